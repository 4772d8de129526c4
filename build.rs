use std::env;
use std::path::PathBuf;

fn main() {
    println!("cargo:rerun-if-changed=build.rs");

    let Ok(manifest_dir) = env::var("CARGO_MANIFEST_DIR") else {
        return;
    };
    let linker_script = PathBuf::from(manifest_dir).join("src/platform/rpi-zero2/link.ld");
    println!("cargo:rerun-if-changed={}", linker_script.display());

    // Host builds (unit tests, tooling) link normally; only the bare-metal
    // image gets the fixed load address and section layout.
    if env::var("CARGO_CFG_TARGET_OS").as_deref() == Ok("none") {
        println!("cargo:rustc-link-arg-bins=-T{}", linker_script.display());
    }
}
