//! Simulated peripherals for host tests
//!
//! [`FakeBus`] is a plain register file with scripted reads. [`FakeVideoCore`]
//! emulates the mailbox and the firmware's property handling: it resolves the
//! posted bus address back to the buffer, answers the tags in place and
//! queues the response word.

use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, VecDeque};

use crate::hal::mailbox::{MBOX_READ, MBOX_STATUS, MBOX_WRITE};
use crate::hal::property::{RESPONSE_ERROR, RESPONSE_SUCCESS, TAG_RESPONSE, TagId};
use crate::platform_core::mmio::RegisterAccess;

// ============================================================================
// Register File
// ============================================================================

#[derive(Default)]
pub(crate) struct FakeBus {
    registers: RefCell<BTreeMap<usize, u32>>,
    scripted: RefCell<BTreeMap<usize, VecDeque<u32>>>,
    reads: RefCell<BTreeMap<usize, usize>>,
    writes: RefCell<Vec<(usize, u32)>>,
}

impl FakeBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Value returned once the script for `addr` runs dry
    pub fn set(&self, addr: usize, value: u32) {
        self.registers.borrow_mut().insert(addr, value);
    }

    pub fn get(&self, addr: usize) -> u32 {
        self.registers.borrow().get(&addr).copied().unwrap_or(0)
    }

    /// Values returned by the next reads of `addr`, in order
    pub fn script(&self, addr: usize, values: impl IntoIterator<Item = u32>) {
        self.scripted
            .borrow_mut()
            .entry(addr)
            .or_default()
            .extend(values);
    }

    pub fn read_count(&self, addr: usize) -> usize {
        self.reads.borrow().get(&addr).copied().unwrap_or(0)
    }

    pub fn writes(&self) -> Vec<(usize, u32)> {
        self.writes.borrow().clone()
    }

    pub fn writes_to(&self, addr: usize) -> Vec<u32> {
        self.writes
            .borrow()
            .iter()
            .filter(|(a, _)| *a == addr)
            .map(|(_, value)| *value)
            .collect()
    }
}

impl RegisterAccess for FakeBus {
    fn read_word(&self, addr: usize) -> u32 {
        *self.reads.borrow_mut().entry(addr).or_default() += 1;
        let scripted = self
            .scripted
            .borrow_mut()
            .get_mut(&addr)
            .and_then(VecDeque::pop_front);
        scripted.unwrap_or_else(|| self.get(addr))
    }

    fn write_word(&self, addr: usize, value: u32) {
        self.writes.borrow_mut().push((addr, value));
        self.set(addr, value);
    }
}

// ============================================================================
// VideoCore Mailbox
// ============================================================================

/// How the simulated firmware treats the next message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Reply {
    /// Answer every tag and report success
    Success,
    /// Report the whole message as failed
    Error,
    /// Hand the buffer back untouched
    Untouched,
    /// Report success without answering any tag
    Unanswered,
    /// Never post a response word
    Silent,
}

pub(crate) struct FakeVideoCore {
    replies: RefCell<VecDeque<Reply>>,
    buffers: RefCell<Vec<*mut u32>>,
    inbox: RefCell<VecDeque<u32>>,
    posted: RefCell<Vec<u32>>,
    /// Largest display the firmware agrees to
    display_limit: Cell<Option<(u32, u32)>>,
    /// Depth the firmware picks regardless of the request
    forced_depth: Cell<Option<u32>>,
    fb_address: Cell<u32>,
    configured_bytes: Cell<u32>,
    /// Bus addresses handed out with low bits set
    misaligned: Cell<bool>,
}

impl FakeVideoCore {
    pub fn new() -> Self {
        Self {
            replies: RefCell::new(VecDeque::new()),
            buffers: RefCell::new(Vec::new()),
            inbox: RefCell::new(VecDeque::new()),
            posted: RefCell::new(Vec::new()),
            display_limit: Cell::new(None),
            forced_depth: Cell::new(None),
            fb_address: Cell::new(0xFE40_0000),
            configured_bytes: Cell::new(0),
            misaligned: Cell::new(false),
        }
    }

    /// Replies for the coming messages; unscripted messages succeed
    pub fn reply_with(&self, replies: impl IntoIterator<Item = Reply>) {
        self.replies.borrow_mut().extend(replies);
    }

    pub fn limit_display(&self, width: u32, height: u32) {
        self.display_limit.set(Some((width, height)));
    }

    pub fn force_depth(&self, bpp: u32) {
        self.forced_depth.set(Some(bpp));
    }

    pub fn set_fb_address(&self, address: u32) {
        self.fb_address.set(address);
    }

    /// Hand out buffer addresses that collide with the channel field
    pub fn misalign_buffers(&self) {
        self.misaligned.set(true);
    }

    /// Queue a word for another channel ahead of any response
    pub fn inject(&self, word: u32) {
        self.inbox.borrow_mut().push_back(word);
    }

    /// Words the ARM side wrote to the mailbox
    pub fn posted(&self) -> Vec<u32> {
        self.posted.borrow().clone()
    }

    fn handle_for(&self, index: usize) -> u32 {
        ((index as u32) + 1) << 12
    }

    fn buffer_for(&self, handle: u32) -> Option<*mut u32> {
        let index = (handle >> 12).checked_sub(1)? as usize;
        self.buffers.borrow().get(index).copied()
    }

    fn service(&self, words: &mut [u32], reply: Reply) {
        match reply {
            Reply::Untouched | Reply::Silent => return,
            Reply::Error => {
                words[1] = RESPONSE_ERROR;
                return;
            }
            Reply::Unanswered => {
                words[1] = RESPONSE_SUCCESS;
                return;
            }
            Reply::Success => {}
        }

        let mut index = 2;
        while index + 2 < words.len() && words[index] != 0 {
            let value_bytes = words[index + 1];
            let value = index + 3;
            match TagId::from_raw(words[index]) {
                Some(TagId::SetPhysicalSize) | Some(TagId::SetVirtualSize) => {
                    if let Some((max_w, max_h)) = self.display_limit.get() {
                        words[value] = words[value].min(max_w);
                        words[value + 1] = words[value + 1].min(max_h);
                    }
                    self.configured_bytes
                        .set(words[value].wrapping_mul(words[value + 1]));
                }
                Some(TagId::SetDepth) => {
                    if let Some(bpp) = self.forced_depth.get() {
                        words[value] = bpp;
                    }
                    let pixels = self.configured_bytes.get();
                    self.configured_bytes.set(pixels.wrapping_mul(words[value] / 8));
                }
                Some(TagId::AllocateBuffer) => {
                    words[value] = self.fb_address.get();
                    words[value + 1] = self.configured_bytes.get();
                }
                None => {}
            }
            words[index + 2] = TAG_RESPONSE | value_bytes;
            index = value + (value_bytes as usize).div_ceil(4);
        }
        words[1] = RESPONSE_SUCCESS;
    }
}

impl RegisterAccess for FakeVideoCore {
    fn read_word(&self, addr: usize) -> u32 {
        match addr {
            MBOX_STATUS if self.inbox.borrow().is_empty() => 1 << 30,
            MBOX_STATUS => 0,
            MBOX_READ => self.inbox.borrow_mut().pop_front().unwrap_or(0),
            _ => 0,
        }
    }

    fn write_word(&self, addr: usize, value: u32) {
        if addr != MBOX_WRITE {
            return;
        }
        self.posted.borrow_mut().push(value);

        let handle = value & !0xF;
        let Some(ptr) = self.buffer_for(handle) else {
            return;
        };
        let reply = self.replies.borrow_mut().pop_front().unwrap_or(Reply::Success);

        // SAFETY: the pointer came from bus_address() on a live, exclusively
        // borrowed buffer whose first word holds its size in bytes.
        let words = unsafe {
            let len = (*ptr as usize / 4).min(crate::hal::property::BUFFER_WORDS);
            std::slice::from_raw_parts_mut(ptr, len)
        };
        self.service(words, reply);

        if reply != Reply::Silent {
            self.inbox.borrow_mut().push_back(handle | (value & 0xF));
        }
    }

    fn bus_address(&self, ptr: *mut u32) -> u32 {
        let mut buffers = self.buffers.borrow_mut();
        buffers.push(ptr);
        let handle = self.handle_for(buffers.len() - 1);
        if self.misaligned.get() {
            handle | 0x4
        } else {
            handle
        }
    }
}
