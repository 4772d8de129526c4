//! Property tag messages
//!
//! A property message is a self-describing buffer handed to the firmware
//! over the property channel. The firmware writes its answer back into the
//! same memory.
//!
//! ```text
//! word 0      total size in bytes (multiple of 16)
//! word 1      request/response code
//! word 2..    tags: id, value buffer size, tag code, value words
//! word n      end tag (0), then zero padding
//! ```

use core::mem::{align_of, size_of};
use core::ptr::{read_volatile, write_volatile};

use static_assertions::const_assert;

use crate::hal::mailbox::MailboxError;

// ============================================================================
// Message Constants
// ============================================================================

/// Message code of a request the firmware has not yet processed
pub const REQUEST: u32 = 0x0000_0000;
pub const RESPONSE_SUCCESS: u32 = 0x8000_0000;
pub const RESPONSE_ERROR: u32 = 0x8000_0001;

/// Bit set in a tag code once the firmware has answered that tag
pub const TAG_RESPONSE: u32 = 0x8000_0000;

pub const END_TAG: u32 = 0;

/// Alignment requested for the framebuffer allocation
pub const FB_ALLOCATE_ALIGNMENT: u32 = 16;

/// Capacity of a [`PropertyBuffer`] in words
pub const BUFFER_WORDS: usize = 36;

/// Size word and code word
const HEADER_WORDS: usize = 2;
/// Tag id, value buffer size and tag code
const TAG_HEADER_WORDS: usize = 3;
const MAX_VALUE_WORDS: usize = 2;

// ============================================================================
// Tags
// ============================================================================

#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TagId {
    AllocateBuffer = 0x0004_0001,
    SetPhysicalSize = 0x0004_8003,
    SetVirtualSize = 0x0004_8004,
    SetDepth = 0x0004_8005,
}

impl TagId {
    pub fn from_raw(raw: u32) -> Option<Self> {
        match raw {
            0x0004_0001 => Some(TagId::AllocateBuffer),
            0x0004_8003 => Some(TagId::SetPhysicalSize),
            0x0004_8004 => Some(TagId::SetVirtualSize),
            0x0004_8005 => Some(TagId::SetDepth),
            _ => None,
        }
    }

    /// Words reserved for the value buffer, large enough for request and response
    pub const fn value_words(self) -> usize {
        match self {
            TagId::SetDepth => 1,
            TagId::AllocateBuffer | TagId::SetPhysicalSize | TagId::SetVirtualSize => 2,
        }
    }
}

/// Decoded value buffer of a tag
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TagValue {
    Dimensions { width: u32, height: u32 },
    BitsPerPixel(u32),
    /// Allocation request
    Alignment(u32),
    /// Allocation response: bus address and size in bytes
    Allocation { address: u32, size: u32 },
}

impl TagValue {
    fn encode(&self) -> [u32; MAX_VALUE_WORDS] {
        match *self {
            TagValue::Dimensions { width, height } => [width, height],
            TagValue::BitsPerPixel(bpp) => [bpp, 0],
            TagValue::Alignment(align) => [align, 0],
            TagValue::Allocation { address, size } => [address, size],
        }
    }

    /// Interpret value words for `id`; `response` selects the firmware's
    /// layout where it differs from the request.
    pub fn decode(id: TagId, response: bool, words: [u32; MAX_VALUE_WORDS]) -> Self {
        match id {
            TagId::SetPhysicalSize | TagId::SetVirtualSize => TagValue::Dimensions {
                width: words[0],
                height: words[1],
            },
            TagId::SetDepth => TagValue::BitsPerPixel(words[0]),
            TagId::AllocateBuffer if response => TagValue::Allocation {
                address: words[0],
                size: words[1],
            },
            TagId::AllocateBuffer => TagValue::Alignment(words[0]),
        }
    }
}

/// A request tag; the constructors pair every id with its value shape
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tag {
    id: TagId,
    value: TagValue,
}

impl Tag {
    pub const fn set_physical_size(width: u32, height: u32) -> Self {
        Self {
            id: TagId::SetPhysicalSize,
            value: TagValue::Dimensions { width, height },
        }
    }

    pub const fn set_virtual_size(width: u32, height: u32) -> Self {
        Self {
            id: TagId::SetVirtualSize,
            value: TagValue::Dimensions { width, height },
        }
    }

    pub const fn set_depth(bpp: u32) -> Self {
        Self {
            id: TagId::SetDepth,
            value: TagValue::BitsPerPixel(bpp),
        }
    }

    pub const fn allocate_buffer(alignment: u32) -> Self {
        Self {
            id: TagId::AllocateBuffer,
            value: TagValue::Alignment(alignment),
        }
    }

    pub fn id(&self) -> TagId {
        self.id
    }

    pub fn value(&self) -> TagValue {
        self.value
    }

    fn encoded_words(&self) -> usize {
        TAG_HEADER_WORDS + self.id.value_words()
    }
}

/// Firmware's verdict on a whole message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseCode {
    /// Code still reads as a request
    Unprocessed,
    Success,
    Error,
    Unknown(u32),
}

impl ResponseCode {
    pub fn from_raw(raw: u32) -> Self {
        match raw {
            REQUEST => ResponseCode::Unprocessed,
            RESPONSE_SUCCESS => ResponseCode::Success,
            RESPONSE_ERROR => ResponseCode::Error,
            other => ResponseCode::Unknown(other),
        }
    }
}

// ============================================================================
// Property Buffer
// ============================================================================

/// 16-byte aligned message storage shared with the firmware
#[repr(C, align(16))]
pub struct PropertyBuffer {
    words: [u32; BUFFER_WORDS],
}

const_assert!(align_of::<PropertyBuffer>() == 16);
const_assert!(size_of::<PropertyBuffer>() % 16 == 0);
// Configure message (three tags) must fit
const_assert!(BUFFER_WORDS * 4 >= 80);

impl PropertyBuffer {
    pub const fn new() -> Self {
        Self {
            words: [0; BUFFER_WORDS],
        }
    }

    /// Pointer handed to the firmware
    pub fn as_mut_ptr(&mut self) -> *mut u32 {
        self.words.as_mut_ptr()
    }

    // The firmware writes behind the compiler's back, so every access is volatile.
    fn word(&self, index: usize) -> u32 {
        unsafe { read_volatile(&self.words[index]) }
    }

    fn set_word(&mut self, index: usize, value: u32) {
        unsafe { write_volatile(&mut self.words[index], value) }
    }

    pub fn clear(&mut self) {
        for index in 0..BUFFER_WORDS {
            self.set_word(index, 0);
        }
    }

    /// Lay out a request carrying `tags`, returning its size in bytes.
    ///
    /// The buffer is fully rewritten, so identical tag lists always produce
    /// identical bytes.
    pub fn encode(&mut self, tags: &[Tag]) -> Result<u32, MailboxError> {
        let used_words = HEADER_WORDS + tags.iter().map(Tag::encoded_words).sum::<usize>() + 1;
        let size = align_up_16(used_words * 4);
        if size > BUFFER_WORDS * 4 {
            return Err(MailboxError::BufferOverflow);
        }

        self.clear();
        self.set_word(0, size as u32);
        self.set_word(1, REQUEST);

        let mut index = HEADER_WORDS;
        for tag in tags {
            let value_words = tag.id.value_words();
            self.set_word(index, tag.id as u32);
            self.set_word(index + 1, (value_words * 4) as u32);
            self.set_word(index + 2, REQUEST);
            for (offset, word) in tag.value.encode().into_iter().take(value_words).enumerate() {
                self.set_word(index + TAG_HEADER_WORDS + offset, word);
            }
            index += TAG_HEADER_WORDS + value_words;
        }
        self.set_word(index, END_TAG);

        Ok(size as u32)
    }

    /// Request for a `width` x `height` display at `bpp` bits per pixel.
    /// The virtual size mirrors the physical size.
    pub fn encode_configure(
        &mut self,
        width: u32,
        height: u32,
        bpp: u32,
    ) -> Result<u32, MailboxError> {
        self.encode(&[
            Tag::set_physical_size(width, height),
            Tag::set_virtual_size(width, height),
            Tag::set_depth(bpp),
        ])
    }

    /// Request for the framebuffer allocation
    pub fn encode_allocate(&mut self, alignment: u32) -> Result<u32, MailboxError> {
        self.encode(&[Tag::allocate_buffer(alignment)])
    }

    pub fn size(&self) -> u32 {
        self.word(0)
    }

    pub fn code(&self) -> u32 {
        self.word(1)
    }

    pub fn response(&self) -> ResponseCode {
        ResponseCode::from_raw(self.code())
    }

    /// Tags of the message as they currently read
    pub fn tags(&self) -> TagIter<'_> {
        TagIter {
            buffer: self,
            index: HEADER_WORDS,
        }
    }

    /// First tag with `id`
    pub fn find(&self, id: TagId) -> Option<ParsedTag> {
        self.tags().find(|tag| tag.id == Some(id))
    }

    /// Copy of the raw words, for logging and tests
    pub fn snapshot(&self) -> [u32; BUFFER_WORDS] {
        let mut words = [0; BUFFER_WORDS];
        for (index, word) in words.iter_mut().enumerate() {
            *word = self.word(index);
        }
        words
    }
}

impl Default for PropertyBuffer {
    fn default() -> Self {
        Self::new()
    }
}

const fn align_up_16(bytes: usize) -> usize {
    (bytes + 15) & !15
}

/// One tag read back from a buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParsedTag {
    /// `None` for ids this crate does not know
    pub id: Option<TagId>,
    pub raw_id: u32,
    pub code: u32,
    pub value: Option<TagValue>,
}

impl ParsedTag {
    pub fn is_response(&self) -> bool {
        self.code & TAG_RESPONSE != 0
    }

    /// Value length the firmware reported, in bytes
    pub fn response_len(&self) -> u32 {
        self.code & !TAG_RESPONSE
    }
}

pub struct TagIter<'a> {
    buffer: &'a PropertyBuffer,
    index: usize,
}

impl Iterator for TagIter<'_> {
    type Item = ParsedTag;

    fn next(&mut self) -> Option<ParsedTag> {
        let limit = (self.buffer.size() as usize / 4).min(BUFFER_WORDS);
        if self.index + TAG_HEADER_WORDS > limit {
            return None;
        }

        let raw_id = self.buffer.word(self.index);
        if raw_id == END_TAG {
            return None;
        }
        let value_bytes = self.buffer.word(self.index + 1) as usize;
        let code = self.buffer.word(self.index + 2);
        let value_start = self.index + TAG_HEADER_WORDS;
        let value_words = value_bytes.div_ceil(4);
        if value_start + value_words > limit {
            self.index = limit;
            return None;
        }

        let id = TagId::from_raw(raw_id);
        let value = id.map(|id| {
            let mut words = [0; MAX_VALUE_WORDS];
            for (offset, word) in words.iter_mut().enumerate().take(value_words) {
                *word = self.buffer.word(value_start + offset);
            }
            TagValue::decode(id, code & TAG_RESPONSE != 0, words)
        });

        self.index = value_start + value_words;
        Some(ParsedTag {
            id,
            raw_id,
            code,
            value,
        })
    }
}
