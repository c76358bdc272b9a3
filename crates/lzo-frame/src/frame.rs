//! Frame header and message definitions

use bytes::Bytes;

use crate::error::FrameError;
use crate::{COMPRESSED_FLAG, HEADER_SIZE, TYPE_MASK};

/// 7-bit message type tag carried in the flag byte
///
/// The codec treats the value as opaque; applications assign meaning to it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct MessageType(u8);

impl MessageType {
    pub const MAX: u8 = TYPE_MASK;

    /// Returns `None` when `value` does not fit in 7 bits
    #[inline]
    pub const fn new(value: u8) -> Option<Self> {
        if value <= Self::MAX { Some(Self(value)) } else { None }
    }

    #[inline]
    pub const fn get(self) -> u8 { self.0 }
}

impl TryFrom<u8> for MessageType {
    type Error = FrameError;

    #[inline]
    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::new(value).ok_or(FrameError::InvalidMessageType(value))
    }
}

impl From<MessageType> for u8 {
    #[inline]
    fn from(ty: MessageType) -> u8 { ty.0 }
}

impl core::fmt::Display for MessageType {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

/// Parsed flag byte
///
/// ```text
///  7   6               0
/// +---+-----------------+
/// | C | message type    |
/// +---+-----------------+
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Flags {
    compressed: bool,
    r#type: MessageType,
}

impl Flags {
    #[inline]
    pub const fn new(r#type: MessageType, compressed: bool) -> Self { Self { compressed, r#type } }

    #[inline]
    pub const fn from_byte(byte: u8) -> Self {
        Self { compressed: byte & COMPRESSED_FLAG != 0, r#type: MessageType(byte & TYPE_MASK) }
    }

    #[inline]
    pub const fn to_byte(self) -> u8 {
        if self.compressed { self.r#type.0 | COMPRESSED_FLAG } else { self.r#type.0 }
    }

    #[inline]
    pub const fn is_compressed(self) -> bool { self.compressed }

    #[inline]
    pub const fn message_type(self) -> MessageType { self.r#type }
}

/// Frame header: payload length and flags
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    pub data_len: u32,
    pub flags: Flags,
}

impl Header {
    #[inline]
    pub const fn parse(bytes: &[u8; HEADER_SIZE]) -> Self {
        Self {
            data_len: u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]),
            flags: Flags::from_byte(bytes[4]),
        }
    }

    #[inline]
    pub const fn to_bytes(self) -> [u8; HEADER_SIZE] {
        let len = self.data_len.to_be_bytes();
        [len[0], len[1], len[2], len[3], self.flags.to_byte()]
    }

    /// Checks `data_len` lies in `[1, max_frame_size]`
    #[inline]
    pub const fn validate(self, max_frame_size: u32) -> Result<Self, FrameError> {
        if self.data_len == 0 || self.data_len > max_frame_size {
            Err(FrameError::InvalidFrameSize { len: self.data_len, max: max_frame_size })
        } else {
            Ok(self)
        }
    }

    /// Total bytes the frame occupies on the wire
    ///
    /// ```
    /// # use lzo_frame::{Flags, Header, MessageType};
    /// let header = Header { data_len: 3, flags: Flags::new(MessageType::default(), false) };
    /// assert_eq!(header.frame_size(), 8); // 5 + 3
    /// ```
    #[inline]
    pub const fn frame_size(self) -> usize { HEADER_SIZE + self.data_len as usize }
}

/// Decoded message: payload after decompression plus its type tag
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub data: Bytes,
    pub r#type: MessageType,
}

impl Message {
    #[inline]
    pub fn into_parts(self) -> (Bytes, MessageType) { (self.data, self.r#type) }
}
