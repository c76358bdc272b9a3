//! Length-prefixed message framing with optional LZO compression
//!
//! Every frame is a 5-byte header followed by the payload:
//!
//! ```text
//! +-----------+-------+-------------------+
//! | data_len  | flags | payload           |
//! | 4B (BE)   | 1B    | data_len bytes    |
//! +-----------+-------+-------------------+
//! ```
//!
//! Bit 7 of `flags` marks an LZO1X-compressed payload, bits 0-6 carry the message type.
//!
//! # Example
//!
//! ```
//! use lzo_frame::{FrameDecoder, MessageType, frame_message};
//!
//! let ty = MessageType::new(3).unwrap();
//! let frame = frame_message(b"hello", ty, false).unwrap();
//! assert_eq!(&frame[..5], &[0, 0, 0, 5, 3]);
//!
//! let mut decoder = FrameDecoder::new(1024);
//! decoder.feed(&frame[..7]).unwrap();
//! decoder.feed(&frame[7..]).unwrap();
//!
//! let messages = decoder.drain_messages();
//! assert_eq!(messages.len(), 1);
//! assert_eq!(&messages[0].data[..], b"hello");
//! assert_eq!(messages[0].r#type, ty);
//! ```

mod buffer;
mod compression;
mod decoder;
mod encoder;
mod error;
mod frame;

// Public API
pub use buffer::Accumulator;
pub use compression::{compress_lzo, decompress_lzo};
pub use decoder::{DecoderState, FrameDecoder};
pub use encoder::{encode_into, frame_message};
pub use error::FrameError;
pub use frame::{Flags, Header, Message, MessageType};

// Constants
/// Size of the frame header: 4-byte length + 1 flag byte
pub const HEADER_SIZE: usize = 5;

/// Maximum decompressed payload size (10 KiB)
///
/// Compressed payloads that inflate past this bound are rejected.
pub const MAX_DECOMPRESSED_SIZE_BYTES: usize = 10240;

/// Flag bit marking an LZO-compressed payload
pub const COMPRESSED_FLAG: u8 = 0x80;

/// Mask selecting the message type from the flag byte
pub const TYPE_MASK: u8 = 0x7f;
