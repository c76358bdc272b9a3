//! Frame encoding

use bytes::{BufMut as _, Bytes, BytesMut};

use crate::HEADER_SIZE;
use crate::compression::compress_lzo;
use crate::error::FrameError;
use crate::frame::{Flags, Header, MessageType};

/// Frame a single message
///
/// Compresses `payload` when `compress` is set, then prefixes the header. The length
/// field describes the bytes actually written, i.e. the compressed size.
///
/// ```
/// # use lzo_frame::{frame_message, MessageType};
/// let frame = frame_message(b"hello", MessageType::new(3).unwrap(), false).unwrap();
/// assert_eq!(&frame[..], b"\x00\x00\x00\x05\x03hello");
/// ```
pub fn frame_message(
    payload: &[u8],
    r#type: MessageType,
    compress: bool,
) -> Result<Bytes, FrameError> {
    let mut dst = BytesMut::new();
    encode_into(&mut dst, payload, r#type, compress)?;
    Ok(dst.freeze())
}

/// Append a framed message to `dst`
///
/// `dst` is left untouched on error.
pub fn encode_into(
    dst: &mut BytesMut,
    payload: &[u8],
    r#type: MessageType,
    compress: bool,
) -> Result<(), FrameError> {
    let compressed;
    let body = if compress {
        compressed = compress_lzo(payload)?;
        &compressed[..]
    } else {
        payload
    };

    if body.is_empty() {
        return Err(FrameError::EmptyPayload);
    }
    let data_len = u32::try_from(body.len()).map_err(|_| FrameError::PayloadTooLarge(body.len()))?;

    let header = Header { data_len, flags: Flags::new(r#type, compress) };
    dst.reserve(HEADER_SIZE + body.len());
    dst.put_slice(&header.to_bytes());
    dst.put_slice(body);
    Ok(())
}
