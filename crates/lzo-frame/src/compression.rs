//! LZO1X payload compression

use crate::MAX_DECOMPRESSED_SIZE_BYTES;
use crate::error::FrameError;
use rust_lzo::{LZOContext, LZOError, worst_compress};

/// Compress data with LZO1X-1
///
/// The codec keeps a small work area, so a context is set up per call.
pub fn compress_lzo(data: &[u8]) -> Result<Vec<u8>, FrameError> {
    let mut out = Vec::with_capacity(worst_compress(data.len()));
    if LZOContext::new().compress(data, &mut out) != LZOError::OK {
        return Err(FrameError::CompressionFailure("lzo1x compress failed"));
    }
    Ok(out)
}

/// Decompress LZO1X data
///
/// # Returns
/// - `Ok(Vec<u8>)`: Decompression successful, sized to the actual output
/// - `Err(DecompressionFailure)`: Corrupt input, or output would exceed the bound
///
/// # Security
/// - Output is written into a buffer of `MAX_DECOMPRESSED_SIZE_BYTES`, so an
///   inflating payload fails with an output overrun instead of allocating
pub fn decompress_lzo(data: &[u8]) -> Result<Vec<u8>, FrameError> {
    // Minimal LZO1X stream is the 3-byte end-of-stream marker
    if data.len() < 3 {
        return Err(FrameError::DecompressionFailure("lzo stream too short"));
    }

    let mut out = vec![0u8; MAX_DECOMPRESSED_SIZE_BYTES];
    let (written, err) = LZOContext::decompress_to_slice(data, &mut out);
    let len = written.len();

    if err == LZOError::OUTPUT_OVERRUN {
        return Err(FrameError::DecompressionFailure("decompressed size exceeds limit"));
    }
    if err != LZOError::OK {
        return Err(FrameError::DecompressionFailure("corrupt lzo payload"));
    }

    out.truncate(len);
    Ok(out)
}
