//! Framing errors

/// Errors raised while encoding or decoding frames
///
/// `InvalidFrameSize` and `DecompressionFailure` are fatal for the stream: the decoder
/// does not try to find the next valid header, the owner is expected to close the
/// connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FrameError {
    /// Header declared a payload length outside `[1, max]`
    InvalidFrameSize { len: u32, max: u32 },
    /// LZO codec rejected the payload or the output exceeded the size bound
    DecompressionFailure(&'static str),
    /// LZO compression failed while encoding
    CompressionFailure(&'static str),
    /// Message type does not fit in 7 bits
    InvalidMessageType(u8),
    /// Uncompressed empty payload, which would encode a zero `data_len`
    EmptyPayload,
    /// Encoded payload does not fit the 32-bit length field
    PayloadTooLarge(usize),
    /// Decoder already hit a fatal error
    Poisoned,
}

impl FrameError {
    #[inline]
    pub fn error_type(&self) -> &'static str {
        match self {
            Self::InvalidFrameSize { .. } => "invalid_frame_size",
            Self::DecompressionFailure(_) => "decompression_failure",
            Self::CompressionFailure(_) => "compression_failure",
            Self::InvalidMessageType(_) => "invalid_message_type",
            Self::EmptyPayload => "empty_payload",
            Self::PayloadTooLarge(_) => "payload_too_large",
            Self::Poisoned => "poisoned",
        }
    }

    /// Whether the error leaves the decoding stream unusable
    #[inline]
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::InvalidFrameSize { .. } | Self::DecompressionFailure(_) | Self::Poisoned
        )
    }
}

impl core::fmt::Display for FrameError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::InvalidFrameSize { len, max } => {
                write!(f, "Invalid frame size {len}, expected 1..={max}")
            }
            Self::DecompressionFailure(reason) => write!(f, "Decompression failed: {reason}"),
            Self::CompressionFailure(reason) => write!(f, "Compression failed: {reason}"),
            Self::InvalidMessageType(ty) => write!(f, "Message type {ty} exceeds 127"),
            Self::EmptyPayload => write!(f, "Uncompressed payload cannot be empty"),
            Self::PayloadTooLarge(len) => write!(f, "Payload of {len} bytes exceeds u32 length"),
            Self::Poisoned => write!(f, "Decoder is unusable after a fatal framing error"),
        }
    }
}

impl std::error::Error for FrameError {}
