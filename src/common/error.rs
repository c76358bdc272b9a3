use alloc::borrow::Cow;
use core::time::Duration;
use lzo_frame::FrameError;

// ========== Error type definitions ==========

#[derive(Debug)]
pub enum IngestError {
    /// Network I/O error
    Io(std::io::Error),
    /// Peer violated the framing protocol
    Frame(FrameError),
    /// Configuration could not be loaded
    Config(Cow<'static, str>),
    /// No bytes arrived within the idle timeout
    IdleTimeout(Duration),
}

impl IngestError {
    #[inline]
    pub fn error_type(&self) -> &'static str {
        match self {
            Self::Io(_) => "io",
            Self::Frame(e) => e.error_type(),
            Self::Config(_) => "config",
            Self::IdleTimeout(_) => "idle_timeout",
        }
    }
}

impl core::fmt::Display for IngestError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Io(e) => write!(f, "IO error: {e}"),
            Self::Frame(e) => write!(f, "Framing error: {e}"),
            Self::Config(msg) => write!(f, "Configuration error: {msg}"),
            Self::IdleTimeout(d) => write!(f, "Connection idle for {}s", d.as_secs()),
        }
    }
}

impl std::error::Error for IngestError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            Self::Frame(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for IngestError {
    fn from(e: std::io::Error) -> Self { Self::Io(e) }
}

impl From<FrameError> for IngestError {
    fn from(e: FrameError) -> Self { Self::Frame(e) }
}

impl From<toml::de::Error> for IngestError {
    fn from(e: toml::de::Error) -> Self { Self::Config(Cow::Owned(e.to_string())) }
}
