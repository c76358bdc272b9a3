//! 分段累积缓冲区

use bytes::{Bytes, BytesMut};

/// Bounded byte accumulator
///
/// Collects bytes from successive chunks until a caller-chosen target length is
/// reached. Never holds more than the target passed to [`fill`](Self::fill).
#[derive(Debug, Default)]
pub struct Accumulator {
    inner: BytesMut,
}

impl Accumulator {
    #[inline]
    pub fn new() -> Self { Self { inner: BytesMut::new() } }

    #[inline]
    pub fn with_capacity(capacity: usize) -> Self {
        Self { inner: BytesMut::with_capacity(capacity) }
    }

    #[inline]
    pub fn len(&self) -> usize { self.inner.len() }

    #[inline]
    pub fn is_empty(&self) -> bool { self.inner.is_empty() }

    #[inline]
    pub fn capacity(&self) -> usize { self.inner.capacity() }

    /// Appends from `data` until `target` bytes are held
    ///
    /// Returns how many bytes of `data` were consumed.
    #[inline]
    pub fn fill(&mut self, data: &[u8], target: usize) -> usize {
        let wanted = target.saturating_sub(self.inner.len());
        let taken = wanted.min(data.len());
        self.inner.extend_from_slice(&data[..taken]);
        taken
    }

    /// Reserves room for `additional` more bytes
    #[inline]
    pub fn reserve(&mut self, additional: usize) { self.inner.reserve(additional) }

    /// Takes the held bytes, leaving the accumulator empty
    #[inline]
    pub fn take(&mut self) -> Bytes { self.inner.split().freeze() }

    #[inline]
    pub fn clear(&mut self) { self.inner.clear() }
}

impl AsRef<[u8]> for Accumulator {
    #[inline]
    fn as_ref(&self) -> &[u8] { &self.inner }
}
