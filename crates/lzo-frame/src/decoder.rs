//! Streaming frame decoder

use std::collections::VecDeque;

use bytes::Bytes;

use crate::HEADER_SIZE;
use crate::buffer::Accumulator;
use crate::compression::decompress_lzo;
use crate::error::FrameError;
use crate::frame::{Header, Message};

/// Position of the decoder within the current frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecoderState {
    /// Collecting the 5-byte header
    AwaitingHeader,
    /// Header parsed, collecting `header.data_len` payload bytes
    AwaitingPayload { header: Header },
}

/// Initial payload buffer size; larger payloads grow as their bytes arrive
const PAYLOAD_RESERVE_LIMIT: usize = 8 * 1024;

/// Input to the transition function, produced once an accumulator is full
///
/// Each event carries the state it completes.
enum Event {
    HeaderComplete([u8; HEADER_SIZE]),
    PayloadComplete { header: Header, payload: Bytes },
}

/// Side effect requested by a transition
enum Action {
    None,
    Emit(Message),
}

/// Pure state transition
///
/// Payload bytes only flow after the header passed validation, so an oversized frame
/// is rejected before any of its payload is buffered.
fn transition(event: Event, max_frame_size: u32) -> Result<(DecoderState, Action), FrameError> {
    match event {
        Event::HeaderComplete(bytes) => {
            let header = Header::parse(&bytes).validate(max_frame_size)?;
            Ok((DecoderState::AwaitingPayload { header }, Action::None))
        }
        Event::PayloadComplete { header, payload } => {
            let data = if header.flags.is_compressed() {
                Bytes::from(decompress_lzo(&payload)?)
            } else {
                payload
            };
            let message = Message { data, r#type: header.flags.message_type() };
            Ok((DecoderState::AwaitingHeader, Action::Emit(message)))
        }
    }
}

/// Incremental frame decoder
///
/// Fed with arbitrarily sized chunks of a byte stream, it collects complete frames into
/// a ready-queue that the caller drains. One decoder belongs to one stream.
///
/// # Example
///
/// ```
/// use lzo_frame::FrameDecoder;
///
/// let mut decoder = FrameDecoder::new(1024);
/// decoder.feed(&[0, 0, 0, 5, 3, b'h', b'e']).unwrap();
/// assert!(decoder.drain_messages().is_empty());
///
/// decoder.feed(b"llo").unwrap();
/// let (data, ty) = decoder.drain_messages().remove(0).into_parts();
/// assert_eq!(&data[..], b"hello");
/// assert_eq!(ty.get(), 3);
/// ```
#[derive(Debug)]
pub struct FrameDecoder {
    state: DecoderState,
    header: Accumulator,
    payload: Accumulator,
    ready: VecDeque<Message>,
    max_frame_size: u32,
    poisoned: bool,
}

impl FrameDecoder {
    /// Create new decoder accepting payloads of `1..=max_frame_size` bytes
    #[inline]
    pub fn new(max_frame_size: u32) -> Self {
        Self {
            state: DecoderState::AwaitingHeader,
            header: Accumulator::with_capacity(HEADER_SIZE),
            payload: Accumulator::new(),
            ready: VecDeque::new(),
            max_frame_size,
            poisoned: false,
        }
    }

    #[inline]
    pub fn max_frame_size(&self) -> u32 { self.max_frame_size }

    #[inline]
    pub fn state(&self) -> DecoderState { self.state }

    /// Number of decoded messages waiting to be drained
    #[inline]
    pub fn pending(&self) -> usize { self.ready.len() }

    /// Bytes held for the frame currently being assembled
    #[inline]
    pub fn buffered(&self) -> usize { self.header.len() + self.payload.len() }

    /// Whether a fatal error has been returned
    #[inline]
    pub fn is_poisoned(&self) -> bool { self.poisoned }

    /// Consume a chunk of the stream
    ///
    /// Every frame completed by `data` is queued in arrival order, including several
    /// frames in a single chunk. An error is fatal: the decoder refuses further input
    /// and the stream should be closed. Messages completed before the failing frame
    /// remain drainable.
    pub fn feed(&mut self, mut data: &[u8]) -> Result<(), FrameError> {
        if self.poisoned {
            return Err(FrameError::Poisoned);
        }

        while !data.is_empty() {
            let event = match self.state {
                DecoderState::AwaitingHeader => {
                    let taken = self.header.fill(data, HEADER_SIZE);
                    data = &data[taken..];
                    if self.header.len() < HEADER_SIZE {
                        break;
                    }
                    let mut bytes = [0u8; HEADER_SIZE];
                    bytes.copy_from_slice(self.header.as_ref());
                    self.header.clear();
                    Event::HeaderComplete(bytes)
                }
                DecoderState::AwaitingPayload { header } => {
                    let target = header.data_len as usize;
                    let taken = self.payload.fill(data, target);
                    data = &data[taken..];
                    if self.payload.len() < target {
                        break;
                    }
                    Event::PayloadComplete { header, payload: self.payload.take() }
                }
            };

            let (state, action) = match transition(event, self.max_frame_size) {
                Ok(step) => step,
                Err(e) => return Err(self.poison(e)),
            };

            if let DecoderState::AwaitingPayload { header } = state {
                // 按实际到达的字节增长，头部声明的长度不预先占用内存
                self.payload.reserve((header.data_len as usize).min(PAYLOAD_RESERVE_LIMIT));
            }
            if let Action::Emit(message) = action {
                self.ready.push_back(message);
            }
            self.state = state;
        }

        Ok(())
    }

    /// Take every message decoded so far
    #[inline]
    pub fn drain_messages(&mut self) -> Vec<Message> { self.ready.drain(..).collect() }

    /// Feed `data` and map the drained messages through `processor`
    ///
    /// Messages for which `processor` returns `None` are dropped.
    ///
    /// ```
    /// # use lzo_frame::FrameDecoder;
    /// let mut decoder = FrameDecoder::new(64);
    /// let texts = decoder
    ///     .decode_with(b"\x00\x00\x00\x02\x01hi\x00\x00\x00\x01\x02x", |msg| {
    ///         (msg.r#type.get() == 1).then(|| String::from_utf8_lossy(&msg.data).into_owned())
    ///     })
    ///     .unwrap();
    /// assert_eq!(texts, ["hi"]);
    /// ```
    pub fn decode_with<T, F>(&mut self, data: &[u8], processor: F) -> Result<Vec<T>, FrameError>
    where F: FnMut(Message) -> Option<T> {
        self.feed(data)?;
        Ok(self.ready.drain(..).filter_map(processor).collect())
    }

    #[cold]
    fn poison(&mut self, error: FrameError) -> FrameError {
        self.poisoned = true;
        self.state = DecoderState::AwaitingHeader;
        self.header.clear();
        self.payload.clear();
        error
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compression::compress_lzo;
    use crate::encoder::frame_message;
    use crate::frame::MessageType;
    use crate::MAX_DECOMPRESSED_SIZE_BYTES;

    fn ty(v: u8) -> MessageType { MessageType::new(v).unwrap() }

    #[test]
    fn test_split_header_and_payload() {
        let mut decoder = FrameDecoder::new(1024);

        decoder.feed(&[0x00, 0x00, 0x00, 0x05, 0x03, b'h', b'e']).unwrap();
        assert_eq!(decoder.pending(), 0);
        assert!(matches!(decoder.state(), DecoderState::AwaitingPayload { .. }));
        assert_eq!(decoder.buffered(), 2);

        decoder.feed(b"llo").unwrap();
        let messages = decoder.drain_messages();
        assert_eq!(messages, vec![Message { data: Bytes::from_static(b"hello"), r#type: ty(3) }]);
        assert_eq!(decoder.state(), DecoderState::AwaitingHeader);
        assert_eq!(decoder.buffered(), 0);
    }

    #[test]
    fn test_empty_feed_is_noop() {
        let mut decoder = FrameDecoder::new(1024);
        decoder.feed(&[]).unwrap();
        assert_eq!(decoder.state(), DecoderState::AwaitingHeader);

        decoder.feed(&[0, 0]).unwrap();
        decoder.feed(&[]).unwrap();
        assert_eq!(decoder.buffered(), 2);
    }

    #[test]
    fn test_byte_by_byte() {
        let frame = frame_message(b"split me", ty(9), false).unwrap();
        let mut decoder = FrameDecoder::new(1024);

        for byte in frame.iter() {
            assert!(decoder.header.len() <= HEADER_SIZE);
            decoder.feed(core::slice::from_ref(byte)).unwrap();
        }

        let (data, r#type) = decoder.drain_messages().remove(0).into_parts();
        assert_eq!(&data[..], b"split me");
        assert_eq!(r#type, ty(9));
    }

    #[test]
    fn test_header_and_payload_in_one_chunk() {
        let mut decoder = FrameDecoder::new(1024);
        decoder.feed(&frame_message(b"x", ty(0), false).unwrap()).unwrap();
        assert_eq!(decoder.pending(), 1);
        assert_eq!(decoder.state(), DecoderState::AwaitingHeader);
    }

    #[test]
    fn test_multiple_frames_in_order() {
        let mut stream = Vec::new();
        for i in 0..10u8 {
            stream.extend_from_slice(&frame_message(&[i; 3], ty(i), i % 2 == 0).unwrap());
        }
        // 末尾附带下一帧的部分头部
        stream.extend_from_slice(&[0, 0]);

        let mut decoder = FrameDecoder::new(1024);
        decoder.feed(&stream).unwrap();

        let messages = decoder.drain_messages();
        assert_eq!(messages.len(), 10);
        for (i, msg) in messages.iter().enumerate() {
            assert_eq!(&msg.data[..], &[i as u8; 3]);
            assert_eq!(msg.r#type.get(), i as u8);
        }
        assert_eq!(decoder.buffered(), 2);
    }

    #[test]
    fn test_drain_is_repeatable() {
        let mut decoder = FrameDecoder::new(1024);
        assert!(decoder.drain_messages().is_empty());

        decoder.feed(&frame_message(b"a", ty(1), false).unwrap()).unwrap();
        assert_eq!(decoder.drain_messages().len(), 1);
        assert!(decoder.drain_messages().is_empty());
    }

    #[test]
    fn test_minimum_frame() {
        let mut decoder = FrameDecoder::new(1024);
        decoder.feed(&[0, 0, 0, 1, 0x05, 0xaa]).unwrap();
        let messages = decoder.drain_messages();
        assert_eq!(&messages[0].data[..], &[0xaa]);
    }

    #[test]
    fn test_zero_length_rejected() {
        let mut decoder = FrameDecoder::new(1024);
        assert_eq!(
            decoder.feed(&[0, 0, 0, 0, 0x01]),
            Err(FrameError::InvalidFrameSize { len: 0, max: 1024 })
        );
    }

    #[test]
    fn test_oversized_rejected_before_payload() {
        let mut decoder = FrameDecoder::new(1024);
        let len = 2000u32.to_be_bytes();

        // 仅头部即可触发错误
        let err = decoder.feed(&[len[0], len[1], len[2], len[3], 0x00]).unwrap_err();
        assert_eq!(err, FrameError::InvalidFrameSize { len: 2000, max: 1024 });
        assert!(err.is_fatal());
        assert_eq!(decoder.buffered(), 0);
    }

    #[test]
    fn test_poisoned_after_error() {
        let mut decoder = FrameDecoder::new(4);
        let mut stream = frame_message(b"ok", ty(1), false).unwrap().to_vec();
        stream.extend_from_slice(&[0, 0, 0, 9, 0]);

        assert!(decoder.feed(&stream).is_err());
        assert!(decoder.is_poisoned());
        // 出错前已完成的消息仍可取出
        assert_eq!(decoder.drain_messages().len(), 1);

        assert_eq!(decoder.feed(&[0, 0, 0, 1, 0, 0]), Err(FrameError::Poisoned));
        assert_eq!(decoder.pending(), 0);
    }

    #[test]
    fn test_compressed_round_trip() {
        let payload = b"compressible compressible compressible compressible".repeat(20);
        let mut decoder = FrameDecoder::new(1024);
        decoder.feed(&frame_message(&payload, ty(42), true).unwrap()).unwrap();

        let msg = decoder.drain_messages().remove(0);
        assert_eq!(&msg.data[..], &payload[..]);
        assert_eq!(msg.r#type.get(), 42);
    }

    #[test]
    fn test_decompression_bound() {
        let compressed = compress_lzo(&[7u8; MAX_DECOMPRESSED_SIZE_BYTES + 100]).unwrap();
        let header = Header {
            data_len: compressed.len() as u32,
            flags: crate::frame::Flags::new(ty(1), true),
        };

        let mut decoder = FrameDecoder::new(1 << 20);
        decoder.feed(&header.to_bytes()).unwrap();
        assert!(matches!(decoder.feed(&compressed), Err(FrameError::DecompressionFailure(_))));
    }

    #[test]
    fn test_corrupt_compressed_payload() {
        let mut decoder = FrameDecoder::new(1024);
        let err = decoder.feed(&[0, 0, 0, 4, 0x81, 0xff, 0xff, 0xff, 0xff]).unwrap_err();
        assert!(matches!(err, FrameError::DecompressionFailure(_)));
    }

    #[test]
    fn test_decode_with_processor() {
        let mut decoder = FrameDecoder::new(1024);
        let mut stream = frame_message(b"keep", ty(1), false).unwrap().to_vec();
        stream.extend_from_slice(&frame_message(b"drop", ty(2), false).unwrap());

        let kept = decoder
            .decode_with(&stream, |msg| (msg.r#type.get() == 1).then_some(msg.data))
            .unwrap();
        assert_eq!(kept, vec![Bytes::from_static(b"keep")]);
        assert_eq!(decoder.pending(), 0);
    }

    #[test]
    fn test_header_does_not_preallocate_payload() {
        let mut decoder = FrameDecoder::new(1 << 20);
        decoder.feed(&[0x00, 0x10, 0x00, 0x00, 0x00]).unwrap();

        assert_eq!(decoder.buffered(), 0);
        assert!(matches!(decoder.state(), DecoderState::AwaitingPayload { .. }));
        assert!(decoder.payload.capacity() <= 2 * PAYLOAD_RESERVE_LIMIT);
    }

    #[test]
    fn test_large_payload_grows_with_input() {
        let payload = vec![0x5au8; 3 * PAYLOAD_RESERVE_LIMIT];
        let frame = frame_message(&payload, ty(1), false).unwrap();
        let mut decoder = FrameDecoder::new(1 << 20);

        for chunk in frame.chunks(1000) {
            decoder.feed(chunk).unwrap();
        }
        assert_eq!(&decoder.drain_messages()[0].data[..], &payload[..]);
    }

    #[test]
    fn test_transition_emits_completed_payload() {
        let header = Header { data_len: 2, flags: crate::frame::Flags::new(ty(6), false) };
        let event = Event::PayloadComplete { header, payload: Bytes::from_static(b"hi") };

        let (state, action) = transition(event, 1024).unwrap();
        assert_eq!(state, DecoderState::AwaitingHeader);
        let Action::Emit(message) = action else { panic!("payload was not emitted") };
        assert_eq!(message, Message { data: Bytes::from_static(b"hi"), r#type: ty(6) });
    }

    #[test]
    fn test_transition_validates_header() {
        let (state, action) = transition(Event::HeaderComplete([0, 0, 0, 3, 0x82]), 1024).unwrap();
        assert!(matches!(action, Action::None));
        assert!(matches!(
            state,
            DecoderState::AwaitingPayload { header } if header.data_len == 3 && header.flags.is_compressed()
        ));

        assert!(transition(Event::HeaderComplete([0, 0, 0, 0, 0]), 1024).is_err());
    }

    #[test]
    fn test_empty_compressed_round_trip() {
        let frame = frame_message(b"", ty(11), true).unwrap();
        let mut decoder = FrameDecoder::new(1024);
        decoder.feed(&frame).unwrap();

        let msg = decoder.drain_messages().remove(0);
        assert!(msg.data.is_empty());
        assert_eq!(msg.r#type, ty(11));
    }

    #[test]
    fn test_compressed_length_preserved() {
        for len in [1usize, 17, 300, MAX_DECOMPRESSED_SIZE_BYTES] {
            let payload: Vec<u8> = (0..len).map(|i| (i % 7) as u8).collect();
            let mut decoder = FrameDecoder::new(1 << 16);
            decoder.feed(&frame_message(&payload, ty(2), true).unwrap()).unwrap();

            let msg = decoder.drain_messages().remove(0);
            assert_eq!(msg.data.len(), len);
            assert_eq!(&msg.data[..], &payload[..]);
        }
    }
}
