use super::{handler::MessageHandler, stats::Stats};
use crate::common::error::IngestError;
use bytes::BytesMut;
use core::{net::SocketAddr, time::Duration};
use lzo_frame::{DecoderState, FrameDecoder};
use tokio::{
    io::{AsyncRead, AsyncReadExt as _},
    sync::watch,
};

/// Per-connection limits
#[derive(Debug, Clone, Copy)]
pub struct ConnectionConfig {
    pub max_frame_size: u32,
    pub idle_timeout: Option<Duration>,
    pub read_buffer_size: usize,
}

/// How a connection ended without error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Closed {
    /// Peer closed at a frame boundary
    Eof,
    /// Peer closed with `buffered` bytes of an unfinished frame
    Truncated { buffered: usize },
    /// Server is shutting down
    Shutdown,
}

/// Read the stream until EOF, shutdown or a fatal error
///
/// Messages completed by a read are dispatched before a framing error from the same
/// read is reported.
pub async fn serve<S, H>(
    stream: &mut S,
    peer: SocketAddr,
    config: ConnectionConfig,
    handler: &H,
    stats: &Stats,
    mut shutdown: watch::Receiver<bool>,
) -> Result<Closed, IngestError>
where
    S: AsyncRead + Unpin,
    H: MessageHandler,
{
    let mut decoder = FrameDecoder::new(config.max_frame_size);
    let mut buf = BytesMut::with_capacity(config.read_buffer_size);

    loop {
        if *shutdown.borrow() {
            return Ok(Closed::Shutdown);
        }

        buf.clear();
        buf.reserve(config.read_buffer_size);

        let n = tokio::select! {
            biased;
            _ = shutdown.changed() => return Ok(Closed::Shutdown),
            read = read_some(stream, &mut buf, config.idle_timeout) => read?,
        };

        if n == 0 {
            // 头部已完整但负载尚未到达时 buffered 为 0，仍属帧内截断
            let buffered = decoder.buffered();
            let at_boundary = buffered == 0 && decoder.state() == DecoderState::AwaitingHeader;
            return Ok(if at_boundary { Closed::Eof } else { Closed::Truncated { buffered } });
        }

        stats.record_bytes(n);
        let fed = decoder.feed(&buf[..n]);

        for message in decoder.drain_messages() {
            stats.increment_messages();
            handler.handle(peer, message);
        }

        fed?;
    }
}

#[inline]
async fn read_some<S>(
    stream: &mut S,
    buf: &mut BytesMut,
    idle_timeout: Option<Duration>,
) -> Result<usize, IngestError>
where
    S: AsyncRead + Unpin,
{
    match idle_timeout {
        Some(timeout) => tokio::time::timeout(timeout, stream.read_buf(buf))
            .await
            .map_err(|_| IngestError::IdleTimeout(timeout))?
            .map_err(IngestError::Io),
        None => stream.read_buf(buf).await.map_err(IngestError::Io),
    }
}
