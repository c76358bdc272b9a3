use super::{
    connection::{self, Closed, ConnectionConfig},
    handler::MessageHandler,
    stats::Stats,
};
use crate::{app::config::AppConfig, common::error::IngestError};
use alloc::sync::Arc;
use core::{net::SocketAddr, time::Duration};
use tokio::{
    net::{TcpListener, TcpStream},
    sync::{Semaphore, watch},
    task::JoinSet,
};
use tracing::{Instrument as _, debug, info, info_span, warn};

/// Pause after a failed accept, e.g. when out of file descriptors
const ACCEPT_BACKOFF: Duration = Duration::from_millis(100);

/// Accepts connections and decodes frames from each of them
pub struct Server<H> {
    listener: TcpListener,
    connection: ConnectionConfig,
    handler: Arc<H>,
    stats: Arc<Stats>,
    limit: Arc<Semaphore>,
}

impl<H: MessageHandler> Server<H> {
    pub async fn bind(config: &AppConfig, handler: H) -> Result<Self, IngestError> {
        let listener = TcpListener::bind(&*config.listen_addr).await?;
        Ok(Self {
            listener,
            connection: ConnectionConfig {
                max_frame_size: config.max_frame_size,
                idle_timeout: config.idle_timeout(),
                read_buffer_size: config.read_buffer_size,
            },
            handler: Arc::new(handler),
            stats: Arc::new(Stats::default()),
            limit: Arc::new(Semaphore::new(config.max_connections)),
        })
    }

    #[inline]
    pub fn local_addr(&self) -> Result<SocketAddr, IngestError> { Ok(self.listener.local_addr()?) }

    #[inline]
    pub fn stats(&self) -> Arc<Stats> { self.stats.clone() }

    /// Serve until `shutdown` resolves
    ///
    /// After shutdown no new connection is accepted; live connections are told to stop
    /// and awaited.
    pub async fn run_until<F>(self, shutdown: F) -> Result<(), IngestError>
    where F: Future<Output = ()> {
        let (stop_tx, stop_rx) = watch::channel(false);
        let mut tasks = JoinSet::new();
        tokio::pin!(shutdown);

        loop {
            // 达到连接上限时在此等待
            let permit = tokio::select! {
                biased;
                () = &mut shutdown => break,
                permit = self.limit.clone().acquire_owned() => permit,
            };
            let Ok(permit) = permit else { break };

            let (stream, peer) = tokio::select! {
                biased;
                () = &mut shutdown => break,
                accepted = self.listener.accept() => match accepted {
                    Ok(accepted) => accepted,
                    Err(e) => {
                        accept_backoff(&e).await;
                        continue;
                    }
                },
            };

            let handler = self.handler.clone();
            let stats = self.stats.clone();
            let config = self.connection;
            let stop = stop_rx.clone();
            tasks.spawn(
                async move {
                    handle_connection(stream, peer, config, &*handler, &stats, stop).await;
                    drop(permit);
                }
                .instrument(info_span!("conn", %peer)),
            );

            // 回收已结束的连接任务
            while tasks.try_join_next().is_some() {}
        }

        info!(active = tasks.len(), "shutting down");
        let _ = stop_tx.send(true);
        while tasks.join_next().await.is_some() {}
        Ok(())
    }
}

async fn accept_backoff(error: &std::io::Error) {
    warn!("accept failed: {error}");
    tokio::time::sleep(ACCEPT_BACKOFF).await;
}

async fn handle_connection<H: MessageHandler>(
    mut stream: TcpStream,
    peer: SocketAddr,
    config: ConnectionConfig,
    handler: &H,
    stats: &Stats,
    stop: watch::Receiver<bool>,
) {
    let _active = stats.connection_opened();
    debug!("connection opened");

    if let Err(e) = stream.set_nodelay(true) {
        debug!("set_nodelay failed: {e}");
    }

    match connection::serve(&mut stream, peer, config, handler, stats, stop).await {
        Ok(Closed::Eof) => debug!("connection closed by peer"),
        Ok(Closed::Truncated { buffered }) => {
            warn!(buffered, "stream ended inside a frame");
        }
        Ok(Closed::Shutdown) => debug!("connection closed for shutdown"),
        Err(IngestError::Frame(e)) => {
            stats.increment_rejected();
            warn!(error = e.error_type(), "closing connection: {e}");
        }
        Err(e @ IngestError::IdleTimeout(_)) => info!("{e}"),
        Err(e) => debug!(error = e.error_type(), "connection error: {e}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lzo_frame::{Message, MessageType, frame_message};
    use tokio::{io::AsyncWriteExt as _, sync::mpsc};

    fn test_config(max_connections: usize) -> AppConfig {
        AppConfig {
            listen_addr: "127.0.0.1:0".to_owned(),
            max_frame_size: 1024,
            idle_timeout_secs: 0,
            max_connections,
            ..AppConfig::default()
        }
    }

    async fn start(
        max_connections: usize,
    ) -> (SocketAddr, Arc<Stats>, mpsc::UnboundedReceiver<Message>, watch::Sender<bool>) {
        let (msg_tx, msg_rx) = mpsc::unbounded_channel();
        let server = Server::bind(&test_config(max_connections), move |_: SocketAddr, msg: Message| {
            let _ = msg_tx.send(msg);
        })
        .await
        .unwrap();

        let addr = server.local_addr().unwrap();
        let stats = server.stats();
        let (stop_tx, mut stop_rx) = watch::channel(false);
        tokio::spawn(server.run_until(async move {
            let _ = stop_rx.changed().await;
        }));
        (addr, stats, msg_rx, stop_tx)
    }

    fn ty(v: u8) -> MessageType { MessageType::new(v).unwrap() }

    #[tokio::test]
    async fn test_ingest_messages() {
        let (addr, stats, mut messages, _stop) = start(8).await;

        let mut client = TcpStream::connect(addr).await.unwrap();
        let frame = frame_message(b"hello", ty(3), false).unwrap();
        client.write_all(&frame[..7]).await.unwrap();
        client.write_all(&frame[7..]).await.unwrap();
        client.write_all(&frame_message(&[9u8; 4000], ty(4), true).unwrap()).await.unwrap();

        let first = messages.recv().await.unwrap();
        assert_eq!(&first.data[..], b"hello");
        assert_eq!(first.r#type, ty(3));

        let second = messages.recv().await.unwrap();
        assert_eq!(&second.data[..], &[9u8; 4000][..]);
        assert_eq!(stats.snapshot().messages, 2);
    }

    #[tokio::test]
    async fn test_oversized_frame_closes_connection() {
        let (addr, stats, _messages, _stop) = start(8).await;

        let mut client = TcpStream::connect(addr).await.unwrap();
        client.write_all(&[0, 0, 0x07, 0xd0, 0x01]).await.unwrap();

        // 服务端关闭连接后读到 EOF
        let mut buf = [0u8; 1];
        let n = tokio::io::AsyncReadExt::read(&mut client, &mut buf).await.unwrap_or(0);
        assert_eq!(n, 0);

        while stats.snapshot().active_connections != 0 {
            tokio::task::yield_now().await;
        }
        assert_eq!(stats.snapshot().rejected_streams, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_accept_error_backs_off() {
        let start = tokio::time::Instant::now();
        accept_backoff(&std::io::Error::from_raw_os_error(24)).await;
        assert!(start.elapsed() >= ACCEPT_BACKOFF);
    }

    #[tokio::test]
    async fn test_shutdown_stops_server() {
        let (addr, stats, _messages, stop) = start(8).await;

        let _client = TcpStream::connect(addr).await.unwrap();
        while stats.snapshot().total_connections == 0 {
            tokio::task::yield_now().await;
        }

        stop.send(true).unwrap();
        while stats.snapshot().active_connections != 0 {
            tokio::task::yield_now().await;
        }
    }
}
