use core::net::SocketAddr;
use lzo_frame::Message;

/// Consumer of decoded messages
///
/// Called from the connection task in arrival order; implementations should not block.
pub trait MessageHandler: Send + Sync + 'static {
    fn handle(&self, peer: SocketAddr, message: Message);
}

impl<F> MessageHandler for F
where F: Fn(SocketAddr, Message) + Send + Sync + 'static
{
    #[inline]
    fn handle(&self, peer: SocketAddr, message: Message) { self(peer, message) }
}

/// Logs every message it receives
#[derive(Debug, Default, Clone, Copy)]
pub struct LogHandler;

impl MessageHandler for LogHandler {
    fn handle(&self, peer: SocketAddr, message: Message) {
        tracing::info!(
            %peer,
            msg_type = message.r#type.get(),
            len = message.data.len(),
            "message received"
        );
    }
}
