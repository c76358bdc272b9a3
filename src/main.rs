extern crate alloc;

mod app;
mod common;
mod ingest;

use app::config::AppConfig;
use common::error::IngestError;
use ingest::{LogHandler, Server};
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<(), IngestError> {
    // 环境变量文件不存在时忽略
    let _ = dotenvy::dotenv();

    let config = AppConfig::load()?;
    app::log::init(&config.log_level);

    let server = Server::bind(&config, LogHandler).await?;
    let stats = server.stats();
    info!(
        addr = %server.local_addr()?,
        max_frame_size = config.max_frame_size,
        max_connections = config.max_connections,
        "frame-ingest listening"
    );

    server.run_until(shutdown_signal()).await?;

    info!(stats = ?stats.snapshot(), "frame-ingest stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("failed to listen for shutdown signal: {e}");
        core::future::pending::<()>().await
    }
}
