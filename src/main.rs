//! Focus Timer - a countdown screen with local completion notifications
//!
//! This is the main entry point for the focus-timer application.

use std::sync::Arc;

use tracing::info;
use tracing_subscriber::EnvFilter;

use focus_timer::{
    config::{Backend, Config},
    notifications::{DesktopHost, InMemoryHost, NotificationGateway, NotificationHost},
    ui::Screen,
};

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let config = Config::parse();

    // Logs go to stderr so the screen owns stdout
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("focus_timer={}", config.log_level())));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    info!("Starting focus-timer v{}", env!("CARGO_PKG_VERSION"));
    info!(
        "Configuration: minutes={}, backend={:?}, silent={}",
        config.minutes, config.backend, config.silent
    );

    let host: Arc<dyn NotificationHost> = match config.backend {
        Backend::Desktop => Arc::new(DesktopHost::new(config.app_name.clone())),
        Backend::Memory => Arc::new(InMemoryHost::new()),
    };
    let gateway = Arc::new(NotificationGateway::new(host, config.handler_policy()));

    Screen::new(gateway, config.minutes).run().await?;

    info!("Focus timer closed");
    Ok(())
}
