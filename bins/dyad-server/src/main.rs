mod config;
mod http;
mod push;

#[cfg(test)]
mod tests;

use config::{DyadConfig, StorageKind};
use dyad_core::sqlite::SqliteStore;
use dyad_core::store::{MemoryStore, MessageStore};
use dyad_core::Core;
use log::LevelFilter;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::signal;
use tokio::sync::oneshot;

#[derive(thiserror::Error, Debug)]
enum ServerError {
    #[error("config")]
    Config,
    #[error("storage")]
    Storage,
    #[error("bind")]
    Bind,
}

#[tokio::main]
async fn main() -> Result<(), ServerError> {
    let args: Vec<String> = std::env::args().collect();
    let mut path = PathBuf::from("dyad.toml");
    let mut i = 1;
    while i + 1 < args.len() {
        if args[i] == "--config" {
            path = PathBuf::from(&args[i + 1]);
        }
        i += 1;
    }
    let cfg = config::load_config(&path).map_err(|_| ServerError::Config)?;
    init_logging(&cfg);
    let core = Arc::new(init_core(&cfg)?);

    let push_listener = TcpListener::bind(&cfg.server.push_addr)
        .await
        .map_err(|_| ServerError::Bind)?;
    let http_listener = TcpListener::bind(&cfg.server.http_addr)
        .await
        .map_err(|_| ServerError::Bind)?;
    log::info!(
        "push channel on {}, fallback channel on {}",
        cfg.server.push_addr,
        cfg.server.http_addr
    );

    let (push_shutdown, push_shutdown_rx) = oneshot::channel();
    let (http_shutdown, http_shutdown_rx) = oneshot::channel();
    let push_task = push::start_push_listener(core.clone(), push_listener, push_shutdown_rx);
    let http_task = http::start_http_listener(core, http_listener, http_shutdown_rx);

    let ctrl_c = signal::ctrl_c();
    tokio::pin!(ctrl_c);
    let _ = ctrl_c.as_mut().await;
    log::info!("shutting down");
    let _ = push_shutdown.send(());
    let _ = http_shutdown.send(());
    let _ = push_task.await;
    let _ = http_task.await;
    Ok(())
}

fn init_logging(cfg: &DyadConfig) {
    let level = match cfg.logging.level.to_lowercase().as_str() {
        "trace" => LevelFilter::Trace,
        "debug" => LevelFilter::Debug,
        "info" => LevelFilter::Info,
        "warn" => LevelFilter::Warn,
        "error" => LevelFilter::Error,
        _ => LevelFilter::Info,
    };
    let _ = env_logger::Builder::from_default_env()
        .filter_level(level)
        .try_init();
}

fn init_core(cfg: &DyadConfig) -> Result<Core, ServerError> {
    let primary: Arc<dyn MessageStore> = match cfg.storage.kind {
        StorageKind::Sqlite => {
            Arc::new(SqliteStore::open(&cfg.storage.path).map_err(|_| ServerError::Storage)?)
        }
        StorageKind::Memory => Arc::new(MemoryStore::new()),
    };
    Ok(Core::new(cfg.delivery.core_config(), primary))
}
