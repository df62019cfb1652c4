//! ladder-daemon: the referral ledger daemon.
//!
//! Single OS process running a Tokio async runtime. Operators and the web
//! backend talk to the daemon via JSON-RPC over a Unix socket; the accrual
//! timer runs the daily income cycle in the background.

mod clock;
mod commands;
mod config;
mod events;
mod rpc;
mod timer;

use std::sync::Arc;

use tokio::sync::broadcast;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use crate::config::DaemonConfig;
use crate::events::{Event, EventBus};
use crate::rpc::RpcServer;

/// Daemon-wide shared state.
pub struct DaemonState {
    /// Ledger store connection. Held for the whole read-compute-write of a
    /// command.
    pub db: Arc<tokio::sync::Mutex<rusqlite::Connection>>,
    /// Configuration.
    pub config: DaemonConfig,
    /// Event bus for pushing events to subscribers.
    pub event_bus: EventBus,
    /// Shutdown signal sender.
    pub shutdown_tx: broadcast::Sender<()>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. Load config
    let config = DaemonConfig::load()?;
    let data_dir = config.data_dir();

    // Ensure data directory exists
    std::fs::create_dir_all(&data_dir)?;

    // 2. Initialize tracing
    init_tracing(&config)?;
    info!("Ladder daemon starting");

    // 3. Open database
    let db_path = data_dir.join("ledger.db");
    let conn = ladder_db::open(&db_path)?;
    info!("Ledger store opened at {:?}", db_path);
    let db = Arc::new(tokio::sync::Mutex::new(conn));

    // 4. Create event bus and shutdown channel
    let event_bus = EventBus::new(1000);
    let (shutdown_tx, _shutdown_rx) = broadcast::channel(1);

    // 5. Build daemon state
    let state = Arc::new(DaemonState {
        db,
        config,
        event_bus,
        shutdown_tx: shutdown_tx.clone(),
    });

    // 6. Start accrual timer
    if state.config.schedule.timer_enabled {
        tokio::spawn(timer::run(state.clone(), shutdown_tx.subscribe()));
    } else {
        info!("accrual timer disabled, waiting for external triggers");
    }

    // 7. Start IPC server
    let socket_path = data_dir.join("daemon.sock");
    let rpc_server = RpcServer::new(state.clone(), socket_path.clone());

    info!("Starting JSON-RPC server on {:?}", socket_path);

    state.event_bus.emit(Event::now(
        "DaemonStarted",
        serde_json::json!({
            "version": env!("CARGO_PKG_VERSION"),
        }),
    ));

    // 8. Run the RPC server until shutdown
    let mut shutdown_rx = shutdown_tx.subscribe();
    tokio::select! {
        result = rpc_server.run() => {
            if let Err(e) = result {
                error!("RPC server error: {}", e);
            }
        }
        _ = shutdown_rx.recv() => {
            info!("Shutdown signal received");
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Ctrl-C received, shutting down");
        }
    }

    // Graceful shutdown
    info!("Daemon shutting down gracefully");
    let _ = state.shutdown_tx.send(());

    // Clean up socket file
    let _ = std::fs::remove_file(&socket_path);

    info!("Daemon stopped");
    Ok(())
}

/// `RUST_LOG` wins; otherwise `ladder=<log_level>`.
fn init_tracing(config: &DaemonConfig) -> anyhow::Result<()> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::new("")
            .add_directive(format!("ladder={}", config.advanced.log_level).parse()?),
    };

    if config.advanced.log_file.is_empty() {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    } else {
        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&config.advanced.log_file)?;
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_ansi(false)
            .with_writer(std::sync::Mutex::new(file))
            .init();
    }
    Ok(())
}

/// Daemon state over an in-memory store, with exports going to a fresh
/// temporary directory.
#[cfg(test)]
pub(crate) fn test_state() -> Arc<DaemonState> {
    use std::sync::atomic::{AtomicU64, Ordering};
    static NEXT: AtomicU64 = AtomicU64::new(0);

    let dir = std::env::temp_dir().join(format!(
        "ladder-daemon-test-{}-{}",
        std::process::id(),
        NEXT.fetch_add(1, Ordering::SeqCst)
    ));
    let mut config = DaemonConfig::default();
    config.store.data_dir = dir.display().to_string();

    let (shutdown_tx, _) = broadcast::channel(1);
    Arc::new(DaemonState {
        db: Arc::new(tokio::sync::Mutex::new(
            ladder_db::open_memory().expect("open test db"),
        )),
        config,
        event_bus: EventBus::new(64),
        shutdown_tx,
    })
}
