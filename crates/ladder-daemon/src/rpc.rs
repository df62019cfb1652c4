//! JSON-RPC server over Unix socket.
//!
//! Listens on a Unix domain socket, accepts connections, and dispatches
//! newline-delimited JSON-RPC method calls to the command handlers. A
//! connection that calls `subscribe_events` additionally receives matching
//! events as `event` notifications until it unsubscribes or disconnects.

use std::path::PathBuf;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::unix::OwnedWriteHalf;
use tokio::net::UnixListener;
use tokio::sync::{broadcast, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::commands;
use crate::events::{EventBus, EventFilter};
use crate::DaemonState;

/// JSON-RPC request.
#[derive(Debug, Deserialize)]
pub struct RpcRequest {
    /// JSON-RPC version (must be "2.0").
    pub jsonrpc: String,
    /// Request ID.
    pub id: serde_json::Value,
    /// Method name.
    pub method: String,
    /// Parameters.
    #[serde(default)]
    pub params: serde_json::Value,
}

/// JSON-RPC response.
#[derive(Debug, Serialize)]
pub struct RpcResponse {
    /// JSON-RPC version.
    pub jsonrpc: String,
    /// Request ID.
    pub id: serde_json::Value,
    /// Result or error.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<RpcError>,
}

/// JSON-RPC error object.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct RpcError {
    /// Error code.
    pub code: i32,
    /// Error name.
    pub message: String,
    /// Optional structured data.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

impl RpcResponse {
    /// Create a success response.
    pub fn success(id: serde_json::Value, result: serde_json::Value) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id,
            result: Some(result),
            error: None,
        }
    }

    /// Create an error response.
    pub fn error(id: serde_json::Value, error: RpcError) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id,
            result: None,
            error: Some(error),
        }
    }
}

impl RpcError {
    // Standard JSON-RPC errors

    /// Parse error (-32700).
    pub fn parse_error() -> Self {
        Self {
            code: -32700,
            message: "PARSE_ERROR".to_string(),
            data: None,
        }
    }

    /// Invalid request (-32600).
    pub fn invalid_request() -> Self {
        Self {
            code: -32600,
            message: "INVALID_REQUEST".to_string(),
            data: None,
        }
    }

    /// Method not found (-32601).
    pub fn method_not_found(method: &str) -> Self {
        Self {
            code: -32601,
            message: "METHOD_NOT_FOUND".to_string(),
            data: Some(serde_json::json!({"method": method})),
        }
    }

    /// Invalid params (-32602).
    pub fn invalid_params(detail: &str) -> Self {
        Self {
            code: -32602,
            message: "INVALID_PARAMS".to_string(),
            data: Some(serde_json::json!({"detail": detail})),
        }
    }

    /// Internal error (-32603).
    pub fn internal_error(detail: &str) -> Self {
        Self {
            code: -32603,
            message: "INTERNAL_ERROR".to_string(),
            data: Some(serde_json::json!({"detail": detail})),
        }
    }

    // Ledger errors

    /// Referenced user, purchase or transaction does not exist (-32004).
    pub fn not_found(detail: &str) -> Self {
        Self {
            code: -32004,
            message: "NOT_FOUND".to_string(),
            data: Some(serde_json::json!({"detail": detail})),
        }
    }

    /// Another write landed first; retry from a fresh read (-32009).
    pub fn conflict(detail: &str) -> Self {
        Self {
            code: -32009,
            message: "CONFLICT".to_string(),
            data: Some(serde_json::json!({"detail": detail})),
        }
    }

    /// Insufficient balance (-32040).
    pub fn insufficient_balance(required: i64, available: i64) -> Self {
        Self {
            code: -32040,
            message: "INSUFFICIENT_BALANCE".to_string(),
            data: Some(serde_json::json!({"required": required, "available": available})),
        }
    }
}

/// The RPC server.
pub struct RpcServer {
    state: Arc<DaemonState>,
    socket_path: PathBuf,
}

impl RpcServer {
    /// Create a new RPC server.
    pub fn new(state: Arc<DaemonState>, socket_path: PathBuf) -> Self {
        Self { state, socket_path }
    }

    /// Run the server, accepting connections.
    pub async fn run(&self) -> anyhow::Result<()> {
        // Remove stale socket file
        let _ = std::fs::remove_file(&self.socket_path);

        let listener = UnixListener::bind(&self.socket_path)?;
        info!("IPC server listening on {:?}", self.socket_path);

        loop {
            match listener.accept().await {
                Ok((stream, _addr)) => {
                    let state = self.state.clone();
                    tokio::spawn(async move {
                        if let Err(e) = handle_connection(state, stream).await {
                            warn!("Connection error: {}", e);
                        }
                    });
                }
                Err(e) => {
                    error!("Accept error: {}", e);
                }
            }
        }
    }
}

/// Handle a single client connection.
async fn handle_connection(
    state: Arc<DaemonState>,
    stream: tokio::net::UnixStream,
) -> anyhow::Result<()> {
    let (reader, writer) = stream.into_split();
    let writer = Arc::new(Mutex::new(writer));
    let mut reader = BufReader::new(reader);
    let mut line = String::new();
    let mut subscription: Option<JoinHandle<()>> = None;

    loop {
        line.clear();
        let bytes_read = reader.read_line(&mut line).await?;
        if bytes_read == 0 {
            break; // EOF
        }
        if line.trim().is_empty() {
            continue;
        }

        let response = match serde_json::from_str::<RpcRequest>(&line) {
            Ok(request) if request.method == "subscribe_events" => {
                let filter = if request.params.is_null() {
                    Ok(EventFilter::default())
                } else {
                    serde_json::from_value::<EventFilter>(request.params.clone())
                };
                match filter {
                    Ok(filter) => {
                        if let Some(previous) = subscription.take() {
                            previous.abort();
                        }
                        subscription = Some(spawn_forwarder(
                            &state.event_bus,
                            filter,
                            writer.clone(),
                        ));
                        RpcResponse::success(
                            request.id,
                            serde_json::json!({
                                "subscribed": true,
                                "sequence": state.event_bus.sequence(),
                            }),
                        )
                    }
                    Err(e) => {
                        RpcResponse::error(request.id, RpcError::invalid_params(&e.to_string()))
                    }
                }
            }
            Ok(request) if request.method == "unsubscribe_events" => {
                let was_subscribed = match subscription.take() {
                    Some(handle) => {
                        handle.abort();
                        true
                    }
                    None => false,
                };
                RpcResponse::success(
                    request.id,
                    serde_json::json!({"unsubscribed": was_subscribed}),
                )
            }
            Ok(request) => dispatch_request(state.clone(), request).await,
            Err(_) => RpcResponse::error(serde_json::Value::Null, RpcError::parse_error()),
        };

        write_line(&writer, &serde_json::to_string(&response)?).await?;
    }

    if let Some(handle) = subscription {
        handle.abort();
    }
    Ok(())
}

async fn write_line(writer: &Mutex<OwnedWriteHalf>, json: &str) -> std::io::Result<()> {
    let mut writer = writer.lock().await;
    writer.write_all(json.as_bytes()).await?;
    writer.write_all(b"\n").await?;
    writer.flush().await
}

/// Forward matching bus events to the connection as notifications.
fn spawn_forwarder(
    bus: &EventBus,
    filter: EventFilter,
    writer: Arc<Mutex<OwnedWriteHalf>>,
) -> JoinHandle<()> {
    let mut rx = bus.subscribe();
    tokio::spawn(async move {
        loop {
            let notification = match rx.recv().await {
                Ok(event) if filter.matches(&event) => serde_json::json!({
                    "jsonrpc": "2.0",
                    "method": "event",
                    "params": event,
                }),
                Ok(_) => continue,
                Err(broadcast::error::RecvError::Lagged(missed)) => {
                    warn!(missed, "event subscriber lagging");
                    serde_json::json!({
                        "jsonrpc": "2.0",
                        "method": "events_missed",
                        "params": {"count": missed},
                    })
                }
                Err(broadcast::error::RecvError::Closed) => break,
            };
            if write_line(&writer, &notification.to_string()).await.is_err() {
                break;
            }
        }
    })
}

/// Dispatch a JSON-RPC request to the appropriate command handler.
pub async fn dispatch_request(state: Arc<DaemonState>, request: RpcRequest) -> RpcResponse {
    let id = request.id.clone();
    if request.jsonrpc != "2.0" {
        return RpcResponse::error(id, RpcError::invalid_request());
    }
    let method = request.method.as_str();
    let params = &request.params;

    debug!("Dispatching RPC method: {}", method);

    let result = match method {
        // Income
        "run_accrual_cycle" => commands::ledger::run_accrual_cycle(&state, params).await,
        "maybe_run_daily_accrual" => commands::ledger::maybe_run_daily_accrual(&state).await,
        "force_daily_accrual" => commands::ledger::force_daily_accrual(&state, params).await,
        "set_income_frozen" => commands::ledger::set_income_frozen(&state, params).await,
        "set_admin_config" => commands::ledger::set_admin_config(&state, params).await,

        // Purchases and fraud
        "purchase_plan" => commands::ledger::purchase_plan(&state, params).await,
        "compute_impact" => commands::ledger::compute_impact(&state, params).await,
        "apply_reversal" => commands::ledger::apply_reversal(&state, params).await,

        // Wallet
        "register_user" => commands::wallet::register_user(&state, params).await,
        "set_user_status" => commands::wallet::set_user_status(&state, params).await,
        "request_recharge" => commands::wallet::request_recharge(&state, params).await,
        "approve_recharge" => commands::wallet::approve_recharge(&state, params).await,
        "request_withdrawal" => commands::wallet::request_withdrawal(&state, params).await,
        "approve_withdrawal" => commands::wallet::approve_withdrawal(&state, params).await,
        "reject_transaction" => commands::wallet::reject_transaction(&state, params).await,

        // Store
        "get_snapshot" => commands::ledger::get_snapshot(&state).await,
        "export_snapshot" => commands::ledger::export_snapshot(&state).await,

        _ => Err(RpcError::method_not_found(method)),
    };

    match result {
        Ok(value) => RpcResponse::success(id, value),
        Err(err) => RpcResponse::error(id, err),
    }
}
