//! MCP server loop over stdio.
//!
//! stdin carries one JSON-RPC frame per line and stdout carries responses
//! and progress notifications, also one per line. Everything written to
//! stdout goes through a single writer task fed by a channel, so frames
//! from concurrently running tool calls never interleave. Logging is on
//! stderr only; stdout belongs to the wire.

use anyhow::{Context, Result};
use gmcp_common::progress::{NullSink, ProgressSignal, ProgressSink};
use serde_json::{Value, json};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::ServerContext;
use crate::rpc::{self, CallToolParams, Notification, Request, Response};
use crate::tools;

pub const PROTOCOL_VERSION: &str = "2024-11-05";
pub const SERVER_NAME: &str = "gradle-mcp";

/// Outbound queue depth shared by responses and progress notifications.
const OUTBOUND_BUFFER: usize = 64;

// ── Progress forwarding ──────────────────────────────────────────────────

/// Forwards progress signals as `notifications/progress` frames.
///
/// Signals are queued with `try_send`: when the outbound queue is full
/// they are dropped, so a slow host can never stall the stream reader.
/// Responses take the blocking path and are never dropped.
struct ChannelSink {
    token: Value,
    outbound: mpsc::Sender<String>,
}

impl ProgressSink for ChannelSink {
    fn report(&self, signal: ProgressSignal) {
        let frame = Notification::progress(self.token.clone(), signal.percent, signal.total);
        match serde_json::to_string(&frame) {
            Ok(line) => {
                let _ = self.outbound.try_send(line);
            }
            Err(e) => debug!(error = %e, "progress frame could not be serialized"),
        }
    }
}

// ── Server loop ──────────────────────────────────────────────────────────

/// Run the server until stdin closes.
///
/// In-flight tool calls keep their own handle to the outbound channel,
/// so shutdown waits for their responses to flush before returning.
pub async fn serve(context: ServerContext) -> Result<()> {
    let context = Arc::new(context);
    let (outbound, writer) = start_writer();

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await.context("failed reading stdin")? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        handle_line(line, &context, &outbound).await;
    }

    info!("stdin closed, shutting down");
    drop(outbound);
    writer.await.context("stdout writer task failed")?;
    Ok(())
}

fn start_writer() -> (mpsc::Sender<String>, JoinHandle<()>) {
    let (tx, mut rx) = mpsc::channel::<String>(OUTBOUND_BUFFER);
    let handle = tokio::spawn(async move {
        let mut stdout = tokio::io::stdout();
        while let Some(line) = rx.recv().await {
            if write_line(&mut stdout, &line).await.is_err() {
                warn!("stdout closed, dropping outbound frames");
                break;
            }
        }
    });
    (tx, handle)
}

async fn write_line(stdout: &mut tokio::io::Stdout, line: &str) -> std::io::Result<()> {
    stdout.write_all(line.as_bytes()).await?;
    stdout.write_all(b"\n").await?;
    stdout.flush().await
}

// ── Frame handling ───────────────────────────────────────────────────────

async fn handle_line(line: &str, context: &Arc<ServerContext>, outbound: &mpsc::Sender<String>) {
    let frame: Value = match serde_json::from_str(line) {
        Ok(value) => value,
        Err(e) => {
            let response =
                Response::error(Value::Null, rpc::PARSE_ERROR, format!("Parse error: {e}"));
            send(outbound, response).await;
            return;
        }
    };

    // Keep the id from the raw frame so malformed requests still get an
    // addressed error instead of a null-id one.
    let id = frame.get("id").cloned().unwrap_or(Value::Null);
    let request: Request = match serde_json::from_value(frame) {
        Ok(request) => request,
        Err(e) => {
            let response =
                Response::error(id, rpc::INVALID_REQUEST, format!("Invalid request: {e}"));
            send(outbound, response).await;
            return;
        }
    };

    if request.jsonrpc != rpc::JSONRPC_VERSION {
        if !request.is_notification() {
            let response = Response::error(
                id,
                rpc::INVALID_REQUEST,
                format!("Unsupported JSON-RPC version '{}'", request.jsonrpc),
            );
            send(outbound, response).await;
        }
        return;
    }

    dispatch(request, context, outbound).await;
}

async fn dispatch(request: Request, context: &Arc<ServerContext>, outbound: &mpsc::Sender<String>) {
    // Notifications are never answered, whatever their method.
    if request.is_notification() {
        debug!(method = %request.method, "notification received");
        return;
    }
    let id = request.id.clone().unwrap_or(Value::Null);

    match request.method.as_str() {
        "initialize" => {
            debug!("initialize received");
            send(outbound, Response::success(id, initialize_result())).await;
        }
        "ping" => {
            send(outbound, Response::success(id, json!({}))).await;
        }
        "tools/list" => {
            let result = json!({ "tools": tools::descriptors() });
            send(outbound, Response::success(id, result)).await;
        }
        "tools/call" => {
            // Tool calls run concurrently; a slow build must not block
            // the read loop or other calls.
            let context = Arc::clone(context);
            let outbound = outbound.clone();
            tokio::spawn(async move {
                handle_tool_call(request, &context, &outbound).await;
            });
        }
        other => {
            let response = Response::error(
                id,
                rpc::METHOD_NOT_FOUND,
                format!("Method not found: {other}"),
            );
            send(outbound, response).await;
        }
    }
}

async fn handle_tool_call(
    request: Request,
    context: &ServerContext,
    outbound: &mpsc::Sender<String>,
) {
    let id = request.id.clone().unwrap_or(Value::Null);
    let params = request.params.unwrap_or_else(|| json!({}));
    let params: CallToolParams = match serde_json::from_value(params) {
        Ok(params) => params,
        Err(e) => {
            let response = Response::error(id, rpc::INVALID_PARAMS, format!("Invalid params: {e}"));
            send(outbound, response).await;
            return;
        }
    };

    let sink: Arc<dyn ProgressSink> = match params.progress_token() {
        Some(token) => Arc::new(ChannelSink {
            token,
            outbound: outbound.clone(),
        }),
        None => Arc::new(NullSink),
    };

    let arguments = params.arguments.clone().unwrap_or_else(|| json!({}));
    let result = match tools::call_tool(context, &params.name, arguments, sink).await {
        Some(result) => result,
        None => {
            let response = Response::error(
                id,
                rpc::INVALID_PARAMS,
                format!("Unknown tool: {}", params.name),
            );
            send(outbound, response).await;
            return;
        }
    };

    match serde_json::to_value(&result) {
        Ok(value) => send(outbound, Response::success(id, value)).await,
        Err(e) => {
            let response = Response::error(
                id,
                rpc::INTERNAL_ERROR,
                format!("Failed to encode result: {e}"),
            );
            send(outbound, response).await;
        }
    }
}

/// Queue one response frame, waiting for space. Responses are never
/// dropped; only progress notifications are.
async fn send(outbound: &mpsc::Sender<String>, response: Response) {
    match serde_json::to_string(&response) {
        Ok(line) => {
            if outbound.send(line).await.is_err() {
                warn!("outbound channel closed before response could be sent");
            }
        }
        Err(e) => warn!(error = %e, "response frame could not be serialized"),
    }
}

fn initialize_result() -> Value {
    json!({
        "protocolVersion": PROTOCOL_VERSION,
        "capabilities": { "tools": {} },
        "serverInfo": {
            "name": SERVER_NAME,
            "version": env!("CARGO_PKG_VERSION"),
        },
    })
}
