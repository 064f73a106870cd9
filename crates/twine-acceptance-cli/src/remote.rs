//! Twine remote control.
//!
//! Runs next to Twine inside the acceptance environment so the harness can
//! drive ingestion over HTTP:
//!
//! - `POST /ingest` stores the body in the data file and runs the ingest
//!   command on it,
//! - `GET /update` runs the update command when one is configured,
//! - every other `GET` answers with a banner.
//!
//! Replies are JSON with `Content-Type: text/json;charset=utf-8`. Commands run
//! through `sh -c` on the blocking pool; their stdout and stderr come back as
//! `logs`.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::body::Incoming;
use hyper::header::CONTENT_TYPE;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Method, Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use serde::Serialize;
use tokio::net::TcpListener;
use tokio::sync::Mutex;

pub(crate) const REPLY_CONTENT_TYPE: &str = "text/json;charset=utf-8";
pub(crate) const BANNER: &str = "Twine remote control";
pub(crate) const DEFAULT_LISTEN: &str = "0.0.0.0:8000";
pub(crate) const DEFAULT_DATA_FILE: &str = "/tmp/remote-data.nq";
pub(crate) const DEFAULT_INGEST_COMMAND: &str = "twine -d -c /usr/etc/twine.conf";

#[derive(Debug, Clone)]
pub(crate) struct RemoteConfig {
    pub listen: SocketAddr,
    pub data_file: PathBuf,
    /// Run with the quoted data-file path appended.
    pub ingest_command: String,
    pub update_command: Option<String>,
    /// Written once the listener is bound: `{"addr": "...", "pid": ...}`.
    pub ready_file: Option<PathBuf>,
}

impl RemoteConfig {
    pub(crate) fn ingest_command_line(&self) -> String {
        format!(
            "{} {}",
            self.ingest_command.trim(),
            shell_quote(&self.data_file.to_string_lossy())
        )
    }
}

/// Shared by all connections. `commands` is held from storing an upload until
/// its command finishes, so one document is ingested at a time.
struct RemoteState {
    config: RemoteConfig,
    commands: Mutex<()>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub(crate) struct RemoteReply {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub logs: Option<String>,
}

impl RemoteReply {
    fn banner() -> Self {
        Self {
            message: BANNER.to_string(),
            command: None,
            logs: None,
        }
    }
}

/// Result of one shell command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct CommandOutcome {
    pub command: String,
    pub success: bool,
    /// Exit code; `None` when killed by a signal or never started.
    pub code: Option<i32>,
    pub logs: String,
}

pub(crate) fn run_command(command_line: &str) -> CommandOutcome {
    tracing::info!(command = command_line, "running command");
    let output = Command::new("sh")
        .arg("-c")
        .arg(command_line)
        .stdin(Stdio::null())
        .output();

    match output {
        Ok(output) => {
            let mut logs = String::from_utf8_lossy(&output.stdout).into_owned();
            logs.push_str(&String::from_utf8_lossy(&output.stderr));
            CommandOutcome {
                command: command_line.to_string(),
                success: output.status.success(),
                code: output.status.code(),
                logs,
            }
        }
        Err(e) => CommandOutcome {
            command: command_line.to_string(),
            success: false,
            code: None,
            logs: format!("failed to start `sh -c`: {e}"),
        },
    }
}

/// Map a finished command onto the HTTP reply.
pub(crate) fn command_reply(done: &str, outcome: CommandOutcome) -> (StatusCode, RemoteReply) {
    if outcome.success {
        return (
            StatusCode::OK,
            RemoteReply {
                message: done.to_string(),
                command: Some(outcome.command),
                logs: Some(outcome.logs),
            },
        );
    }

    let reason = match outcome.code {
        Some(code) => format!("Error: `{}` exited with status {code}", outcome.command),
        None => format!("Error: `{}` did not run to completion", outcome.command),
    };
    tracing::warn!(command = %outcome.command, code = ?outcome.code, "command failed");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        RemoteReply {
            message: reason,
            command: None,
            logs: Some(outcome.logs),
        },
    )
}

fn shell_quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', r"'\''"))
}

pub(crate) fn cmd_remote(config: RemoteConfig) -> Result<()> {
    let rt = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|e| anyhow!("failed to initialize tokio runtime: {e}"))?;

    rt.block_on(async move { serve_async(config).await })
}

async fn serve_async(config: RemoteConfig) -> Result<()> {
    let listener = TcpListener::bind(config.listen)
        .await
        .with_context(|| format!("remote: failed to bind {}", config.listen))?;
    let bound = listener
        .local_addr()
        .context("remote: failed to read bound addr")?;

    tracing::info!(addr = %bound, data_file = %config.data_file.display(), "remote control listening");
    if let Some(path) = config.ready_file.as_ref() {
        write_ready_file(path, bound)?;
    }

    let state = Arc::new(RemoteState {
        config,
        commands: Mutex::new(()),
    });
    loop {
        let (stream, _peer) = listener
            .accept()
            .await
            .context("remote: accept failed")?;
        let io = TokioIo::new(stream);
        let state = state.clone();

        tokio::spawn(async move {
            let service = service_fn(move |req| handle_request(req, state.clone()));
            if let Err(e) = http1::Builder::new().serve_connection(io, service).await {
                tracing::warn!(error = %e, "remote: connection error");
            }
        });
    }
}

fn write_ready_file(path: &Path, bound: SocketAddr) -> Result<()> {
    let payload = serde_json::json!({
        "addr": bound.to_string(),
        "pid": std::process::id(),
    });
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("remote: failed to create {}", parent.display()))?;
    }
    std::fs::write(path, serde_json::to_string_pretty(&payload)?)
        .with_context(|| format!("remote: failed to write ready file {}", path.display()))
}

async fn handle_request(
    req: Request<Incoming>,
    state: Arc<RemoteState>,
) -> Result<Response<Full<Bytes>>, hyper::Error> {
    let method = req.method().clone();
    let path = req.uri().path().to_string();
    tracing::debug!(%method, path = %path, "remote request");

    let resp = match (method, path.as_str()) {
        (Method::POST, "/ingest") => {
            let body = req.into_body().collect().await?.to_bytes();
            let (status, reply) = ingest(state, body).await;
            json_reply(status, &reply)
        }
        (Method::GET, "/update") => match state.config.update_command.clone() {
            Some(command) => {
                let _running = state.commands.lock().await;
                let (status, reply) = run_blocking("Update completed", command).await;
                json_reply(status, &reply)
            }
            None => json_reply(StatusCode::OK, &RemoteReply::banner()),
        },
        (Method::GET, _) => json_reply(StatusCode::OK, &RemoteReply::banner()),
        _ => json_error(StatusCode::NOT_FOUND, "not found"),
    };

    Ok(resp)
}

async fn ingest(state: Arc<RemoteState>, body: Bytes) -> (StatusCode, RemoteReply) {
    let _running = state.commands.lock().await;
    let config = &state.config;
    if let Err(e) = tokio::fs::write(&config.data_file, &body).await {
        let reply = RemoteReply {
            message: format!("Error: failed to write {}: {e}", config.data_file.display()),
            command: None,
            logs: None,
        };
        tracing::warn!(data_file = %config.data_file.display(), error = %e, "remote: cannot store upload");
        return (StatusCode::INTERNAL_SERVER_ERROR, reply);
    }
    tracing::info!(bytes = body.len(), data_file = %config.data_file.display(), "stored upload");

    run_blocking("Ingest completed", config.ingest_command_line()).await
}

async fn run_blocking(done: &'static str, command: String) -> (StatusCode, RemoteReply) {
    match tokio::task::spawn_blocking(move || run_command(&command)).await {
        Ok(outcome) => command_reply(done, outcome),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            RemoteReply {
                message: format!("Error: command task failed: {e}"),
                command: None,
                logs: None,
            },
        ),
    }
}

fn json_reply<T: Serialize>(status: StatusCode, value: &T) -> Response<Full<Bytes>> {
    let body = serde_json::to_vec(value).unwrap_or_else(|_| b"{\"error\":\"serialize\"}".to_vec());
    Response::builder()
        .status(status)
        .header(CONTENT_TYPE, REPLY_CONTENT_TYPE)
        .body(Full::new(Bytes::from(body)))
        .unwrap_or_else(|_| Response::new(Full::new(Bytes::from_static(b"{\"error\":\"internal\"}"))))
}

fn json_error(status: StatusCode, msg: &str) -> Response<Full<Bytes>> {
    json_reply(status, &serde_json::json!({ "error": msg }))
}
