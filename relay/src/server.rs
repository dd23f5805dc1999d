//! HTTP and WebSocket front end.
//!
//! Endpoints:
//! - GET  /ws        - streaming session (binary audio in, events + WAV out)
//! - POST /translate - one-shot: multipart `file` in, WAV out
//! - GET  /healthz   - liveness, live and busy session counts
//! - GET  /*         - static files from `static_dir`, when set

use std::net::SocketAddr;
use std::path::PathBuf;

use axum::{
    Json, Router,
    extract::{
        DefaultBodyLimit, Multipart, State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use futures::{SinkExt, StreamExt};
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tracing::{debug, info, warn};

use crate::buffer::Utterance;
use crate::error::{Failure, PipelineError};
use crate::event::{ClientEvent, ServerEvent, decode_chunk};
use crate::pipeline::SessionPipeline;
use crate::session::{SessionOptions, SessionRegistry, spawn_session};

/// Error type for starting the server.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("invalid listen address {addr:?}: {source}")]
    Addr {
        addr: String,
        #[source]
        source: std::net::AddrParseError,
    },
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}

/// Shared state behind every handler.
#[derive(Clone)]
pub struct AppState {
    pub pipeline: SessionPipeline,
    pub registry: SessionRegistry,
    pub options: SessionOptions,
}

impl AppState {
    pub fn new(pipeline: SessionPipeline, options: SessionOptions) -> Self {
        Self {
            pipeline,
            registry: SessionRegistry::new(),
            options,
        }
    }
}

/// Builds the application router.
pub fn router(state: AppState, static_dir: Option<PathBuf>) -> Router {
    // Multipart framing on top of the utterance cap.
    let body_limit = state
        .options
        .max_utterance_bytes
        .map_or(DefaultBodyLimit::disable(), |limit| DefaultBodyLimit::max(limit + 64 * 1024));

    let mut app = Router::new()
        .route("/ws", get(ws_handler))
        .route("/translate", post(translate_handler))
        .route("/healthz", get(health_handler))
        .layer(body_limit)
        .layer(CorsLayer::permissive())
        .with_state(state);

    if let Some(dir) = static_dir {
        if dir.exists() {
            app = app.fallback_service(ServeDir::new(dir));
        } else {
            warn!(dir = %dir.display(), "server: static dir not found");
        }
    }
    app
}

/// Parses a listen address; `:5000` means every interface.
pub fn parse_addr(addr: &str) -> Result<SocketAddr, ServerError> {
    let full = if addr.starts_with(':') {
        format!("0.0.0.0{}", addr)
    } else {
        addr.to_string()
    };
    full.parse().map_err(|source| ServerError::Addr {
        addr: addr.to_string(),
        source,
    })
}

/// Binds `addr` and serves until the listener fails.
pub async fn serve(addr: &str, state: AppState, static_dir: Option<PathBuf>) -> Result<(), ServerError> {
    let addr = parse_addr(addr)?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(addr = %listener.local_addr()?, "server: listening");
    axum::serve(listener, router(state, static_dir)).await?;
    Ok(())
}

async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "sessions": state.registry.len(),
        "processing": state.registry.processing(),
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: AppState) {
    let (handle, mut events) = spawn_session(&state.registry, state.pipeline.clone(), state.options.clone());
    let session_id = handle.id();
    info!(session = %session_id, "server: client connected");

    let (mut sink, mut stream) = socket.split();

    let writer = tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            if sink.send(Message::Text(event.to_json().into())).await.is_err() {
                break;
            }
            if let Some(wav) = event.audio() {
                if sink.send(Message::Binary(wav.clone())).await.is_err() {
                    break;
                }
            }
        }
        let _ = sink.close().await;
    });

    while let Some(msg) = stream.next().await {
        let msg = match msg {
            Ok(msg) => msg,
            Err(e) => {
                debug!(session = %session_id, error = %e, "server: receive failed");
                break;
            }
        };
        match msg {
            Message::Binary(data) => handle.append(&data),
            Message::Text(text) => {
                let event = ClientEvent::parse(text.as_str()).and_then(|event| match event {
                    ClientEvent::AudioChunk { data } => decode_chunk(&data).map(Some),
                    ClientEvent::EndAudio => Ok(None),
                });
                match event {
                    Ok(Some(fragment)) => handle.append(&fragment),
                    Ok(None) => {
                        if handle.end_of_utterance().await.is_err() {
                            break;
                        }
                    }
                    Err(e) => {
                        debug!(session = %session_id, error = %e, "server: protocol error");
                        handle.notify(ServerEvent::protocol_error(&e));
                    }
                }
            }
            Message::Close(_) => break,
            Message::Ping(_) | Message::Pong(_) => {}
        }
    }

    // Dropping the handle cancels the worker, which closes the event stream.
    drop(handle);
    let _ = writer.await;
    info!(session = %session_id, "server: client disconnected");
}

async fn translate_handler(State(state): State<AppState>, mut multipart: Multipart) -> Response {
    let mut data = None;
    loop {
        match multipart.next_field().await {
            Ok(Some(field)) if field.name() == Some("file") => match field.bytes().await {
                Ok(bytes) => {
                    data = Some(bytes);
                    break;
                }
                Err(e) => return bad_request(e.to_string()),
            },
            Ok(Some(_)) => continue,
            Ok(None) => break,
            Err(e) => return bad_request(e.to_string()),
        }
    }
    let Some(data) = data else {
        return bad_request("missing multipart field `file`".to_string());
    };

    let utterance = match state.options.max_utterance_bytes {
        Some(limit) if data.len() > limit => Utterance::overflowed(limit),
        _ => Utterance::from_bytes(data),
    };
    match state.pipeline.run(utterance, |_| {}).await {
        Ok(result) => {
            debug!(bytes = result.wav.len(), "server: one-shot translation done");
            ([(header::CONTENT_TYPE, "audio/wav")], result.wav).into_response()
        }
        Err(e) => {
            warn!(stage = %e.stage(), kind = e.kind(), error = %e, "server: one-shot translation failed");
            (status_for(&e), Json(Failure::from(&e))).into_response()
        }
    }
}

fn bad_request(message: String) -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(serde_json::json!({ "kind": "bad_request", "message": message })),
    )
        .into_response()
}

/// HTTP status for a failed one-shot run.
pub fn status_for(err: &PipelineError) -> StatusCode {
    match err {
        PipelineError::Timeout { .. } => StatusCode::GATEWAY_TIMEOUT,
        e if e.is_client_error() => StatusCode::BAD_REQUEST,
        _ => StatusCode::BAD_GATEWAY,
    }
}
