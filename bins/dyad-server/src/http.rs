use bytes::Bytes;
use dyad_api::types::OutgoingMessage;
use dyad_core::error::CoreError;
use dyad_core::Core;
use http_body_util::{BodyExt, Full};
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use serde_json::json;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

pub fn start_http_listener(
    core: Arc<Core>,
    listener: TcpListener,
    shutdown: oneshot::Receiver<()>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut shutdown = shutdown;
        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    break;
                }
                res = listener.accept() => {
                    match res {
                        Ok((stream, _)) => {
                            let core = core.clone();
                            tokio::spawn(async move {
                                let io = TokioIo::new(stream);
                                let service = service_fn(move |req: Request<Incoming>| {
                                    let core = core.clone();
                                    async move { handle_request(core, req).await }
                                });
                                let _ = http1::Builder::new().serve_connection(io, service).await;
                            });
                        }
                        Err(_) => break,
                    }
                }
            }
        }
    })
}

/// Fallback surface: the push-channel operations mirrored over
/// request/response, handled by the same core as the push frames.
pub async fn handle_request(
    core: Arc<Core>,
    req: Request<Incoming>,
) -> Result<Response<Full<Bytes>>, hyper::Error> {
    let method = req.method().as_str().to_string();
    let path = req.uri().path().trim_matches('/').to_string();
    let segments: Vec<&str> = path.split('/').collect();
    match (method.as_str(), segments.as_slice()) {
        ("GET", ["health"]) => json_response(
            StatusCode::OK,
            json!({"status": "ok"}),
        ),
        ("GET", ["stats"]) => {
            let stats = core.stats().await;
            json_response(
                StatusCode::OK,
                json!({
                    "online_users": stats.online_users,
                    "transient_messages": stats.transient_messages,
                    "pending_auto_reads": stats.pending_auto_reads
                }),
            )
        }
        ("GET", ["api", "messages", a, b]) => {
            let messages = core.history(a, b).await;
            json_response(
                StatusCode::OK,
                serde_json::to_value(messages).unwrap_or_else(|_| json!([])),
            )
        }
        ("POST", ["api", "messages"]) => {
            let bytes = req.into_body().collect().await?.to_bytes();
            let outgoing: OutgoingMessage = match serde_json::from_slice(&bytes) {
                Ok(outgoing) => outgoing,
                Err(err) => {
                    log::warn!("malformed fallback submit: {err}");
                    return json_response(
                        StatusCode::BAD_REQUEST,
                        json!({"error": "malformed body"}),
                    );
                }
            };
            match core
                .send(
                    &outgoing.sender,
                    &outgoing.recipient,
                    &outgoing.body,
                    outgoing.timestamp,
                )
                .await
            {
                Ok(message) => json_response(
                    StatusCode::OK,
                    serde_json::to_value(&message).unwrap_or_default(),
                ),
                Err(err @ (CoreError::InvalidMessage(_) | CoreError::SelfAddressed)) => {
                    json_response(
                        StatusCode::BAD_REQUEST,
                        json!({"error": err.to_string()}),
                    )
                }
                Err(err) => {
                    log::warn!("fallback submit failed: {err}");
                    json_response(
                        StatusCode::INTERNAL_SERVER_ERROR,
                        json!({"error": "internal"}),
                    )
                }
            }
        }
        ("PUT", ["api", "messages", "read", message_id, reader]) => {
            match core.mark_read(message_id, reader).await {
                Ok(receipt) => json_response(
                    StatusCode::OK,
                    serde_json::to_value(&receipt).unwrap_or_default(),
                ),
                Err(CoreError::NotFound) => json_response(
                    StatusCode::NOT_FOUND,
                    json!({"error": "not found"}),
                ),
                Err(CoreError::NotAuthorized) => json_response(
                    StatusCode::FORBIDDEN,
                    json!({"error": "not authorized"}),
                ),
                Err(err) => {
                    log::warn!("fallback mark-read failed: {err}");
                    json_response(
                        StatusCode::INTERNAL_SERVER_ERROR,
                        json!({"error": "internal"}),
                    )
                }
            }
        }
        _ => json_response(StatusCode::NOT_FOUND, json!({"error": "not found"})),
    }
}

fn json_response(
    status: StatusCode,
    value: serde_json::Value,
) -> Result<Response<Full<Bytes>>, hyper::Error> {
    Ok(Response::builder()
        .status(status)
        .header("content-type", "application/json")
        .body(Full::from(value.to_string()))
        .unwrap())
}
