pub mod config_tests;

use crate::http::start_http_listener;
use crate::push::start_push_listener;
use bytes::Bytes;
use dyad_api::events::{ClientEvent, ServerEvent};
use dyad_api::types::{LoginPayload, UserStatus};
use dyad_core::config::CoreConfig;
use dyad_core::store::MemoryStore;
use dyad_core::Core;
use http_body_util::{BodyExt, Full};
use hyper::{Request, StatusCode};
use hyper_util::rt::TokioIo;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::timeout;

pub struct TestServer {
    pub push_addr: SocketAddr,
    pub http_addr: SocketAddr,
    push_shutdown: oneshot::Sender<()>,
    http_shutdown: oneshot::Sender<()>,
    push_task: JoinHandle<()>,
    http_task: JoinHandle<()>,
}

impl TestServer {
    pub async fn start() -> Self {
        let config = CoreConfig {
            auto_read_delay_ms: 50,
            ..CoreConfig::default()
        };
        let core = Arc::new(Core::new(config, Arc::new(MemoryStore::new())));
        let push_listener = TcpListener::bind("127.0.0.1:0").await.expect("bind push");
        let http_listener = TcpListener::bind("127.0.0.1:0").await.expect("bind http");
        let push_addr = push_listener.local_addr().expect("push addr");
        let http_addr = http_listener.local_addr().expect("http addr");
        let (push_shutdown, push_rx) = oneshot::channel();
        let (http_shutdown, http_rx) = oneshot::channel();
        let push_task = start_push_listener(core.clone(), push_listener, push_rx);
        let http_task = start_http_listener(core, http_listener, http_rx);
        Self {
            push_addr,
            http_addr,
            push_shutdown,
            http_shutdown,
            push_task,
            http_task,
        }
    }

    pub async fn stop(self) {
        let _ = self.push_shutdown.send(());
        let _ = self.http_shutdown.send(());
        let _ = self.push_task.await;
        let _ = self.http_task.await;
    }
}

pub struct PushClient {
    write_half: OwnedWriteHalf,
    lines: Lines<BufReader<OwnedReadHalf>>,
}

impl PushClient {
    pub async fn connect(addr: SocketAddr) -> Self {
        let stream = TcpStream::connect(addr).await.expect("connect push");
        let (read_half, write_half) = stream.into_split();
        Self {
            write_half,
            lines: BufReader::new(read_half).lines(),
        }
    }

    /// Connects and logs in, waiting for the server's own online broadcast so
    /// later frames are guaranteed to see the registration.
    pub async fn login(addr: SocketAddr, identity: &str) -> Self {
        let mut client = Self::connect(addr).await;
        client
            .send(&ClientEvent::Login(LoginPayload {
                identity: identity.to_string(),
            }))
            .await;
        let expected = identity.to_string();
        client
            .recv_until(|event| {
                matches!(
                    event,
                    ServerEvent::UserStatus(notice)
                        if notice.identity == expected && notice.status == UserStatus::Online
                )
            })
            .await;
        client
    }

    pub async fn send(&mut self, event: &ClientEvent) {
        let mut frame = serde_json::to_vec(event).expect("encode frame");
        frame.push(b'\n');
        self.write_half.write_all(&frame).await.expect("write frame");
    }

    pub async fn send_raw(&mut self, line: &str) {
        self.write_half
            .write_all(format!("{line}\n").as_bytes())
            .await
            .expect("write raw");
    }

    pub async fn recv(&mut self) -> ServerEvent {
        let line = timeout(Duration::from_secs(2), self.lines.next_line())
            .await
            .expect("timed out waiting for frame")
            .expect("read frame")
            .expect("connection closed");
        serde_json::from_str(&line).expect("decode frame")
    }

    pub async fn recv_until<F>(&mut self, mut matches: F) -> ServerEvent
    where
        F: FnMut(&ServerEvent) -> bool,
    {
        loop {
            let event = self.recv().await;
            if matches(&event) {
                return event;
            }
        }
    }
}

pub async fn http_request(
    addr: SocketAddr,
    method: &str,
    path: &str,
    body: Option<serde_json::Value>,
) -> (StatusCode, serde_json::Value) {
    let stream = TcpStream::connect(addr).await.expect("connect http");
    let io = TokioIo::new(stream);
    let (mut sender, connection) = hyper::client::conn::http1::handshake(io)
        .await
        .expect("handshake");
    tokio::spawn(async move {
        let _ = connection.await;
    });
    let payload = body
        .map(|value| Bytes::from(value.to_string()))
        .unwrap_or_default();
    let request = Request::builder()
        .method(method)
        .uri(path)
        .header("host", "dyad")
        .header("content-type", "application/json")
        .body(Full::<Bytes>::from(payload))
        .expect("build request");
    let response = sender.send_request(request).await.expect("send request");
    let status = response.status();
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("collect body")
        .to_bytes();
    let value = if bytes.is_empty() {
        serde_json::Value::Null
    } else {
        serde_json::from_slice(&bytes).expect("decode body")
    };
    (status, value)
}
