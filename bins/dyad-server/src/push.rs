use dyad_api::events::{ClientEvent, ServerEvent};
use dyad_core::error::CoreError;
use dyad_core::presence::ConnectionHandle;
use dyad_core::Core;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

pub fn start_push_listener(
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
                                handle_connection(core, stream).await;
                            });
                        }
                        Err(_) => break,
                    }
                }
            }
        }
    })
}

/// One task per connection: frames are read serially off the socket, which
/// is what gives per-pair sends their delivery order.
async fn handle_connection(core: Arc<Core>, stream: TcpStream) {
    let (read_half, write_half) = stream.into_split();
    let (tx, mut rx) = mpsc::unbounded_channel();
    let handle = ConnectionHandle::new(tx);
    log::debug!("push connection {} opened", handle.id());

    let writer = tokio::spawn(async move {
        let mut write_half = write_half;
        while let Some(event) = rx.recv().await {
            let mut frame = match serde_json::to_vec(&event) {
                Ok(frame) => frame,
                Err(err) => {
                    log::warn!("unencodable outbound frame: {err}");
                    continue;
                }
            };
            frame.push(b'\n');
            if write_half.write_all(&frame).await.is_err() {
                break;
            }
        }
    });

    let mut lines = BufReader::new(read_half).lines();
    loop {
        match lines.next_line().await {
            Ok(Some(line)) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                match serde_json::from_str::<ClientEvent>(line) {
                    Ok(event) => dispatch(&core, &handle, event).await,
                    Err(err) => {
                        log::warn!(
                            "connection {} sent an unparseable frame: {err}",
                            handle.id()
                        );
                    }
                }
            }
            Ok(None) | Err(_) => break,
        }
    }

    core.disconnect(handle.id()).await;
    writer.abort();
    log::debug!("push connection {} closed", handle.id());
}

/// Invalid input is logged and ignored rather than bounced; nothing a client
/// sends may tear down its connection.
pub async fn dispatch(core: &Core, handle: &ConnectionHandle, event: ClientEvent) {
    match event {
        ClientEvent::Login(payload) => {
            core.login(&payload.identity, handle.clone()).await;
        }
        ClientEvent::GetPreviousMessages(request) => {
            let messages = core.history(&request.identity, &request.partner).await;
            handle.push(ServerEvent::PreviousMessages(messages));
        }
        ClientEvent::PrivateMessage(outgoing) => {
            match core
                .send(
                    &outgoing.sender,
                    &outgoing.recipient,
                    &outgoing.body,
                    outgoing.timestamp,
                )
                .await
            {
                Ok(message) => handle.push(ServerEvent::MessageSent(message)),
                Err(CoreError::SelfAddressed) => {
                    log::debug!("self-addressed message from connection {} dropped", handle.id());
                }
                Err(err) => {
                    log::warn!("message from connection {} rejected: {err}", handle.id());
                }
            }
        }
        ClientEvent::MarkMessageRead(payload) => {
            if let Err(err) = core.mark_read(&payload.message_id, &payload.reader).await {
                log::warn!(
                    "mark-read of {} by {} rejected: {err}",
                    payload.message_id,
                    payload.reader
                );
            }
        }
        ClientEvent::Typing(signal) => {
            core.typing(signal).await;
        }
        ClientEvent::CheckUserStatus(identity) => {
            core.check_status(&identity).await;
        }
    }
}
