use dyad_api::events::{ClientEvent, ServerEvent};
use dyad_api::types::{
    HistoryRequest, LoginPayload, MarkReadPayload, Message, OutgoingMessage,
};
use dyad_core::time::now_ms;
use std::collections::HashSet;
use std::time::Duration;
use thiserror::Error;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::time::timeout;

/// Bounded wait for the push channel before switching to the fallback path.
const LIVENESS_WAIT: Duration = Duration::from_secs(3);
const ECHO_WAIT: Duration = Duration::from_secs(5);
const POLL_INTERVAL: Duration = Duration::from_secs(2);

#[derive(Debug, Error)]
enum CliError {
    #[error("push channel unavailable")]
    PushUnavailable,
    #[error("io")]
    Io,
    #[error("protocol")]
    Protocol,
    #[error("http")]
    Http,
}

fn push_addr() -> String {
    std::env::var("DYAD_PUSH_ADDR").unwrap_or_else(|_| "127.0.0.1:5001".to_string())
}

fn http_base() -> String {
    match std::env::var("DYAD_HTTP_ADDR") {
        Ok(addr) => format!("http://{addr}"),
        Err(_) => "http://127.0.0.1:5000".to_string(),
    }
}

#[tokio::main]
async fn main() {
    let args: Vec<String> = std::env::args().collect();
    let command = args.get(1).map(|s| s.as_str()).unwrap_or("help");
    let result = match command {
        "send" if args.len() >= 5 => {
            send(args[2].clone(), args[3].clone(), args[4..].join(" ")).await
        }
        "history" if args.len() >= 4 => history(&args[2], &args[3]).await,
        "watch" if args.len() >= 4 => watch(&args[2], &args[3]).await,
        _ => {
            eprintln!("usage: dyad-cli send <sender> <recipient> <text>");
            eprintln!("       dyad-cli history <identity> <partner>");
            eprintln!("       dyad-cli watch <identity> <partner>");
            return;
        }
    };
    if let Err(err) = result {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}

async fn send(sender: String, recipient: String, body: String) -> Result<(), CliError> {
    let mut draft = PendingDraft::new(&sender, &body);
    let outgoing = OutgoingMessage {
        sender: sender.clone(),
        recipient,
        body,
        timestamp: Some(now_ms()),
    };
    match PushSession::connect(&sender).await {
        Ok(mut session) => {
            session
                .send(&ClientEvent::PrivateMessage(outgoing))
                .await?;
            let echo = session.wait_for_echo(&mut draft, ECHO_WAIT).await?;
            println!("sent {}", echo.id);
            Ok(())
        }
        Err(CliError::PushUnavailable) => {
            let client = reqwest::Client::new();
            let message = submit_via_fallback(&client, &outgoing).await?;
            draft.confirm(&message);
            println!("sent {} via fallback", message.id);
            Ok(())
        }
        Err(err) => Err(err),
    }
}

async fn history(identity: &str, partner: &str) -> Result<(), CliError> {
    let messages = match PushSession::connect(identity).await {
        Ok(mut session) => {
            session
                .send(&ClientEvent::GetPreviousMessages(HistoryRequest {
                    identity: identity.to_string(),
                    partner: partner.to_string(),
                }))
                .await?;
            session.wait_for_history(ECHO_WAIT).await?
        }
        Err(CliError::PushUnavailable) => {
            let client = reqwest::Client::new();
            fetch_history(&client, identity, partner).await?
        }
        Err(err) => return Err(err),
    };
    for message in messages {
        print_message(&message);
    }
    Ok(())
}

async fn watch(identity: &str, partner: &str) -> Result<(), CliError> {
    match PushSession::connect(identity).await {
        Ok(mut session) => {
            println!("watching as {identity} (push)");
            session
                .send(&ClientEvent::CheckUserStatus(partner.to_string()))
                .await?;
            loop {
                match session.recv_blocking().await? {
                    ServerEvent::NewMessage(message) => {
                        print_message(&message);
                        // This surface counts as focused: a displayed message
                        // is read immediately.
                        session
                            .send(&ClientEvent::MarkMessageRead(MarkReadPayload {
                                message_id: message.id.clone(),
                                reader: identity.to_string(),
                            }))
                            .await?;
                    }
                    ServerEvent::MessageRead(receipt) => {
                        println!("read: {} by {}", receipt.message_id, receipt.reader);
                    }
                    ServerEvent::UserStatus(notice) => {
                        println!("{} is {}", notice.identity, notice.status);
                    }
                    ServerEvent::UserTyping(notice) if notice.is_typing => {
                        println!("{} is typing...", notice.sender);
                    }
                    _ => {}
                }
            }
        }
        Err(CliError::PushUnavailable) => watch_via_fallback(identity, partner).await,
        Err(err) => Err(err),
    }
}

/// Pull/poll mirror of the push watch: fetch the pair history on an interval,
/// print what is new and mark received messages read.
async fn watch_via_fallback(identity: &str, partner: &str) -> Result<(), CliError> {
    println!("push channel unavailable, polling as {identity} (fallback)");
    let client = reqwest::Client::new();
    let mut seen: HashSet<String> = HashSet::new();
    loop {
        let messages = fetch_history(&client, identity, partner).await?;
        for message in messages {
            if !seen.insert(message.id.clone()) {
                continue;
            }
            print_message(&message);
            if message.recipient == identity && !message.read {
                mark_read_via_fallback(&client, &message.id, identity).await?;
            }
        }
        tokio::time::sleep(POLL_INTERVAL).await;
    }
}

fn print_message(message: &Message) {
    let marker = if message.read { "r" } else { "-" };
    println!(
        "[{} {}] {} -> {}: {}",
        message.timestamp, marker, message.sender, message.recipient, message.body
    );
}

/// Optimistic local draft. It stays pending until the server echo is matched
/// by content, since the draft carries no server-assigned identifier yet.
struct PendingDraft {
    sender: String,
    body: String,
    pending: bool,
}

impl PendingDraft {
    fn new(sender: &str, body: &str) -> Self {
        Self {
            sender: sender.to_string(),
            body: body.to_string(),
            pending: true,
        }
    }

    fn confirm(&mut self, echo: &Message) -> bool {
        if self.pending && echo.sender == self.sender && echo.body == self.body {
            self.pending = false;
            return true;
        }
        false
    }
}

struct PushSession {
    write_half: OwnedWriteHalf,
    lines: Lines<BufReader<OwnedReadHalf>>,
}

impl PushSession {
    async fn connect(identity: &str) -> Result<Self, CliError> {
        let addr = push_addr();
        let stream = match timeout(LIVENESS_WAIT, TcpStream::connect(&addr)).await {
            Ok(Ok(stream)) => stream,
            Ok(Err(_)) | Err(_) => return Err(CliError::PushUnavailable),
        };
        let (read_half, write_half) = stream.into_split();
        let mut session = Self {
            write_half,
            lines: BufReader::new(read_half).lines(),
        };
        session
            .send(&ClientEvent::Login(LoginPayload {
                identity: identity.to_string(),
            }))
            .await?;
        Ok(session)
    }

    async fn send(&mut self, event: &ClientEvent) -> Result<(), CliError> {
        let mut frame = serde_json::to_vec(event).map_err(|_| CliError::Protocol)?;
        frame.push(b'\n');
        self.write_half
            .write_all(&frame)
            .await
            .map_err(|_| CliError::Io)
    }

    async fn recv(&mut self, wait: Duration) -> Result<ServerEvent, CliError> {
        let line = timeout(wait, self.lines.next_line())
            .await
            .map_err(|_| CliError::PushUnavailable)?
            .map_err(|_| CliError::Io)?
            .ok_or(CliError::Io)?;
        serde_json::from_str(&line).map_err(|_| CliError::Protocol)
    }

    async fn recv_blocking(&mut self) -> Result<ServerEvent, CliError> {
        let line = self
            .lines
            .next_line()
            .await
            .map_err(|_| CliError::Io)?
            .ok_or(CliError::Io)?;
        serde_json::from_str(&line).map_err(|_| CliError::Protocol)
    }

    async fn wait_for_echo(
        &mut self,
        draft: &mut PendingDraft,
        wait: Duration,
    ) -> Result<Message, CliError> {
        loop {
            if let ServerEvent::MessageSent(message) = self.recv(wait).await? {
                if draft.confirm(&message) {
                    return Ok(message);
                }
            }
        }
    }

    async fn wait_for_history(&mut self, wait: Duration) -> Result<Vec<Message>, CliError> {
        loop {
            if let ServerEvent::PreviousMessages(messages) = self.recv(wait).await? {
                return Ok(messages);
            }
        }
    }
}

async fn submit_via_fallback(
    client: &reqwest::Client,
    outgoing: &OutgoingMessage,
) -> Result<Message, CliError> {
    let response = client
        .post(format!("{}/api/messages", http_base()))
        .json(outgoing)
        .send()
        .await
        .map_err(|_| CliError::Http)?;
    if !response.status().is_success() {
        return Err(CliError::Http);
    }
    response.json().await.map_err(|_| CliError::Http)
}

async fn fetch_history(
    client: &reqwest::Client,
    identity: &str,
    partner: &str,
) -> Result<Vec<Message>, CliError> {
    let response = client
        .get(format!("{}/api/messages/{identity}/{partner}", http_base()))
        .send()
        .await
        .map_err(|_| CliError::Http)?;
    if !response.status().is_success() {
        return Err(CliError::Http);
    }
    response.json().await.map_err(|_| CliError::Http)
}

async fn mark_read_via_fallback(
    client: &reqwest::Client,
    message_id: &str,
    reader: &str,
) -> Result<(), CliError> {
    let response = client
        .put(format!(
            "{}/api/messages/read/{message_id}/{reader}",
            http_base()
        ))
        .send()
        .await
        .map_err(|_| CliError::Http)?;
    if !response.status().is_success() {
        return Err(CliError::Http);
    }
    Ok(())
}
