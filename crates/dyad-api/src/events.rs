use crate::types::{
    HistoryRequest, LoginPayload, MarkReadPayload, Message, OutgoingMessage, ReadReceipt,
    StatusNotice, TypingNotice, TypingSignal,
};
use serde::{Deserialize, Serialize};

/// Push-channel frames are newline-delimited JSON objects of the shape
/// `{"event": <name>, "data": <payload>}`. The event names are the wire
/// contract and must not change.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "camelCase")]
pub enum ClientEvent {
    Login(LoginPayload),
    GetPreviousMessages(HistoryRequest),
    PrivateMessage(OutgoingMessage),
    MarkMessageRead(MarkReadPayload),
    Typing(TypingSignal),
    CheckUserStatus(String),
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "camelCase")]
pub enum ServerEvent {
    PreviousMessages(Vec<Message>),
    NewMessage(Message),
    MessageSent(Message),
    MessageRead(ReadReceipt),
    UserTyping(TypingNotice),
    UserStatus(StatusNotice),
}
