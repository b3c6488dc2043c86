use crate::types::{HistoryRequest, MarkReadPayload, OutgoingMessage, ValidationLimits};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("empty field {0}")]
    Empty(&'static str),
    #[error("too long {0}")]
    TooLong(&'static str),
    #[error("self addressed")]
    SelfAddressed,
}

pub fn validate_identity(
    value: &str,
    field: &'static str,
    limits: &ValidationLimits,
) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::Empty(field));
    }
    if value.len() > limits.max_identity_len {
        return Err(ValidationError::TooLong(field));
    }
    Ok(())
}

pub fn validate_outgoing(
    message: &OutgoingMessage,
    limits: &ValidationLimits,
) -> Result<(), ValidationError> {
    validate_identity(&message.sender, "sender", limits)?;
    validate_identity(&message.recipient, "recipient", limits)?;
    if message.body.trim().is_empty() {
        return Err(ValidationError::Empty("body"));
    }
    if message.body.len() > limits.max_body_bytes {
        return Err(ValidationError::TooLong("body"));
    }
    if message.sender == message.recipient {
        return Err(ValidationError::SelfAddressed);
    }
    Ok(())
}

pub fn validate_history_request(
    request: &HistoryRequest,
    limits: &ValidationLimits,
) -> Result<(), ValidationError> {
    validate_identity(&request.identity, "identity", limits)?;
    validate_identity(&request.partner, "partner", limits)
}

pub fn validate_mark_read(
    payload: &MarkReadPayload,
    limits: &ValidationLimits,
) -> Result<(), ValidationError> {
    if payload.message_id.trim().is_empty() {
        return Err(ValidationError::Empty("message_id"));
    }
    validate_identity(&payload.reader, "reader", limits)
}
