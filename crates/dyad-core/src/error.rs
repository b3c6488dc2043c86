use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CoreError {
    #[error("invalid message {0}")]
    InvalidMessage(&'static str),
    #[error("self addressed")]
    SelfAddressed,
    #[error("not authorized")]
    NotAuthorized,
    #[error("not found")]
    NotFound,
    #[error("storage")]
    Storage,
}
