use thiserror::Error;

#[derive(Debug, Error)]
pub enum HuddleError {
    #[error("connection failed: {0}")]
    Connection(String),
    #[error("room error: {0}")]
    Room(String),
    #[error("authentication failed: {0}")]
    Auth(String),
    #[error("http error: {0}")]
    Http(String),
    #[error("invalid room code: {0}")]
    InvalidRoomCode(String),
    #[error("no active session")]
    NoSession,
}
