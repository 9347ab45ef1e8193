/// Shared error type used across all ZapGate crates.
///
/// "Already exists" is deliberately absent: re-creating an instance that is
/// already registered is benign and reported through
/// `CreateOutcome::AlreadyExists`, not as a failure.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("IO: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP: {0}")]
    Http(String),

    #[error("config: {0}")]
    Config(String),

    #[error("instance not found: {0}")]
    NotFound(String),

    #[error("instance limit of {max} reached")]
    CapacityExceeded { max: usize },

    #[error("instance not connected: {0}")]
    NotReady(String),

    #[error("invalid recipient: {0}")]
    InvalidRecipient(String),

    #[error("recipient not registered on the platform: {0}")]
    UnregisteredRecipient(String),

    #[error("send failed: {0}")]
    SendFailed(String),

    #[error("adapter: {0}")]
    AdapterInit(String),

    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, Error>;
