use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("malformed server event: {0}")]
    MalformedEvent(#[from] serde_json::Error),
}
