use thiserror::Error;

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("invalid server url '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },
    #[error("failed to connect websocket {url}: {source}")]
    Connect {
        url: String,
        source: tokio_tungstenite::tungstenite::Error,
    },
    #[error("websocket close failed: {0}")]
    Close(#[source] tokio_tungstenite::tungstenite::Error),
    #[error("transport unavailable: {0}")]
    Unavailable(String),
}

#[derive(Debug, Error)]
pub enum CommandError {
    #[error("push request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("push rejected with status {status}")]
    Rejected { status: u16 },
    #[error("invalid push url: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

#[derive(Debug, Error)]
pub enum SetupConnectivityError {
    #[error("invalid server url '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },
    #[error("cannot reach server: {0}")]
    Unreachable(#[from] reqwest::Error),
    #[error("health check returned status {status}")]
    Unhealthy { status: u16 },
}
