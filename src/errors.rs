use thiserror::Error;

#[derive(Debug, Error)]
pub enum FeedError {
    #[error("WebSocket error: {0}")]
    WebSocket(String),

    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Unexpected data from exchange: {0}")]
    UnexpectedData(String),

    /// Local book diverged from the exchange. Fatal for the connection.
    #[error("Book integrity failure: {0}")]
    Integrity(BookError),
}

impl FeedError {
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Integrity(_))
    }
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum BookError {
    #[error("checksum mismatch: expected {expected}, computed {computed} over \"{input}\"")]
    ChecksumMismatch {
        expected: i32,
        computed: i32,
        input: String,
    },

    #[error("received a snapshot after {messages} book messages")]
    UnexpectedSnapshot { messages: u64 },
}

impl BookError {
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::ChecksumMismatch { .. })
    }
}

#[derive(Debug, Error)]
pub enum SinkError {
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("Serialize error: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("sink is not connected yet")]
    NotConnected,
}
