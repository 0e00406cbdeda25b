use thiserror::Error;

#[derive(Error, Debug)]
pub enum HyperliquidError {
    #[error("Invalid number: {0}")]
    InvalidNumber(String),

    #[error("Encoding error: {0}")]
    EncodingError(String),

    #[error("Unknown asset: {0}")]
    UnknownAsset(String),

    #[error("Position not found for coin: {0}")]
    PositionNotFound(String),

    #[error("Signing error: {0}")]
    SigningError(String),

    /// Exchange answered `status: err`, or a per-order status carried an error.
    #[error("{}", format_rejection(.index, .message))]
    RemoteRejected {
        index: Option<usize>,
        message: String,
    },

    /// One element of a batch failed to build; nothing was signed.
    #[error("failed to build {kind} {index}: {source}")]
    BatchItem {
        kind: &'static str,
        index: usize,
        #[source]
        source: Box<HyperliquidError>,
    },

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("TOML error: {0}")]
    TomlError(#[from] toml::de::Error),
}

impl HyperliquidError {
    /// Index of the failing batch element, for builder and remote errors.
    pub fn batch_index(&self) -> Option<usize> {
        match self {
            HyperliquidError::BatchItem { index, .. } => Some(*index),
            HyperliquidError::RemoteRejected { index, .. } => *index,
            _ => None,
        }
    }
}

fn format_rejection(index: &Option<usize>, message: &str) -> String {
    match index {
        Some(i) => format!("Remote rejected order {}: {}", i, message),
        None => format!("Remote rejected: {}", message),
    }
}

pub type Result<T> = std::result::Result<T, HyperliquidError>;
