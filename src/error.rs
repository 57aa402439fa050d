use thiserror::Error;

#[derive(Error, Debug)]
pub enum LdmError {
    #[error("Config error: {0}")]
    Config(String),
    #[error("GraphDB error: {reason}")]
    Upstream { status: u16, reason: String },
    #[error("Connection failed: {0}")]
    Transport(String),
    #[error("{kind} not found: {uri}")]
    NotFound { kind: &'static str, uri: String },
    #[error("Invalid identifier: {0}")]
    InvalidIdentifier(String),
    #[error("Invalid timestamp: {0}")]
    InvalidTimestamp(String),
    #[error("Decode error: {0}")]
    Decode(String),
}

pub type Result<T> = std::result::Result<T, LdmError>;

impl LdmError {
    pub fn class_not_found(uri: &str) -> Self {
        Self::NotFound { kind: "Class", uri: uri.to_string() }
    }
    pub fn subject_not_found(uri: &str) -> Self {
        Self::NotFound { kind: "Subject", uri: uri.to_string() }
    }
    /// HTTP status a caller should see for this error.
    pub fn status_code(&self) -> u16 {
        match self {
            Self::Upstream { status, .. } => *status,
            Self::NotFound { .. } => 404,
            Self::InvalidIdentifier(_) | Self::InvalidTimestamp(_) => 400,
            Self::Config(_) | Self::Transport(_) | Self::Decode(_) => 500,
        }
    }
}

// Helper conversions
impl From<reqwest::Error> for LdmError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            Self::Decode(e.to_string())
        } else {
            Self::Transport(e.to_string())
        }
    }
}
impl From<serde_json::Error> for LdmError {
    fn from(e: serde_json::Error) -> Self {
        Self::Decode(e.to_string())
    }
}
impl From<::config::ConfigError> for LdmError {
    fn from(e: ::config::ConfigError) -> Self {
        Self::Config(e.to_string())
    }
}
