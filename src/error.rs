use std::fmt;

/// Main error type for fast-cli
#[derive(Debug)]
pub enum FastCliError {
    // Setup Errors
    SetupFailed {
        index: usize,
        url: String,
        message: String,
    },
    HttpStatus {
        index: usize,
        url: String,
        status: u16,
    },

    // Transfer Errors
    TransferFailed {
        index: usize,
        source: std::io::Error,
    },
    OutcomeChannelClosed,
    RunnerSpawnFailed {
        index: usize,
        source: std::io::Error,
    },

    // Configuration Errors
    ConfigLoad(config::ConfigError),
    InvalidConfigValue(String),

    // HTTP client errors
    Http(reqwest::Error),

    // General errors
    Other(String),
}

impl fmt::Display for FastCliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            // Setup Errors
            Self::SetupFailed {
                index,
                url,
                message,
            } => write!(f, "Request for stream {} ({}) failed: {}", index, url, message),
            Self::HttpStatus { index, url, status } => write!(
                f,
                "Request for stream {} ({}) returned HTTP status {}",
                index, url, status
            ),

            // Transfer Errors
            Self::TransferFailed { index, source } => {
                write!(f, "Transfer failed on stream {}: {}", index, source)
            }
            Self::OutcomeChannelClosed => {
                write!(f, "All transfers ended without reporting an outcome")
            }
            Self::RunnerSpawnFailed { index, source } => {
                write!(f, "Cannot start transfer thread {}: {}", index, source)
            }

            // Configuration Errors
            Self::ConfigLoad(err) => write!(f, "Configuration error: {}", err),
            Self::InvalidConfigValue(msg) => write!(f, "Invalid configuration value: {}", msg),

            Self::Http(err) => write!(f, "HTTP error: {}", err),

            // General
            Self::Other(msg) => write!(f, "Error: {}", msg),
        }
    }
}

impl std::error::Error for FastCliError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::TransferFailed { source, .. } => Some(source),
            Self::RunnerSpawnFailed { source, .. } => Some(source),
            Self::ConfigLoad(err) => Some(err),
            Self::Http(err) => Some(err),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for FastCliError {
    fn from(err: reqwest::Error) -> Self {
        Self::Http(err)
    }
}

impl From<config::ConfigError> for FastCliError {
    fn from(err: config::ConfigError) -> Self {
        Self::ConfigLoad(err)
    }
}

impl FastCliError {
    /// Wrap a request failure for the stream at `index`
    pub fn setup(index: usize, url: &str, err: impl fmt::Display) -> Self {
        Self::SetupFailed {
            index,
            url: url.to_string(),
            message: err.to_string(),
        }
    }

    /// Whether this error happened before any transfer started
    pub fn is_setup_failure(&self) -> bool {
        matches!(self, Self::SetupFailed { .. } | Self::HttpStatus { .. })
    }
}

/// Result type alias for convenience
pub type Result<T> = std::result::Result<T, FastCliError>;
