use thiserror::Error;

/// Photo Trails sync client errors
#[derive(Debug, Error)]
pub enum PhotoTrailsError {
    /// Ingest endpoint answered with a non-2xx status or an unusable body
    #[error("Transfer error: {message}")]
    Transfer {
        status: Option<u16>,
        message: String,
    },

    /// No response at all (connect failure, reset, timeout)
    #[error("Network error: {0}")]
    Network(String),

    /// Malformed catalog or page response
    #[error("Parse error: {0}")]
    Parse(String),

    /// Configuration file errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// HTTP request errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Mutex poison error
    #[error("Lock poisoned: {0}")]
    LockPoisoned(String),

    /// Event published while nothing was subscribed to the bus
    #[error("No subscribers for {0} event")]
    NoSubscribers(String),

    /// An upload session is already running on this orchestrator
    #[error("Upload already in progress")]
    SessionBusy,

    /// Generic error with context
    #[error("{0}")]
    Other(String),
}

impl PhotoTrailsError {
    pub fn transfer(status: Option<u16>, message: impl Into<String>) -> Self {
        PhotoTrailsError::Transfer {
            status,
            message: message.into(),
        }
    }

    /// Map a reqwest failure that happened before any response arrived.
    pub fn from_send(err: reqwest::Error) -> Self {
        PhotoTrailsError::Network(err.to_string())
    }

    /// Network faults and 5xx responses may succeed on a later attempt.
    pub fn is_retryable(&self) -> bool {
        match self {
            PhotoTrailsError::Network(_) => true,
            PhotoTrailsError::Transfer {
                status: Some(status),
                ..
            } => (500..600).contains(status),
            _ => false,
        }
    }
}

impl<T> From<std::sync::PoisonError<T>> for PhotoTrailsError {
    fn from(err: std::sync::PoisonError<T>) -> Self {
        PhotoTrailsError::LockPoisoned(err.to_string())
    }
}

/// Helper trait for adding context to errors
pub trait ErrorContext<T> {
    fn context(self, msg: &str) -> Result<T, PhotoTrailsError>;
}

impl<T, E: Into<PhotoTrailsError>> ErrorContext<T> for Result<T, E> {
    fn context(self, msg: &str) -> Result<T, PhotoTrailsError> {
        self.map_err(|e| {
            let err: PhotoTrailsError = e.into();
            match err {
                PhotoTrailsError::Transfer { status, message } => PhotoTrailsError::Transfer {
                    status,
                    message: format!("{}: {}", msg, message),
                },
                PhotoTrailsError::Network(s) => PhotoTrailsError::Network(format!("{}: {}", msg, s)),
                PhotoTrailsError::Parse(s) => PhotoTrailsError::Parse(format!("{}: {}", msg, s)),
                PhotoTrailsError::Config(s) => PhotoTrailsError::Config(format!("{}: {}", msg, s)),
                PhotoTrailsError::Other(s) => PhotoTrailsError::Other(format!("{}: {}", msg, s)),
                PhotoTrailsError::LockPoisoned(s) => {
                    PhotoTrailsError::LockPoisoned(format!("{}: {}", msg, s))
                }
                other => other,
            }
        })
    }
}
