//! Error handling

use thiserror::Error;

/// Persisted store errors
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Errors returned by the telemetry facade.
///
/// Delivery failures never show up here: they are absorbed by the pending
/// queue. Only malformed hits and a failing persisted store are surfaced.
#[derive(Debug, Error)]
pub enum HitError {
    #[error("Invalid hit: {0}")]
    Invalid(#[from] validator::ValidationErrors),

    #[error("Hit storage failed: {0}")]
    Storage(#[from] StoreError),
}

/// HTTP layer errors
#[derive(Debug, Clone, Error)]
pub enum ApiError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Server returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Decode error: {0}")]
    Decode(String),

    #[error("Invalid header value for {0}")]
    InvalidHeader(String),
}

impl ApiError {
    /// HTTP status of the failed response, if the server answered
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn is_unauthorized(&self) -> bool {
        self.status() == Some(401)
    }
}

/// Token refresh errors.
///
/// `Clone` because one refresh result is handed to every concurrent waiter.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RefreshError {
    #[error("No refresh token held")]
    MissingRefreshToken,

    #[error("Refresh rejected with status {status}")]
    Rejected { status: u16 },

    #[error("Refresh network error: {0}")]
    Network(String),

    #[error("Refresh response could not be decoded: {0}")]
    Decode(String),

    #[error("Refreshed credentials could not be saved: {0}")]
    Storage(String),
}

impl RefreshError {
    /// A 403 during refresh means the refresh token itself is revoked
    pub fn is_forbidden(&self) -> bool {
        matches!(self, Self::Rejected { status: 403 })
    }
}

impl From<ApiError> for RefreshError {
    fn from(err: ApiError) -> Self {
        match err {
            ApiError::Status { status, .. } => Self::Rejected { status },
            ApiError::Network(e) => Self::Network(e),
            ApiError::Decode(e) | ApiError::InvalidHeader(e) => Self::Decode(e),
        }
    }
}

/// Errors while wiring the client services together
#[derive(Debug, Error)]
pub enum SetupError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Hit(#[from] HitError),

    #[error(transparent)]
    Api(#[from] ApiError),
}
