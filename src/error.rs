use thiserror::Error;

/// Every way a single Bot API call can fail.
///
/// The variants are ordered the way a response is classified: a body that
/// could not be built, no response at all, an unreadable envelope, a non-200
/// status and finally an envelope that reports `ok: false`.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("no data received")]
    NoDataReceived,

    #[error("failed to decode response: {body}")]
    DecodeError { body: String },

    #[error("unexpected HTTP status {status}: {}", .description.as_deref().unwrap_or("no description"))]
    InvalidStatusCode {
        status: u16,
        description: Option<String>,
        error_code: Option<i64>,
        body: String,
    },

    #[error("server error: {body}")]
    ServerError { body: String },
}

impl TransportError {
    /// Raw response body, when the failure happened after one was received.
    pub fn body(&self) -> Option<&str> {
        match self {
            TransportError::DecodeError { body }
            | TransportError::InvalidStatusCode { body, .. }
            | TransportError::ServerError { body } => Some(body),
            TransportError::InvalidRequest(_) | TransportError::NoDataReceived => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, TransportError>;

/// Failures of the polling side and the blocking front end: a transport
/// failure that was not retried, filtering by addressee before the bot knows
/// who it is, or a blocking call issued from async code.
#[derive(Debug, Error)]
pub enum BotError {
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("bot identity unknown; fetch it before filtering by addressee")]
    IdentityUnknown,

    #[error("blocking call made from inside an async runtime")]
    NestedRuntime,
}
