use thiserror::Error;

/// Local form/aggregate validation failure. Carries every violation found
/// in one pass; a draft failing validation never reaches the network.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("order validation failed: {}", .violations.join("; "))]
pub struct ClientValidationError {
    pub violations: Vec<String>,
}

impl ClientValidationError {
    pub fn new(violations: Vec<String>) -> Self {
        Self { violations }
    }
}

/// Everything an API call can fail with, normalized at the adapter
/// boundary. Raw transport errors never cross into callers.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ApiClientError {
    /// Transport-level failure with no server response, or a response body
    /// that could not be decoded.
    #[error("client/network error: {0}")]
    Network(String),
    /// 4xx with the best message the error body offered.
    #[error("server rejected the request ({status}): {message}")]
    Server { status: u16, message: String },
    /// 5xx.
    #[error("server fault ({status}): {message}")]
    Fault { status: u16, message: String },
    /// Local validation failure; no HTTP request was issued.
    #[error(transparent)]
    Validation(#[from] ClientValidationError),
}

impl ApiClientError {
    /// The human-readable message for UI surfaces, without the status
    /// prefix the `Display` impl adds.
    pub fn message(&self) -> String {
        match self {
            ApiClientError::Network(message) => message.clone(),
            ApiClientError::Server { message, .. } | ApiClientError::Fault { message, .. } => {
                message.clone()
            }
            ApiClientError::Validation(validation) => validation.to_string(),
        }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            ApiClientError::Server { status, .. } | ApiClientError::Fault { status, .. } => {
                Some(*status)
            }
            _ => None,
        }
    }
}
