use crate::features::transport::repo::TransportError;
use flymachines_core::State;
use std::collections::HashMap;
use std::fmt;
use thiserror::Error;

/// Header carrying the remote request id on every response.
pub const REQUEST_ID_HEADER: &str = "fly-request-id";

/// Errors returned by every client operation.
///
/// Variants fall into three groups: local validation (raised before any
/// request is sent), remote API rejections, and transport or cancellation
/// failures which are passed through unchanged.
#[derive(Debug, Error)]
pub enum MachinesError {
    #[error("app name is required")]
    AppNameRequired,
    #[error("api token is required")]
    AuthRequired,
    #[error("machine id is required")]
    MachineIdRequired,
    #[error("lease nonce is required")]
    NonceRequired,
    #[error("state must be one of started/stopped/destroyed, got {0}")]
    InvalidWaitState(State),
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
    #[error(transparent)]
    Api(#[from] ApiError),
    #[error("failed to decode response body: {0}")]
    Decode(#[source] serde_json::Error),
    #[error("failed to encode request body: {0}")]
    Encode(#[source] serde_json::Error),
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error("request cancelled")]
    Cancelled,
    #[error("request deadline exceeded")]
    DeadlineExceeded,
}

impl MachinesError {
    pub fn api_error(&self) -> Option<&ApiError> {
        match self {
            MachinesError::Api(err) => Some(err),
            _ => None,
        }
    }

    pub fn status_code(&self) -> Option<u16> {
        self.api_error().map(ApiError::status_code)
    }

    pub fn is_not_found(&self) -> bool {
        self.status_code() == Some(404)
    }

    /// True for errors raised locally before any request was sent.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            MachinesError::AppNameRequired
                | MachinesError::AuthRequired
                | MachinesError::MachineIdRequired
                | MachinesError::NonceRequired
                | MachinesError::InvalidWaitState(_)
                | MachinesError::InvalidRequest(_)
        )
    }

    pub fn is_cancellation(&self) -> bool {
        matches!(
            self,
            MachinesError::Cancelled | MachinesError::DeadlineExceeded
        )
    }
}

pub type MachinesResult<T> = std::result::Result<T, MachinesError>;

/// A non-2xx response from the API.
///
/// Built once per failed call and never mutated. Every response header is
/// kept so trace and request ids survive without the classifier knowing them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiError {
    status_code: u16,
    error_message: String,
    headers: HashMap<String, Vec<String>>,
    raw_body: Vec<u8>,
}

impl ApiError {
    pub(crate) fn new(
        status_code: u16,
        error_message: String,
        headers: HashMap<String, Vec<String>>,
        raw_body: Vec<u8>,
    ) -> Self {
        Self {
            status_code,
            error_message,
            headers,
            raw_body,
        }
    }

    pub fn status_code(&self) -> u16 {
        self.status_code
    }

    /// Message from the `error` key of a JSON body. Empty for any other body.
    pub fn error_message(&self) -> &str {
        &self.error_message
    }

    pub fn headers(&self) -> &HashMap<String, Vec<String>> {
        &self.headers
    }

    /// First value of the named header. Exact key match wins; otherwise the
    /// lookup falls back to an ASCII case-insensitive comparison.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(name)
            .or_else(|| {
                self.headers
                    .iter()
                    .find(|(key, _)| key.eq_ignore_ascii_case(name))
                    .map(|(_, values)| values)
            })
            .and_then(|values| values.first())
            .map(String::as_str)
    }

    pub fn request_id(&self) -> Option<&str> {
        self.header(REQUEST_ID_HEADER)
    }

    pub fn raw_body(&self) -> &[u8] {
        &self.raw_body
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.error_message.is_empty() {
            write!(f, "request failed with status {}", self.status_code)
        } else {
            f.write_str(&self.error_message)
        }
    }
}

impl std::error::Error for ApiError {}
