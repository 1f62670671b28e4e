use std::error::Error;
use std::io;
use std::time::Duration;

use http::StatusCode;
use thiserror::Error;

/// Error type returned by request handlers, filters and the method router.
pub type HandlerError = Box<dyn Error + Send + Sync>;

/// Registration time errors. Any of them means the route table is misconfigured,
/// so they are meant to abort startup rather than being handled.
#[derive(Debug, Error)]
pub enum RouteError {
    #[error("invalid route pattern '{pattern}': {reason}")]
    InvalidPattern { pattern: String, reason: String },

    #[error("route '{pattern}' does not belong to hub '{base_pattern}'")]
    RouteConflict { pattern: String, base_pattern: String },

    #[error("hub '{base_pattern}' already registered")]
    DuplicateHub { base_pattern: String },
}

impl RouteError {
    pub fn invalid_pattern<S: ToString>(pattern: &str, reason: S) -> Self {
        Self::InvalidPattern { pattern: pattern.to_owned(), reason: reason.to_string() }
    }

    pub fn route_conflict(pattern: &str, base_pattern: &str) -> Self {
        Self::RouteConflict { pattern: pattern.to_owned(), base_pattern: base_pattern.to_owned() }
    }

    pub fn duplicate_hub(base_pattern: &str) -> Self {
        Self::DuplicateHub { base_pattern: base_pattern.to_owned() }
    }
}

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("bind {addr} error: {source}")]
    Bind { addr: String, source: io::Error },

    #[error("request error: {source}")]
    Parse {
        #[from]
        source: ParseError,
    },

    #[error("io error: {source}")]
    Io {
        #[from]
        source: io::Error,
    },

    #[error("{stage} timed out after {timeout:?}")]
    Timeout { stage: &'static str, timeout: Duration },
}

impl ServerError {
    pub fn timeout(stage: &'static str, timeout: Duration) -> Self {
        Self::Timeout { stage, timeout }
    }
}

/// Errors raised while decoding a request from the wire.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("header size too large, current: {current_size} exceed the limit {max_size}")]
    TooLargeHeader { current_size: usize, max_size: usize },

    #[error("body size too large, content-length: {current_size} exceed the limit {max_size}")]
    TooLargeBody { current_size: usize, max_size: usize },

    #[error("header number exceed the limit {max_num}")]
    TooManyHeaders { max_num: usize },

    #[error("invalid header: {reason}")]
    InvalidHeader { reason: String },

    #[error("invalid http version: {0:?}")]
    InvalidVersion(Option<u8>),

    #[error("invalid content-length header: {reason}")]
    InvalidContentLength { reason: String },

    #[error("transfer-encoding is not supported, a content-length is required")]
    LengthRequired,

    #[error("invalid body: {reason}")]
    InvalidBody { reason: String },

    #[error("io error: {source}")]
    Io {
        #[from]
        source: io::Error,
    },
}

impl ParseError {
    pub fn too_large_header(current_size: usize, max_size: usize) -> Self {
        Self::TooLargeHeader { current_size, max_size }
    }

    pub fn too_large_body(current_size: usize, max_size: usize) -> Self {
        Self::TooLargeBody { current_size, max_size }
    }

    pub fn too_many_headers(max_num: usize) -> Self {
        Self::TooManyHeaders { max_num }
    }

    pub fn invalid_header<S: ToString>(str: S) -> Self {
        Self::InvalidHeader { reason: str.to_string() }
    }

    pub fn invalid_content_length<S: ToString>(str: S) -> Self {
        Self::InvalidContentLength { reason: str.to_string() }
    }

    pub fn invalid_body<S: ToString>(str: S) -> Self {
        Self::InvalidBody { reason: str.to_string() }
    }

    /// The status code sent back to the client before the connection is dropped.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::TooLargeHeader { .. } | Self::TooManyHeaders { .. } => StatusCode::REQUEST_HEADER_FIELDS_TOO_LARGE,
            Self::TooLargeBody { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            Self::InvalidVersion(_) => StatusCode::HTTP_VERSION_NOT_SUPPORTED,
            Self::LengthRequired => StatusCode::LENGTH_REQUIRED,
            _ => StatusCode::BAD_REQUEST,
        }
    }
}
