use std::time::Duration;

use {
    serde_json::Value,
    thiserror::Error,
    tokio_tungstenite::tungstenite::{self, http::header::InvalidHeaderValue},
};

/// The gateway rejected the request or left out an expected field.
pub const EXIT_REJECTED: u8 = 1;
/// Bad command line, origin, proxy or config file.
pub const EXIT_CONFIG: u8 = 2;
/// Connection, TLS, HTTP or WebSocket failure, including the receive timeout.
pub const EXIT_TRANSPORT: u8 = 3;

pub type FlowResult<T> = Result<T, FlowError>;

/// Everything that can stop a negotiation. Each variant maps to exactly one
/// process exit code through [`FlowError::exit_code`].
#[derive(Debug, Error)]
pub enum FlowError {
    #[error("invalid gateway origin `{origin}`: {reason}")]
    InvalidOrigin { origin: String, reason: String },

    #[error("invalid proxy `{proxy}`: {source}")]
    InvalidProxy {
        proxy: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("HTTP transport failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("WebSocket failed: {0}")]
    WebSocket(#[from] tungstenite::Error),

    #[error("TLS setup failed: {0}")]
    Tls(#[from] rustls::Error),

    #[error("no update received within {0:?}")]
    Timeout(Duration),

    #[error("update stream closed before any data frame")]
    StreamClosed,

    #[error("gateway sent a value that is not a valid header: {0}")]
    InvalidHeader(#[from] InvalidHeaderValue),

    #[error("response is missing `{field}`")]
    MissingField {
        field: &'static str,
        /// The full response, printed for the operator.
        response: String,
    },

    #[error("cookie `{name}` was not set by the gateway")]
    MissingCookie { name: &'static str },

    #[error("login was not accepted (result: {result})")]
    LoginRejected { result: Value },

    #[error("invalid telephone number (lookup returned HTTP 400)")]
    InvalidNumber { body: String },
}

impl FlowError {
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::InvalidOrigin { .. } | Self::InvalidProxy { .. } => EXIT_CONFIG,
            Self::Transport(_)
            | Self::WebSocket(_)
            | Self::Tls(_)
            | Self::Timeout(_)
            | Self::StreamClosed => EXIT_TRANSPORT,
            Self::InvalidHeader(_)
            | Self::MissingField { .. }
            | Self::MissingCookie { .. }
            | Self::LoginRejected { .. }
            | Self::InvalidNumber { .. } => EXIT_REJECTED,
        }
    }

    /// A failed login ends the run without any diagnostic at the default
    /// log level.
    pub fn is_silent(&self) -> bool {
        matches!(self, Self::LoginRejected { .. })
    }

    pub(crate) fn missing(field: &'static str, response: impl ToString) -> Self {
        Self::MissingField {
            field,
            response: response.to_string(),
        }
    }
}
