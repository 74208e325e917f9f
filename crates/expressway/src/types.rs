//! Request bodies and response helpers for the gateway's guest-join API.
//!
//! Field names are the gateway's and must match exactly.

use std::fmt;

use {
    secrecy::{ExposeSecret, SecretString},
    serde::Serialize,
    serde_json::Value,
};

use crate::error::{FlowError, FlowResult};

/// Cookie carrying the anti-forgery token.
pub const XSRF_COOKIE: &str = "CMA-XSRF-TOKEN";

/// Header that echoes [`XSRF_COOKIE`] back on every request.
pub const CSRF_HEADER: &str = "CSRF-Token";

/// Body of a POST whose content may or may not be JSON.
#[derive(Debug, Clone, PartialEq)]
pub enum ResponseBody {
    Json(Value),
    Text(String),
}

impl ResponseBody {
    pub fn parse(raw: String) -> Self {
        match serde_json::from_str(&raw) {
            Ok(value) => Self::Json(value),
            Err(_) => Self::Text(raw),
        }
    }

    /// Look up a top-level key. Text bodies have no fields.
    pub fn field(&self, name: &str) -> Option<&Value> {
        match self {
            Self::Json(value) => value.get(name),
            Self::Text(_) => None,
        }
    }

    /// Like [`field`](Self::field) but a missing key is a hard stop carrying
    /// the whole response.
    pub fn require(&self, name: &'static str) -> FlowResult<&Value> {
        self.field(name)
            .ok_or_else(|| FlowError::missing(name, self))
    }

    /// A field that must be present and hold a string.
    pub fn require_str(&self, name: &'static str) -> FlowResult<&str> {
        self.require(name)?
            .as_str()
            .ok_or_else(|| FlowError::missing(name, self))
    }
}

impl fmt::Display for ResponseBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Json(value) => write!(f, "{value}"),
            Self::Text(text) => f.write_str(text),
        }
    }
}

/// Username and password issued by guest registration.
pub struct GuestCredentials {
    pub username: String,
    pub password: SecretString,
}

impl fmt::Debug for GuestCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GuestCredentials")
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .finish()
    }
}

// ── Legacy API (/api/v1) ───────────────────────────────────────────────────

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchGuestConference<'a> {
    pub numeric_id: &'a str,
    pub secret: Option<&'a str>,
    pub passcode: Option<&'a str>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GuestRegister<'a> {
    pub numeric_id: &'a str,
    pub secret: Option<&'a str>,
    pub passcode: Option<&'a str>,
    pub display_name: &'a str,
    /// Passed through exactly as the search step returned it.
    pub token: &'a Value,
}

#[derive(Serialize)]
pub struct Login<'a> {
    pub username: &'a str,
    pub password: &'a str,
}

impl<'a> Login<'a> {
    pub fn from_credentials(credentials: &'a GuestCredentials) -> Self {
        Self {
            username: &credentials.username,
            password: credentials.password.expose_secret(),
        }
    }
}

#[derive(Debug, Default, Serialize)]
pub struct CreateStream {
    pub subscriptions: Vec<Value>,
}

// ── Current API (/api) ─────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Lookup<'a> {
    pub numeric_id: &'a str,
    pub passcode: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Join<'a> {
    pub numeric_id: &'a str,
    pub passcode: &'a str,
    /// The gateway expects the string `"false"`, not a boolean.
    pub trace: &'a str,
    pub display_name: &'a str,
    pub user_agent: &'a str,
}
