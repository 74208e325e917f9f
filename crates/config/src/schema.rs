/// Config schema types (gateway client, guest identity, update stream).
use {
    serde::{Deserialize, Serialize},
    tracing::warn,
};

/// Display name registered for the guest; the gateway accepts any glyph.
pub const DEFAULT_DISPLAY_NAME: &str = "⚠";

/// Value of `userAgent` in the join request body.
pub const DEFAULT_JOIN_USER_AGENT: &str = "stunner";

/// Root configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StunnerConfig {
    pub gateway: GatewayConfig,
    pub guest: GuestConfig,
    pub updates: UpdatesConfig,
}

/// HTTP client settings used for every call against the gateway.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    /// Forward proxy for all HTTP calls, e.g. `http://127.0.0.1:8080`.
    pub proxy: Option<String>,

    /// Skip certificate and hostname verification. Defaults to true since
    /// targets are usually lab appliances with self-signed certificates.
    pub accept_invalid_certs: bool,

    /// Overall per-request timeout. Unset means the client never times out.
    pub request_timeout_secs: Option<u64>,

    /// Override the HTTP `User-Agent` header.
    pub user_agent: Option<String>,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            proxy: None,
            accept_invalid_certs: true,
            request_timeout_secs: None,
            user_agent: None,
        }
    }
}

/// Identity presented when registering as a guest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GuestConfig {
    pub display_name: String,
    pub join_user_agent: String,
}

impl Default for GuestConfig {
    fn default() -> Self {
        Self {
            display_name: DEFAULT_DISPLAY_NAME.into(),
            join_user_agent: DEFAULT_JOIN_USER_AGENT.into(),
        }
    }
}

/// Settings for the legacy stream-updates WebSocket.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UpdatesConfig {
    pub receive_timeout_secs: u64,
}

/// Default wait for the first pushed update, in seconds.
pub const DEFAULT_RECEIVE_TIMEOUT_SECS: u64 = 2;

impl Default for UpdatesConfig {
    fn default() -> Self {
        Self {
            receive_timeout_secs: DEFAULT_RECEIVE_TIMEOUT_SECS,
        }
    }
}

impl StunnerConfig {
    /// Apply `STUNNER_*` environment overrides on top of file values.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Replace zero timeouts, which would fail every run instantly, with
    /// working values.
    pub fn sanitize(&mut self) {
        if self.updates.receive_timeout_secs == 0 {
            warn!(
                fallback = DEFAULT_RECEIVE_TIMEOUT_SECS,
                "updates.receive_timeout_secs = 0 would never wait for a frame, using default"
            );
            self.updates.receive_timeout_secs = DEFAULT_RECEIVE_TIMEOUT_SECS;
        }
        if self.gateway.request_timeout_secs == Some(0) {
            warn!("gateway.request_timeout_secs = 0 would fail every request, disabling the timeout");
            self.gateway.request_timeout_secs = None;
        }
    }

    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(proxy) = lookup("STUNNER_PROXY").filter(|p| !p.is_empty()) {
            self.gateway.proxy = Some(proxy);
        }
        if let Some(name) = lookup("STUNNER_DISPLAY_NAME").filter(|n| !n.is_empty()) {
            self.guest.display_name = name;
        }
        if let Some(flag) = lookup("STUNNER_ACCEPT_INVALID_CERTS").and_then(|v| parse_bool(&v)) {
            self.gateway.accept_invalid_certs = flag;
        }
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
