//! Configuration for the gateway credential tools.
//!
//! Config is read from `stunner.{toml,yaml,yml,json}`, with `${ENV}`
//! placeholders substituted before parsing and `STUNNER_*` overrides
//! applied afterwards.

pub mod env_subst;
pub mod loader;
pub mod schema;

pub use {
    loader::{config_dir, discover_and_load, load_config, resolve_config},
    schema::{
        DEFAULT_DISPLAY_NAME, DEFAULT_JOIN_USER_AGENT, DEFAULT_RECEIVE_TIMEOUT_SECS, GatewayConfig,
        GuestConfig, StunnerConfig, UpdatesConfig,
    },
};
