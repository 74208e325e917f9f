use std::path::PathBuf;

use {clap::Args, stunner_config::StunnerConfig};

/// Which gateway to talk to and which conference to ask for.
#[derive(Args, Debug, Clone)]
pub struct TargetArgs {
    /// Gateway origin including scheme, e.g. `https://expressway.example.com`.
    #[arg(long)]
    pub domain: String,

    /// Numeric conference identifier to look up.
    #[arg(long = "telephonenumber")]
    pub telephonenumber: String,
}

#[derive(Args, Debug, Clone)]
pub struct CommonArgs {
    /// Config file (TOML, YAML or JSON). Standard locations are searched when unset.
    #[arg(long, env = "STUNNER_CONFIG")]
    pub config: Option<PathBuf>,

    /// Forward proxy for HTTP calls; overrides the config file.
    #[arg(long, env = "STUNNER_PROXY")]
    pub proxy: Option<String>,

    /// Log level (trace, debug, info, warn, error). `RUST_LOG` takes precedence.
    #[arg(long, default_value = "warn")]
    pub log_level: String,

    /// Output logs as JSON instead of human-readable.
    #[arg(long, default_value_t = false)]
    pub json_logs: bool,
}

impl CommonArgs {
    /// Effective config: file (explicit or discovered), env overrides, then flags.
    pub fn load_config(&self) -> anyhow::Result<StunnerConfig> {
        let mut config = stunner_config::resolve_config(self.config.as_deref())?;
        if let Some(proxy) = self.proxy.as_deref().filter(|p| !p.is_empty()) {
            config.gateway.proxy = Some(proxy.to_owned());
        }
        Ok(config)
    }
}
