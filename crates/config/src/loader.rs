use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::{env_subst::substitute_env, schema::StunnerConfig};

/// Standard config file names, checked in order.
const CONFIG_FILENAMES: &[&str] = &[
    "stunner.toml",
    "stunner.yaml",
    "stunner.yml",
    "stunner.json",
];

/// Load config from the given path (any supported format).
pub fn load_config(path: &Path) -> anyhow::Result<StunnerConfig> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("failed to read {}: {e}", path.display()))?;
    let raw = substitute_env(&raw);
    parse_config(&raw, path)
}

/// Resolve the effective config for one run.
///
/// An explicit path must load cleanly. Without one, the standard locations
/// are searched and a broken file falls back to defaults. Environment
/// overrides are applied last in both cases, then zero timeouts are replaced.
pub fn resolve_config(explicit: Option<&Path>) -> anyhow::Result<StunnerConfig> {
    let mut config = match explicit {
        Some(path) => {
            debug!(path = %path.display(), "loading explicit config");
            load_config(path)?
        },
        None => discover_and_load(),
    };
    config.apply_env_overrides();
    config.sanitize();
    Ok(config)
}

/// Discover and load config from standard locations.
///
/// Search order:
/// 1. `./stunner.{toml,yaml,yml,json}` (project-local)
/// 2. `~/.config/stunner/stunner.{toml,yaml,yml,json}` (user-global)
///
/// Returns `StunnerConfig::default()` if no usable config file is found.
pub fn discover_and_load() -> StunnerConfig {
    let Some(path) = find_config_file(&search_dirs()) else {
        debug!("no config file found, using defaults");
        return StunnerConfig::default();
    };
    debug!(path = %path.display(), "loading config");
    match load_config(&path) {
        Ok(cfg) => cfg,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "failed to load config, using defaults");
            StunnerConfig::default()
        },
    }
}

fn search_dirs() -> Vec<PathBuf> {
    let mut dirs = vec![PathBuf::from(".")];
    if let Some(dir) = config_dir() {
        dirs.push(dir);
    }
    dirs
}

/// Find the first config file in `dirs`, trying every file name per directory.
fn find_config_file(dirs: &[PathBuf]) -> Option<PathBuf> {
    dirs.iter()
        .flat_map(|dir| CONFIG_FILENAMES.iter().map(move |name| dir.join(name)))
        .find(|p| p.exists())
}

/// Returns the user config directory: `~/.config/stunner/` on all platforms.
pub fn config_dir() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|d| d.home_dir().join(".config").join("stunner"))
}

fn parse_config(raw: &str, path: &Path) -> anyhow::Result<StunnerConfig> {
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("toml");

    match ext {
        "toml" => Ok(toml::from_str(raw)?),
        "yaml" | "yml" => Ok(serde_yaml::from_str(raw)?),
        "json" => Ok(serde_json::from_str(raw)?),
        _ => anyhow::bail!("unsupported config format: .{ext}"),
    }
}
