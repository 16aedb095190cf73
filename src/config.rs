use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::{Deserialize, Serialize};

#[cfg(unix)]
use std::os::unix::fs::PermissionsExt;

pub const DEFAULT_API_URL: &str = "http://localhost:8000";

/// Persistent settings stored in `~/.config/finboard-cli/config.json`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_size: Option<usize>,
}

pub fn config_path() -> PathBuf {
    let home = std::env::var_os("HOME").unwrap_or_default();
    let mut p = PathBuf::from(home);
    p.push(".config");
    p.push("finboard-cli");
    p.push("config.json");
    p
}

/// A missing file is not an error; it just means nothing has been configured yet.
pub fn load_config(path: &Path) -> anyhow::Result<Config> {
    if !path.exists() {
        return Ok(Config::default());
    }
    let s = fs::read_to_string(path)
        .with_context(|| format!("failed to read config {}", path.display()))?;
    if s.trim().is_empty() {
        return Ok(Config::default());
    }
    serde_json::from_str(&s).with_context(|| format!("invalid config {}", path.display()))
}

pub fn save_config(path: &Path, config: &Config) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let mut f = fs::File::create(path)?;
    #[cfg(unix)]
    f.set_permissions(fs::Permissions::from_mode(0o600))?;
    f.write_all(serde_json::to_string_pretty(config)?.as_bytes())?;
    f.write_all(b"\n")?;
    Ok(())
}

/// Flag/env value wins over the config file, which wins over the built-in default.
pub fn resolve_api_url(flag: Option<&str>, config: &Config) -> String {
    flag.map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .or_else(|| config.api_url.clone())
        .unwrap_or_else(|| DEFAULT_API_URL.to_string())
}
