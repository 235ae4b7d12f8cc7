//! Kubepilot CLI defaults stored at `~/.kubepilot/config.json`.
//!
//! The file is optional and only read, never written. Every field is a
//! fallback for a command line flag.
//!
//! The kubeconfig resolution chain (highest priority first):
//! 1. Explicit `--kubeconfig` flag or `KUBEPILOT_KUBECONFIG`
//! 2. `KUBECONFIG` environment variable
//! 3. `kubeconfig` from `~/.kubepilot/config.json`
//! 4. Fall back to kube defaults (`~/.kube/config` or in-cluster)

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

const CONFIG_DIR_NAME: &str = ".kubepilot";
const CONFIG_FILE_NAME: &str = "config.json";
const KUBECONFIG_ENV: &str = "KUBECONFIG";

/// Persistent CLI defaults.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct KubepilotConfig {
    /// Namespace used when `--namespace` is not given.
    pub namespace: Option<String>,
    /// Kubeconfig context used when `--context` is not given.
    pub context: Option<String>,
    /// Kubeconfig path used when neither flag nor environment names one.
    pub kubeconfig: Option<String>,
}

/// Path to `~/.kubepilot/config.json`.
pub fn config_path() -> Result<PathBuf> {
    let home = dirs::home_dir().ok_or(Error::NoHomeDir)?;
    Ok(home.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME))
}

/// Load config from `~/.kubepilot/config.json`, returning default if missing.
pub fn load_config() -> Result<KubepilotConfig> {
    load_config_from(&config_path()?)
}

/// Load config from `path`, returning default if missing.
pub fn load_config_from(path: &Path) -> Result<KubepilotConfig> {
    if !path.exists() {
        return Ok(KubepilotConfig::default());
    }
    let data = std::fs::read_to_string(path)
        .map_err(|e| Error::config(path, format!("could not read: {}", e)))?;
    serde_json::from_str(&data).map_err(|e| Error::config(path, e.to_string()))
}

/// Resolve a kubeconfig path using the priority chain.
///
/// Returns `None` to let kube pick its defaults.
pub fn resolve_kubeconfig(explicit: Option<&str>, config: &KubepilotConfig) -> Option<PathBuf> {
    let from_env = std::env::var(KUBECONFIG_ENV).ok();
    resolve_kubeconfig_with(explicit, from_env.as_deref(), config)
}

fn resolve_kubeconfig_with(
    explicit: Option<&str>,
    env: Option<&str>,
    config: &KubepilotConfig,
) -> Option<PathBuf> {
    [explicit, env, config.kubeconfig.as_deref()]
        .into_iter()
        .flatten()
        .find(|p| !p.is_empty())
        .map(PathBuf::from)
}
