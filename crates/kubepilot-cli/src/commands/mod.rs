//! CLI commands

use clap::ValueEnum;
use kube::Client;
use kubepilot_common::kube_utils::{create_client, ClientOptions};
use tracing::debug;

use crate::config::{resolve_kubeconfig, KubepilotConfig};
use crate::{GlobalArgs, Result};

pub mod rollout;

/// Output format
#[derive(Clone, Copy, Debug, Default, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text (default)
    #[default]
    Text,
    /// JSON
    Json,
}

/// Connect to the cluster selected by flags, environment and config file
pub async fn connect(global: &GlobalArgs, config: &KubepilotConfig) -> Result<Client> {
    let options = ClientOptions {
        kubeconfig: resolve_kubeconfig(global.kubeconfig.as_deref(), config),
        context: global.context.clone().or_else(|| config.context.clone()),
        ..Default::default()
    };
    debug!(kubeconfig = ?options.kubeconfig, context = ?options.context, "connecting");
    Ok(create_client(&options).await?)
}

/// Namespace from the flag, then the config file, then the kubeconfig
pub fn resolve_namespace(global: &GlobalArgs, config: &KubepilotConfig, client: &Client) -> String {
    pick_namespace(
        global.namespace.as_deref(),
        config.namespace.as_deref(),
        client.default_namespace(),
    )
}

fn pick_namespace(flag: Option<&str>, file: Option<&str>, kube_default: &str) -> String {
    flag.or(file)
        .filter(|ns| !ns.is_empty())
        .unwrap_or(kube_default)
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(Some("flag"), Some("file"), "flag")]
    #[case(None, Some("file"), "file")]
    #[case(None, None, "default")]
    #[case(Some(""), None, "default")]
    fn namespace_precedence(
        #[case] flag: Option<&str>,
        #[case] file: Option<&str>,
        #[case] expected: &str,
    ) {
        assert_eq!(pick_namespace(flag, file, "default"), expected);
    }
}
