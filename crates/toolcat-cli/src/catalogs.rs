//! Catalog selection shared by the commands.

use std::{fmt, sync::Arc};

use anyhow::{Context, Result};
use clap::ValueEnum;
use console::style;
use toolcat_core::{Catalog, Config};
use toolcat_graph::{
    GraphClient,
    auth::{DeviceCodeInfo, DevicePrompt},
};
use toolcat_tools::{InteractClient, directory_catalog, interact_catalog, lights_catalog};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum CatalogKind {
    /// Simulated room light
    Lights,
    /// REST backend at `backend.base_url`
    #[default]
    Interact,
    /// Microsoft Graph, in-process
    Directory,
}

impl fmt::Display for CatalogKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Lights => "lights",
            Self::Interact => "interact",
            Self::Directory => "directory",
        })
    }
}

pub fn build(kind: CatalogKind, config: &Config) -> Result<Catalog> {
    let policy = config.dispatch.policy();
    let catalog = match kind {
        CatalogKind::Lights => lights_catalog(policy)?,
        CatalogKind::Interact => {
            let client = InteractClient::from_config(&config.backend)
                .context("failed to create backend client")?;
            interact_catalog(client, policy)?
        }
        CatalogKind::Directory => {
            directory_catalog(graph_client(config)?, config.graph.mode, policy)?
        }
    };
    Ok(catalog)
}

/// Graph client for the configured auth mode. Device-code sign-in
/// instructions go to stderr.
pub fn graph_client(config: &Config) -> Result<GraphClient> {
    config.graph.validate().context("invalid graph config")?;
    GraphClient::from_config(&config.graph, Some(device_prompt()))
        .context("failed to create Microsoft Graph client")
}

fn device_prompt() -> DevicePrompt {
    Arc::new(|info: &DeviceCodeInfo| {
        eprintln!("{} {}", style("→").cyan(), info.message);
    })
}
