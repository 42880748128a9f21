use std::path::PathBuf;

use action_sync::{NotionStore, SyncConfig};
use anyhow::{Context, Result};
use clap::Args;

use crate::output;

#[derive(Args)]
pub struct SetupArgs {
    /// Config file (defaults to ~/.config/actionsync/config.toml when present)
    #[arg(long, short = 'c', env = "ACTIONSYNC_CONFIG")]
    pub config: Option<PathBuf>
}

pub async fn run(args: SetupArgs) -> Result<()> {
    let config = SyncConfig::load(args.config.as_deref()).context("loading configuration")?;
    config.validate_store()?;

    let store = NotionStore::new(config.store.clone(), config.retry.clone())?;
    store
        .configure_schema()
        .await
        .context("updating Notion database properties")?;

    output::success(&format!(
        "Database {} configured (completion checkbox: \"{}\")",
        config.store.database_id, config.store.completion_property
    ));
    output::hint("Run `actionsync sync` to push action items");
    Ok(())
}
