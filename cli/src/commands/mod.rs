pub mod completion;
pub mod fingerprint;
pub mod setup;
pub mod sync;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "actionsync",
    author,
    version,
    about = "actionsync - push new meeting action items into Notion",
    long_about = "Reads recent meeting notes, asks a language model for action items, and \
                  creates only the ones Notion has never seen.\n\nRe-running is safe: items \
                  already tracked, open or checked off, are never created again."
)]
pub struct Cli {
    /// Log progress (RUST_LOG overrides)
    #[arg(long, short, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands
}

#[derive(Subcommand)]
pub enum Commands {
    #[command(about = "Extract new action items from recent notes and push them")]
    Sync(sync::SyncArgs),

    #[command(about = "Create or update the Notion database properties")]
    Setup(setup::SetupArgs),

    #[command(about = "Print the fingerprint used to deduplicate a description")]
    Fingerprint(fingerprint::FingerprintArgs),

    #[command(about = "Generate shell completions")]
    Completion(completion::CompletionArgs)
}
