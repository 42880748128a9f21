//! Sync command - push new action items from recent meeting notes
//!
//! - Reads open items and every known fingerprint from Notion
//! - Loads notes dated within the lookback window
//! - Asks the model for items and creates only unseen ones

use std::path::PathBuf;
use std::sync::Arc;

use action_sync::{
    DirectoryNoteSource, SyncConfig, SyncEngine, SyncReport, create_anthropic_extractor,
    create_notion_store
};
use anyhow::{Context, Result};
use chrono::Local;
use clap::Args;
use colored::Colorize;

use crate::output;

#[derive(Args)]
pub struct SyncArgs {
    /// Days before today to include (0 = today only)
    #[arg(long, short = 'd')]
    pub lookback_days: Option<u32>,

    /// Show what would be pushed without writing to Notion
    #[arg(long)]
    pub dry_run: bool,

    /// Output the run report as JSON
    #[arg(long)]
    pub json: bool,

    /// Config file (defaults to ~/.config/actionsync/config.toml when present)
    #[arg(long, short = 'c', env = "ACTIONSYNC_CONFIG")]
    pub config: Option<PathBuf>
}

pub async fn run(args: SyncArgs) -> Result<()> {
    let config = load_config(&args)?;

    let store = create_notion_store(config.store.clone(), config.retry.clone())?;
    let notes = Arc::new(DirectoryNoteSource::from_config(&config.notes));
    let extractor = create_anthropic_extractor(config.extraction.clone())?;
    let engine = SyncEngine::new(config.clone(), store, notes, extractor);

    if !args.json {
        output::header(&format!(
            "Meeting notes → Notion sync - {}",
            Local::now().format("%A, %B %d, %Y %I:%M %p")
        ));
        println!();
        println!(
            "  {} {}",
            "Notes:".dimmed(),
            config.notes.directory.display().to_string().cyan()
        );
        println!(
            "  {} today and {} day(s) before",
            "Window:".dimmed(),
            config.notes.lookback_days.to_string().cyan()
        );
        println!();
    }

    let report = engine.run().await.context("sync aborted")?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report);
    }

    Ok(())
}

fn load_config(args: &SyncArgs) -> Result<SyncConfig> {
    let mut config = SyncConfig::load(args.config.as_deref()).context("loading configuration")?;
    if let Some(days) = args.lookback_days {
        config.notes.lookback_days = days;
    }
    if args.dry_run {
        config.dry_run = true;
    }
    config.validate()?;
    Ok(config)
}

fn print_report(report: &SyncReport) {
    println!(
        "  {} {} open item(s), {} tracked in total",
        "Store:".dimmed(),
        report.open_items,
        report.known_fingerprints
    );

    if report.no_notes {
        println!("  {} no meeting notes in the window", "Notes:".dimmed());
        println!();
        output::success("Nothing to do");
        return;
    }

    println!(
        "  {} {} document(s), {} candidate item(s)",
        "Notes:".dimmed(),
        report.notes_found,
        report.candidates
    );
    for warning in &report.warnings {
        output::warn(&format!("extraction: {}", warning));
    }
    println!();

    if !report.pushed_items.is_empty() {
        if report.dry_run {
            output::subheader("Would push:");
        } else {
            output::subheader("Pushed:");
        }
        for item in &report.pushed_items {
            println!(
                "  {} {} {}",
                "+".green(),
                item.fingerprint.to_string().dimmed(),
                item.description
            );
        }
        println!();
    }

    for failure in &report.errors {
        println!(
            "  {} {} {} ({})",
            "✗".red(),
            failure.fingerprint.to_string().dimmed(),
            failure.description,
            failure.error.red()
        );
    }

    let verb = if report.dry_run { "Would push" } else { "Pushed" };
    let summary = format!(
        "{} {} new item(s). Skipped {} duplicate(s).",
        verb, report.pushed, report.skipped
    );
    if report.has_errors() {
        println!("{} {} {} item(s) failed.", "!".yellow().bold(), summary, report.failed);
        output::warn("some items were not written; they will be retried on the next run");
    } else {
        output::success(&summary);
    }
    if report.dry_run {
        output::hint("Remove --dry-run to write to Notion");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use action_sync::Fingerprint;
    use action_sync::sync::PushedItem;

    #[test]
    fn test_print_report_does_not_panic() {
        let mut report = SyncReport::new();
        report.notes_found = 1;
        report.candidates = 2;
        report.pushed = 1;
        report.skipped = 1;
        report.pushed_items.push(PushedItem {
            fingerprint: Fingerprint::of("Book flight for offsite"),
            description: "Book flight for offsite".to_string(),
            store_id: Some("page".to_string())
        });
        print_report(&report);

        report.dry_run = true;
        print_report(&report);
    }

    #[test]
    fn test_print_no_notes_report_does_not_panic() {
        let mut report = SyncReport::new();
        report.no_notes = true;
        print_report(&report);
    }
}
