use crate::config::SyncConfig;
use crate::error::SyncResult;
use crate::extraction::Extractor;
use crate::fingerprint::Fingerprint;
use crate::item::{CandidateItem, NewItem};
use crate::notes::NoteSource;
use crate::notion::ItemStore;
use chrono::{DateTime, Local, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Turns meeting notes into new store records without ever writing a
/// fingerprint the store has already seen, open or completed.
pub struct SyncEngine {
    config: SyncConfig,
    store: Arc<dyn ItemStore>,
    notes: Arc<dyn NoteSource>,
    extractor: Arc<dyn Extractor>
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SyncReport {
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub run_date: Option<NaiveDate>,
    pub dry_run: bool,
    pub open_items: u32,
    pub known_fingerprints: u32,
    pub notes_found: u32,
    pub no_notes: bool,
    pub candidates: u32,
    pub pushed: u32,
    pub skipped: u32,
    pub blank: u32,
    pub failed: u32,
    pub pushed_items: Vec<PushedItem>,
    pub errors: Vec<ItemFailure>,
    pub warnings: Vec<String>
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PushedItem {
    pub fingerprint: Fingerprint,
    pub description: String,
    pub store_id: Option<String>
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItemFailure {
    pub fingerprint: Fingerprint,
    pub description: String,
    pub error: String,
    pub timestamp: DateTime<Utc>
}

impl SyncReport {
    pub fn new() -> Self {
        Self {
            started_at: Utc::now(),
            ..Default::default()
        }
    }

    pub fn complete(&mut self) {
        self.completed_at = Some(Utc::now());
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn add_error(&mut self, item: &NewItem, error: impl ToString) {
        self.failed += 1;
        self.errors.push(ItemFailure {
            fingerprint: item.fingerprint.clone(),
            description: item.description.clone(),
            error: error.to_string(),
            timestamp: Utc::now()
        });
    }
}

impl SyncEngine {
    pub fn new(
        config: SyncConfig,
        store: Arc<dyn ItemStore>,
        notes: Arc<dyn NoteSource>,
        extractor: Arc<dyn Extractor>
    ) -> Self {
        Self {
            config,
            store,
            notes,
            extractor
        }
    }

    pub async fn run(&self) -> SyncResult<SyncReport> {
        self.run_for(Local::now().date_naive()).await
    }

    /// One full pass for `today`. Setup failures (store reads, note access,
    /// extraction transport) abort before anything is written.
    pub async fn run_for(&self, today: NaiveDate) -> SyncResult<SyncReport> {
        let mut report = SyncReport::new();
        report.run_date = Some(today);
        report.dry_run = self.config.dry_run;
        info!(date = %today, dry_run = self.config.dry_run, "Starting action item sync");

        let open_items = self.store.list_open().await?;
        report.open_items = open_items.len() as u32;
        info!(count = open_items.len(), "Fetched open items from store");

        let mut known = self.store.list_all_fingerprints().await?;
        report.known_fingerprints = known.len() as u32;
        info!(count = known.len(), "Fetched known fingerprints from store");

        let corpus = self.notes.load(today, self.config.notes.lookback_days)?;
        report.notes_found = corpus.len() as u32;
        if corpus.is_empty() {
            info!(lookback_days = self.config.notes.lookback_days, "No meeting notes in window");
            report.no_notes = true;
            report.complete();
            return Ok(report);
        }
        info!(count = corpus.len(), "Loaded meeting notes");

        let open_descriptions: Vec<String> =
            open_items.into_iter().map(|item| item.description).collect();
        let extraction = self
            .extractor
            .extract(&corpus.render(), &open_descriptions, today)
            .await?;
        if let Some(warning) = extraction.warning {
            report.warnings.push(warning);
        }
        report.candidates = extraction.candidates.len() as u32;
        info!(count = extraction.candidates.len(), "Extracted candidate items");

        self.commit_candidates(&extraction.candidates, &mut known, today, &mut report)
            .await;

        report.complete();
        info!(
            pushed = report.pushed,
            skipped = report.skipped,
            blank = report.blank,
            failed = report.failed,
            "Sync completed"
        );

        Ok(report)
    }

    /// Writes every candidate whose fingerprint is not in `known`, in order.
    /// Fingerprints join `known` as soon as they are written so the same
    /// batch cannot repeat them. A failed write is recorded and skipped.
    async fn commit_candidates(
        &self,
        candidates: &[CandidateItem],
        known: &mut HashSet<Fingerprint>,
        today: NaiveDate,
        report: &mut SyncReport
    ) {
        for candidate in candidates {
            let description = candidate.description.trim();
            if description.is_empty() {
                report.blank += 1;
                continue;
            }

            let fingerprint = Fingerprint::of(description);
            if known.contains(&fingerprint) {
                report.skipped += 1;
                debug!(fingerprint = %fingerprint, description, "Skipping known item");
                continue;
            }

            let item = NewItem::from_candidate(candidate, description, fingerprint, today);

            let store_id = if self.config.dry_run {
                None
            } else {
                match self.store.create(&item).await {
                    Ok(id) => Some(id),
                    Err(e) => {
                        warn!(fingerprint = %item.fingerprint, error = %e, "Failed to push item");
                        report.add_error(&item, &e);
                        continue;
                    }
                }
            };

            debug!(fingerprint = %item.fingerprint, description, "Pushed new item");
            report.pushed += 1;
            known.insert(item.fingerprint.clone());
            report.pushed_items.push(PushedItem {
                fingerprint: item.fingerprint,
                description: item.description,
                store_id
            });
        }
    }
}
