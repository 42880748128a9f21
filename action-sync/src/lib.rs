//! Idempotent sync of meeting-note action items into a task database.
//!
//! Notes are read from disk, a language model proposes action items, and
//! only items whose fingerprint the store has never seen are written.

pub mod config;
pub mod error;
pub mod extraction;
pub mod fingerprint;
pub mod item;
pub mod notes;
pub mod notion;
pub mod sync;

pub use config::SyncConfig;
pub use error::{SyncError, SyncResult};
pub use extraction::{Extraction, Extractor, LlmExtractor, create_anthropic_extractor};
pub use fingerprint::Fingerprint;
pub use item::{CandidateItem, Category, NewItem, Priority, StoredItem};
pub use notes::{DirectoryNoteSource, NoteCorpus, NoteSource};
pub use notion::{ItemStore, NotionStore, create_notion_store};
pub use sync::{SyncEngine, SyncReport};
