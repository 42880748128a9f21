use crate::fingerprint::Fingerprint;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Longest source-meeting label the store accepts in a rich text cell.
pub const MAX_SOURCE_CHARS: usize = 2000;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    #[default]
    Action,
    FollowUp,
    DecisionPending,
    WaitingOnOthers
}

impl Category {
    pub const ALL: [Category; 4] = [
        Category::Action,
        Category::FollowUp,
        Category::DecisionPending,
        Category::WaitingOnOthers
    ];

    /// Lenient parse; anything unrecognized is an action.
    pub fn from_label(label: &str) -> Self {
        let key = label.trim().to_lowercase().replace(['-', ' '], "_");
        match key.as_str() {
            "follow_up" | "followup" => Self::FollowUp,
            "decision_pending" | "decision" => Self::DecisionPending,
            "waiting_on_others" | "waiting_on" | "waiting" => Self::WaitingOnOthers,
            _ => Self::Action
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            Self::Action => "Action",
            Self::FollowUp => "Follow-up",
            Self::DecisionPending => "Decision Pending",
            Self::WaitingOnOthers => "Waiting on Others"
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    High,
    #[default]
    Medium,
    Low
}

impl Priority {
    pub const ALL: [Priority; 3] = [Priority::High, Priority::Medium, Priority::Low];

    /// Lenient parse; anything unrecognized is medium.
    pub fn from_label(label: &str) -> Self {
        match label.trim().to_lowercase().as_str() {
            "high" => Self::High,
            "low" => Self::Low,
            _ => Self::Medium
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            Self::High => "High",
            Self::Medium => "Medium",
            Self::Low => "Low"
        }
    }
}

/// An item proposed by extraction. Untrusted until fingerprinted and checked.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateItem {
    pub description: String,
    pub category: Category,
    pub priority: Priority,
    pub deadline: Option<NaiveDate>,
    pub source_meeting: String
}

impl CandidateItem {
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            category: Category::default(),
            priority: Priority::default(),
            deadline: None,
            source_meeting: String::new()
        }
    }
}

/// A record about to be written to the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewItem {
    pub description: String,
    pub fingerprint: Fingerprint,
    pub category: Category,
    pub priority: Priority,
    pub deadline: Option<NaiveDate>,
    pub source_meeting: String,
    pub date_added: NaiveDate
}

impl NewItem {
    /// Builds the stored form of a candidate whose description is already trimmed.
    pub fn from_candidate(
        candidate: &CandidateItem,
        description: &str,
        fingerprint: Fingerprint,
        date_added: NaiveDate
    ) -> Self {
        Self {
            description: description.to_string(),
            fingerprint,
            category: candidate.category,
            priority: candidate.priority,
            deadline: candidate.deadline,
            source_meeting: truncate_chars(&candidate.source_meeting, MAX_SOURCE_CHARS),
            date_added
        }
    }
}

/// A record as read back from the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredItem {
    pub id: String,
    pub description: String,
    pub fingerprint: Option<Fingerprint>,
    pub completed: bool
}

pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((byte_index, _)) => text[..byte_index].to_string(),
        None => text.to_string()
    }
}
