//! Action-item extraction through a hosted language model.
//!
//! The model never sees prior runs, so its output is only a proposal list.
//! Identity and dedup are decided later against the store.

use crate::config::ExtractionConfig;
use crate::error::{SyncError, SyncResult};
use crate::item::{CandidateItem, Category, Priority};
use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::{Value, json};
use std::sync::Arc;
use tracing::{debug, warn};

const ANTHROPIC_VERSION: &str = "2023-06-01";
const RAW_EXCERPT_CHARS: usize = 500;

/// Candidates plus a warning when the reply could not be read as records.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Extraction {
    pub candidates: Vec<CandidateItem>,
    pub warning: Option<String>
}

#[async_trait]
pub trait Extractor: Send + Sync {
    /// Transport failures are errors. Malformed replies are not: they yield
    /// zero candidates and a warning.
    async fn extract(
        &self,
        notes: &str,
        open_descriptions: &[String],
        today: NaiveDate
    ) -> SyncResult<Extraction>;
}

#[async_trait]
pub trait CompletionClient: Send + Sync {
    async fn complete(&self, prompt: &str) -> SyncResult<String>;
}

pub struct AnthropicClient {
    client: Client,
    config: ExtractionConfig
}

impl AnthropicClient {
    pub fn new(config: ExtractionConfig) -> SyncResult<Self> {
        let client = Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(SyncError::HttpError)?;

        Ok(Self { client, config })
    }
}

#[async_trait]
impl CompletionClient for AnthropicClient {
    async fn complete(&self, prompt: &str) -> SyncResult<String> {
        let url = format!("{}/v1/messages", self.config.base_url.trim_end_matches('/'));
        debug!(url = %url, model = %self.config.model, "Requesting extraction");

        let response = self
            .client
            .post(&url)
            .header("x-api-key", &self.config.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&json!({
                "model": self.config.model,
                "max_tokens": self.config.max_tokens,
                "messages": [{ "role": "user", "content": prompt }]
            }))
            .send()
            .await?;

        match response.status() {
            StatusCode::OK => {
                let body = response.json::<MessagesResponse>().await?;
                Ok(body
                    .content
                    .into_iter()
                    .filter(|block| block.kind == "text")
                    .filter_map(|block| block.text)
                    .collect::<Vec<_>>()
                    .join(""))
            }
            StatusCode::UNAUTHORIZED => Err(SyncError::AuthenticationError(
                "Invalid Anthropic API key".to_string()
            )),
            StatusCode::TOO_MANY_REQUESTS => {
                let retry_after = response
                    .headers()
                    .get("retry-after")
                    .and_then(|v| v.to_str().ok())
                    .and_then(|s| s.parse::<u64>().ok())
                    .unwrap_or(60);
                Err(SyncError::RateLimited {
                    retry_after_seconds: retry_after
                })
            }
            status => {
                let body = response.text().await.unwrap_or_default();
                Err(SyncError::ExtractionApiError {
                    status: status.as_u16(),
                    message: body.chars().take(200).collect()
                })
            }
        }
    }
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<ContentBlock>
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    kind: String,
    text: Option<String>
}

pub struct LlmExtractor {
    llm: Arc<dyn CompletionClient>,
    owner: Option<String>
}

impl LlmExtractor {
    pub fn new(llm: Arc<dyn CompletionClient>, owner: Option<String>) -> Self {
        Self { llm, owner }
    }
}

#[async_trait]
impl Extractor for LlmExtractor {
    async fn extract(
        &self,
        notes: &str,
        open_descriptions: &[String],
        today: NaiveDate
    ) -> SyncResult<Extraction> {
        let prompt = build_prompt(notes, open_descriptions, today, self.owner.as_deref());
        let reply = self.llm.complete(&prompt).await?;
        let extraction = parse_extraction(&reply);
        if let Some(warning) = &extraction.warning {
            warn!(warning = %warning, "Extraction reply was not usable as records");
        }
        Ok(extraction)
    }
}

pub fn build_prompt(
    notes: &str,
    open_descriptions: &[String],
    today: NaiveDate,
    owner: Option<&str>
) -> String {
    let existing = if open_descriptions.is_empty() {
        "(none)".to_string()
    } else {
        open_descriptions
            .iter()
            .map(|d| format!("- {}", d))
            .collect::<Vec<_>>()
            .join("\n")
    };
    let (subject, scope_rule) = match owner {
        Some(name) => (
            format!(" for {}", name),
            format!(
                "- Only items that are {name}'s responsibility or that {name} is waiting on\n"
            )
        ),
        None => (String::new(), String::new())
    };

    format!(
        "Today is {today}. Extract action items from these meeting notes{subject}.\n\nMEETING \
         NOTES:\n{notes}\n\nITEMS ALREADY TRACKED (do NOT include these or anything \
         similar):\n{existing}\n\nReturn ONLY a JSON array of NEW items not already tracked \
         above. Each item:\n{{\n  \"description\": \"concise action item\",\n  \"category\": \
         \"action|follow_up|decision_pending|waiting_on_others\",\n  \"deadline\": \"YYYY-MM-DD \
         or null\",\n  \"source_meeting\": \"meeting title from the filename\",\n  \
         \"priority\": \"high|medium|low\"\n}}\n\nRules:\n{scope_rule}- Skip anything already \
         covered in the existing items list\n- If no new items, return an empty array: []\n- \
         Return ONLY valid JSON. No markdown, no explanation, no code fences.",
        today = today.format("%Y-%m-%d")
    )
}

/// Drops an opening fence with its optional language tag and a closing fence.
/// The body may start on the fence line itself.
pub fn strip_code_fences(raw: &str) -> &str {
    let mut text = raw.trim();
    if let Some(rest) = text.strip_prefix("```") {
        let tag_end = rest
            .find(|c: char| c.is_whitespace() || c == '[' || c == '{')
            .unwrap_or(rest.len());
        text = &rest[tag_end..];
    }
    if let Some(stripped) = text.trim_end().strip_suffix("```") {
        text = stripped;
    }
    text.trim()
}

#[derive(Debug, Deserialize)]
struct RawCandidate {
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    category: Option<String>,
    #[serde(default)]
    priority: Option<String>,
    #[serde(default)]
    deadline: Option<Value>,
    #[serde(default)]
    source_meeting: Option<String>
}

impl From<RawCandidate> for CandidateItem {
    fn from(raw: RawCandidate) -> Self {
        Self {
            description: raw.description.unwrap_or_default(),
            category: raw
                .category
                .as_deref()
                .map(Category::from_label)
                .unwrap_or_default(),
            priority: raw
                .priority
                .as_deref()
                .map(Priority::from_label)
                .unwrap_or_default(),
            deadline: raw
                .deadline
                .as_ref()
                .and_then(Value::as_str)
                .and_then(|s| NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d").ok()),
            source_meeting: raw.source_meeting.unwrap_or_default()
        }
    }
}

/// Reads a model reply as candidate records without ever failing.
pub fn parse_extraction(reply: &str) -> Extraction {
    let body = strip_code_fences(reply);

    let value: Value = match serde_json::from_str(body) {
        Ok(value) => value,
        Err(e) => {
            let excerpt: String = reply.trim().chars().take(RAW_EXCERPT_CHARS).collect();
            return Extraction {
                candidates: Vec::new(),
                warning: Some(format!("failed to parse reply as JSON: {e}; raw: {excerpt}"))
            };
        }
    };

    let Value::Array(elements) = value else {
        return Extraction {
            candidates: Vec::new(),
            warning: Some("reply was JSON but not an array".to_string())
        };
    };

    let mut candidates = Vec::with_capacity(elements.len());
    let mut rejected = 0usize;
    for element in elements {
        match serde_json::from_value::<RawCandidate>(element) {
            Ok(raw) => candidates.push(CandidateItem::from(raw)),
            Err(e) => {
                debug!(error = %e, "Skipping malformed extraction record");
                rejected += 1;
            }
        }
    }

    Extraction {
        candidates,
        warning: (rejected > 0).then(|| format!("skipped {rejected} malformed record(s)"))
    }
}

pub fn create_anthropic_extractor(config: ExtractionConfig) -> SyncResult<Arc<dyn Extractor>> {
    let owner = config.owner.clone();
    let client = AnthropicClient::new(config)?;
    Ok(Arc::new(LlmExtractor::new(Arc::new(client), owner)))
}
