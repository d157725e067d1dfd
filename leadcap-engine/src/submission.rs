//! Answer sets and partial submissions
//!
//! Both producers (the step-by-step web form and the conversational chat
//! flow) submit the same shape; only the identity fields differ in which
//! one is populated.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;

/// Channel a submission originated from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LeadSource {
    WebForm,
    Chat,
}

impl LeadSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            LeadSource::WebForm => "web_form",
            LeadSource::Chat => "chat",
        }
    }
}

/// Mapping from question id (including conditional sub-ids and free-form
/// custom ids) to a string value
///
/// Empty or whitespace-only values are treated as absent and never stored,
/// so a later submission can never blank out a previously captured answer.
/// The guard also applies at deserialization: blank values in a wire
/// payload are dropped before they reach the merge.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct AnswerSet {
    entries: BTreeMap<String, String>,
}

impl<'de> Deserialize<'de> for AnswerSet {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = BTreeMap::<String, String>::deserialize(deserializer)?;
        Ok(raw.into_iter().collect())
    }
}

impl AnswerSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store an answer; whitespace-only values are dropped
    pub fn insert(&mut self, id: impl Into<String>, value: impl AsRef<str>) {
        let trimmed = value.as_ref().trim();
        if trimmed.is_empty() {
            return;
        }
        self.entries.insert(id.into(), trimmed.to_string());
    }

    pub fn get(&self, id: &str) -> Option<&str> {
        self.entries.get(id).map(|s| s.as_str())
    }

    pub fn contains(&self, id: &str) -> bool {
        self.entries.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Right-biased merge with empty-value protection: every non-empty
    /// answer in `newer` overwrites, everything else is kept
    pub fn merge_from(&mut self, newer: &AnswerSet) {
        for (id, value) in newer.iter() {
            // insert() re-applies the non-empty guard
            self.insert(id, value);
        }
    }
}

impl FromIterator<(String, String)> for AnswerSet {
    fn from_iter<T: IntoIterator<Item = (String, String)>>(iter: T) -> Self {
        let mut set = AnswerSet::new();
        for (id, value) in iter {
            set.insert(id, value);
        }
        set
    }
}

/// One partial (or final) intake submission
///
/// Only `session_id` is required; everything else is optional. Omitted or
/// empty answer fields never overwrite previously stored values.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PartialSubmission {
    /// Stable for the lifetime of one web-form attempt
    pub session_id: String,
    /// Stable for the lifetime of one chat attempt
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conversation_id: Option<String>,
    /// Ordinal step this submission represents completion of
    #[serde(default)]
    pub question_number: i64,
    #[serde(default)]
    pub answers: AnswerSet,
    /// Explicit completion marker from the producer
    #[serde(default)]
    pub mark_complete: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<LeadSource>,
    /// Submission-declared intake start time; used for `created_at` on
    /// first write when present
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    /// Pass-through diagnostics: seconds the visitor has spent so far
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub elapsed_seconds: Option<i64>,
}

impl PartialSubmission {
    /// Minimal submission for a session, no answers yet
    pub fn for_session(session_id: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            conversation_id: None,
            question_number: 0,
            answers: AnswerSet::new(),
            mark_complete: false,
            source: None,
            started_at: None,
            elapsed_seconds: None,
        }
    }
}
