//! Durable lead record
//!
//! One record per distinct intake, created once and mutated incrementally
//! across partial submissions. The engine owns the merged answers and every
//! field derived from them; `status`, `notes` and the external-sync slots
//! belong to the surrounding system and pass through merges untouched.

use crate::classify::Tier;
use crate::submission::AnswerSet;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

/// Answer id carrying the lead's identity; first-contact submissions
/// without it are rejected
pub const PRIMARY_IDENTITY_FIELD: &str = "name";

/// Fallback staleness cutoff when the host has not configured one
pub const DEFAULT_ABANDONMENT_WINDOW_HOURS: i64 = 24;

/// Read-time engagement state
///
/// Derived from `form_complete` and `updated_at` only, never persisted;
/// an engine restart cannot desynchronize it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Engagement {
    Complete,
    InProgress,
    Abandoned,
}

/// The durable lead entity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LeadRecord {
    pub guid: Uuid,
    /// Stable for the lifetime of one web-form attempt; always present
    pub session_id: String,
    /// Stable for the lifetime of one chat attempt; backfilled when the
    /// visitor continues in chat
    pub conversation_id: Option<String>,
    /// Merged answer set: schema fields plus free-form custom ids
    pub answers: AnswerSet,
    /// Always equals the evaluator's total over `answers` as of the last merge
    pub score_total: i64,
    /// The same evaluator's per-question partial scores
    pub score_breakdown: BTreeMap<String, i64>,
    /// Tier label; set once the lead reaches completion
    pub classification: Option<Tier>,
    /// Highest question ordinal with a merged answer; monotonic
    pub last_answered_step: i64,
    /// Monotonic completion flag
    pub form_complete: bool,
    /// Human workflow tag owned by the admin UI
    pub status: String,
    pub notes: Option<String>,
    /// Opaque pass-through slots for an outbound-sync layer
    pub external_contact_id: Option<String>,
    pub external_sync_status: Option<String>,
    /// Channel the lead first arrived from
    pub source: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl LeadRecord {
    /// Engagement state as of `now`, for a given staleness window
    pub fn engagement_at(&self, now: DateTime<Utc>, window: Duration) -> Engagement {
        if self.form_complete {
            Engagement::Complete
        } else if now - self.updated_at > window {
            Engagement::Abandoned
        } else {
            Engagement::InProgress
        }
    }

    /// Engagement state using the default abandonment window
    pub fn engagement(&self, now: DateTime<Utc>) -> Engagement {
        self.engagement_at(now, Duration::hours(DEFAULT_ABANDONMENT_WINDOW_HOURS))
    }

    pub fn name(&self) -> Option<&str> {
        self.answers.get(PRIMARY_IDENTITY_FIELD)
    }

    pub fn email(&self) -> Option<&str> {
        self.answers.get("email")
    }

    pub fn whatsapp(&self) -> Option<&str> {
        self.answers.get("whatsapp")
    }
}
