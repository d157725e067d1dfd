//! Progressive merge engine
//!
//! Combines a new partial submission with the lead's stored answers,
//! re-runs the evaluator and classifier over the merged set, and decides
//! completion transitions. The engine itself is stateless; all mutable
//! state lives in the repository, so it is safe to invoke concurrently
//! from any number of request-handling workers.

use crate::classify::{classify, ScoreThresholds};
use crate::lead::{LeadRecord, PRIMARY_IDENTITY_FIELD};
use crate::repository::{is_unique_violation, LeadRepository};
use crate::resolver::IdentityResolver;
use crate::schema::{self, QuestionDef};
use crate::scoring;
use crate::submission::PartialSubmission;
use chrono::Utc;
use sqlx::SqlitePool;
use tracing::{debug, info};

use leadcap_common::db::models::read_setting;
use leadcap_common::{uuid_utils, Error, Result};

/// Workflow tag for brand-new leads when the host has not configured one
const FALLBACK_DEFAULT_STATUS: &str = "new";

/// Entry point for both producers (web form and chat)
pub struct LeadEngine {
    repo: LeadRepository,
}

impl LeadEngine {
    pub fn new(pool: SqlitePool) -> Self {
        Self { repo: LeadRepository::new(pool) }
    }

    pub fn repository(&self) -> &LeadRepository {
        &self.repo
    }

    /// Ingest one partial (or final) submission and return the full merged
    /// lead record
    ///
    /// Schema and thresholds are call-time data so administrators can edit
    /// them without a code change. The only caller-visible failure is the
    /// validation case (unknown identity with no identity-bearing answer);
    /// a lost create race is recovered internally by retrying as an update
    /// against the row the concurrent writer produced.
    pub async fn submit(
        &self,
        submission: PartialSubmission,
        questions: &[QuestionDef],
        thresholds: &ScoreThresholds,
    ) -> Result<LeadRecord> {
        if submission.session_id.trim().is_empty() {
            return Err(Error::Validation("session_id is required".to_string()));
        }

        let resolver = IdentityResolver::new(&self.repo);
        let existing = resolver
            .resolve(&submission.session_id, submission.conversation_id.as_deref())
            .await?;

        if let Some(existing) = existing {
            let merged = merged_record(
                Some(&existing),
                &submission,
                questions,
                thresholds,
                &existing.status,
            )?;
            let stored = self.repo.update(&merged).await?;
            debug!(
                "Merged submission for session {} (step {}, score {})",
                stored.session_id, stored.last_answered_step, stored.score_total
            );
            return Ok(stored);
        }

        let default_status = read_setting(self.repo.pool(), "lead_default_status")
            .await?
            .unwrap_or_else(|| FALLBACK_DEFAULT_STATUS.to_string());
        let record = merged_record(None, &submission, questions, thresholds, &default_status)?;

        match self.repo.insert(&record).await {
            Ok(stored) => Ok(stored),
            Err(err) if is_unique_violation(&err) => {
                // Lost the first-write race: a concurrent submission created
                // the row between resolution and insert. Re-fetch the winner
                // and merge against it so no step is skipped.
                info!(
                    "Create race for session {}, retrying as update",
                    submission.session_id
                );
                let existing = resolver
                    .resolve(&submission.session_id, submission.conversation_id.as_deref())
                    .await?
                    .ok_or_else(|| {
                        Error::Internal(format!(
                            "lead for session {} missing after create race",
                            submission.session_id
                        ))
                    })?;
                let merged = merged_record(
                    Some(&existing),
                    &submission,
                    questions,
                    thresholds,
                    &existing.status,
                )?;
                self.repo.update(&merged).await
            }
            Err(err) => Err(err),
        }
    }
}

/// Pure merge step: existing record + submission → the record to persist
///
/// Host-owned fields (`status`, `notes`, external-sync slots) pass through
/// unchanged from the existing record; on first write they are initialized
/// to their creation defaults.
fn merged_record(
    existing: Option<&LeadRecord>,
    submission: &PartialSubmission,
    questions: &[QuestionDef],
    thresholds: &ScoreThresholds,
    default_status: &str,
) -> Result<LeadRecord> {
    // A lead cannot be created from content with nothing identifying in it
    if existing.is_none() && submission.answers.get(PRIMARY_IDENTITY_FIELD).is_none() {
        return Err(Error::Validation(format!(
            "{} is required",
            PRIMARY_IDENTITY_FIELD
        )));
    }

    // Right-biased answer merge; empty values were already dropped at the
    // AnswerSet boundary, so nothing here can blank out a stored answer
    let mut answers = existing.map(|e| e.answers.clone()).unwrap_or_default();
    answers.merge_from(&submission.answers);

    let total_questions = schema::total_questions(questions);

    // Step tracking is monotonic: navigating back never lowers it
    let clamped_step = if total_questions > 0 {
        submission.question_number.clamp(1, total_questions)
    } else {
        0
    };
    let last_answered_step = existing
        .map(|e| e.last_answered_step)
        .unwrap_or(0)
        .max(clamped_step);

    // Always a fresh evaluation over the merged set, never an incremental
    // patch of the stored score
    let report = scoring::evaluate(&answers, questions);

    // Completion is monotonic as well
    let form_complete = submission.mark_complete
        || (total_questions > 0 && last_answered_step >= total_questions)
        || existing.map(|e| e.form_complete).unwrap_or(false);

    // A lead is not tiered until it finishes; premature tiers would let
    // tier-based automation fire on half-answered data
    let classification = if form_complete {
        Some(classify(report.total, thresholds))
    } else {
        existing.and_then(|e| e.classification)
    };

    let now = Utc::now();
    let created_at = match existing {
        Some(e) => e.created_at,
        None => submission.started_at.unwrap_or(now),
    };

    Ok(LeadRecord {
        guid: existing.map(|e| e.guid).unwrap_or_else(uuid_utils::generate),
        session_id: existing
            .map(|e| e.session_id.clone())
            .unwrap_or_else(|| submission.session_id.trim().to_string()),
        conversation_id: existing
            .and_then(|e| e.conversation_id.clone())
            .or_else(|| submission.conversation_id.clone()),
        answers,
        score_total: report.total,
        score_breakdown: report.breakdown,
        classification,
        last_answered_step,
        form_complete,
        status: existing
            .map(|e| e.status.clone())
            .unwrap_or_else(|| default_status.to_string()),
        notes: existing.and_then(|e| e.notes.clone()),
        external_contact_id: existing.and_then(|e| e.external_contact_id.clone()),
        external_sync_status: match existing {
            Some(e) => e.external_sync_status.clone(),
            None => Some("pending".to_string()),
        },
        source: existing
            .and_then(|e| e.source.clone())
            .or_else(|| submission.source.map(|s| s.as_str().to_string())),
        created_at,
        updated_at: now,
    })
}
