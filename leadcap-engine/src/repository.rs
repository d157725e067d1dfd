//! Lead repository
//!
//! Durable store of one row per lead identity over SQLite. The create path
//! surfaces unique violations so the merge engine can retry a lost create
//! race as an update; the update path only ever writes engine-owned fields.

use crate::classify::Tier;
use crate::lead::LeadRecord;
use crate::submission::AnswerSet;
use chrono::{DateTime, Utc};
use sqlx::{Row, SqlitePool};
use std::collections::BTreeMap;
use tracing::info;
use uuid::Uuid;

use leadcap_common::{Error, Result};

const LEAD_COLUMNS: &str = "guid, session_id, conversation_id, name, email, whatsapp, \
     answers, score_total, score_breakdown, classification, last_answered_step, \
     form_complete, status, notes, external_contact_id, external_sync_status, \
     source, created_at, updated_at";

/// Admin reporting filter; all fields optional and combinable
#[derive(Debug, Clone, Default)]
pub struct LeadFilter {
    pub classification: Option<Tier>,
    pub status: Option<String>,
    pub form_complete: Option<bool>,
    pub updated_since: Option<DateTime<Utc>>,
    pub updated_until: Option<DateTime<Utc>>,
    pub limit: Option<i64>,
}

/// Repository for the `leads` table
#[derive(Debug, Clone)]
pub struct LeadRepository {
    pool: SqlitePool,
}

impl LeadRepository {
    /// Create new repository with database pool
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Look up a lead by its web-form session id
    pub async fn find_by_session(&self, session_id: &str) -> Result<Option<LeadRecord>> {
        let sql = format!("SELECT {LEAD_COLUMNS} FROM leads WHERE session_id = ?");
        let row = sqlx::query(&sql)
            .bind(session_id)
            .fetch_optional(&self.pool)
            .await?;

        row.map(|r| row_to_lead(&r)).transpose()
    }

    /// Look up a lead by its chat conversation id
    pub async fn find_by_conversation(&self, conversation_id: &str) -> Result<Option<LeadRecord>> {
        let sql = format!("SELECT {LEAD_COLUMNS} FROM leads WHERE conversation_id = ?");
        let row = sqlx::query(&sql)
            .bind(conversation_id)
            .fetch_optional(&self.pool)
            .await?;

        row.map(|r| row_to_lead(&r)).transpose()
    }

    /// Look up a lead by primary key
    pub async fn get(&self, guid: Uuid) -> Result<LeadRecord> {
        let sql = format!("SELECT {LEAD_COLUMNS} FROM leads WHERE guid = ?");
        let row = sqlx::query(&sql)
            .bind(guid.to_string())
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(r) => row_to_lead(&r),
            None => Err(Error::NotFound(format!("lead {}", guid))),
        }
    }

    /// Create path: insert a brand-new lead row
    ///
    /// A unique violation on either identity column means a concurrent
    /// submission created the row first; callers detect it via
    /// [`is_unique_violation`] and retry as an update.
    pub async fn insert(&self, record: &LeadRecord) -> Result<LeadRecord> {
        let answers_json = serialize_answers(&record.answers)?;
        let breakdown_json = serialize_breakdown(&record.score_breakdown)?;
        let now = Utc::now();

        sqlx::query(
            r#"
            INSERT INTO leads (
                guid, session_id, conversation_id, name, email, whatsapp,
                answers, score_total, score_breakdown, classification,
                last_answered_step, form_complete, status, notes,
                external_contact_id, external_sync_status, source,
                created_at, updated_at
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(record.guid.to_string())
        .bind(&record.session_id)
        .bind(&record.conversation_id)
        .bind(record.name())
        .bind(record.email())
        .bind(record.whatsapp())
        .bind(&answers_json)
        .bind(record.score_total)
        .bind(&breakdown_json)
        .bind(record.classification.map(|t| t.as_str()))
        .bind(record.last_answered_step)
        .bind(record.form_complete)
        .bind(&record.status)
        .bind(&record.notes)
        .bind(&record.external_contact_id)
        .bind(&record.external_sync_status)
        .bind(&record.source)
        .bind(record.created_at.to_rfc3339())
        .bind(now.to_rfc3339())
        .execute(&self.pool)
        .await?;

        info!("Created lead {} for session {}", record.guid, record.session_id);

        self.get(record.guid).await
    }

    /// Update path: apply the merge engine's computed patch
    ///
    /// Writes engine-owned fields only and bumps `updated_at`; `created_at`,
    /// `status` and `notes` are never touched here.
    pub async fn update(&self, record: &LeadRecord) -> Result<LeadRecord> {
        let answers_json = serialize_answers(&record.answers)?;
        let breakdown_json = serialize_breakdown(&record.score_breakdown)?;
        let now = Utc::now();

        let result = sqlx::query(
            r#"
            UPDATE leads SET
                conversation_id = ?,
                name = ?,
                email = ?,
                whatsapp = ?,
                answers = ?,
                score_total = ?,
                score_breakdown = ?,
                classification = ?,
                last_answered_step = ?,
                form_complete = ?,
                source = ?,
                updated_at = ?
            WHERE guid = ?
            "#,
        )
        .bind(&record.conversation_id)
        .bind(record.name())
        .bind(record.email())
        .bind(record.whatsapp())
        .bind(&answers_json)
        .bind(record.score_total)
        .bind(&breakdown_json)
        .bind(record.classification.map(|t| t.as_str()))
        .bind(record.last_answered_step)
        .bind(record.form_complete)
        .bind(&record.source)
        .bind(now.to_rfc3339())
        .bind(record.guid.to_string())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(Error::NotFound(format!("lead {}", record.guid)));
        }

        self.get(record.guid).await
    }

    /// Admin-side workflow tag update (host-owned field)
    pub async fn set_status(&self, guid: Uuid, status: &str) -> Result<()> {
        sqlx::query("UPDATE leads SET status = ?, updated_at = ? WHERE guid = ?")
            .bind(status)
            .bind(Utc::now().to_rfc3339())
            .bind(guid.to_string())
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    /// Admin-side notes update (host-owned field)
    pub async fn set_notes(&self, guid: Uuid, notes: Option<&str>) -> Result<()> {
        sqlx::query("UPDATE leads SET notes = ? WHERE guid = ?")
            .bind(notes)
            .bind(guid.to_string())
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    /// Outbound-sync bookkeeping (host-owned fields, opaque to the engine)
    pub async fn set_external_sync(
        &self,
        guid: Uuid,
        contact_id: Option<&str>,
        sync_status: Option<&str>,
    ) -> Result<()> {
        sqlx::query(
            "UPDATE leads SET external_contact_id = ?, external_sync_status = ? WHERE guid = ?",
        )
        .bind(contact_id)
        .bind(sync_status)
        .bind(guid.to_string())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Admin reporting query, newest activity first
    pub async fn list(&self, filter: &LeadFilter) -> Result<Vec<LeadRecord>> {
        let mut sql = format!("SELECT {LEAD_COLUMNS} FROM leads WHERE 1=1");

        if filter.classification.is_some() {
            sql.push_str(" AND classification = ?");
        }
        if filter.status.is_some() {
            sql.push_str(" AND status = ?");
        }
        if filter.form_complete.is_some() {
            sql.push_str(" AND form_complete = ?");
        }
        if filter.updated_since.is_some() {
            sql.push_str(" AND updated_at >= ?");
        }
        if filter.updated_until.is_some() {
            sql.push_str(" AND updated_at <= ?");
        }
        sql.push_str(" ORDER BY updated_at DESC");
        if filter.limit.is_some() {
            sql.push_str(" LIMIT ?");
        }

        let mut query = sqlx::query(&sql);
        if let Some(tier) = filter.classification {
            query = query.bind(tier.as_str());
        }
        if let Some(status) = &filter.status {
            query = query.bind(status);
        }
        if let Some(complete) = filter.form_complete {
            query = query.bind(complete);
        }
        if let Some(since) = filter.updated_since {
            query = query.bind(since.to_rfc3339());
        }
        if let Some(until) = filter.updated_until {
            query = query.bind(until.to_rfc3339());
        }
        if let Some(limit) = filter.limit {
            query = query.bind(limit);
        }

        let rows = query.fetch_all(&self.pool).await?;
        rows.iter().map(row_to_lead).collect()
    }

    /// Lead counts per tier (unclassified leads excluded)
    pub async fn count_by_classification(&self) -> Result<BTreeMap<String, i64>> {
        let rows = sqlx::query(
            "SELECT classification, COUNT(*) AS n FROM leads \
             WHERE classification IS NOT NULL GROUP BY classification",
        )
        .fetch_all(&self.pool)
        .await?;

        let mut counts = BTreeMap::new();
        for row in rows {
            let tier: String = row.get("classification");
            let n: i64 = row.get("n");
            counts.insert(tier, n);
        }

        Ok(counts)
    }
}

/// Whether an error is the database reporting a duplicate identity key
pub fn is_unique_violation(err: &Error) -> bool {
    match err {
        Error::Database(e) => e
            .as_database_error()
            .map(|d| d.is_unique_violation())
            .unwrap_or(false),
        _ => false,
    }
}

fn serialize_answers(answers: &AnswerSet) -> Result<String> {
    serde_json::to_string(answers)
        .map_err(|e| Error::Internal(format!("Failed to serialize answers: {}", e)))
}

fn serialize_breakdown(breakdown: &BTreeMap<String, i64>) -> Result<String> {
    serde_json::to_string(breakdown)
        .map_err(|e| Error::Internal(format!("Failed to serialize score breakdown: {}", e)))
}

fn row_to_lead(row: &sqlx::sqlite::SqliteRow) -> Result<LeadRecord> {
    let guid_str: String = row.get("guid");
    let guid = Uuid::parse_str(&guid_str)
        .map_err(|e| Error::Internal(format!("Failed to parse lead guid: {}", e)))?;

    let answers: String = row.get("answers");
    let answers: AnswerSet = serde_json::from_str(&answers)
        .map_err(|e| Error::Internal(format!("Failed to deserialize answers: {}", e)))?;

    let breakdown: String = row.get("score_breakdown");
    let score_breakdown: BTreeMap<String, i64> = serde_json::from_str(&breakdown)
        .map_err(|e| Error::Internal(format!("Failed to deserialize score breakdown: {}", e)))?;

    let classification: Option<String> = row.get("classification");
    let classification = classification.as_deref().and_then(Tier::parse);

    let created_at: String = row.get("created_at");
    let created_at = chrono::DateTime::parse_from_rfc3339(&created_at)
        .map_err(|e| Error::Internal(format!("Failed to parse created_at: {}", e)))?
        .with_timezone(&Utc);

    let updated_at: String = row.get("updated_at");
    let updated_at = chrono::DateTime::parse_from_rfc3339(&updated_at)
        .map_err(|e| Error::Internal(format!("Failed to parse updated_at: {}", e)))?
        .with_timezone(&Utc);

    Ok(LeadRecord {
        guid,
        session_id: row.get("session_id"),
        conversation_id: row.get("conversation_id"),
        answers,
        score_total: row.get("score_total"),
        score_breakdown,
        classification,
        last_answered_step: row.get("last_answered_step"),
        form_complete: row.get("form_complete"),
        status: row.get("status"),
        notes: row.get("notes"),
        external_contact_id: row.get("external_contact_id"),
        external_sync_status: row.get("external_sync_status"),
        source: row.get("source"),
        created_at,
        updated_at,
    })
}
