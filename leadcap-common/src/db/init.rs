//! Database initialization
//!
//! Creates the SQLite database on first run, applies connection pragmas and
//! seeds default settings. Initialization is idempotent and safe to call
//! concurrently from multiple workers.

use crate::Result;
use sqlx::{sqlite::SqlitePoolOptions, SqlitePool};
use std::path::Path;
use tracing::{info, warn};

/// Initialize database connection and create tables if needed
pub async fn init_database(db_path: &Path) -> Result<SqlitePool> {
    let newly_created = !db_path.exists();

    // Create parent directory if it doesn't exist
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let db_url = format!("sqlite://{}?mode=rwc", db_path.display());
    let pool = SqlitePoolOptions::new()
        .max_connections(10)
        .connect(&db_url)
        .await?;

    if newly_created {
        info!("Initialized new database: {}", db_path.display());
    } else {
        info!("Opened existing database: {}", db_path.display());
    }

    // Enable foreign keys
    sqlx::query("PRAGMA foreign_keys = ON").execute(&pool).await?;

    // WAL mode: concurrent readers with one writer, needed when the web form
    // and chat workers submit against the same store
    sqlx::query("PRAGMA journal_mode = WAL").execute(&pool).await?;

    // Bounded wait on lock contention before sqlx surfaces a busy error
    sqlx::query("PRAGMA busy_timeout = 5000").execute(&pool).await?;

    // Table creation (idempotent - safe to call multiple times)
    create_settings_table(&pool).await?;
    create_leads_table(&pool).await?;

    // Seed default settings
    init_default_settings(&pool).await?;

    Ok(pool)
}

/// Create the settings table
///
/// Stores application configuration key-value pairs.
pub async fn create_settings_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS settings (
            key TEXT PRIMARY KEY,
            value TEXT,
            updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Create the leads table
///
/// One row per distinct intake. The UNIQUE constraints on `session_id` and
/// `conversation_id` are what makes the create path race-safe: two
/// near-simultaneous first submissions for one identity collapse onto a
/// single row, with the loser retried as an update.
pub async fn create_leads_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS leads (
            guid TEXT PRIMARY KEY,
            session_id TEXT NOT NULL UNIQUE,
            conversation_id TEXT UNIQUE,
            name TEXT,
            email TEXT,
            whatsapp TEXT,
            answers TEXT NOT NULL DEFAULT '{}',
            score_total INTEGER NOT NULL DEFAULT 0,
            score_breakdown TEXT NOT NULL DEFAULT '{}',
            classification TEXT CHECK (classification IS NULL OR classification IN ('HOT', 'WARM', 'COLD', 'DISQUALIFIED')),
            last_answered_step INTEGER NOT NULL DEFAULT 0,
            form_complete INTEGER NOT NULL DEFAULT 0,
            status TEXT NOT NULL DEFAULT 'new',
            notes TEXT,
            external_contact_id TEXT,
            external_sync_status TEXT,
            source TEXT,
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
            updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
            CHECK (score_total >= 0),
            CHECK (last_answered_step >= 0),
            CHECK (form_complete IN (0, 1))
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Create indexes for the admin reporting filters
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_leads_classification ON leads(classification)")
        .execute(pool)
        .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_leads_status ON leads(status)")
        .execute(pool)
        .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_leads_completion ON leads(form_complete, updated_at)")
        .execute(pool)
        .await?;

    Ok(())
}

/// Initialize or update default settings
///
/// This function ensures all required settings exist with default values.
/// It also handles NULL values by resetting them to defaults.
async fn init_default_settings(pool: &SqlitePool) -> Result<()> {
    // Qualification thresholds, consistent with the built-in question
    // schema's 30-point maximum
    ensure_setting(pool, "score_threshold_hot", "24").await?;
    ensure_setting(pool, "score_threshold_warm", "15").await?;
    ensure_setting(pool, "score_threshold_cold", "8").await?;

    // Incomplete leads older than this window report as abandoned
    ensure_setting(pool, "lead_abandonment_window_hours", "24").await?;

    // Workflow tag assigned to newly created leads
    ensure_setting(pool, "lead_default_status", "new").await?;

    info!("Default settings initialized");
    Ok(())
}

/// Ensure a setting exists with the specified default value
///
/// If the setting doesn't exist, it will be created with the default.
/// If the setting exists but has a NULL value, it will be reset to the default.
pub async fn ensure_setting(pool: &SqlitePool, key: &str, default_value: &str) -> Result<()> {
    // Check if setting exists
    let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM settings WHERE key = ?)")
        .bind(key)
        .fetch_one(pool)
        .await?;

    if !exists {
        // Use INSERT OR IGNORE to handle concurrent initialization race
        // conditions: multiple workers may pass the exists check simultaneously
        sqlx::query("INSERT OR IGNORE INTO settings (key, value) VALUES (?, ?)")
            .bind(key)
            .bind(default_value)
            .execute(pool)
            .await?;

        info!("Initialized setting '{}' with default value: {}", key, default_value);
        return Ok(());
    }

    // Check if value is NULL
    let value: Option<String> = sqlx::query_scalar("SELECT value FROM settings WHERE key = ?")
        .bind(key)
        .fetch_one(pool)
        .await?;

    if value.is_none() {
        // Value is NULL - reset to default
        sqlx::query("UPDATE settings SET value = ? WHERE key = ?")
            .bind(default_value)
            .bind(key)
            .execute(pool)
            .await?;

        warn!("Setting '{}' was NULL, reset to default: {}", key, default_value);
    }

    Ok(())
}
