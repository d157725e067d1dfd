//! Intake configuration
//!
//! Question schema and thresholds are host-supplied data on every call.
//! Hosts that persist them elsewhere (e.g. an admin UI table) can ignore
//! this module; hosts without one yet can ship a TOML file, or run on the
//! built-in defaults.

use crate::classify::ScoreThresholds;
use crate::lead::DEFAULT_ABANDONMENT_WINDOW_HOURS;
use crate::schema::{self, QuestionDef};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::warn;

/// Everything the host configures about the intake
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntakeConfig {
    #[serde(default = "default_question_list")]
    pub questions: Vec<QuestionDef>,
    #[serde(default)]
    pub thresholds: ScoreThresholds,
    /// Incomplete leads older than this report as abandoned
    #[serde(default = "default_window_hours")]
    pub abandonment_window_hours: i64,
}

fn default_question_list() -> Vec<QuestionDef> {
    schema::default_questions().to_vec()
}

fn default_window_hours() -> i64 {
    DEFAULT_ABANDONMENT_WINDOW_HOURS
}

impl Default for IntakeConfig {
    fn default() -> Self {
        Self {
            questions: default_question_list(),
            thresholds: ScoreThresholds::default(),
            abandonment_window_hours: default_window_hours(),
        }
    }
}

impl IntakeConfig {
    /// Load from a TOML file, degrading to the built-in defaults when the
    /// file is missing or malformed
    ///
    /// A bad admin-entered config must not take down lead capture, so this
    /// never fails; problems are logged for operator visibility.
    pub fn load(path: &Path) -> IntakeConfig {
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) => {
                warn!(
                    "Could not read intake config {}: {}; using built-in defaults",
                    path.display(),
                    e
                );
                return IntakeConfig::default();
            }
        };

        let config = match toml::from_str::<IntakeConfig>(&content) {
            Ok(config) => config,
            Err(e) => {
                warn!(
                    "Could not parse intake config {}: {}; using built-in defaults",
                    path.display(),
                    e
                );
                return IntakeConfig::default();
            }
        };

        for warning in schema::validate(&config.questions) {
            warn!("Intake config {}: {}", path.display(), warning);
        }

        config
    }
}
