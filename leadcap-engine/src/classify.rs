//! Lead tier classification
//!
//! Pure total-order comparison of a score against configurable cut points.

use serde::{Deserialize, Serialize};
use tracing::warn;

/// Qualification tier of a completed lead
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Tier {
    Hot,
    Warm,
    Cold,
    Disqualified,
}

impl Tier {
    /// Stable text encoding used in the database
    pub fn as_str(&self) -> &'static str {
        match self {
            Tier::Hot => "HOT",
            Tier::Warm => "WARM",
            Tier::Cold => "COLD",
            Tier::Disqualified => "DISQUALIFIED",
        }
    }

    pub fn parse(s: &str) -> Option<Tier> {
        match s {
            "HOT" => Some(Tier::Hot),
            "WARM" => Some(Tier::Warm),
            "COLD" => Some(Tier::Cold),
            "DISQUALIFIED" => Some(Tier::Disqualified),
            _ => None,
        }
    }
}

impl std::fmt::Display for Tier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Strictly decreasing score cut points
///
/// `total >= hot` ⇒ HOT, `>= warm` ⇒ WARM, `>= cold` ⇒ COLD, otherwise
/// DISQUALIFIED.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreThresholds {
    pub hot: i64,
    pub warm: i64,
    pub cold: i64,
}

impl Default for ScoreThresholds {
    /// Consistent with the built-in schema's 30-point maximum
    fn default() -> Self {
        Self { hot: 24, warm: 15, cold: 8 }
    }
}

impl ScoreThresholds {
    /// Clamp malformed (non-strictly-decreasing) thresholds into a usable
    /// shape: `warm` is clamped down to `hot`, `cold` down to `warm`
    ///
    /// Admin-entered thresholds that fail the ordering invariant must not
    /// take down lead capture; the clamped interpretation keeps the tier
    /// comparison total and is logged for operator visibility.
    pub fn normalized(&self) -> ScoreThresholds {
        if self.hot > self.warm && self.warm > self.cold {
            return *self;
        }

        let warm = self.warm.min(self.hot);
        let cold = self.cold.min(warm);
        warn!(
            "Thresholds {{hot: {}, warm: {}, cold: {}}} are not strictly decreasing, \
             clamped to {{hot: {}, warm: {}, cold: {}}}",
            self.hot, self.warm, self.cold, self.hot, warm, cold
        );
        ScoreThresholds { hot: self.hot, warm, cold }
    }
}

/// Classify a total score into a tier
pub fn classify(total: i64, thresholds: &ScoreThresholds) -> Tier {
    let t = thresholds.normalized();

    if total >= t.hot {
        Tier::Hot
    } else if total >= t.warm {
        Tier::Warm
    } else if total >= t.cold {
        Tier::Cold
    } else {
        Tier::Disqualified
    }
}
