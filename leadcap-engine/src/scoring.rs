//! Scoring evaluator
//!
//! Pure function over (answers, schema). Called fresh on every merge;
//! scores are never incrementally patched, to avoid drift from partial
//! updates.

use crate::schema::{QuestionDef, QuestionKind};
use crate::submission::AnswerSet;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Per-question score breakdown plus total
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreReport {
    pub total: i64,
    /// One entry per schema question, zero scores included, so reporting
    /// can show exactly where points came from
    pub breakdown: BTreeMap<String, i64>,
}

/// Evaluate an answer set against a question schema
///
/// Iteration order is irrelevant to the result. For each `select` question
/// the answer is matched against the option table by exact `value`, falling
/// back to exact `label`; absent or unmatched answers score zero. Questions
/// of kind `text`/`email`/`tel` never contribute points.
///
/// Conditional floor: when a `select` answer fails option matching (e.g. a
/// free-text variant of the fallback path) but the question's conditional
/// sub-answer is present, the option triggering the conditional field sets
/// the question's minimum score: completing the required detail is never
/// scored as zero.
pub fn evaluate(answers: &AnswerSet, questions: &[QuestionDef]) -> ScoreReport {
    let mut report = ScoreReport::default();

    for question in questions {
        let score = score_question(answers, question);
        report.total += score;
        report.breakdown.insert(question.id.clone(), score);
    }

    report
}

fn score_question(answers: &AnswerSet, question: &QuestionDef) -> i64 {
    if question.kind != QuestionKind::Select {
        return 0;
    }

    let answer = match answers.get(&question.id) {
        Some(a) => a,
        None => return 0,
    };

    let mut score = question
        .match_option(answer)
        .map(|o| o.points as i64)
        .unwrap_or(0);

    if score == 0 {
        if let Some(conditional) = &question.conditional {
            let detail_present = answers.get(&conditional.id).is_some();
            if detail_present {
                if let Some(trigger) = question.show_when_option() {
                    score = trigger.points as i64;
                }
            }
        }
    }

    score
}
