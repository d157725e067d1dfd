//! Question schema model
//!
//! The intake questionnaire is data, not code: administrators edit
//! questions, options and point weights without a code change, and the
//! engine consumes whatever schema snapshot the host passes in. A built-in
//! default schema is provided for hosts that have none configured yet.

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

/// Input type of an intake question
///
/// Only `select` questions carry point weights; the other kinds exist
/// purely for data capture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QuestionKind {
    Text,
    Email,
    Tel,
    Select,
}

/// One selectable option of a `select` question
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnswerOption {
    /// Stable machine value submitted by the form
    pub value: String,
    /// Display label shown to the visitor (also accepted as an answer)
    pub label: String,
    /// Points awarded when this option is chosen
    #[serde(default)]
    pub points: u32,
}

/// A dependent sub-question that only applies when the parent question's
/// answer equals `show_when`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConditionalField {
    /// Parent option value that reveals this field
    pub show_when: String,
    /// Answer id the sub-question's value is stored under
    pub id: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub placeholder: Option<String>,
}

/// One intake question
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuestionDef {
    /// Stable string key, unique within a schema
    pub id: String,
    /// Presentation order; ties broken by `id` lexical order
    pub order: i64,
    pub title: String,
    #[serde(rename = "type")]
    pub kind: QuestionKind,
    #[serde(default)]
    pub required: bool,
    /// Present only for `select` questions
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<AnswerOption>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conditional: Option<ConditionalField>,
}

impl QuestionDef {
    /// Look up an option by exact `value` match, falling back to exact
    /// `label` match (upstream layers may submit either)
    pub fn match_option(&self, answer: &str) -> Option<&AnswerOption> {
        self.options
            .iter()
            .find(|o| o.value == answer)
            .or_else(|| self.options.iter().find(|o| o.label == answer))
    }

    /// The option whose value equals the conditional field's trigger, if any
    pub fn show_when_option(&self) -> Option<&AnswerOption> {
        let conditional = self.conditional.as_ref()?;
        self.options.iter().find(|o| o.value == conditional.show_when)
    }
}

/// Questions sorted by presentation order, ties broken by id
pub fn ordered(questions: &[QuestionDef]) -> Vec<&QuestionDef> {
    let mut sorted: Vec<&QuestionDef> = questions.iter().collect();
    sorted.sort_by(|a, b| a.order.cmp(&b.order).then_with(|| a.id.cmp(&b.id)));
    sorted
}

/// Number of questions in the schema
///
/// Conditional sub-fields do not count as steps of their own; they belong
/// to their parent question.
pub fn total_questions(questions: &[QuestionDef]) -> i64 {
    questions.len() as i64
}

/// All answer ids the schema can produce, conditional sub-ids included
pub fn question_ids(questions: &[QuestionDef]) -> Vec<&str> {
    let mut ids = Vec::with_capacity(questions.len());
    for q in questions {
        ids.push(q.id.as_str());
        if let Some(c) = &q.conditional {
            ids.push(c.id.as_str());
        }
    }
    ids
}

/// Validate a schema snapshot, returning warnings
///
/// A bad admin-entered schema must never take down lead capture, so
/// problems are reported for operator visibility instead of raised. The
/// evaluator treats unscoreable cases as zero regardless.
pub fn validate(questions: &[QuestionDef]) -> Vec<String> {
    let mut warnings = Vec::new();
    let mut seen = std::collections::HashSet::new();

    for q in questions {
        if !seen.insert(q.id.as_str()) {
            warnings.push(format!("duplicate question id '{}'", q.id));
        }

        match q.kind {
            QuestionKind::Select => {
                if q.options.is_empty() {
                    warnings.push(format!("select question '{}' has no options", q.id));
                }
            }
            _ => {
                if !q.options.is_empty() {
                    warnings.push(format!(
                        "question '{}' is not a select but carries {} options",
                        q.id,
                        q.options.len()
                    ));
                }
            }
        }

        if let Some(c) = &q.conditional {
            let trigger_matches = q.options.iter().filter(|o| o.value == c.show_when).count();
            if trigger_matches > 1 {
                warnings.push(format!(
                    "question '{}' has {} options matching conditional trigger '{}'",
                    q.id, trigger_matches, c.show_when
                ));
            }
            if !seen.insert(c.id.as_str()) {
                warnings.push(format!("duplicate question id '{}'", c.id));
            }
        }
    }

    warnings
}

/// Built-in default intake schema
///
/// Three contact-capture questions followed by three scoreable selects
/// worth up to 10 points each (30-point maximum). Used when the host has
/// no admin-configured schema yet.
pub fn default_questions() -> &'static [QuestionDef] {
    &DEFAULT_QUESTIONS
}

static DEFAULT_QUESTIONS: Lazy<Vec<QuestionDef>> = Lazy::new(|| {
    vec![
        QuestionDef {
            id: "name".into(),
            order: 1,
            title: "What's your name?".into(),
            kind: QuestionKind::Text,
            required: true,
            options: vec![],
            conditional: None,
        },
        QuestionDef {
            id: "email".into(),
            order: 2,
            title: "What's your email address?".into(),
            kind: QuestionKind::Email,
            required: true,
            options: vec![],
            conditional: None,
        },
        QuestionDef {
            id: "whatsapp".into(),
            order: 3,
            title: "What's your WhatsApp number?".into(),
            kind: QuestionKind::Tel,
            required: true,
            options: vec![],
            conditional: None,
        },
        QuestionDef {
            id: "service_interest".into(),
            order: 4,
            title: "What are you looking for?".into(),
            kind: QuestionKind::Select,
            required: true,
            options: vec![
                AnswerOption {
                    value: "brand_identity".into(),
                    label: "Complete brand identity".into(),
                    points: 10,
                },
                AnswerOption {
                    value: "website".into(),
                    label: "Website redesign".into(),
                    points: 7,
                },
                AnswerOption {
                    value: "social_media".into(),
                    label: "Social media management".into(),
                    points: 4,
                },
                AnswerOption {
                    value: "other".into(),
                    label: "Something else".into(),
                    points: 2,
                },
            ],
            conditional: Some(ConditionalField {
                show_when: "other".into(),
                id: "service_interest_other".into(),
                title: "Tell us what you need".into(),
                placeholder: Some("Describe your project".into()),
            }),
        },
        QuestionDef {
            id: "budget".into(),
            order: 5,
            title: "What budget do you have in mind?".into(),
            kind: QuestionKind::Select,
            required: true,
            options: vec![
                AnswerOption {
                    value: "over_5k".into(),
                    label: "More than $5,000".into(),
                    points: 10,
                },
                AnswerOption {
                    value: "2k_5k".into(),
                    label: "$2,000 to $5,000".into(),
                    points: 7,
                },
                AnswerOption {
                    value: "under_2k".into(),
                    label: "Under $2,000".into(),
                    points: 3,
                },
                AnswerOption {
                    value: "not_sure".into(),
                    label: "Not sure yet".into(),
                    points: 1,
                },
            ],
            conditional: None,
        },
        QuestionDef {
            id: "timeline".into(),
            order: 6,
            title: "When do you want to start?".into(),
            kind: QuestionKind::Select,
            required: true,
            options: vec![
                AnswerOption {
                    value: "asap".into(),
                    label: "As soon as possible".into(),
                    points: 10,
                },
                AnswerOption {
                    value: "this_quarter".into(),
                    label: "Within the next 3 months".into(),
                    points: 6,
                },
                AnswerOption {
                    value: "exploring".into(),
                    label: "Just exploring".into(),
                    points: 2,
                },
            ],
            conditional: None,
        },
    ]
});

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_schema_shape() {
        let questions = default_questions();
        assert_eq!(total_questions(questions), 6);
        assert!(validate(questions).is_empty());

        // Three scoreable selects, 10 points maximum each
        let max: u32 = questions
            .iter()
            .filter(|q| q.kind == QuestionKind::Select)
            .map(|q| q.options.iter().map(|o| o.points).max().unwrap_or(0))
            .sum();
        assert_eq!(max, 30);
    }

    #[test]
    fn test_ordered_breaks_ties_by_id() {
        let questions = vec![
            QuestionDef {
                id: "b".into(),
                order: 2,
                title: "B".into(),
                kind: QuestionKind::Text,
                required: false,
                options: vec![],
                conditional: None,
            },
            QuestionDef {
                id: "a".into(),
                order: 2,
                title: "A".into(),
                kind: QuestionKind::Text,
                required: false,
                options: vec![],
                conditional: None,
            },
            QuestionDef {
                id: "c".into(),
                order: 1,
                title: "C".into(),
                kind: QuestionKind::Text,
                required: false,
                options: vec![],
                conditional: None,
            },
        ];

        let sorted = ordered(&questions);
        let ids: Vec<&str> = sorted.iter().map(|q| q.id.as_str()).collect();
        assert_eq!(ids, vec!["c", "a", "b"]);
    }

    #[test]
    fn test_match_option_value_then_label() {
        let q = &default_questions()[3];
        assert_eq!(q.match_option("website").unwrap().points, 7);
        assert_eq!(q.match_option("Website redesign").unwrap().points, 7);
        assert!(q.match_option("no such thing").is_none());
    }

    #[test]
    fn test_question_ids_include_conditional_sub_ids() {
        let ids = question_ids(default_questions());
        assert!(ids.contains(&"service_interest"));
        assert!(ids.contains(&"service_interest_other"));
    }

    #[test]
    fn test_validate_flags_select_without_options() {
        let questions = vec![QuestionDef {
            id: "broken".into(),
            order: 1,
            title: "Broken".into(),
            kind: QuestionKind::Select,
            required: true,
            options: vec![],
            conditional: None,
        }];

        let warnings = validate(&questions);
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains("no options"));
    }

    #[test]
    fn test_validate_flags_duplicate_ids() {
        let mut questions: Vec<QuestionDef> = default_questions().to_vec();
        questions.push(questions[0].clone());

        let warnings = validate(&questions);
        assert!(warnings.iter().any(|w| w.contains("duplicate question id 'name'")));
    }

    #[test]
    fn test_schema_round_trips_through_serde() {
        let questions = default_questions();
        let json = serde_json::to_string(questions).unwrap();
        let parsed: Vec<QuestionDef> = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.len(), questions.len());
        assert_eq!(parsed[3].conditional.as_ref().unwrap().show_when, "other");
    }
}
