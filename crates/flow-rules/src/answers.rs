//! Answer values and the token extraction that both rule engines compare against.
//!
//! Whatever shape the answer UI produced (plain text, `{value, label}` selections,
//! `{values: [...]}` multi-selects, nested lists) is flattened here into a list of
//! string tokens. Nothing downstream looks at the raw shape again.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;
use serde::Deserialize;
use serde_json::Value;

/// Absolute tolerance for numeric token equality.
pub const NUMERIC_TOLERANCE: f64 = 1e-9;

static NUMERIC_TOKEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^-?\d+(\.\d+)?$").expect("numeric token pattern"));

/// One collected answer.
#[derive(Debug, Clone, PartialEq, Deserialize, Default)]
#[serde(from = "Value")]
pub enum AnswerValue {
    #[default]
    Empty,
    Bool(bool),
    Number(serde_json::Number),
    Text(String),
    Selection {
        value: Box<AnswerValue>,
        label: Option<String>,
    },
    MultiSelection {
        values: Vec<AnswerValue>,
    },
    List(Vec<AnswerValue>),
    Map(BTreeMap<String, AnswerValue>),
}

impl AnswerValue {
    pub fn text(value: impl Into<String>) -> Self {
        AnswerValue::Text(value.into())
    }

    pub fn is_empty(&self) -> bool {
        extract_tokens(self).is_empty()
    }
}

impl From<&Value> for AnswerValue {
    fn from(value: &Value) -> Self {
        match value {
            Value::Null => AnswerValue::Empty,
            Value::Bool(flag) => AnswerValue::Bool(*flag),
            Value::Number(number) => AnswerValue::Number(number.clone()),
            Value::String(text) => AnswerValue::Text(text.clone()),
            Value::Array(items) => AnswerValue::List(items.iter().map(AnswerValue::from).collect()),
            Value::Object(map) => {
                if let Some(Value::Array(values)) = map.get("values") {
                    AnswerValue::MultiSelection {
                        values: values.iter().map(AnswerValue::from).collect(),
                    }
                } else if map.contains_key("value") || map.contains_key("label") {
                    AnswerValue::Selection {
                        value: Box::new(
                            map.get("value")
                                .map(AnswerValue::from)
                                .unwrap_or_default(),
                        ),
                        label: map.get("label").and_then(Value::as_str).map(str::to_string),
                    }
                } else {
                    AnswerValue::Map(
                        map.iter()
                            .map(|(key, value)| (key.clone(), AnswerValue::from(value)))
                            .collect(),
                    )
                }
            }
        }
    }
}

impl From<Value> for AnswerValue {
    fn from(value: Value) -> Self {
        AnswerValue::from(&value)
    }
}

impl From<&str> for AnswerValue {
    fn from(value: &str) -> Self {
        AnswerValue::Text(value.to_string())
    }
}

/// Answers keyed by question `qid`.
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(transparent)]
pub struct AnswerBag {
    answers: BTreeMap<String, AnswerValue>,
}

impl AnswerBag {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a bag from a JSON object; anything else yields an empty bag.
    pub fn from_json(value: &Value) -> Self {
        let answers = value
            .as_object()
            .map(|map| {
                map.iter()
                    .map(|(qid, answer)| (qid.clone(), AnswerValue::from(answer)))
                    .collect()
            })
            .unwrap_or_default();
        Self { answers }
    }

    pub fn insert(&mut self, qid: impl Into<String>, value: impl Into<AnswerValue>) {
        self.answers.insert(qid.into(), value.into());
    }

    pub fn with(mut self, qid: impl Into<String>, value: impl Into<AnswerValue>) -> Self {
        self.insert(qid, value);
        self
    }

    pub fn get(&self, qid: &str) -> Option<&AnswerValue> {
        self.answers.get(qid)
    }

    /// Tokens of the answer for `qid`; empty when unanswered.
    pub fn tokens(&self, qid: &str) -> Vec<String> {
        self.get(qid).map(extract_tokens).unwrap_or_default()
    }

    pub fn is_answered(&self, qid: &str) -> bool {
        self.get(qid).is_some_and(|value| !value.is_empty())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &AnswerValue)> {
        self.answers.iter()
    }

    pub fn len(&self) -> usize {
        self.answers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.answers.is_empty()
    }
}

impl<K, V> FromIterator<(K, V)> for AnswerBag
where
    K: Into<String>,
    V: Into<AnswerValue>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            answers: iter
                .into_iter()
                .map(|(key, value)| (key.into(), value.into()))
                .collect(),
        }
    }
}

/// Flattens an answer into its comparison tokens.
pub fn extract_tokens(value: &AnswerValue) -> Vec<String> {
    let mut tokens = Vec::new();
    collect_tokens(value, &mut tokens);
    tokens
}

fn collect_tokens(value: &AnswerValue, out: &mut Vec<String>) {
    match value {
        AnswerValue::Empty => {}
        AnswerValue::Bool(flag) => out.push(flag.to_string()),
        AnswerValue::Number(number) => out.push(number.to_string()),
        AnswerValue::Text(text) => {
            let trimmed = text.trim();
            if !trimmed.is_empty() {
                out.push(trimmed.to_string());
            }
        }
        AnswerValue::Selection { value, label } => {
            let before = out.len();
            collect_tokens(value, out);
            if out.len() == before
                && let Some(label) = label
            {
                collect_tokens(&AnswerValue::Text(label.clone()), out);
            }
        }
        AnswerValue::MultiSelection { values } | AnswerValue::List(values) => {
            for item in values {
                collect_tokens(item, out);
            }
        }
        AnswerValue::Map(map) => {
            for item in map.values() {
                collect_tokens(item, out);
            }
        }
    }
}

/// Parses a token that looks like `-?\d+(\.\d+)?`. Unit suffixes (`5.2M`) are not numeric.
pub fn numeric_token(token: &str) -> Option<f64> {
    let trimmed = token.trim();
    if NUMERIC_TOKEN.is_match(trimmed) {
        trimmed.parse::<f64>().ok()
    } else {
        None
    }
}

pub fn numbers_equal(left: f64, right: f64) -> bool {
    (left - right).abs() <= NUMERIC_TOLERANCE
}
