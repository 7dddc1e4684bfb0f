use schemars::JsonSchema;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::spec::order::OrderKey;

/// Scalar kinds a question can collect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "snake_case")]
pub enum QuestionType {
    #[default]
    #[serde(alias = "text", alias = "short")]
    ShortText,
    Paragraph,
    Number,
    Boolean,
    #[serde(alias = "select")]
    SingleSelect,
    #[serde(alias = "multi")]
    MultiSelect,
}

/// One row of a flow, as produced by the external schema loader.
///
/// Rule text is kept raw; both engines parse it on demand.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Question {
    pub qid: String,
    #[serde(default, deserialize_with = "order_from_any")]
    #[schemars(with = "String")]
    pub order: String,
    #[serde(default)]
    pub label: String,
    #[serde(rename = "type", default)]
    pub kind: QuestionType,
    #[serde(default)]
    pub required: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<String>,
    /// Strict-grammar visibility directives (`skip_if(...)`, `show_if(...)`, ...).
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub visibility_rules: String,
    /// Strict-grammar navigation directives (`goto_if(..., target=qid)`).
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub nav_rules: String,
    /// Legacy clause text (`if ... skip ...`, `if ... goto ...`).
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub rules: String,
}

impl Question {
    pub fn new(qid: impl Into<String>, order: impl Into<String>) -> Self {
        Self {
            qid: qid.into(),
            order: order.into(),
            label: String::new(),
            kind: QuestionType::default(),
            required: false,
            options: Vec::new(),
            visibility_rules: String::new(),
            nav_rules: String::new(),
            rules: String::new(),
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    pub fn with_kind(mut self, kind: QuestionType) -> Self {
        self.kind = kind;
        self
    }

    pub fn required(mut self, required: bool) -> Self {
        self.required = required;
        self
    }

    pub fn with_options<I, S>(mut self, options: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.options = options.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_visibility_rules(mut self, rules: impl Into<String>) -> Self {
        self.visibility_rules = rules.into();
        self
    }

    pub fn with_nav_rules(mut self, rules: impl Into<String>) -> Self {
        self.nav_rules = rules.into();
        self
    }

    pub fn with_rules(mut self, rules: impl Into<String>) -> Self {
        self.rules = rules.into();
        self
    }

    pub fn order_key(&self) -> OrderKey {
        OrderKey::parse(&self.order)
    }
}

/// Spreadsheet exports hand us `order` as either `12`, `12.0` or `"12B"`.
fn order_from_any<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::Null => String::new(),
        Value::String(text) => text.trim().to_string(),
        Value::Number(number) => match number.as_f64() {
            Some(float) if float.fract() == 0.0 && float.abs() < 1e15 => {
                format!("{}", float as i64)
            }
            _ => number.to_string(),
        },
        other => other.to_string(),
    })
}
