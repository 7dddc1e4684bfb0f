use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::spec::question::Question;

/// A named, ordered sequence of questions (an onboarding or promotion form).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Flow {
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    pub questions: Vec<Question>,
}

impl Flow {
    pub fn new(name: impl Into<String>, questions: Vec<Question>) -> Self {
        Self {
            name: name.into(),
            title: None,
            version: None,
            questions,
        }
    }

    /// Position of the first question with this `qid`.
    pub fn index_of(&self, qid: &str) -> Option<usize> {
        self.questions.iter().position(|question| question.qid == qid)
    }

    /// Stable sort by `order`; questions whose orders collide keep their declared order.
    pub fn sort_by_order(&mut self) {
        self.questions.sort_by_key(Question::order_key);
    }
}
