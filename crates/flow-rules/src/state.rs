use std::collections::BTreeMap;

use serde::{Serialize, Serializer};

/// Consumer-facing collapse of a [`QuestionState`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum VisibilityState {
    Show,
    Optional,
    Skip,
}

impl VisibilityState {
    pub fn as_str(&self) -> &'static str {
        match self {
            VisibilityState::Show => "show",
            VisibilityState::Optional => "optional",
            VisibilityState::Skip => "skip",
        }
    }
}

/// A transition requested by a matched directive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Skip,
    Optional,
    Require,
    Show,
}

/// Resolved visibility of one question.
///
/// Transitions only move toward `skip`; once skipped nothing re-shows the question.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuestionState {
    pub visible: bool,
    pub required: bool,
}

impl QuestionState {
    pub fn initial(required: bool) -> Self {
        Self {
            visible: true,
            required,
        }
    }

    pub fn is_skipped(&self) -> bool {
        !self.visible
    }

    pub fn apply(&mut self, transition: Transition) {
        if self.is_skipped() {
            return;
        }
        match transition {
            Transition::Skip => {
                self.visible = false;
                self.required = false;
            }
            Transition::Optional => self.required = false,
            Transition::Require => self.required = true,
            Transition::Show => {}
        }
    }

    pub fn state(&self) -> VisibilityState {
        match (self.visible, self.required) {
            (false, _) => VisibilityState::Skip,
            (true, false) => VisibilityState::Optional,
            (true, true) => VisibilityState::Show,
        }
    }
}

#[derive(Serialize)]
struct StateReport {
    state: VisibilityState,
    required: bool,
}

impl Serialize for QuestionState {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        StateReport {
            state: self.state(),
            required: self.required,
        }
        .serialize(serializer)
    }
}

/// `qid → state` for every question of a flow.
pub type VisibilityMap = BTreeMap<String, QuestionState>;

/// Builds the map from per-index states; the first question wins on duplicate qids.
pub(crate) fn collect_states<'a, I>(qids: I, states: &[QuestionState]) -> VisibilityMap
where
    I: IntoIterator<Item = &'a str>,
{
    let mut map = VisibilityMap::new();
    for (qid, state) in qids.into_iter().zip(states) {
        map.entry(qid.to_string()).or_insert(*state);
    }
    map
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn skip_is_terminal() {
        let mut state = QuestionState::initial(true);
        state.apply(Transition::Skip);
        for transition in [Transition::Show, Transition::Require, Transition::Optional] {
            state.apply(transition);
            assert_eq!(state.state(), VisibilityState::Skip);
            assert!(!state.required);
        }
    }

    #[test]
    fn optional_and_require_toggle_requiredness() {
        let mut state = QuestionState::initial(true);
        state.apply(Transition::Optional);
        assert_eq!(state.state(), VisibilityState::Optional);
        state.apply(Transition::Require);
        assert_eq!(state.state(), VisibilityState::Show);
        state.apply(Transition::Show);
        assert_eq!(state, QuestionState::initial(true));
    }

    #[test]
    fn serializes_as_state_and_required() {
        let value = serde_json::to_value(QuestionState::initial(false)).unwrap();
        assert_eq!(value, serde_json::json!({ "state": "optional", "required": false }));
    }
}
