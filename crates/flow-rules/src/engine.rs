//! Engine dispatch: one entry point over the strict and legacy rule engines.

use crate::answers::AnswerBag;
use crate::cache::DirectiveCache;
use crate::config::{DEFAULT_MAX_NAV_HOPS, DEFAULT_MAX_VISIBILITY_PASSES, EngineConfig, EngineKind};
use crate::legacy::LegacyEngine;
use crate::navigation::{NavResolution, resolve_navigation};
use crate::spec::question::Question;
use crate::state::VisibilityMap;
use crate::visibility::resolve_visibility;

/// Grammar-based engine with bounded passes and an optional parse cache.
#[derive(Debug)]
pub struct StrictEngine {
    cache: Option<DirectiveCache>,
    max_visibility_passes: usize,
    max_nav_hops: usize,
}

impl Default for StrictEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl StrictEngine {
    /// Default limits, no cache.
    pub fn new() -> Self {
        Self {
            cache: None,
            max_visibility_passes: DEFAULT_MAX_VISIBILITY_PASSES,
            max_nav_hops: DEFAULT_MAX_NAV_HOPS,
        }
    }

    pub fn from_config(config: &EngineConfig) -> Self {
        Self {
            cache: config.cache.then(DirectiveCache::new),
            max_visibility_passes: config.max_visibility_passes,
            max_nav_hops: config.max_nav_hops,
        }
    }

    pub fn with_cache(mut self) -> Self {
        self.cache = Some(DirectiveCache::new());
        self
    }

    pub fn cache(&self) -> Option<&DirectiveCache> {
        self.cache.as_ref()
    }

    pub fn evaluate_visibility(
        &self,
        questions: &[Question],
        answers: &AnswerBag,
    ) -> VisibilityMap {
        resolve_visibility(
            questions,
            answers,
            self.cache.as_ref(),
            self.max_visibility_passes,
        )
    }

    pub fn resolve_navigation(
        &self,
        questions: &[Question],
        current: usize,
        answers: &AnswerBag,
    ) -> NavResolution {
        resolve_navigation(
            questions,
            current,
            answers,
            self.cache.as_ref(),
            self.max_nav_hops,
        )
    }

    pub fn next_index_by_rules(
        &self,
        questions: &[Question],
        current: usize,
        answers: &AnswerBag,
    ) -> Option<usize> {
        self.resolve_navigation(questions, current, answers).index()
    }
}

/// The engine selected for a flow.
#[derive(Debug)]
pub enum RuleEngine {
    Strict(StrictEngine),
    Legacy(LegacyEngine),
}

impl Default for RuleEngine {
    fn default() -> Self {
        RuleEngine::Strict(StrictEngine::new())
    }
}

impl RuleEngine {
    pub fn from_config(config: &EngineConfig) -> Self {
        match config.engine {
            EngineKind::Strict => RuleEngine::Strict(StrictEngine::from_config(config)),
            EngineKind::Legacy => RuleEngine::Legacy(LegacyEngine::new()),
        }
    }

    pub fn kind(&self) -> EngineKind {
        match self {
            RuleEngine::Strict(_) => EngineKind::Strict,
            RuleEngine::Legacy(_) => EngineKind::Legacy,
        }
    }

    pub fn evaluate_visibility(
        &self,
        questions: &[Question],
        answers: &AnswerBag,
    ) -> VisibilityMap {
        match self {
            RuleEngine::Strict(engine) => engine.evaluate_visibility(questions, answers),
            RuleEngine::Legacy(engine) => engine.evaluate_visibility(questions, answers),
        }
    }

    pub fn next_index_by_rules(
        &self,
        questions: &[Question],
        current: usize,
        answers: &AnswerBag,
    ) -> Option<usize> {
        match self {
            RuleEngine::Strict(engine) => engine.next_index_by_rules(questions, current, answers),
            RuleEngine::Legacy(engine) => engine.next_index_by_rules(questions, current, answers),
        }
    }
}

/// Where the flow goes after `current`: the rule override when one fires, else the next
/// question in declared order that is not skipped. `None` once the flow is exhausted.
///
/// An override that lands on a skipped question advances linearly from there.
pub fn next_question_index(
    engine: &RuleEngine,
    questions: &[Question],
    current: usize,
    answers: &AnswerBag,
    visibility: &VisibilityMap,
) -> Option<usize> {
    let is_skipped = |index: usize| {
        visibility
            .get(&questions[index].qid)
            .is_some_and(|state| state.is_skipped())
    };
    let first_unskipped_from =
        |start: usize| (start..questions.len()).find(|&index| !is_skipped(index));

    match engine.next_index_by_rules(questions, current, answers) {
        Some(target) if !is_skipped(target) => Some(target),
        Some(target) => first_unskipped_from(target + 1),
        None => first_unskipped_from(current.saturating_add(1)),
    }
}

/// Visibility with the strict engine and default limits.
pub fn evaluate_visibility(questions: &[Question], answers: &AnswerBag) -> VisibilityMap {
    StrictEngine::new().evaluate_visibility(questions, answers)
}

/// Navigation override with the strict engine and default limits.
pub fn next_index_by_rules(
    questions: &[Question],
    current: usize,
    answers: &AnswerBag,
) -> Option<usize> {
    StrictEngine::new().next_index_by_rules(questions, current, answers)
}
