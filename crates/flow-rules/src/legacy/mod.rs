//! Pattern-based rule engine kept for flows authored before the directive grammar.
//!
//! Visibility clauses live on the *trigger* question and name their targets
//! explicitly; navigation clauses jump to a declared `order`. Nothing here uses the
//! strict lexer or parser.

pub mod clause;
pub mod matching;
pub mod targets;

use tracing::{debug, warn};

use crate::answers::AnswerBag;
use crate::spec::question::Question;
use crate::state::{QuestionState, Transition, VisibilityMap, collect_states};

pub use clause::{Action, CompareOp, Condition, LegacyClause, parse_legacy_rules};
pub use targets::{resolve_order, resolve_target};

#[derive(Debug, Clone, Copy, Default)]
pub struct LegacyEngine;

impl LegacyEngine {
    pub fn new() -> Self {
        Self
    }

    /// Applies every question's `if ... skip|make ...` clauses to their targets.
    ///
    /// Conditions read answers only, so a single pass is already the fixed point.
    pub fn evaluate_visibility(
        &self,
        questions: &[Question],
        answers: &AnswerBag,
    ) -> VisibilityMap {
        let mut states = questions
            .iter()
            .map(|question| QuestionState::initial(question.required))
            .collect::<Vec<_>>();

        for question in questions {
            for clause in clauses_for(questions, question) {
                let LegacyClause::Visibility {
                    condition,
                    action,
                    targets,
                    raw,
                } = &clause
                else {
                    log_ignored(question, &clause);
                    continue;
                };

                if !condition_holds(condition, question, answers) {
                    continue;
                }

                let transition = match action {
                    Action::Skip => Transition::Skip,
                    Action::Optional => Transition::Optional,
                    Action::Required => Transition::Require,
                };
                for target in targets {
                    let indices = resolve_target(questions, target);
                    if indices.is_empty() {
                        warn!(
                            qid = %question.qid,
                            clause = %raw,
                            target = %target,
                            "legacy target matched no question"
                        );
                    }
                    for index in indices {
                        states[index].apply(transition);
                    }
                }
            }
        }

        collect_states(questions.iter().map(|question| question.qid.as_str()), &states)
    }

    /// First `goto` / `else goto` among the current question's clauses that resolves to
    /// a question, in declared order.
    pub fn next_index_by_rules(
        &self,
        questions: &[Question],
        current: usize,
        answers: &AnswerBag,
    ) -> Option<usize> {
        let question = questions.get(current)?;
        for clause in clauses_for(questions, question) {
            let LegacyClause::Navigation {
                subject,
                op,
                values,
                then_order,
                else_order,
                raw,
            } = &clause
            else {
                continue;
            };

            let holds = matching::compare(&subject_tokens(subject, answers), *op, values);
            let order = if holds { then_order } else { else_order };
            let Some(order) = order else {
                continue;
            };
            match resolve_order(questions, order) {
                Some(index) => {
                    debug!(
                        qid = %question.qid,
                        clause = %raw,
                        target = %questions[index].qid,
                        "legacy goto"
                    );
                    return Some(index);
                }
                None => warn!(
                    qid = %question.qid,
                    clause = %raw,
                    order = %order,
                    "legacy goto names an unknown order"
                ),
            }
        }
        None
    }
}

fn clauses_for(questions: &[Question], question: &Question) -> Vec<LegacyClause> {
    if question.rules.trim().is_empty() {
        return Vec::new();
    }
    parse_legacy_rules(&question.rules, |candidate| {
        questions
            .iter()
            .any(|question| question.qid.eq_ignore_ascii_case(candidate))
    })
}

fn condition_holds(condition: &Condition, owner: &Question, answers: &AnswerBag) -> bool {
    match condition {
        Condition::Compare {
            subject,
            op,
            values,
        } => matching::compare(&subject_tokens(subject, answers), *op, values),
        Condition::Text { alternatives } => {
            matching::compare(&answers.tokens(&owner.qid), CompareOp::In, alternatives)
        }
    }
}

/// Subjects are matched to answers case-insensitively, like targets are to qids.
fn subject_tokens(subject: &str, answers: &AnswerBag) -> Vec<String> {
    let tokens = answers.tokens(subject);
    if !tokens.is_empty() {
        return tokens;
    }
    answers
        .iter()
        .find(|(qid, _)| qid.eq_ignore_ascii_case(subject))
        .map(|(qid, _)| answers.tokens(qid))
        .unwrap_or_default()
}

fn log_ignored(question: &Question, clause: &LegacyClause) {
    match clause {
        LegacyClause::RangeSkip { raw } => {
            debug!(qid = %question.qid, clause = %raw, "ignoring legacy order-range skip")
        }
        LegacyClause::Unrecognized { raw } => {
            warn!(qid = %question.qid, clause = %raw, "unrecognized legacy rule clause")
        }
        LegacyClause::Navigation { .. } | LegacyClause::Visibility { .. } => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::VisibilityState;

    fn flow() -> Vec<Question> {
        vec![
            Question::new("role", "1")
                .required(true)
                .with_rules("if role in [tank, heal] skip gear_score\nif dps make 3 optional"),
            Question::new("gear_score", "2").required(true),
            Question::new("rotation", "3")
                .required(true)
                .with_label("Rotation notes"),
            Question::new("power", "4")
                .with_rules("if power >= 1000000 goto 6 else goto 5\nskip order>=5 and order<6"),
            Question::new("low_power", "5"),
            Question::new("officer", "6"),
        ]
    }

    #[test]
    fn skip_clause_targets_named_question() {
        let answers = AnswerBag::new().with("role", "heal");
        let map = LegacyEngine.evaluate_visibility(&flow(), &answers);
        assert_eq!(map["gear_score"].state(), VisibilityState::Skip);
        assert_eq!(map["rotation"].state(), VisibilityState::Show);
        assert_eq!(map["role"].state(), VisibilityState::Show);
    }

    #[test]
    fn free_text_condition_matches_owner_answer() {
        let answers = AnswerBag::new().with("role", "DPS");
        let map = LegacyEngine.evaluate_visibility(&flow(), &answers);
        assert_eq!(map["gear_score"].state(), VisibilityState::Show);
        assert_eq!(map["rotation"].state(), VisibilityState::Optional);
    }

    #[test]
    fn goto_and_else_goto() {
        let strong = AnswerBag::new().with("power", "2500000");
        assert_eq!(LegacyEngine.next_index_by_rules(&flow(), 3, &strong), Some(5));
        let weak = AnswerBag::new().with("power", "5.2M");
        assert_eq!(LegacyEngine.next_index_by_rules(&flow(), 3, &weak), Some(4));
        assert_eq!(LegacyEngine.next_index_by_rules(&flow(), 0, &weak), None);
    }

    #[test]
    fn goto_subject_ignores_case_like_visibility() {
        let questions = vec![
            Question::new("power", "1").with_rules(
                "if POWER >= 5 skip notes\nif POWER >= 5 goto 3 else goto 2",
            ),
            Question::new("notes", "2").required(true),
            Question::new("officer", "3"),
        ];
        let strong = AnswerBag::new().with("power", "9");
        let map = LegacyEngine.evaluate_visibility(&questions, &strong);
        assert_eq!(map["notes"].state(), VisibilityState::Skip);
        assert_eq!(LegacyEngine.next_index_by_rules(&questions, 0, &strong), Some(2));

        let weak = AnswerBag::new().with("power", "2");
        assert_eq!(LegacyEngine.next_index_by_rules(&questions, 0, &weak), Some(1));
    }

    #[test]
    fn unknown_targets_and_orders_are_dropped() {
        let questions = vec![
            Question::new("a", "1").with_rules("if yes skip nowhere, b\nif a = yes goto 99"),
            Question::new("b", "2").required(true),
        ];
        let answers = AnswerBag::new().with("a", "yes");
        let map = LegacyEngine.evaluate_visibility(&questions, &answers);
        assert_eq!(map["b"].state(), VisibilityState::Skip);
        assert_eq!(LegacyEngine.next_index_by_rules(&questions, 0, &answers), None);
    }
}
