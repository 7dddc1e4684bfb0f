//! `goto_if` resolution: a bounded walk over `qid → qid` edges with a visited set.

use std::collections::HashSet;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::answers::AnswerBag;
use crate::cache::{DirectiveCache, Parsed};
use crate::directive::{NavDirective, parse_nav_directives};
use crate::expr::EvalContext;
use crate::spec::question::Question;

/// Why a navigation walk was abandoned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NavGuard {
    /// The walk came back to a question it already visited.
    Cycle { qid: String },
    /// More chained jumps than the configured limit.
    HopLimit { hops: usize },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NavResolution {
    /// Jump to `index`, reached after `hops` chained directives.
    Override { index: usize, hops: usize },
    /// No directive fired; the caller continues in declared order.
    NoOverride,
    /// A guard tripped; treated like `NoOverride` by callers.
    Guarded(NavGuard),
}

impl NavResolution {
    pub fn index(&self) -> Option<usize> {
        match self {
            NavResolution::Override { index, .. } => Some(*index),
            NavResolution::NoOverride | NavResolution::Guarded(_) => None,
        }
    }
}

/// Evaluates the current question's `goto_if` directives in declared order, following
/// chained jumps through the targets' own directives.
pub fn resolve_navigation(
    questions: &[Question],
    current: usize,
    answers: &AnswerBag,
    cache: Option<&DirectiveCache>,
    max_hops: usize,
) -> NavResolution {
    let Some(start) = questions.get(current) else {
        return NavResolution::NoOverride;
    };

    let mut visited = HashSet::from([start.qid.as_str()]);
    let mut position = current;
    let mut hops = 0;

    loop {
        let Some(next) = first_matching_target(questions, position, answers, cache) else {
            break;
        };
        let target = &questions[next];
        if !visited.insert(target.qid.as_str()) {
            warn!(
                qid = %start.qid,
                revisited = %target.qid,
                "navigation cycle detected; falling back to declared order"
            );
            return NavResolution::Guarded(NavGuard::Cycle {
                qid: target.qid.clone(),
            });
        }
        hops += 1;
        if hops > max_hops {
            warn!(
                qid = %start.qid,
                hops,
                "navigation hop limit exceeded; falling back to declared order"
            );
            return NavResolution::Guarded(NavGuard::HopLimit { hops });
        }
        position = next;
    }

    if hops == 0 {
        NavResolution::NoOverride
    } else {
        debug!(qid = %start.qid, target = %questions[position].qid, hops, "navigation override");
        NavResolution::Override {
            index: position,
            hops,
        }
    }
}

/// Index of the first directive target whose expression holds, skipping unknown targets.
fn first_matching_target(
    questions: &[Question],
    position: usize,
    answers: &AnswerBag,
    cache: Option<&DirectiveCache>,
) -> Option<usize> {
    let owner = &questions[position];
    if owner.nav_rules.trim().is_empty() {
        return None;
    }

    let parsed = parse_for(owner, cache);
    let directives = match parsed.as_ref() {
        Ok(directives) => directives,
        Err(err) => {
            warn!(
                qid = %owner.qid,
                rules = %owner.nav_rules,
                error = %err,
                "ignoring navigation rules that failed to parse"
            );
            return None;
        }
    };

    let ctx = EvalContext::navigation(answers, &owner.qid);
    for directive in directives {
        let Some(target) = questions
            .iter()
            .position(|question| question.qid == directive.target_qid)
        else {
            warn!(
                qid = %owner.qid,
                directive = %directive.raw_text,
                target = %directive.target_qid,
                "skipping goto_if with unknown target"
            );
            continue;
        };
        match directive.expression.matches(&ctx) {
            Ok(true) => return Some(target),
            Ok(false) => {}
            Err(err) => warn!(
                qid = %owner.qid,
                directive = %directive.raw_text,
                error = %err,
                "goto_if failed to evaluate; treating as not matched"
            ),
        }
    }
    None
}

fn parse_for(question: &Question, cache: Option<&DirectiveCache>) -> Parsed<NavDirective> {
    match cache {
        Some(cache) => cache.navigation(&question.nav_rules),
        None => Arc::new(parse_nav_directives(&question.nav_rules)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resolve(questions: &[Question], current: usize, answers: &AnswerBag) -> NavResolution {
        resolve_navigation(questions, current, answers, None, 10)
    }

    #[test]
    fn first_true_directive_wins() {
        let questions = vec![
            Question::new("start", "1").with_nav_rules(
                "goto_if(value = 'no', target=end)\n\
                 goto_if(value = 'yes', target=middle)\n\
                 goto_if(true, target=end)",
            ),
            Question::new("middle", "2"),
            Question::new("end", "3"),
        ];
        let answers = AnswerBag::new().with("start", "yes");
        assert_eq!(
            resolve(&questions, 0, &answers),
            NavResolution::Override { index: 1, hops: 1 }
        );
    }

    #[test]
    fn chained_jumps_are_followed() {
        let questions = vec![
            Question::new("a", "1").with_nav_rules("goto_if(true, target=b)"),
            Question::new("b", "2").with_nav_rules("goto_if(true, target=d)"),
            Question::new("c", "3"),
            Question::new("d", "4"),
        ];
        assert_eq!(
            resolve(&questions, 0, &AnswerBag::new()),
            NavResolution::Override { index: 3, hops: 2 }
        );
    }

    #[test]
    fn mutual_gotos_trip_the_cycle_guard() {
        let questions = vec![
            Question::new("a", "1").with_nav_rules("goto_if(true, target=b)"),
            Question::new("b", "2").with_nav_rules("goto_if(true, target=a)"),
        ];
        assert_eq!(
            resolve(&questions, 0, &AnswerBag::new()),
            NavResolution::Guarded(NavGuard::Cycle { qid: "a".into() })
        );
    }

    #[test]
    fn self_goto_is_a_cycle() {
        let questions = vec![Question::new("a", "1").with_nav_rules("goto_if(true, target=a)")];
        assert_eq!(resolve(&questions, 0, &AnswerBag::new()).index(), None);
    }

    #[test]
    fn long_chains_hit_the_hop_limit() {
        let questions = (0..15)
            .map(|i| {
                Question::new(format!("q{i}"), i.to_string())
                    .with_nav_rules(format!("goto_if(true, target=q{})", i + 1))
            })
            .chain(std::iter::once(Question::new("q15", "15")))
            .collect::<Vec<_>>();
        assert_eq!(
            resolve(&questions, 0, &AnswerBag::new()),
            NavResolution::Guarded(NavGuard::HopLimit { hops: 11 })
        );
        assert_eq!(
            resolve_navigation(&questions, 10, &AnswerBag::new(), None, 10),
            NavResolution::Override {
                index: 15,
                hops: 5
            }
        );
    }

    #[test]
    fn unknown_target_is_skipped() {
        let questions = vec![
            Question::new("a", "1")
                .with_nav_rules("goto_if(true, target=ghost)\ngoto_if(true, target=b)"),
            Question::new("b", "2"),
        ];
        assert_eq!(resolve(&questions, 0, &AnswerBag::new()).index(), Some(1));
    }

    #[test]
    fn no_rules_or_out_of_range_means_no_override() {
        let questions = vec![Question::new("a", "1")];
        assert_eq!(resolve(&questions, 0, &AnswerBag::new()), NavResolution::NoOverride);
        assert_eq!(resolve(&questions, 7, &AnswerBag::new()), NavResolution::NoOverride);
    }

    #[test]
    fn value_refers_to_the_question_owning_the_directive() {
        let questions = vec![
            Question::new("a", "1").with_nav_rules("goto_if(true, target=b)"),
            Question::new("b", "2").with_nav_rules("goto_if(value = 'x', target=d)"),
            Question::new("c", "3"),
            Question::new("d", "4"),
        ];
        let only_a = AnswerBag::new().with("a", "x");
        assert_eq!(resolve(&questions, 0, &only_a).index(), Some(1));
        let b_answered = AnswerBag::new().with("b", "x");
        assert_eq!(resolve(&questions, 0, &b_answered).index(), Some(3));
    }
}
