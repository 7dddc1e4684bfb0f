//! Fixed-point resolution of strict visibility directives.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::answers::AnswerBag;
use crate::cache::{DirectiveCache, Parsed};
use crate::directive::{VisibilityDirective, parse_visibility_directives};
use crate::expr::EvalContext;
use crate::spec::question::Question;
use crate::state::{QuestionState, VisibilityMap, collect_states};

/// A parsed directive bound to the question index it acts on.
struct Bound<'a> {
    owner: &'a str,
    target: usize,
    directive: &'a VisibilityDirective,
}

/// Applies every question's visibility directives until a pass changes nothing or
/// `max_passes` is spent.
///
/// Parse errors disable the offending question's directives (it stays visible with its
/// declared requiredness). Evaluation errors count as "not matched" for that directive.
pub fn resolve_visibility(
    questions: &[Question],
    answers: &AnswerBag,
    cache: Option<&DirectiveCache>,
    max_passes: usize,
) -> VisibilityMap {
    resolve_counting_passes(questions, answers, cache, max_passes).0
}

/// Same as [`resolve_visibility`], also returning how many passes ran.
pub(crate) fn resolve_counting_passes(
    questions: &[Question],
    answers: &AnswerBag,
    cache: Option<&DirectiveCache>,
    max_passes: usize,
) -> (VisibilityMap, usize) {
    let parsed = questions
        .iter()
        .map(|question| parse_for(question, cache))
        .collect::<Vec<_>>();

    let mut bound = Vec::new();
    for (index, (question, directives)) in questions.iter().zip(&parsed).enumerate() {
        let directives = match directives.as_ref() {
            Ok(directives) => directives,
            Err(err) => {
                warn!(
                    qid = %question.qid,
                    rules = %question.visibility_rules,
                    error = %err,
                    "ignoring visibility rules that failed to parse"
                );
                continue;
            }
        };
        for directive in directives {
            let target = match &directive.target {
                None => index,
                Some(qid) => match questions.iter().position(|candidate| &candidate.qid == qid) {
                    Some(target) => target,
                    None => {
                        warn!(
                            qid = %question.qid,
                            directive = %directive.raw_text,
                            target = %qid,
                            "dropping visibility directive with unknown target"
                        );
                        continue;
                    }
                },
            };
            bound.push(Bound {
                owner: &question.qid,
                target,
                directive,
            });
        }
    }

    let mut states = questions
        .iter()
        .map(|question| QuestionState::initial(question.required))
        .collect::<Vec<_>>();
    let ctx = EvalContext::visibility(answers);

    let mut passes = 0;
    loop {
        passes += 1;
        let previous = states.clone();

        for entry in &bound {
            if states[entry.target].is_skipped() {
                continue;
            }
            match entry.directive.expression.matches(&ctx) {
                Ok(true) => states[entry.target].apply(entry.directive.kind.transition()),
                Ok(false) => {}
                Err(err) => {
                    if passes == 1 {
                        warn!(
                            qid = %entry.owner,
                            directive = %entry.directive.raw_text,
                            error = %err,
                            "visibility directive failed to evaluate; treating as not matched"
                        );
                    }
                }
            }
        }

        if states == previous {
            break;
        }
        if passes >= max_passes {
            warn!(
                passes,
                "visibility rules did not settle within the pass limit; keeping last state"
            );
            break;
        }
    }
    debug!(passes, questions = questions.len(), "visibility resolved");

    let map = collect_states(questions.iter().map(|question| question.qid.as_str()), &states);
    (map, passes)
}

fn parse_for(question: &Question, cache: Option<&DirectiveCache>) -> Parsed<VisibilityDirective> {
    match cache {
        Some(cache) => cache.visibility(&question.visibility_rules),
        None => Arc::new(parse_visibility_directives(&question.visibility_rules)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::VisibilityState;

    fn resolve(questions: &[Question], answers: &AnswerBag) -> VisibilityMap {
        resolve_visibility(questions, answers, None, 5)
    }

    #[test]
    fn no_rules_keeps_declared_requiredness() {
        let questions = vec![
            Question::new("a", "1").required(true),
            Question::new("b", "2"),
        ];
        let map = resolve(&questions, &AnswerBag::new());
        assert_eq!(map["a"].state(), VisibilityState::Show);
        assert_eq!(map["b"].state(), VisibilityState::Optional);
    }

    #[test]
    fn targeted_directive_acts_on_other_question() {
        let questions = vec![
            Question::new("role", "1")
                .with_visibility_rules("skip_if(role = 'dps', target=gear)"),
            Question::new("gear", "2").required(true),
        ];
        let answers = AnswerBag::new().with("role", "dps");
        let map = resolve(&questions, &answers);
        assert_eq!(map["role"].state(), VisibilityState::Optional);
        assert_eq!(map["gear"].state(), VisibilityState::Skip);
    }

    #[test]
    fn parse_error_fails_open_for_that_question_only() {
        let questions = vec![
            Question::new("broken", "1")
                .required(true)
                .with_visibility_rules("skip_if(true)\nskip_if(role in 'tank')"),
            Question::new("ok", "2").with_visibility_rules("skip_if(true)"),
        ];
        let map = resolve(&questions, &AnswerBag::new());
        assert_eq!(map["broken"].state(), VisibilityState::Show);
        assert!(map["broken"].required);
        assert_eq!(map["ok"].state(), VisibilityState::Skip);
    }

    #[test]
    fn eval_error_only_disables_the_failing_directive() {
        let questions = vec![Question::new("q", "1").required(true).with_visibility_rules(
            "skip_if(int(missing) > 3)\noptional_if(true)",
        )];
        let map = resolve(&questions, &AnswerBag::new());
        assert_eq!(map["q"].state(), VisibilityState::Optional);
    }

    #[test]
    fn passes_stop_at_fixed_point_or_limit() {
        let questions = vec![
            Question::new("a", "1")
                .required(true)
                .with_visibility_rules("optional_if(true)"),
            Question::new("b", "2").with_visibility_rules("skip_if(true, target=a)"),
        ];
        let answers = AnswerBag::new();

        let (settled, passes) = resolve_counting_passes(&questions, &answers, None, 5);
        assert_eq!(passes, 2);
        assert_eq!(settled["a"].state(), VisibilityState::Skip);

        let (capped, passes) = resolve_counting_passes(&questions, &answers, None, 1);
        assert_eq!(passes, 1);
        assert_eq!(capped, settled);

        let plain = vec![Question::new("c", "1")];
        assert_eq!(resolve_counting_passes(&plain, &answers, None, 5).1, 1);
    }

    #[test]
    fn duplicate_qids_report_the_first_question() {
        let questions = vec![
            Question::new("dup", "1").required(true),
            Question::new("dup", "2").with_visibility_rules("skip_if(true)"),
        ];
        let map = resolve(&questions, &AnswerBag::new());
        assert_eq!(map.len(), 1);
        assert_eq!(map["dup"].state(), VisibilityState::Show);
    }
}
