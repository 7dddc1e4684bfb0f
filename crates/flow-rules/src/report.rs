use serde::Serialize;
use serde_json::{Map, Value, json};

use crate::answers::AnswerBag;
use crate::config::EngineKind;
use crate::engine::{RuleEngine, next_question_index};
use crate::spec::flow::Flow;
use crate::state::{VisibilityMap, VisibilityState};

/// Per-state counters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReportCounts {
    pub show: usize,
    pub optional: usize,
    pub skip: usize,
    pub answered: usize,
}

/// One question as seen by the renderers.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportQuestion {
    pub qid: String,
    pub order: String,
    pub label: String,
    pub state: VisibilityState,
    pub required: bool,
    pub answered: bool,
}

/// Evaluation of one flow against one answer bag.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FlowReport {
    pub flow: String,
    pub engine: EngineKind,
    pub questions: Vec<ReportQuestion>,
    pub counts: ReportCounts,
    /// Next index after `current`, or the first unskipped question when no current
    /// position was given.
    pub next_index: Option<usize>,
    pub next_qid: Option<String>,
    #[serde(skip)]
    pub visibility: VisibilityMap,
}

/// Runs both resolvers and collects the renderer payload.
pub fn build_report(
    flow: &Flow,
    engine: &RuleEngine,
    answers: &AnswerBag,
    current: Option<usize>,
) -> FlowReport {
    let visibility = engine.evaluate_visibility(&flow.questions, answers);

    let mut counts = ReportCounts::default();
    let questions = flow
        .questions
        .iter()
        .filter_map(|question| {
            let state = visibility.get(&question.qid)?;
            let answered = answers.is_answered(&question.qid);
            match state.state() {
                VisibilityState::Show => counts.show += 1,
                VisibilityState::Optional => counts.optional += 1,
                VisibilityState::Skip => counts.skip += 1,
            }
            if answered {
                counts.answered += 1;
            }
            Some(ReportQuestion {
                qid: question.qid.clone(),
                order: question.order.clone(),
                label: question.label.clone(),
                state: state.state(),
                required: state.required,
                answered,
            })
        })
        .collect::<Vec<_>>();

    let next_index = match current {
        Some(current) => {
            next_question_index(engine, &flow.questions, current, answers, &visibility)
        }
        None => flow
            .questions
            .iter()
            .position(|question| {
                visibility
                    .get(&question.qid)
                    .is_some_and(|state| !state.is_skipped())
            }),
    };
    let next_qid = next_index.map(|index| flow.questions[index].qid.clone());

    FlowReport {
        flow: flow.name.clone(),
        engine: engine.kind(),
        questions,
        counts,
        next_index,
        next_qid,
        visibility,
    }
}

/// The `qid → {state, required}` mapping.
pub fn render_json(report: &FlowReport) -> Value {
    let mut map = Map::new();
    for (qid, state) in &report.visibility {
        map.insert(
            qid.clone(),
            json!({
                "state": state.state().as_str(),
                "required": state.required,
            }),
        );
    }
    Value::Object(map)
}

/// Human-readable listing, one question per line.
pub fn render_text(report: &FlowReport) -> String {
    let mut lines = Vec::new();
    lines.push(format!("Flow: {} (engine: {})", report.flow, report.engine));
    lines.push(format!(
        "States: {} show, {} optional, {} skip ({} answered)",
        report.counts.show, report.counts.optional, report.counts.skip, report.counts.answered
    ));
    match &report.next_qid {
        Some(qid) => lines.push(format!("Next question: {qid}")),
        None => lines.push("Next question: none".to_string()),
    }
    lines.push(String::new());

    for question in &report.questions {
        let marker = if question.answered { "*" } else { " " };
        let label = if question.label.is_empty() {
            String::new()
        } else {
            format!(" {}", question.label)
        };
        lines.push(format!(
            "{marker} [{:>8}] {:<5} {}{}{}",
            question.state.as_str(),
            question.order,
            question.qid,
            label,
            if question.required { " (required)" } else { "" },
        ));
    }

    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spec::question::Question;

    fn flow() -> Flow {
        Flow::new(
            "raid",
            vec![
                Question::new("role", "1").required(true).with_label("Main role"),
                Question::new("gear", "2")
                    .required(true)
                    .with_visibility_rules("skip_if(role in ['tank', 'heal'])"),
                Question::new("notes", "3"),
            ],
        )
    }

    #[test]
    fn report_counts_states_and_next_question() {
        let answers = AnswerBag::new().with("role", "tank");
        let report = build_report(&flow(), &RuleEngine::default(), &answers, Some(0));
        assert_eq!(
            report.counts,
            ReportCounts {
                show: 1,
                optional: 1,
                skip: 1,
                answered: 1
            }
        );
        assert_eq!(report.next_index, Some(2));
        assert_eq!(report.next_qid.as_deref(), Some("notes"));
        assert_eq!(report.engine, EngineKind::Strict);
    }

    #[test]
    fn json_is_the_visibility_mapping() {
        let answers = AnswerBag::new().with("role", "heal");
        let report = build_report(&flow(), &RuleEngine::default(), &answers, None);
        assert_eq!(
            render_json(&report),
            json!({
                "gear": { "state": "skip", "required": false },
                "notes": { "state": "optional", "required": false },
                "role": { "state": "show", "required": true },
            })
        );
        assert_eq!(report.next_qid.as_deref(), Some("role"));
    }

    #[test]
    fn text_lists_every_question() {
        let report = build_report(&flow(), &RuleEngine::default(), &AnswerBag::new(), None);
        let text = render_text(&report);
        assert!(text.starts_with("Flow: raid (engine: strict)"));
        assert!(text.contains("Main role (required)"));
        assert!(text.contains("gear"));
        assert_eq!(text.lines().count(), 4 + 3);
    }
}
