//! Authoring diagnostics for a flow's rule text.
//!
//! The engines degrade silently at runtime (a broken directive is logged and ignored);
//! lint surfaces the same problems up front so authors can fix them.

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;

use crate::directive::{parse_nav_directives, parse_visibility_directives};
use crate::legacy::{LegacyClause, parse_legacy_rules, resolve_order, resolve_target};
use crate::spec::flow::Flow;
use crate::spec::question::Question;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Error,
    Warning,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LintIssue {
    pub qid: String,
    pub field: &'static str,
    pub code: &'static str,
    pub severity: Severity,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LintReport {
    pub valid: bool,
    pub issues: Vec<LintIssue>,
}

impl LintReport {
    pub fn errors(&self) -> impl Iterator<Item = &LintIssue> {
        self.issues
            .iter()
            .filter(|issue| issue.severity == Severity::Error)
    }
}

pub fn lint_flow(flow: &Flow) -> LintReport {
    let questions = &flow.questions;
    let mut issues = Vec::new();

    check_identity(questions, &mut issues);

    let qids = questions
        .iter()
        .map(|question| question.qid.as_str())
        .collect::<BTreeSet<_>>();
    for question in questions {
        check_visibility_rules(question, &qids, &mut issues);
        check_nav_rules(question, &qids, &mut issues);
        check_legacy_rules(questions, question, &mut issues);
    }

    LintReport {
        valid: !issues.iter().any(|issue| issue.severity == Severity::Error),
        issues,
    }
}

fn check_identity(questions: &[Question], issues: &mut Vec<LintIssue>) {
    let mut seen_qids = BTreeSet::new();
    let mut orders: BTreeMap<String, &str> = BTreeMap::new();
    for question in questions {
        if !seen_qids.insert(question.qid.as_str()) {
            issues.push(issue(
                question,
                "qid",
                "duplicate_qid",
                Severity::Error,
                format!("qid '{}' is declared more than once", question.qid),
                None,
            ));
        }

        let order = question.order.trim().to_ascii_lowercase();
        if order.is_empty() {
            continue;
        }
        if let Some(first) = orders.get(&order) {
            issues.push(issue(
                question,
                "order",
                "order_collision",
                Severity::Warning,
                format!("order '{}' is also used by '{}'", question.order, first),
                None,
            ));
        } else {
            orders.insert(order, &question.qid);
        }
    }
}

fn check_visibility_rules(question: &Question, qids: &BTreeSet<&str>, issues: &mut Vec<LintIssue>) {
    const FIELD: &str = "visibility_rules";
    if question.visibility_rules.trim().is_empty() {
        return;
    }
    match parse_visibility_directives(&question.visibility_rules) {
        Err(err) => issues.push(parse_error(question, FIELD, &question.visibility_rules, err)),
        Ok(directives) => {
            for directive in directives {
                if let Some(target) = &directive.target
                    && !qids.contains(target.as_str())
                {
                    issues.push(unknown_target(question, FIELD, target, &directive.raw_text));
                }
            }
        }
    }
}

fn check_nav_rules(question: &Question, qids: &BTreeSet<&str>, issues: &mut Vec<LintIssue>) {
    const FIELD: &str = "nav_rules";
    if question.nav_rules.trim().is_empty() {
        return;
    }
    match parse_nav_directives(&question.nav_rules) {
        Err(err) => issues.push(parse_error(question, FIELD, &question.nav_rules, err)),
        Ok(directives) => {
            for directive in directives {
                if !qids.contains(directive.target_qid.as_str()) {
                    issues.push(unknown_target(
                        question,
                        FIELD,
                        &directive.target_qid,
                        &directive.raw_text,
                    ));
                }
            }
        }
    }
}

fn check_legacy_rules(questions: &[Question], question: &Question, issues: &mut Vec<LintIssue>) {
    if question.rules.trim().is_empty() {
        return;
    }
    let is_qid = |candidate: &str| {
        questions
            .iter()
            .any(|question| question.qid.eq_ignore_ascii_case(candidate))
    };
    for clause in parse_legacy_rules(&question.rules, is_qid) {
        match &clause {
            LegacyClause::Visibility { targets, raw, .. } => {
                for target in targets {
                    if resolve_target(questions, target).is_empty() {
                        issues.push(legacy_unresolved(question, "target", target, raw));
                    }
                }
            }
            LegacyClause::Navigation {
                then_order,
                else_order,
                raw,
                ..
            } => {
                for order in then_order.iter().chain(else_order) {
                    if resolve_order(questions, order).is_none() {
                        issues.push(legacy_unresolved(question, "goto order", order, raw));
                    }
                }
            }
            LegacyClause::RangeSkip { .. } | LegacyClause::Unrecognized { .. } => {}
        }
    }
}

fn parse_error(
    question: &Question,
    field: &'static str,
    raw: &str,
    err: crate::error::RuleParseError,
) -> LintIssue {
    issue(
        question,
        field,
        "parse_error",
        Severity::Error,
        err.to_string(),
        Some(raw.to_string()),
    )
}

fn unknown_target(question: &Question, field: &'static str, target: &str, raw: &str) -> LintIssue {
    issue(
        question,
        field,
        "unknown_target",
        Severity::Error,
        format!("target '{target}' is not a qid in this flow"),
        Some(raw.to_string()),
    )
}

fn legacy_unresolved(question: &Question, what: &str, target: &str, raw: &str) -> LintIssue {
    issue(
        question,
        "rules",
        "legacy_unresolved",
        Severity::Warning,
        format!("{what} '{target}' matches no question"),
        Some(raw.to_string()),
    )
}

fn issue(
    question: &Question,
    field: &'static str,
    code: &'static str,
    severity: Severity,
    message: String,
    raw: Option<String>,
) -> LintIssue {
    LintIssue {
        qid: question.qid.clone(),
        field,
        code,
        severity,
        message,
        raw,
    }
}
