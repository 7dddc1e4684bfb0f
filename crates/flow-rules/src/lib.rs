#![allow(missing_docs)]

pub mod answers;
pub mod cache;
pub mod config;
pub mod directive;
pub mod engine;
pub mod error;
pub mod expr;
pub mod legacy;
pub mod lexer;
pub mod lint;
pub mod navigation;
pub mod parser;
pub mod report;
pub mod spec;
pub mod state;
pub mod visibility;

pub use answers::{AnswerBag, AnswerValue, NUMERIC_TOLERANCE, extract_tokens};
pub use cache::DirectiveCache;
pub use config::{EngineConfig, EngineKind};
pub use directive::{
    DirectiveKind, NavDirective, VisibilityDirective, parse_nav_directives,
    parse_visibility_directives,
};
pub use engine::{
    RuleEngine, StrictEngine, evaluate_visibility, next_index_by_rules, next_question_index,
};
pub use error::{ConfigError, EvalError, RuleParseError};
pub use expr::{EvalContext, EvalValue, Expr};
pub use legacy::LegacyEngine;
pub use lint::{LintIssue, LintReport, Severity, lint_flow};
pub use navigation::{NavGuard, NavResolution, resolve_navigation};
pub use parser::parse_expression;
pub use report::{FlowReport, ReportCounts, ReportQuestion, build_report, render_json, render_text};
pub use spec::{Flow, OrderKey, Question, QuestionType};
pub use state::{QuestionState, VisibilityMap, VisibilityState};
pub use visibility::resolve_visibility;

/// JSON schema of the flow document the engines consume.
pub fn flow_schema() -> serde_json::Value {
    schemars::schema_for!(Flow).to_value()
}
