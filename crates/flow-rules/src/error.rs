use thiserror::Error;

/// Malformed directive text. Raised while parsing; callers log it with the owning
/// `qid` and treat the question as having no directives.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RuleParseError {
    #[error("unexpected character '{ch}' at offset {offset}")]
    UnexpectedChar { ch: char, offset: usize },
    #[error("unterminated string starting at offset {offset}")]
    UnterminatedString { offset: usize },
    #[error("unexpected end of rule text, expected {expected}")]
    UnexpectedEnd { expected: String },
    #[error("unexpected {found} at offset {offset}, expected {expected}")]
    UnexpectedToken {
        found: String,
        expected: String,
        offset: usize,
    },
    #[error("'in' requires a list literal on the right-hand side (offset {offset})")]
    InWithoutList { offset: usize },
    #[error("expression nested too deeply at offset {offset}")]
    TooDeep { offset: usize },
    #[error("unknown function '{name}'")]
    UnknownFunction { name: String },
    #[error("function '{name}' takes {expected} argument(s), got {found}")]
    Arity {
        name: String,
        expected: usize,
        found: usize,
    },
    #[error("unknown directive '{name}'")]
    UnknownDirective { name: String },
    #[error("directive '{name}' is not allowed in {field}")]
    MisplacedDirective { name: String, field: &'static str },
    #[error("unknown directive option '{name}'")]
    UnknownOption { name: String },
    #[error("directive '{name}' requires target=<qid>")]
    MissingTarget { name: String },
    #[error("{source} in clause `{clause}`")]
    InClause {
        clause: String,
        #[source]
        source: Box<RuleParseError>,
    },
}

impl RuleParseError {
    pub(crate) fn in_clause(self, clause: &str) -> Self {
        RuleParseError::InClause {
            clause: clause.to_string(),
            source: Box::new(self),
        }
    }
}

/// Runtime failure while evaluating one directive. The directive counts as not matched.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EvalError {
    #[error("int() called on an empty value")]
    IntOfEmpty,
    #[error("int() cannot coerce '{token}'")]
    NotAnInteger { token: String },
    #[error("'{op}' needs a single numeric right-hand side, got {found:?}")]
    NonNumericBound { op: &'static str, found: Vec<String> },
    #[error("'value' is only available inside navigation directives")]
    ValueOutsideNavigation,
}

/// Invalid engine configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to parse engine config: {0}")]
    Parse(#[source] serde_json::Error),
    #[error("unknown engine '{0}', expected 'strict' or 'legacy'")]
    UnknownEngine(String),
}
