//! Pattern-based parsing of legacy rule clauses.
//!
//! ```text
//! if <condition> skip <targets>
//! if <condition> make <targets> optional|required
//! if <qid> <op> <rhs> [goto <order>] [else goto <order>]
//! skip order>=X and order<Y            (recognized, ignored)
//! ```

use std::sync::LazyLock;

use regex::Regex;

static RANGE_SKIP: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(?:if\s+.+?\s+)?skip\s+order\s*>=\s*\S+\s+and\s+order\s*<\s*\S+$")
        .expect("range skip pattern")
});

static GOTO_WORD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bgoto\b").expect("goto pattern"));

static NAVIGATION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)^if\s+(?P<subject>[A-Za-z_][\w-]*)\s*(?P<op>==|!=|>=|<=|=|>|<|\s+in\s+)\s*(?P<rhs>.+?)(?:\s+goto\s+(?P<then>\S+))?(?:\s+else\s+goto\s+(?P<else>\S+))?$",
    )
    .expect("navigation pattern")
});

static VISIBILITY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)^if\s+(?P<cond>.+?)\s+(?:skip\s+(?P<skip>.+)|make\s+(?P<make>.+?)\s+(?P<mode>optional|required))$",
    )
    .expect("visibility pattern")
});

static COMPARISON: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?P<subject>[A-Za-z_][\w-]*)\s*(?P<op>==|!=|>=|<=|=|>|<)\s*(?P<rhs>.+)$")
        .expect("comparison pattern")
});

static MEMBERSHIP: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(?P<subject>[A-Za-z_][\w-]*)\s+in\s+(?P<rhs>.+)$")
        .expect("membership pattern")
});

static LIST_SEPARATOR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\s*,\s*|\s+or\s+").expect("list separator pattern"));

static TARGET_SEPARATOR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\s*,\s*|\s+and\s+").expect("target separator pattern"));

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
    In,
}

impl CompareOp {
    fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "=" | "==" => Some(CompareOp::Eq),
            "!=" => Some(CompareOp::NotEq),
            "<" => Some(CompareOp::Lt),
            "<=" => Some(CompareOp::LtEq),
            ">" => Some(CompareOp::Gt),
            ">=" => Some(CompareOp::GtEq),
            "in" => Some(CompareOp::In),
            _ => None,
        }
    }
}

/// What a legacy condition tests.
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    /// `<qid> <op> <values>` against another question's answer.
    Compare {
        subject: String,
        op: CompareOp,
        values: Vec<String>,
    },
    /// Free text matched against the owning question's own answer.
    Text { alternatives: Vec<String> },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Skip,
    Optional,
    Required,
}

#[derive(Debug, Clone, PartialEq)]
pub enum LegacyClause {
    Visibility {
        condition: Condition,
        action: Action,
        targets: Vec<String>,
        raw: String,
    },
    Navigation {
        subject: String,
        op: CompareOp,
        values: Vec<String>,
        then_order: Option<String>,
        else_order: Option<String>,
        raw: String,
    },
    RangeSkip {
        raw: String,
    },
    Unrecognized {
        raw: String,
    },
}

impl LegacyClause {
    pub fn raw(&self) -> &str {
        match self {
            LegacyClause::Visibility { raw, .. }
            | LegacyClause::Navigation { raw, .. }
            | LegacyClause::RangeSkip { raw }
            | LegacyClause::Unrecognized { raw } => raw,
        }
    }
}

/// Splits legacy rule text on newlines and semicolons.
pub fn split_legacy_clauses(text: &str) -> impl Iterator<Item = &str> {
    text.split(['\n', ';'])
        .map(str::trim)
        .filter(|clause| !clause.is_empty())
}

/// Parses every clause of a question's `rules` text.
///
/// `is_qid` decides whether a condition subject names a question; when it does not,
/// the whole condition is treated as free text against the owner's answer.
pub fn parse_legacy_rules(text: &str, is_qid: impl Fn(&str) -> bool) -> Vec<LegacyClause> {
    split_legacy_clauses(text)
        .map(|clause| parse_clause(clause, &is_qid))
        .collect()
}

fn parse_clause(clause: &str, is_qid: &dyn Fn(&str) -> bool) -> LegacyClause {
    let raw = clause.to_string();

    // Checked first: `skip order>=X and order<Y` would otherwise read as a condition.
    if RANGE_SKIP.is_match(clause) {
        return LegacyClause::RangeSkip { raw };
    }

    if GOTO_WORD.is_match(clause) {
        return match NAVIGATION.captures(clause) {
            Some(caps) => {
                let then_order = caps.name("then").map(|m| m.as_str().to_string());
                let else_order = caps.name("else").map(|m| m.as_str().to_string());
                let op = CompareOp::parse(&caps["op"]);
                match op {
                    Some(op) if then_order.is_some() || else_order.is_some() => {
                        LegacyClause::Navigation {
                            subject: caps["subject"].to_string(),
                            op,
                            values: split_values(&caps["rhs"], op),
                            then_order,
                            else_order,
                            raw,
                        }
                    }
                    _ => LegacyClause::Unrecognized { raw },
                }
            }
            None => LegacyClause::Unrecognized { raw },
        };
    }

    let Some(caps) = VISIBILITY.captures(clause) else {
        return LegacyClause::Unrecognized { raw };
    };
    let condition = parse_condition(&caps["cond"], is_qid);
    let (action, targets) = match (caps.name("skip"), caps.name("make"), caps.name("mode")) {
        (Some(targets), _, _) => (Action::Skip, targets.as_str()),
        (None, Some(targets), Some(mode)) if mode.as_str().eq_ignore_ascii_case("required") => {
            (Action::Required, targets.as_str())
        }
        (None, Some(targets), Some(_)) => (Action::Optional, targets.as_str()),
        _ => return LegacyClause::Unrecognized { raw },
    };
    LegacyClause::Visibility {
        condition,
        action,
        targets: split_targets(targets),
        raw,
    }
}

fn parse_condition(text: &str, is_qid: &dyn Fn(&str) -> bool) -> Condition {
    let text = text.trim();
    if let Some(caps) = MEMBERSHIP.captures(text)
        && is_qid(&caps["subject"])
    {
        return Condition::Compare {
            subject: caps["subject"].to_string(),
            op: CompareOp::In,
            values: split_values(&caps["rhs"], CompareOp::In),
        };
    }
    if let Some(caps) = COMPARISON.captures(text)
        && is_qid(&caps["subject"])
        && let Some(op) = CompareOp::parse(&caps["op"])
    {
        return Condition::Compare {
            subject: caps["subject"].to_string(),
            op,
            values: split_values(&caps["rhs"], op),
        };
    }
    Condition::Text {
        alternatives: split_list(text),
    }
}

fn split_values(rhs: &str, op: CompareOp) -> Vec<String> {
    if op == CompareOp::In {
        split_list(rhs)
    } else {
        vec![unquote(rhs).to_string()]
    }
}

/// `[a, b]`, `(a, b)`, `a, b` or `a or b`.
fn split_list(raw: &str) -> Vec<String> {
    let trimmed = raw.trim();
    let inner = trimmed
        .strip_prefix('[')
        .and_then(|rest| rest.strip_suffix(']'))
        .or_else(|| {
            trimmed
                .strip_prefix('(')
                .and_then(|rest| rest.strip_suffix(')'))
        })
        .unwrap_or(trimmed);
    LIST_SEPARATOR
        .split(inner)
        .map(unquote)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}

fn split_targets(raw: &str) -> Vec<String> {
    TARGET_SEPARATOR
        .split(raw.trim())
        .map(unquote)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}

fn unquote(raw: &str) -> &str {
    let trimmed = raw.trim();
    for quote in ['"', '\''] {
        if let Some(inner) = trimmed
            .strip_prefix(quote)
            .and_then(|rest| rest.strip_suffix(quote))
        {
            return inner.trim();
        }
    }
    trimmed
}
