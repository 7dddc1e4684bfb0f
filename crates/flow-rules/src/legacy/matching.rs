//! Loose value matching used by legacy clauses.

use std::sync::LazyLock;

use regex::Regex;

use crate::answers::{numbers_equal, numeric_token};
use crate::legacy::clause::CompareOp;

static SEPARATORS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[\s_-]+").expect("separator pattern"));

/// Lowercases and collapses runs of whitespace, `-` and `_` into one space.
pub fn normalize(raw: &str) -> String {
    SEPARATORS
        .replace_all(raw.trim(), " ")
        .trim()
        .to_lowercase()
}

/// Spellings a free-text token is allowed to match under: `off tank`, `off_tank`,
/// `off-tank`, `offtank`.
pub fn token_variants(raw: &str) -> [String; 4] {
    let spaced = normalize(raw);
    [
        spaced.replace(' ', "_"),
        spaced.replace(' ', "-"),
        spaced.replace(' ', ""),
        spaced,
    ]
}

/// Numeric pairs compare with tolerance, everything else by shared variant.
pub fn loosely_equal(left: &str, right: &str) -> bool {
    if let (Some(a), Some(b)) = (numeric_token(left), numeric_token(right)) {
        return numbers_equal(a, b);
    }
    let left = token_variants(left);
    let right = token_variants(right);
    left.iter().any(|variant| right.contains(variant))
}

/// Tests answer tokens against clause values.
///
/// `=`/`in` hold when any pair matches, `!=` when none does. Ordering needs a single
/// numeric value and holds when any numeric token satisfies it.
pub fn compare(tokens: &[String], op: CompareOp, values: &[String]) -> bool {
    let any_pair = || {
        tokens
            .iter()
            .any(|token| values.iter().any(|value| loosely_equal(token, value)))
    };
    match op {
        CompareOp::Eq | CompareOp::In => any_pair(),
        CompareOp::NotEq => !any_pair(),
        CompareOp::Lt | CompareOp::LtEq | CompareOp::Gt | CompareOp::GtEq => {
            let bound = match values {
                [single] => numeric_token(single),
                _ => None,
            };
            let Some(bound) = bound else {
                return false;
            };
            tokens
                .iter()
                .filter_map(|token| numeric_token(token))
                .any(|value| match op {
                    CompareOp::Lt => value < bound,
                    CompareOp::LtEq => value <= bound,
                    CompareOp::Gt => value > bound,
                    _ => value >= bound,
                })
        }
    }
}
