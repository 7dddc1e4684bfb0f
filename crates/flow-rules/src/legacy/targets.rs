//! Resolution of legacy target text to question indices.

use globset::GlobBuilder;

use crate::legacy::matching::normalize;
use crate::spec::question::Question;

/// Resolves one target by, in turn: `qid`, order wildcard (`12*`), exact `order`,
/// then fuzzy label match. Empty when nothing matches.
pub fn resolve_target(questions: &[Question], target: &str) -> Vec<usize> {
    let target = target.trim();
    if target.is_empty() {
        return Vec::new();
    }

    if let Some(index) = questions
        .iter()
        .position(|question| question.qid.eq_ignore_ascii_case(target))
    {
        return vec![index];
    }

    if target.contains(['*', '?']) {
        return match GlobBuilder::new(target).case_insensitive(true).build() {
            Ok(glob) => {
                let matcher = glob.compile_matcher();
                questions
                    .iter()
                    .enumerate()
                    .filter(|(_, question)| {
                        !question.order.is_empty() && matcher.is_match(&question.order)
                    })
                    .map(|(index, _)| index)
                    .collect()
            }
            Err(_) => Vec::new(),
        };
    }

    let by_order = questions
        .iter()
        .enumerate()
        .filter(|(_, question)| question.order.eq_ignore_ascii_case(target))
        .map(|(index, _)| index)
        .collect::<Vec<_>>();
    if !by_order.is_empty() {
        return by_order;
    }

    fuzzy_label(questions, target).into_iter().collect()
}

/// First question in flow order whose order matches `order`, case-insensitively.
pub fn resolve_order(questions: &[Question], order: &str) -> Option<usize> {
    let order = order.trim();
    questions
        .iter()
        .position(|question| question.order.eq_ignore_ascii_case(order))
}

fn fuzzy_label(questions: &[Question], target: &str) -> Option<usize> {
    let wanted = normalize(target);
    if wanted.is_empty() {
        return None;
    }
    let compact = wanted.replace(' ', "");
    let labels = questions
        .iter()
        .map(|question| normalize(&question.label))
        .collect::<Vec<_>>();

    labels
        .iter()
        .position(|label| *label == wanted)
        .or_else(|| {
            labels
                .iter()
                .position(|label| !label.is_empty() && label.contains(&wanted))
        })
        .or_else(|| {
            labels
                .iter()
                .position(|label| !label.is_empty() && label.replace(' ', "").contains(&compact))
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn flow() -> Vec<Question> {
        vec![
            Question::new("role", "1").with_label("Main role"),
            Question::new("gear_score", "12").with_label("Gear score"),
            Question::new("gear_notes", "12B").with_label("Gear build notes"),
            Question::new("alts", "120").with_label("Alt characters"),
            Question::new("timezone", "13").with_label("Time-zone"),
        ]
    }

    #[test]
    fn qid_wins_over_everything() {
        assert_eq!(resolve_target(&flow(), "GEAR_SCORE"), vec![1]);
    }

    #[test]
    fn order_wildcard_uses_glob_semantics() {
        assert_eq!(resolve_target(&flow(), "12*"), vec![1, 2, 3]);
        assert_eq!(resolve_target(&flow(), "12?"), vec![2, 3]);
    }

    #[test]
    fn exact_order_is_case_insensitive() {
        assert_eq!(resolve_target(&flow(), "12b"), vec![2]);
        assert_eq!(resolve_order(&flow(), "12b"), Some(2));
        assert_eq!(resolve_order(&flow(), "99"), None);
    }

    #[test]
    fn fuzzy_label_matching() {
        assert_eq!(resolve_target(&flow(), "build notes"), vec![2]);
        assert_eq!(resolve_target(&flow(), "time zone"), vec![4]);
        assert_eq!(resolve_target(&flow(), "timezone"), vec![4]);
        assert!(resolve_target(&flow(), "favourite colour").is_empty());
    }
}
