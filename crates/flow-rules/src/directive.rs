//! Extraction of `*_if(...)` directives from multi-line rule text.

use std::fmt;

use crate::error::RuleParseError;
use crate::expr::Expr;
use crate::lexer::{TokenKind, tokenize};
use crate::parser::Parser;
use crate::state::Transition;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DirectiveKind {
    Skip,
    Optional,
    Require,
    Show,
}

impl DirectiveKind {
    fn from_name(name: &str) -> Option<Self> {
        match name {
            "skip_if" => Some(DirectiveKind::Skip),
            "optional_if" => Some(DirectiveKind::Optional),
            "require_if" => Some(DirectiveKind::Require),
            "show_if" => Some(DirectiveKind::Show),
            _ => None,
        }
    }

    pub fn transition(&self) -> Transition {
        match self {
            DirectiveKind::Skip => Transition::Skip,
            DirectiveKind::Optional => Transition::Optional,
            DirectiveKind::Require => Transition::Require,
            DirectiveKind::Show => Transition::Show,
        }
    }
}

impl fmt::Display for DirectiveKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            DirectiveKind::Skip => "skip_if",
            DirectiveKind::Optional => "optional_if",
            DirectiveKind::Require => "require_if",
            DirectiveKind::Show => "show_if",
        })
    }
}

/// `skip_if(expr)`, `show_if(expr, target=qid)`, ...
#[derive(Debug, Clone, PartialEq)]
pub struct VisibilityDirective {
    pub kind: DirectiveKind,
    pub expression: Expr,
    /// Question the directive acts on; `None` means the owning question.
    pub target: Option<String>,
    pub raw_text: String,
}

/// `goto_if(expr, target=qid)`.
#[derive(Debug, Clone, PartialEq)]
pub struct NavDirective {
    pub target_qid: String,
    pub expression: Expr,
    pub raw_text: String,
}

const NAV_DIRECTIVE: &str = "goto_if";

/// Splits rule text on newlines and semicolons that sit outside quotes and brackets.
/// Blank clauses and `#` comments are dropped.
pub fn split_clauses(text: &str) -> Vec<&str> {
    let mut clauses = Vec::new();
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut escaped = false;
    let mut start = 0;

    for (offset, ch) in text.char_indices() {
        if let Some(open) = quote {
            if escaped {
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == open {
                quote = None;
            }
            continue;
        }
        match ch {
            '"' | '\'' => quote = Some(ch),
            '(' | '[' => depth += 1,
            ')' | ']' => depth = depth.saturating_sub(1),
            '\n' => {
                // A newline always ends a clause, even inside unbalanced brackets.
                clauses.push(&text[start..offset]);
                start = offset + 1;
                depth = 0;
            }
            ';' if depth == 0 => {
                clauses.push(&text[start..offset]);
                start = offset + 1;
            }
            _ => {}
        }
    }
    clauses.push(&text[start..]);

    clauses
        .into_iter()
        .map(str::trim)
        .filter(|clause| !clause.is_empty() && !clause.starts_with('#'))
        .collect()
}

pub fn parse_visibility_directives(text: &str) -> Result<Vec<VisibilityDirective>, RuleParseError> {
    split_clauses(text)
        .into_iter()
        .map(|clause| parse_visibility_clause(clause).map_err(|err| err.in_clause(clause)))
        .collect()
}

pub fn parse_nav_directives(text: &str) -> Result<Vec<NavDirective>, RuleParseError> {
    split_clauses(text)
        .into_iter()
        .map(|clause| parse_nav_clause(clause).map_err(|err| err.in_clause(clause)))
        .collect()
}

struct RawDirective {
    name: String,
    expression: Expr,
    target: Option<String>,
}

fn parse_visibility_clause(clause: &str) -> Result<VisibilityDirective, RuleParseError> {
    let raw = parse_directive(clause)?;
    let kind = match DirectiveKind::from_name(&raw.name) {
        Some(kind) => kind,
        None if raw.name == NAV_DIRECTIVE => {
            return Err(RuleParseError::MisplacedDirective {
                name: raw.name,
                field: "visibility_rules",
            });
        }
        None => return Err(RuleParseError::UnknownDirective { name: raw.name }),
    };
    Ok(VisibilityDirective {
        kind,
        expression: raw.expression,
        target: raw.target,
        raw_text: clause.to_string(),
    })
}

fn parse_nav_clause(clause: &str) -> Result<NavDirective, RuleParseError> {
    let raw = parse_directive(clause)?;
    if raw.name != NAV_DIRECTIVE {
        return Err(if DirectiveKind::from_name(&raw.name).is_some() {
            RuleParseError::MisplacedDirective {
                name: raw.name,
                field: "nav_rules",
            }
        } else {
            RuleParseError::UnknownDirective { name: raw.name }
        });
    }
    let target_qid = raw.target.ok_or_else(|| RuleParseError::MissingTarget {
        name: NAV_DIRECTIVE.to_string(),
    })?;
    Ok(NavDirective {
        target_qid,
        expression: raw.expression,
        raw_text: clause.to_string(),
    })
}

/// `<name>(<expr>[, target=<qid>])`
fn parse_directive(clause: &str) -> Result<RawDirective, RuleParseError> {
    let mut parser = Parser::new(tokenize(clause)?);

    let name = match parser.advance() {
        Some(token) => match token.kind {
            TokenKind::Name(name) if name.to_ascii_lowercase().ends_with("_if") => {
                name.to_ascii_lowercase()
            }
            TokenKind::Name(name) => return Err(RuleParseError::UnknownDirective { name }),
            other => {
                return Err(RuleParseError::UnexpectedToken {
                    found: other.to_string(),
                    expected: "a directive name".into(),
                    offset: token.offset,
                });
            }
        },
        None => {
            return Err(RuleParseError::UnexpectedEnd {
                expected: "a directive name".into(),
            });
        }
    };

    parser.expect(TokenKind::LParen)?;
    let expression = parser.expression()?;

    let mut target = None;
    while parser.peek() == Some(&TokenKind::Comma) {
        parser.advance();
        let key = match parser.advance() {
            Some(token) => match token.kind {
                TokenKind::Name(key) => key,
                other => {
                    return Err(RuleParseError::UnexpectedToken {
                        found: other.to_string(),
                        expected: "an option name".into(),
                        offset: token.offset,
                    });
                }
            },
            None => {
                return Err(RuleParseError::UnexpectedEnd {
                    expected: "an option name".into(),
                });
            }
        };
        if !key.eq_ignore_ascii_case("target") {
            return Err(RuleParseError::UnknownOption { name: key });
        }
        parser.expect(TokenKind::Eq)?;
        target = Some(match parser.advance() {
            Some(token) => match token.kind {
                TokenKind::Name(qid) | TokenKind::Str(qid) | TokenKind::Number(qid) => qid,
                other => {
                    return Err(RuleParseError::UnexpectedToken {
                        found: other.to_string(),
                        expected: "a target qid".into(),
                        offset: token.offset,
                    });
                }
            },
            None => {
                return Err(RuleParseError::UnexpectedEnd {
                    expected: "a target qid".into(),
                });
            }
        });
    }

    parser.expect(TokenKind::RParen)?;
    parser.expect_end()?;

    Ok(RawDirective {
        name,
        expression,
        target,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::{BinaryOp, Literal};

    #[test]
    fn splits_on_newlines_and_semicolons_outside_quotes() {
        let clauses = split_clauses("skip_if(a = 'x;y'); show_if(b)\n\n# note\noptional_if(c)");
        assert_eq!(
            clauses,
            vec!["skip_if(a = 'x;y')", "show_if(b)", "optional_if(c)"]
        );
    }

    #[test]
    fn parses_visibility_kinds_case_insensitively() {
        let directives = parse_visibility_directives(
            "SKIP_IF(true)\nrequire_if(q1 = 'yes', target=q2)",
        )
        .unwrap();
        assert_eq!(directives.len(), 2);
        assert_eq!(directives[0].kind, DirectiveKind::Skip);
        assert_eq!(directives[0].expression, Expr::Literal(Literal::Bool(true)));
        assert_eq!(directives[0].target, None);
        assert_eq!(directives[1].kind, DirectiveKind::Require);
        assert_eq!(directives[1].target.as_deref(), Some("q2"));
        assert_eq!(directives[1].raw_text, "require_if(q1 = 'yes', target=q2)");
    }

    #[test]
    fn parses_goto_with_target() {
        let directives = parse_nav_directives("goto_if(value = 'yes', target=\"q9\")").unwrap();
        assert_eq!(directives[0].target_qid, "q9");
        assert!(matches!(
            directives[0].expression,
            Expr::Binary {
                op: BinaryOp::Eq,
                ..
            }
        ));
    }

    #[test]
    fn goto_without_target_is_an_error() {
        let err = parse_nav_directives("goto_if(true)").unwrap_err();
        assert!(matches!(
            err,
            RuleParseError::InClause { ref source, .. }
                if matches!(**source, RuleParseError::MissingTarget { .. })
        ));
    }

    #[test]
    fn unknown_and_misplaced_directives_are_errors() {
        assert!(parse_visibility_directives("hide_if(true)").is_err());
        assert!(parse_visibility_directives("goto_if(true, target=q1)").is_err());
        assert!(parse_nav_directives("skip_if(true)").is_err());
        assert!(parse_visibility_directives("skip_if(true, when=q1)").is_err());
        assert!(parse_visibility_directives("skip when q1").is_err());
    }

    #[test]
    fn one_bad_clause_fails_the_whole_field() {
        let err = parse_visibility_directives("skip_if(true)\nshow_if(q1 in 'x')").unwrap_err();
        assert!(err.to_string().contains("show_if(q1 in 'x')"));
    }

    #[test]
    fn empty_text_has_no_directives() {
        assert!(parse_visibility_directives("  \n ; ").unwrap().is_empty());
    }
}
