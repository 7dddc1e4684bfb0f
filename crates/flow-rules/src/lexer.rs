//! Tokenizer for the strict directive grammar.

use std::fmt;

use crate::error::RuleParseError;

#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    Number(String),
    Str(String),
    Name(String),
    And,
    Or,
    Not,
    In,
    Eq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
    LParen,
    RParen,
    LBracket,
    RBracket,
    Comma,
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenKind::Number(text) => write!(f, "number {}", text),
            TokenKind::Str(text) => write!(f, "string \"{}\"", text),
            TokenKind::Name(name) => write!(f, "name '{}'", name),
            TokenKind::And => f.write_str("'and'"),
            TokenKind::Or => f.write_str("'or'"),
            TokenKind::Not => f.write_str("'not'"),
            TokenKind::In => f.write_str("'in'"),
            TokenKind::Eq => f.write_str("'='"),
            TokenKind::NotEq => f.write_str("'!='"),
            TokenKind::Lt => f.write_str("'<'"),
            TokenKind::LtEq => f.write_str("'<='"),
            TokenKind::Gt => f.write_str("'>'"),
            TokenKind::GtEq => f.write_str("'>='"),
            TokenKind::LParen => f.write_str("'('"),
            TokenKind::RParen => f.write_str("')'"),
            TokenKind::LBracket => f.write_str("'['"),
            TokenKind::RBracket => f.write_str("']'"),
            TokenKind::Comma => f.write_str("','"),
        }
    }
}

/// A token plus the byte offset it started at.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub offset: usize,
}

pub fn tokenize(input: &str) -> Result<Vec<Token>, RuleParseError> {
    let chars: Vec<(usize, char)> = input.char_indices().collect();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let (offset, ch) = chars[i];

        if ch.is_whitespace() {
            i += 1;
            continue;
        }

        let single = match ch {
            '(' => Some(TokenKind::LParen),
            ')' => Some(TokenKind::RParen),
            '[' => Some(TokenKind::LBracket),
            ']' => Some(TokenKind::RBracket),
            ',' => Some(TokenKind::Comma),
            _ => None,
        };
        if let Some(kind) = single {
            tokens.push(Token { kind, offset });
            i += 1;
            continue;
        }

        let next = chars.get(i + 1).map(|(_, c)| *c);
        match ch {
            '=' => {
                // `==` is accepted as an alias for `=`.
                let width = if next == Some('=') { 2 } else { 1 };
                tokens.push(Token {
                    kind: TokenKind::Eq,
                    offset,
                });
                i += width;
                continue;
            }
            '!' => {
                if next == Some('=') {
                    tokens.push(Token {
                        kind: TokenKind::NotEq,
                        offset,
                    });
                    i += 2;
                    continue;
                }
                return Err(RuleParseError::UnexpectedChar { ch, offset });
            }
            '<' | '>' => {
                let with_eq = next == Some('=');
                let kind = match (ch, with_eq) {
                    ('<', false) => TokenKind::Lt,
                    ('<', true) => TokenKind::LtEq,
                    ('>', false) => TokenKind::Gt,
                    _ => TokenKind::GtEq,
                };
                tokens.push(Token { kind, offset });
                i += if with_eq { 2 } else { 1 };
                continue;
            }
            '"' | '\'' => {
                let (text, consumed) = read_string(&chars[i..], ch)
                    .ok_or(RuleParseError::UnterminatedString { offset })?;
                tokens.push(Token {
                    kind: TokenKind::Str(text),
                    offset,
                });
                i += consumed;
                continue;
            }
            _ => {}
        }

        let starts_number =
            ch.is_ascii_digit() || (ch == '-' && next.is_some_and(|c| c.is_ascii_digit()));
        if starts_number {
            let (text, consumed) = read_number(&chars[i..]);
            tokens.push(Token {
                kind: TokenKind::Number(text),
                offset,
            });
            i += consumed;
            continue;
        }

        if ch.is_ascii_alphabetic() || ch == '_' {
            let mut end = i;
            while end < chars.len() {
                let c = chars[end].1;
                if c.is_ascii_alphanumeric() || c == '_' || c == '-' {
                    end += 1;
                } else {
                    break;
                }
            }
            let word: String = chars[i..end].iter().map(|(_, c)| *c).collect();
            let kind = match word.to_ascii_lowercase().as_str() {
                "and" => TokenKind::And,
                "or" => TokenKind::Or,
                "not" => TokenKind::Not,
                "in" => TokenKind::In,
                _ => TokenKind::Name(word),
            };
            tokens.push(Token { kind, offset });
            i = end;
            continue;
        }

        return Err(RuleParseError::UnexpectedChar { ch, offset });
    }

    Ok(tokens)
}

/// Reads a quoted string starting at `chars[0]`; returns the text and chars consumed.
fn read_string(chars: &[(usize, char)], quote: char) -> Option<(String, usize)> {
    let mut text = String::new();
    let mut i = 1;
    while i < chars.len() {
        let c = chars[i].1;
        if c == '\\' {
            let escaped = chars.get(i + 1)?.1;
            text.push(escaped);
            i += 2;
            continue;
        }
        if c == quote {
            return Some((text, i + 1));
        }
        text.push(c);
        i += 1;
    }
    None
}

fn read_number(chars: &[(usize, char)]) -> (String, usize) {
    let mut text = String::new();
    let mut i = 0;
    if chars[0].1 == '-' {
        text.push('-');
        i += 1;
    }
    while i < chars.len() && chars[i].1.is_ascii_digit() {
        text.push(chars[i].1);
        i += 1;
    }
    let fraction_follows = i + 1 < chars.len()
        && chars[i].1 == '.'
        && chars[i + 1].1.is_ascii_digit();
    if fraction_follows {
        text.push('.');
        i += 1;
        while i < chars.len() && chars[i].1.is_ascii_digit() {
            text.push(chars[i].1);
            i += 1;
        }
    }
    (text, i)
}
