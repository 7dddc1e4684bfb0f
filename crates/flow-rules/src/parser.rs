//! Recursive-descent parser for directive expressions.
//!
//! Precedence, lowest to highest: `or`, `and`, `not`, comparisons
//! (`= != < <= > >= in`), primaries.

use crate::error::RuleParseError;
use crate::expr::{BinaryOp, Expr, Function, Literal, UnaryOp};
use crate::lexer::{Token, TokenKind, tokenize};

/// Deepest allowed nesting of `not`, parentheses, lists and calls.
pub const MAX_NESTING: usize = 64;

/// Parses a complete expression; trailing tokens are an error.
pub fn parse_expression(input: &str) -> Result<Expr, RuleParseError> {
    let tokens = tokenize(input)?;
    let mut parser = Parser::new(tokens);
    let expr = parser.expression()?;
    parser.expect_end()?;
    Ok(expr)
}

pub(crate) struct Parser {
    tokens: Vec<Token>,
    position: usize,
    depth: usize,
}

impl Parser {
    pub(crate) fn new(tokens: Vec<Token>) -> Self {
        Self {
            tokens,
            position: 0,
            depth: 0,
        }
    }

    pub(crate) fn peek(&self) -> Option<&TokenKind> {
        self.tokens.get(self.position).map(|token| &token.kind)
    }

    pub(crate) fn advance(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.position).cloned();
        if token.is_some() {
            self.position += 1;
        }
        token
    }

    fn eat(&mut self, kind: &TokenKind) -> bool {
        if self.peek() == Some(kind) {
            self.position += 1;
            true
        } else {
            false
        }
    }

    pub(crate) fn expect(&mut self, kind: TokenKind) -> Result<Token, RuleParseError> {
        match self.advance() {
            Some(token) if token.kind == kind => Ok(token),
            Some(token) => Err(RuleParseError::UnexpectedToken {
                found: token.kind.to_string(),
                expected: kind.to_string(),
                offset: token.offset,
            }),
            None => Err(RuleParseError::UnexpectedEnd {
                expected: kind.to_string(),
            }),
        }
    }

    pub(crate) fn expect_end(&self) -> Result<(), RuleParseError> {
        match self.tokens.get(self.position) {
            None => Ok(()),
            Some(token) => Err(RuleParseError::UnexpectedToken {
                found: token.kind.to_string(),
                expected: "end of expression".into(),
                offset: token.offset,
            }),
        }
    }

    /// Runs `parse` one nesting level deeper, failing once `MAX_NESTING` is exceeded.
    fn nested<T>(
        &mut self,
        offset: usize,
        parse: impl FnOnce(&mut Self) -> Result<T, RuleParseError>,
    ) -> Result<T, RuleParseError> {
        if self.depth >= MAX_NESTING {
            return Err(RuleParseError::TooDeep { offset });
        }
        self.depth += 1;
        let result = parse(self);
        self.depth -= 1;
        result
    }

    fn current_offset(&self) -> usize {
        self.tokens
            .get(self.position)
            .map(|token| token.offset)
            .unwrap_or_default()
    }

    pub(crate) fn expression(&mut self) -> Result<Expr, RuleParseError> {
        self.or_expr()
    }

    fn or_expr(&mut self) -> Result<Expr, RuleParseError> {
        let mut left = self.and_expr()?;
        while self.eat(&TokenKind::Or) {
            let right = self.and_expr()?;
            left = Expr::binary(BinaryOp::Or, left, right);
        }
        Ok(left)
    }

    fn and_expr(&mut self) -> Result<Expr, RuleParseError> {
        let mut left = self.not_expr()?;
        while self.eat(&TokenKind::And) {
            let right = self.not_expr()?;
            left = Expr::binary(BinaryOp::And, left, right);
        }
        Ok(left)
    }

    fn not_expr(&mut self) -> Result<Expr, RuleParseError> {
        let offset = self.current_offset();
        if self.eat(&TokenKind::Not) {
            let operand = self.nested(offset, Self::not_expr)?;
            return Ok(Expr::Unary {
                op: UnaryOp::Not,
                operand: Box::new(operand),
            });
        }
        self.comparison()
    }

    fn comparison(&mut self) -> Result<Expr, RuleParseError> {
        let mut left = self.primary()?;
        loop {
            let op = match self.peek() {
                Some(TokenKind::Eq) => BinaryOp::Eq,
                Some(TokenKind::NotEq) => BinaryOp::NotEq,
                Some(TokenKind::Lt) => BinaryOp::Lt,
                Some(TokenKind::LtEq) => BinaryOp::LtEq,
                Some(TokenKind::Gt) => BinaryOp::Gt,
                Some(TokenKind::GtEq) => BinaryOp::GtEq,
                Some(TokenKind::In) => BinaryOp::In,
                _ => break,
            };
            let op_offset = self.tokens[self.position].offset;
            self.position += 1;

            if op == BinaryOp::In && self.peek() != Some(&TokenKind::LBracket) {
                return Err(RuleParseError::InWithoutList { offset: op_offset });
            }
            let right = self.primary()?;
            left = Expr::binary(op, left, right);
        }
        Ok(left)
    }

    fn primary(&mut self) -> Result<Expr, RuleParseError> {
        let token = self.advance().ok_or_else(|| RuleParseError::UnexpectedEnd {
            expected: "a value".into(),
        })?;
        match token.kind {
            TokenKind::Number(text) => Ok(Expr::Literal(Literal::Number(text))),
            TokenKind::Str(text) => Ok(Expr::Literal(Literal::Text(text))),
            TokenKind::Name(name) => {
                if self.peek() == Some(&TokenKind::LParen) {
                    return self.nested(token.offset, |parser| parser.call(name));
                }
                match name.to_ascii_lowercase().as_str() {
                    "true" => Ok(Expr::Literal(Literal::Bool(true))),
                    "false" => Ok(Expr::Literal(Literal::Bool(false))),
                    _ => Ok(Expr::Identifier(name)),
                }
            }
            TokenKind::LParen => self.nested(token.offset, |parser| {
                let inner = parser.expression()?;
                parser.expect(TokenKind::RParen)?;
                Ok(inner)
            }),
            TokenKind::LBracket => self.nested(token.offset, Self::list),
            other => Err(RuleParseError::UnexpectedToken {
                found: other.to_string(),
                expected: "a value".into(),
                offset: token.offset,
            }),
        }
    }

    /// Called after the opening `[` was consumed.
    fn list(&mut self) -> Result<Expr, RuleParseError> {
        let mut items = Vec::new();
        if self.eat(&TokenKind::RBracket) {
            return Ok(Expr::List(items));
        }
        loop {
            items.push(self.primary()?);
            if self.eat(&TokenKind::Comma) {
                continue;
            }
            self.expect(TokenKind::RBracket)?;
            return Ok(Expr::List(items));
        }
    }

    fn call(&mut self, name: String) -> Result<Expr, RuleParseError> {
        let function = match name.to_ascii_lowercase().as_str() {
            "int" => Function::Int,
            _ => return Err(RuleParseError::UnknownFunction { name }),
        };
        self.expect(TokenKind::LParen)?;
        let mut args = vec![self.expression()?];
        while self.eat(&TokenKind::Comma) {
            args.push(self.expression()?);
        }
        self.expect(TokenKind::RParen)?;
        if args.len() != 1 {
            return Err(RuleParseError::Arity {
                name,
                expected: 1,
                found: args.len(),
            });
        }
        Ok(Expr::Call { function, args })
    }
}
