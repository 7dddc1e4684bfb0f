//! Expression AST for rule directives and its evaluator.

use crate::answers::{AnswerBag, numbers_equal, numeric_token};
use crate::error::EvalError;

/// Pseudo-identifier for "the owning question's own answer" in navigation directives.
pub const VALUE_IDENTIFIER: &str = "value";

#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Text(String),
    /// Kept as written so it compares like any other token.
    Number(String),
    Bool(bool),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Not,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    And,
    Or,
    In,
    Eq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
}

impl BinaryOp {
    pub fn symbol(&self) -> &'static str {
        match self {
            BinaryOp::And => "and",
            BinaryOp::Or => "or",
            BinaryOp::In => "in",
            BinaryOp::Eq => "=",
            BinaryOp::NotEq => "!=",
            BinaryOp::Lt => "<",
            BinaryOp::LtEq => "<=",
            BinaryOp::Gt => ">",
            BinaryOp::GtEq => ">=",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Function {
    Int,
}

/// Immutable expression tree produced once per rule-text parse.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Literal(Literal),
    Identifier(String),
    List(Vec<Expr>),
    Unary {
        op: UnaryOp,
        operand: Box<Expr>,
    },
    Binary {
        op: BinaryOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Call {
        function: Function,
        args: Vec<Expr>,
    },
}

/// Result of evaluating a node.
#[derive(Debug, Clone, PartialEq)]
pub enum EvalValue {
    Bool(bool),
    Text(String),
    List(Vec<String>),
}

impl EvalValue {
    /// Empty list or empty string is false; booleans pass through.
    pub fn truthy(&self) -> bool {
        match self {
            EvalValue::Bool(flag) => *flag,
            EvalValue::Text(text) => !text.is_empty(),
            EvalValue::List(items) => !items.is_empty(),
        }
    }

    pub fn into_tokens(self) -> Vec<String> {
        match self {
            EvalValue::Bool(flag) => vec![flag.to_string()],
            EvalValue::Text(text) => vec![text],
            EvalValue::List(items) => items,
        }
    }
}

/// Answers plus, for navigation, the qid that `value` refers to.
#[derive(Debug, Clone, Copy)]
pub struct EvalContext<'a> {
    answers: &'a AnswerBag,
    owner: Option<&'a str>,
}

impl<'a> EvalContext<'a> {
    pub fn visibility(answers: &'a AnswerBag) -> Self {
        Self {
            answers,
            owner: None,
        }
    }

    pub fn navigation(answers: &'a AnswerBag, owner: &'a str) -> Self {
        Self {
            answers,
            owner: Some(owner),
        }
    }
}

impl Expr {
    pub fn literal_text(text: impl Into<String>) -> Self {
        Expr::Literal(Literal::Text(text.into()))
    }

    pub fn identifier(name: impl Into<String>) -> Self {
        Expr::Identifier(name.into())
    }

    pub fn binary(op: BinaryOp, left: Expr, right: Expr) -> Self {
        Expr::Binary {
            op,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    pub fn evaluate(&self, ctx: &EvalContext<'_>) -> Result<EvalValue, EvalError> {
        match self {
            Expr::Literal(Literal::Text(text)) | Expr::Literal(Literal::Number(text)) => {
                Ok(EvalValue::Text(text.clone()))
            }
            Expr::Literal(Literal::Bool(flag)) => Ok(EvalValue::Bool(*flag)),
            Expr::Identifier(name) => {
                if name.eq_ignore_ascii_case(VALUE_IDENTIFIER) {
                    let owner = ctx.owner.ok_or(EvalError::ValueOutsideNavigation)?;
                    Ok(EvalValue::List(ctx.answers.tokens(owner)))
                } else {
                    Ok(EvalValue::List(ctx.answers.tokens(name)))
                }
            }
            Expr::List(items) => {
                let mut tokens = Vec::new();
                for item in items {
                    tokens.extend(item.evaluate(ctx)?.into_tokens());
                }
                Ok(EvalValue::List(tokens))
            }
            Expr::Unary {
                op: UnaryOp::Not,
                operand,
            } => Ok(EvalValue::Bool(!operand.evaluate(ctx)?.truthy())),
            Expr::Binary { op, left, right } => evaluate_binary(*op, left, right, ctx),
            Expr::Call {
                function: Function::Int,
                args,
            } => {
                let first = match args.first() {
                    Some(arg) => arg.evaluate(ctx)?.into_tokens(),
                    None => Vec::new(),
                };
                coerce_int(first).map(EvalValue::Text)
            }
        }
    }

    /// Evaluates to a boolean using list/value truthiness.
    pub fn matches(&self, ctx: &EvalContext<'_>) -> Result<bool, EvalError> {
        self.evaluate(ctx).map(|value| value.truthy())
    }
}

fn evaluate_binary(
    op: BinaryOp,
    left: &Expr,
    right: &Expr,
    ctx: &EvalContext<'_>,
) -> Result<EvalValue, EvalError> {
    match op {
        BinaryOp::And => {
            let result = left.matches(ctx)? && right.matches(ctx)?;
            Ok(EvalValue::Bool(result))
        }
        BinaryOp::Or => {
            let result = left.matches(ctx)? || right.matches(ctx)?;
            Ok(EvalValue::Bool(result))
        }
        BinaryOp::Eq | BinaryOp::NotEq => {
            let left = left.evaluate(ctx)?.into_tokens();
            let right = right.evaluate(ctx)?.into_tokens();
            let any_pair = any_pair_equal(&left, &right);
            // `=` means some pair matches, `!=` means no pair matches.
            Ok(EvalValue::Bool(if op == BinaryOp::Eq {
                any_pair
            } else {
                !any_pair
            }))
        }
        BinaryOp::Lt | BinaryOp::LtEq | BinaryOp::Gt | BinaryOp::GtEq => {
            let left = left.evaluate(ctx)?.into_tokens();
            let right = right.evaluate(ctx)?.into_tokens();
            compare_ordered(op, &left, &right).map(EvalValue::Bool)
        }
        BinaryOp::In => {
            let left = left.evaluate(ctx)?.into_tokens();
            let right = right.evaluate(ctx)?.into_tokens();
            let found = left
                .iter()
                .any(|token| right.iter().any(|item| item == token));
            Ok(EvalValue::Bool(found))
        }
    }
}

/// Numeric-looking pairs compare with tolerance; anything else is an exact string match.
pub fn tokens_equal(left: &str, right: &str) -> bool {
    match (numeric_token(left), numeric_token(right)) {
        (Some(a), Some(b)) => numbers_equal(a, b),
        _ => left == right,
    }
}

fn any_pair_equal(left: &[String], right: &[String]) -> bool {
    left.iter()
        .any(|a| right.iter().any(|b| tokens_equal(a, b)))
}

fn compare_ordered(op: BinaryOp, left: &[String], right: &[String]) -> Result<bool, EvalError> {
    let bound = match right {
        [single] => numeric_token(single),
        _ => None,
    }
    .ok_or_else(|| EvalError::NonNumericBound {
        op: op.symbol(),
        found: right.to_vec(),
    })?;

    // Non-numeric left tokens are skipped rather than counted as failures.
    Ok(left.iter().filter_map(|token| numeric_token(token)).any(|value| match op {
        BinaryOp::Lt => value < bound,
        BinaryOp::LtEq => value <= bound,
        BinaryOp::Gt => value > bound,
        _ => value >= bound,
    }))
}

fn coerce_int(tokens: Vec<String>) -> Result<String, EvalError> {
    let token = tokens
        .into_iter()
        .map(|token| token.trim().to_string())
        .find(|token| !token.is_empty())
        .ok_or(EvalError::IntOfEmpty)?;
    match token.parse::<f64>() {
        Ok(value) if value.is_finite() => Ok(format!("{}", value.trunc() as i64)),
        _ => Err(EvalError::NotAnInteger { token }),
    }
}
