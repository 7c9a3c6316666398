//! Lowers the surface `PatternExpr` (§1, pre-resolution) into a structural
//! `inox_pattern::Pattern`, resolving `Named`/`OfKindName` references against
//! a [`SymbolicContext`](crate::symbols::SymbolicContext). The bytecode
//! compiler performs the same lowering at a different stage (into constants);
//! this copy exists purely so the checker can fold a pattern literal into an
//! `AbstractValue` without depending on the compiler.

use crate::symbols::SymbolicContext;
use inox_ast::PatternExpr;
use inox_pattern::{ObjectPatternEntry, Pattern};
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LowerError {
    UnknownPattern(String),
    InvalidRegex(String),
    EmptyCombinator(&'static str),
    DuplicateProperty(String),
    /// `Exact(expr)` where `expr` isn't a literal the checker can fold to a
    /// concrete value at check time (§4.3 "exact patterns over literals").
    NonLiteralExact,
}

impl std::fmt::Display for LowerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LowerError::UnknownPattern(name) => write!(f, "unknown pattern `{name}`"),
            LowerError::InvalidRegex(msg) => write!(f, "invalid regex: {msg}"),
            LowerError::EmptyCombinator(c) => write!(f, "empty {c} pattern"),
            LowerError::DuplicateProperty(name) => write!(f, "duplicate property `{name}`"),
            LowerError::NonLiteralExact => {
                write!(f, "exact pattern must wrap a literal expression")
            }
        }
    }
}

pub fn lower_pattern_expr(
    expr: &PatternExpr,
    symbols: &SymbolicContext,
) -> Result<Arc<Pattern>, LowerError> {
    let pattern = match expr {
        PatternExpr::Any => Pattern::Any,
        PatternExpr::Never => Pattern::Never,
        PatternExpr::Exact(inner) => Pattern::Exact(literal_value(inner)?),
        PatternExpr::OfKindName(name) => {
            return symbols
                .resolve_pattern(name)
                .ok_or_else(|| LowerError::UnknownPattern(name.clone()));
        }
        PatternExpr::Named(name) => {
            if let Some((namespace, member)) = name.split_once('.') {
                return symbols
                    .resolve_namespace_member(namespace, member)
                    .ok_or_else(|| LowerError::UnknownPattern(name.clone()));
            }
            return symbols
                .resolve_pattern(name)
                .ok_or_else(|| LowerError::UnknownPattern(name.clone()));
        }
        PatternExpr::Object { entries, exact } => {
            Pattern::object(lower_entries(entries, symbols)?, *exact)
                .map_err(lower_pattern_error)?
        }
        PatternExpr::Record { entries, exact } => {
            Pattern::object(lower_entries(entries, symbols)?, *exact)
                .map_err(lower_pattern_error)?
        }
        PatternExpr::List { element } => Pattern::List(inox_pattern::ListPattern {
            element: lower_pattern_expr(element, symbols)?,
            min_len: 0,
            max_len: None,
        }),
        PatternExpr::Tuple { element } => Pattern::Tuple(inox_pattern::ListPattern {
            element: lower_pattern_expr(element, symbols)?,
            min_len: 0,
            max_len: None,
        }),
        PatternExpr::Union(members) => {
            let lowered = members
                .iter()
                .map(|m| lower_pattern_expr(m, symbols))
                .collect::<Result<Vec<_>, _>>()?;
            Pattern::union(lowered).map_err(lower_pattern_error)?
        }
        PatternExpr::Intersection(members) => {
            let lowered = members
                .iter()
                .map(|m| lower_pattern_expr(m, symbols))
                .collect::<Result<Vec<_>, _>>()?;
            Pattern::intersection(lowered).map_err(lower_pattern_error)?
        }
        PatternExpr::Optional(inner) => Pattern::Optional(lower_pattern_expr(inner, symbols)?),
        PatternExpr::Regex(source) => Pattern::Regex(
            inox_pattern::RegexPattern::compile(source.clone())
                .map_err(|e| LowerError::InvalidRegex(e.to_string()))?,
        ),
        PatternExpr::Function {
            params,
            variadic,
            result,
        } => {
            let params = params
                .iter()
                .map(|p| lower_pattern_expr(p, symbols))
                .collect::<Result<Vec<_>, _>>()?;
            let result = result
                .as_ref()
                .map(|r| lower_pattern_expr(r, symbols))
                .transpose()?;
            Pattern::Function(inox_pattern::FunctionPattern {
                params,
                variadic: *variadic,
                result,
            })
        }
    };
    Ok(Arc::new(pattern))
}

fn lower_entries(
    entries: &[inox_ast::PatternObjectEntry],
    symbols: &SymbolicContext,
) -> Result<Vec<ObjectPatternEntry>, LowerError> {
    entries
        .iter()
        .map(|e| {
            Ok(ObjectPatternEntry {
                name: e.name.as_str().into(),
                pattern: lower_pattern_expr(&e.pattern, symbols)?,
                optional: e.optional,
            })
        })
        .collect()
}

fn lower_pattern_error(e: inox_pattern::PatternError) -> LowerError {
    match e {
        inox_pattern::PatternError::InvalidRegex { message, .. } => {
            LowerError::InvalidRegex(message)
        }
        inox_pattern::PatternError::EmptyCombinator { combinator } => {
            LowerError::EmptyCombinator(combinator)
        }
        inox_pattern::PatternError::DuplicateProperty { name } => {
            LowerError::DuplicateProperty(name)
        }
    }
}

fn literal_value(expr: &inox_ast::Expr) -> Result<inox_value::Value, LowerError> {
    match expr {
        inox_ast::Expr::IntLiteral { value, .. } => Ok(inox_value::Value::Int(*value)),
        inox_ast::Expr::FloatLiteral { value, .. } => Ok(inox_value::Value::Float(*value)),
        inox_ast::Expr::BoolLiteral { value, .. } => Ok(inox_value::Value::Bool(*value)),
        inox_ast::Expr::StringLiteral { value, .. } => {
            Ok(inox_value::Value::String(inox_value::InoxStr::new(value)))
        }
        inox_ast::Expr::NilLiteral { .. } => Ok(inox_value::Value::Nil),
        _ => Err(LowerError::NonLiteralExact),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lowers_of_kind_name_against_builtins() {
        let symbols = SymbolicContext::new();
        let pattern = lower_pattern_expr(&PatternExpr::OfKindName("int".to_string()), &symbols)
            .unwrap();
        assert!(matches!(*pattern, Pattern::OfKind(inox_value::ValueKind::Int)));
    }

    #[test]
    fn unknown_named_pattern_is_an_error() {
        let symbols = SymbolicContext::new();
        let err = lower_pattern_expr(&PatternExpr::Named("nope".to_string()), &symbols)
            .unwrap_err();
        assert_eq!(err, LowerError::UnknownPattern("nope".to_string()));
    }

    #[test]
    fn lowers_exact_int_literal() {
        let symbols = SymbolicContext::new();
        let pattern =
            lower_pattern_expr(
                &PatternExpr::Exact(Box::new(inox_ast::Expr::IntLiteral {
                    value: 5,
                    span: inox_ast::Span::default(),
                })),
                &symbols,
            )
            .unwrap();
        assert!(matches!(*pattern, Pattern::Exact(inox_value::Value::Int(5))));
    }
}
