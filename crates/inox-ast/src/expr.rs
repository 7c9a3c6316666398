//! The surface syntax tree (§1 "the parser is an out-of-scope collaborator";
//! this crate defines the shape it must produce, not how it is produced).
//!
//! Every node carries enough structure for the checker (§4.6) to evaluate it
//! symbolically and for a bytecode compiler to lower it, without committing
//! to either of those consumers' internals. `serde` derives let tests and
//! tooling load a `Program` from a JSON fixture rather than hand-building
//! the tree (the parser itself stays out of scope).

use crate::span::Span;
use serde::{Deserialize, Serialize};

pub type Name = String;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Program {
    pub items: Vec<Item>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Item {
    PatternDef {
        name: Name,
        pattern: PatternExpr,
        span: Span,
    },
    PatternNamespaceDef {
        name: Name,
        entries: Vec<(Name, PatternExpr)>,
        span: Span,
    },
    GlobalDecl {
        name: Name,
        declared_pattern: Option<PatternExpr>,
        value: Expr,
        span: Span,
    },
    FunctionDef(FunctionDef),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionDef {
    pub name: Name,
    pub params: Vec<Param>,
    pub variadic: bool,
    pub return_pattern: Option<PatternExpr>,
    pub body: Block,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Param {
    pub name: Name,
    pub pattern: Option<PatternExpr>,
}

pub type Block = Vec<Stmt>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Stmt {
    Expr(Expr),
    /// A local declaration. `pattern`, if present, is the static type the
    /// checker holds the local to for the rest of its scope (§4.6 "locals
    /// via prior declaration").
    Let {
        name: Name,
        pattern: Option<PatternExpr>,
        value: Expr,
        span: Span,
    },
    Assign {
        target: Expr,
        value: Expr,
        span: Span,
    },
    /// Integer-compound assignment (`+=` and friends); §4.6 "integer
    /// compound assignment requires both sides to be Int".
    CompoundAssign {
        op: BinaryOp,
        target: Expr,
        value: Expr,
        span: Span,
    },
    If {
        cond: Expr,
        then_branch: Block,
        else_branch: Option<Block>,
        span: Span,
    },
    Return {
        value: Option<Expr>,
        span: Span,
    },
    Raise {
        value: Expr,
        span: Span,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Eq,
    Neq,
    Lt,
    Lte,
    Gt,
    Gte,
    And,
    Or,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UnaryOp {
    Neg,
    Not,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Expr {
    IntLiteral { value: i64, span: Span },
    FloatLiteral { value: f64, span: Span },
    BoolLiteral { value: bool, span: Span },
    StringLiteral { value: String, span: Span },
    NilLiteral { span: Span },
    Identifier { name: Name, span: Span },
    Binary {
        op: BinaryOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
        span: Span,
    },
    Unary {
        op: UnaryOp,
        operand: Box<Expr>,
        span: Span,
    },
    Member {
        object: Box<Expr>,
        name: Name,
        span: Span,
    },
    /// `object.(name)` — a property name computed at runtime, not known to
    /// the checker statically (§4.4 DYN_MEMB).
    DynMember {
        object: Box<Expr>,
        name: Box<Expr>,
        span: Span,
    },
    Index {
        object: Box<Expr>,
        index: Box<Expr>,
        span: Span,
    },
    Slice {
        object: Box<Expr>,
        start: Option<Box<Expr>>,
        end: Option<Box<Expr>>,
        span: Span,
    },
    Call {
        callee: Box<Expr>,
        args: Vec<Expr>,
        spread_last: bool,
        /// `fn!(...)`: wraps a `(value, Error)` result and raises when the
        /// error is non-nil (§6 "must convention").
        must: bool,
        span: Span,
    },
    /// A pattern used as a callee (`%int(3..5)`): yields a refined pattern
    /// rather than invoking a function (§4.5 "PatternCallExpression").
    PatternCall {
        pattern: PatternExpr,
        args: Vec<Expr>,
        span: Span,
    },
    /// `value match Pattern` / `value is X` / `value != nil`, the three
    /// narrowing-triggering tests named in §4.6.
    PatternTest {
        value: Box<Expr>,
        pattern: PatternExpr,
        negate: bool,
        span: Span,
    },
    ObjectLiteral {
        properties: Vec<(Name, Expr)>,
        span: Span,
    },
    RecordLiteral {
        properties: Vec<(Name, Expr)>,
        span: Span,
    },
    ListLiteral {
        elements: Vec<Expr>,
        span: Span,
    },
    /// `go { ... }` / `go do <callee>`. `globals`, if present, is the
    /// explicit protocol by which values cross into the child fiber
    /// (§4.6 "Spawn expression").
    Spawn {
        callee: Box<Expr>,
        globals: Option<SpawnGlobals>,
        span: Span,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SpawnGlobals {
    /// Globals passed by name, by reference (§4.6 "a keylist").
    KeyList(Vec<Name>),
    /// Globals passed as a fresh object literal, value-by-share-or-clone.
    ObjectLiteral(Vec<(Name, Expr)>),
}

/// The pattern sublanguage as it appears in source, before the compiler
/// resolves `Named`/`OfKindName` references against a pattern namespace and
/// lowers the result to `inox_pattern::Pattern`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PatternExpr {
    Any,
    Never,
    Exact(Box<Expr>),
    /// A bare type name (`%int`, `%string`, ...), resolved against the
    /// built-in kind table or a user `PatternDef`.
    OfKindName(Name),
    /// A reference to a pattern bound by `PatternDef`/`PatternNamespaceDef`
    /// (`%user`, `%shapes.circle`).
    Named(Name),
    Object {
        entries: Vec<PatternObjectEntry>,
        exact: bool,
    },
    Record {
        entries: Vec<PatternObjectEntry>,
        exact: bool,
    },
    List {
        element: Box<PatternExpr>,
    },
    Tuple {
        element: Box<PatternExpr>,
    },
    Union(Vec<PatternExpr>),
    Intersection(Vec<PatternExpr>),
    Optional(Box<PatternExpr>),
    Regex(String),
    Function {
        params: Vec<PatternExpr>,
        variadic: bool,
        result: Option<Box<PatternExpr>>,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatternObjectEntry {
    pub name: Name,
    pub pattern: PatternExpr,
    pub optional: bool,
}

impl Program {
    pub fn find_function(&self, name: &str) -> Option<&FunctionDef> {
        self.items.iter().find_map(|item| match item {
            Item::FunctionDef(f) if f.name == name => Some(f),
            _ => None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn program_round_trips_through_json() {
        let program = Program {
            items: vec![Item::FunctionDef(FunctionDef {
                name: "add".to_string(),
                params: vec![
                    Param {
                        name: "a".to_string(),
                        pattern: Some(PatternExpr::OfKindName("int".to_string())),
                    },
                    Param {
                        name: "b".to_string(),
                        pattern: Some(PatternExpr::OfKindName("int".to_string())),
                    },
                ],
                variadic: false,
                return_pattern: Some(PatternExpr::OfKindName("int".to_string())),
                body: vec![Stmt::Return {
                    value: Some(Expr::Binary {
                        op: BinaryOp::Add,
                        lhs: Box::new(Expr::Identifier {
                            name: "a".to_string(),
                            span: Span::default(),
                        }),
                        rhs: Box::new(Expr::Identifier {
                            name: "b".to_string(),
                            span: Span::default(),
                        }),
                        span: Span::default(),
                    }),
                    span: Span::default(),
                }],
                span: Span::default(),
            })],
        };
        let json = serde_json::to_string(&program).unwrap();
        let parsed: Program = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, program);
    }

    #[test]
    fn find_function_locates_by_name() {
        let program = Program {
            items: vec![Item::FunctionDef(FunctionDef {
                name: "main".to_string(),
                params: vec![],
                variadic: false,
                return_pattern: None,
                body: vec![],
                span: Span::default(),
            })],
        };
        assert!(program.find_function("main").is_some());
        assert!(program.find_function("missing").is_none());
    }
}
