//! Minimal surface syntax tree shared by the checker and the bytecode
//! compiler (§1, §4.6). The parser that produces a `Program` is an
//! out-of-scope collaborator; this crate only pins down the shape.

pub mod expr;
pub mod span;

pub use expr::{
    BinaryOp, Block, Expr, FunctionDef, Item, Name, Param, PatternExpr, PatternObjectEntry,
    Program, SpawnGlobals, Stmt, UnaryOp,
};
pub use span::Span;
