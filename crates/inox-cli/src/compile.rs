//! A minimal bytecode compiler: lowers a checked [`Program`](inox_ast::Program)
//! into an [`inox_vm::FunctionTable`]. Grounded in the same call/return and
//! operand-width conventions `inox-vm::vm` decodes, so this module and the
//! VM agree on every opcode's stack shape without either depending on the
//! other beyond `inox-bytecode`.
//!
//! Scoping is flat per function: an `if`'s locals stay visible (as dead
//! slots) past the end of their block rather than being popped off the
//! local-name table, since nothing here reuses slot numbers. A real
//! compiler would track block boundaries to reclaim them; this one trades
//! that for simplicity, since the checker has already rejected any program
//! that would observe the difference (it scopes locals exactly at block
//! boundaries).

use inox_ast::{BinaryOp, Block, Expr, FunctionDef, Item, PatternExpr, Program, Stmt, UnaryOp};
use inox_bytecode::{Chunk, ChunkBuilder, OpCode, Span as BSpan};
use inox_checker::SymbolicContext;
use inox_value::{InoxStr, Value};
use inox_vm::{CompiledFunction, FunctionTable};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

#[derive(Debug)]
pub enum CompileError {
    InvalidAssignTarget,
    Pattern(String),
    Unsupported(&'static str),
}

impl fmt::Display for CompileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CompileError::InvalidAssignTarget => write!(f, "expression is not assignable"),
            CompileError::Pattern(msg) => write!(f, "pattern lowering failed: {msg}"),
            CompileError::Unsupported(what) => write!(f, "unsupported construct: {what}"),
        }
    }
}

impl std::error::Error for CompileError {}

/// Output of compiling a whole program: a function table plus the name ->
/// bytecode-id map the CLI uses to register each function as a VM global
/// and to look up the entry point by name.
pub struct CompiledProgram {
    pub functions: FunctionTable,
    pub function_ids: HashMap<String, u32>,
}

pub fn compile_program(program: &Program, symbols: &SymbolicContext) -> Result<CompiledProgram, CompileError> {
    let mut functions = FunctionTable::new();
    let mut function_ids = HashMap::new();
    let defs: Vec<&FunctionDef> = program
        .items
        .iter()
        .filter_map(|item| match item {
            Item::FunctionDef(f) => Some(f),
            _ => None,
        })
        .collect();

    for &def in &defs {
        let compiled = compile_function(def, symbols)?;
        let id = functions.register(compiled);
        function_ids.insert(def.name.clone(), id);
    }
    Ok(CompiledProgram {
        functions,
        function_ids,
    })
}

fn bspan(span: inox_ast::Span) -> BSpan {
    BSpan::new(span.start, span.end)
}

struct FunctionCompiler<'a> {
    builder: ChunkBuilder,
    locals: Vec<String>,
    symbols: &'a SymbolicContext,
}

fn compile_function(def: &FunctionDef, symbols: &SymbolicContext) -> Result<CompiledFunction, CompileError> {
    let mut fc = FunctionCompiler {
        builder: ChunkBuilder::new(),
        locals: def.params.iter().map(|p| p.name.clone()).collect(),
        symbols,
    };
    fc.compile_block(&def.body)?;
    // Fall off the end: implicit `return nil` (§4.5 "a chunk that runs off
    // the end returns Nil").
    fc.builder.emit(OpCode::PushNil, bspan(def.span));
    fc.builder.emit(OpCode::Return, bspan(def.span));
    let chunk: Chunk = fc.builder.finish();
    Ok(CompiledFunction {
        name: Some(InoxStr::new(def.name.as_str())),
        chunk: Arc::new(chunk),
        arity: def.params.len() as u8,
        variadic: def.variadic,
        upvalue_count: 0,
    })
}

impl<'a> FunctionCompiler<'a> {
    fn local_slot(&self, name: &str) -> Option<u8> {
        self.locals.iter().position(|n| n == name).map(|i| i as u8)
    }

    fn declare_local(&mut self, name: &str) -> u8 {
        match self.local_slot(name) {
            Some(slot) => slot,
            None => {
                self.locals.push(name.to_string());
                (self.locals.len() - 1) as u8
            }
        }
    }

    fn compile_block(&mut self, block: &Block) -> Result<(), CompileError> {
        for stmt in block {
            self.compile_stmt(stmt)?;
        }
        Ok(())
    }

    fn compile_stmt(&mut self, stmt: &Stmt) -> Result<(), CompileError> {
        match stmt {
            Stmt::Expr(expr) => {
                self.compile_expr(expr)?;
                self.builder.emit(OpCode::Pop, bspan(expr_span(expr)));
            }
            Stmt::Let { name, value, span, .. } => {
                self.compile_expr(value)?;
                let slot = self.declare_local(name);
                self.builder.emit_u8(OpCode::SetLocal, slot, bspan(*span));
                self.builder.emit(OpCode::Pop, bspan(*span));
            }
            Stmt::Assign { target, value, span } => {
                self.compile_expr(value)?;
                self.compile_assign_target(target, *span)?;
            }
            Stmt::CompoundAssign { op, target, value, span } => {
                self.compile_expr(target)?;
                self.compile_expr(value)?;
                self.emit_binary(*op, *span);
                self.compile_assign_target(target, *span)?;
            }
            Stmt::If {
                cond,
                then_branch,
                else_branch,
                span,
            } => {
                self.compile_expr(cond)?;
                let else_jump = self.builder.emit_jump(OpCode::JumpIfFalse, bspan(*span));
                self.compile_block(then_branch)?;
                let end_jump = self.builder.emit_jump(OpCode::Jump, bspan(*span));
                self.builder.patch_jump(else_jump);
                if let Some(else_branch) = else_branch {
                    self.compile_block(else_branch)?;
                }
                self.builder.patch_jump(end_jump);
            }
            Stmt::Return { value, span } => {
                match value {
                    Some(expr) => self.compile_expr(expr)?,
                    None => self.builder.emit(OpCode::PushNil, bspan(*span)),
                }
                self.builder.emit(OpCode::Return, bspan(*span));
            }
            Stmt::Raise { value, span } => {
                self.compile_expr(value)?;
                self.builder.emit(OpCode::Raise, bspan(*span));
            }
        }
        Ok(())
    }

    fn compile_assign_target(&mut self, target: &Expr, span: inox_ast::Span) -> Result<(), CompileError> {
        match target {
            Expr::Identifier { name, .. } => {
                if let Some(slot) = self.local_slot(name) {
                    self.builder.emit_u8(OpCode::SetLocal, slot, bspan(span));
                } else {
                    self.builder
                        .emit_constant(OpCode::SetGlobal, Value::Identifier(InoxStr::new(name.as_str())), bspan(span));
                }
                self.builder.emit(OpCode::Pop, bspan(span));
            }
            Expr::Member { object, name, .. } => {
                // Stack so far: [new_value]. SetProperty wants
                // [container, value] so the container has to go under it.
                self.compile_expr(object)?;
                self.builder.emit(OpCode::Swap, bspan(span));
                self.builder
                    .emit_constant(OpCode::SetProperty, Value::PropertyName(InoxStr::new(name.as_str())), bspan(span));
            }
            Expr::Index { object, index, .. } => {
                self.compile_expr(object)?;
                self.builder.emit(OpCode::Swap, bspan(span));
                self.compile_expr(index)?;
                self.builder.emit(OpCode::Swap, bspan(span));
                self.builder.emit(OpCode::SetIndex, bspan(span));
            }
            _ => return Err(CompileError::InvalidAssignTarget),
        }
        Ok(())
    }

    /// `And`/`Or` are not handled here: they need to short-circuit around the
    /// right operand's own code, so `compile_expr`'s `Binary` arm emits them
    /// directly instead of compiling both sides eagerly and calling this.
    fn emit_binary(&mut self, op: BinaryOp, span: inox_ast::Span) {
        let opcode = match op {
            BinaryOp::Add => OpCode::Add,
            BinaryOp::Sub => OpCode::Sub,
            BinaryOp::Mul => OpCode::Mul,
            BinaryOp::Div => OpCode::Div,
            BinaryOp::Mod => OpCode::Mod,
            BinaryOp::Eq => OpCode::Eq,
            BinaryOp::Neq => OpCode::Neq,
            BinaryOp::Lt => OpCode::Lt,
            BinaryOp::Lte => OpCode::Lte,
            BinaryOp::Gt => OpCode::Gt,
            BinaryOp::Gte => OpCode::Gte,
            BinaryOp::And | BinaryOp::Or => unreachable!("And/Or short-circuit in compile_expr"),
        };
        self.builder.emit(opcode, bspan(span));
    }

    fn compile_expr(&mut self, expr: &Expr) -> Result<(), CompileError> {
        let span = bspan(expr_span(expr));
        match expr {
            Expr::IntLiteral { value, .. } => self.builder.emit_constant(OpCode::PushConst, Value::Int(*value), span),
            Expr::FloatLiteral { value, .. } => {
                self.builder.emit_constant(OpCode::PushConst, Value::Float(*value), span)
            }
            Expr::BoolLiteral { value: true, .. } => self.builder.emit(OpCode::PushTrue, span),
            Expr::BoolLiteral { value: false, .. } => self.builder.emit(OpCode::PushFalse, span),
            Expr::StringLiteral { value, .. } => {
                self.builder
                    .emit_constant(OpCode::PushConst, Value::String(InoxStr::new(value.as_str())), span);
            }
            Expr::NilLiteral { .. } => self.builder.emit(OpCode::PushNil, span),
            Expr::Identifier { name, .. } => match self.local_slot(name) {
                Some(slot) => self.builder.emit_u8(OpCode::GetLocal, slot, span),
                None => self.builder.emit_constant(
                    OpCode::GetGlobal,
                    Value::Identifier(InoxStr::new(name.as_str())),
                    span,
                ),
            },
            Expr::Binary {
                op: BinaryOp::And, lhs, rhs, ..
            } => {
                self.compile_expr(lhs)?;
                let jump = self.builder.emit_jump(OpCode::AndJump, span);
                self.compile_expr(rhs)?;
                self.builder.patch_jump(jump);
            }
            Expr::Binary {
                op: BinaryOp::Or, lhs, rhs, ..
            } => {
                self.compile_expr(lhs)?;
                let jump = self.builder.emit_jump(OpCode::OrJump, span);
                self.compile_expr(rhs)?;
                self.builder.patch_jump(jump);
            }
            Expr::Binary { op, lhs, rhs, .. } => {
                self.compile_expr(lhs)?;
                self.compile_expr(rhs)?;
                self.emit_binary(*op, expr_span(expr));
            }
            Expr::Unary { op, operand, .. } => {
                self.compile_expr(operand)?;
                let opcode = match op {
                    UnaryOp::Neg => OpCode::Neg,
                    UnaryOp::Not => OpCode::Not,
                };
                self.builder.emit(opcode, span);
            }
            Expr::Member { object, name, .. } => {
                self.compile_expr(object)?;
                self.builder
                    .emit_constant(OpCode::GetProperty, Value::PropertyName(InoxStr::new(name.as_str())), span);
            }
            Expr::DynMember { .. } => {
                return Err(CompileError::Unsupported(
                    "dynamic (`.( )`) member access has no bytecode opcode yet",
                ))
            }
            Expr::Index { object, index, .. } => {
                self.compile_expr(object)?;
                self.compile_expr(index)?;
                self.builder.emit(OpCode::Index, span);
            }
            Expr::Slice { object, start, end, .. } => {
                self.compile_expr(object)?;
                match end {
                    Some(end_expr) => {
                        match start {
                            Some(start_expr) => self.compile_expr(start_expr)?,
                            None => self.builder.emit_constant(OpCode::PushConst, Value::Int(0), span),
                        }
                        self.compile_expr(end_expr)?;
                    }
                    None => {
                        self.builder.emit(OpCode::Dup, span);
                        match start {
                            Some(start_expr) => self.compile_expr(start_expr)?,
                            None => self.builder.emit_constant(OpCode::PushConst, Value::Int(0), span),
                        }
                        self.builder.emit(OpCode::Swap, span);
                        self.builder.emit(OpCode::Len, span);
                    }
                }
                self.builder.emit(OpCode::Slice, span);
            }
            Expr::Call {
                callee,
                args,
                spread_last,
                must,
                ..
            } => {
                self.compile_expr(callee)?;
                for arg in args {
                    self.compile_expr(arg)?;
                }
                self.builder
                    .emit_u16_u16(OpCode::Call, args.len() as u16, if *spread_last { 1 } else { 0 }, span);
                if *must {
                    // Identity for a plain (non-pair) return value; only a
                    // `[result, error]` list would be unwrapped here.
                    self.builder.emit(OpCode::Must, span);
                }
            }
            Expr::PatternCall { pattern, .. } => {
                let lowered = self.lower_pattern(pattern)?;
                self.builder
                    .emit_constant(OpCode::MakePattern, Value::Pattern(Arc::new(lowered)), span);
            }
            Expr::PatternTest {
                value, pattern, negate, ..
            } => {
                self.compile_expr(value)?;
                let lowered = self.lower_pattern(pattern)?;
                self.builder
                    .emit_constant(OpCode::MakePattern, Value::Pattern(Arc::new(lowered)), span);
                self.builder.emit(OpCode::TestPattern, span);
                if *negate {
                    self.builder.emit(OpCode::Not, span);
                }
            }
            Expr::ObjectLiteral { properties, .. } | Expr::RecordLiteral { properties, .. } => {
                for (name, value) in properties {
                    self.builder
                        .emit_constant(OpCode::PushConst, Value::PropertyName(InoxStr::new(name.as_str())), span);
                    self.compile_expr(value)?;
                }
                let opcode = if matches!(expr, Expr::ObjectLiteral { .. }) {
                    OpCode::MakeObject
                } else {
                    OpCode::MakeRecord
                };
                self.builder.emit_u16(opcode, properties.len() as u16, span);
            }
            Expr::ListLiteral { elements, .. } => {
                for element in elements {
                    self.compile_expr(element)?;
                }
                self.builder.emit_u16(OpCode::MakeList, elements.len() as u16, span);
            }
            Expr::Spawn { callee, globals, .. } => {
                self.compile_expr(callee)?;
                let count = match globals {
                    None => 0,
                    Some(inox_ast::SpawnGlobals::KeyList(names)) => {
                        for name in names {
                            self.compile_expr(&Expr::Identifier {
                                name: name.clone(),
                                span: inox_ast::Span::default(),
                            })?;
                        }
                        names.len()
                    }
                    Some(inox_ast::SpawnGlobals::ObjectLiteral(entries)) => {
                        for (_, value) in entries {
                            self.compile_expr(value)?;
                        }
                        entries.len()
                    }
                };
                self.builder.emit_u16(OpCode::Spawn, count as u16, span);
            }
        }
        Ok(())
    }

    fn lower_pattern(&self, pattern: &PatternExpr) -> Result<inox_pattern::Pattern, CompileError> {
        inox_checker::lower_pattern_expr(pattern, self.symbols)
            .map(|arc| (*arc).clone())
            .map_err(|e| CompileError::Pattern(e.to_string()))
    }
}

fn expr_span(expr: &Expr) -> inox_ast::Span {
    match expr {
        Expr::IntLiteral { span, .. }
        | Expr::FloatLiteral { span, .. }
        | Expr::BoolLiteral { span, .. }
        | Expr::StringLiteral { span, .. }
        | Expr::NilLiteral { span }
        | Expr::Identifier { span, .. } => *span,
        Expr::Binary { span, .. }
        | Expr::Unary { span, .. }
        | Expr::Member { span, .. }
        | Expr::DynMember { span, .. }
        | Expr::Index { span, .. }
        | Expr::Slice { span, .. }
        | Expr::Call { span, .. }
        | Expr::PatternCall { span, .. }
        | Expr::PatternTest { span, .. }
        | Expr::ObjectLiteral { span, .. }
        | Expr::RecordLiteral { span, .. }
        | Expr::ListLiteral { span, .. }
        | Expr::Spawn { span, .. } => *span,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use inox_ast::{FunctionDef, Item, Param, Program, Span, Stmt};

    fn function(name: &str, params: Vec<&str>, body: Block) -> Item {
        Item::FunctionDef(FunctionDef {
            name: name.to_string(),
            params: params
                .into_iter()
                .map(|p| Param {
                    name: p.to_string(),
                    pattern: None,
                })
                .collect(),
            variadic: false,
            return_pattern: None,
            body,
            span: Span::default(),
        })
    }

    #[test]
    fn compiles_a_function_returning_sum_of_params() {
        let program = Program {
            items: vec![function(
                "add",
                vec!["a", "b"],
                vec![Stmt::Return {
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
            )],
        };
        let symbols = SymbolicContext::new();
        let compiled = compile_program(&program, &symbols).unwrap();
        assert_eq!(compiled.function_ids.len(), 1);
        let id = compiled.function_ids["add"];
        assert!(compiled.functions.get(id).is_some());
    }

    #[test]
    fn assigning_to_a_non_assignable_expression_is_an_error() {
        let program = Program {
            items: vec![function(
                "f",
                vec![],
                vec![Stmt::Assign {
                    target: Expr::IntLiteral {
                        value: 1,
                        span: Span::default(),
                    },
                    value: Expr::IntLiteral {
                        value: 2,
                        span: Span::default(),
                    },
                    span: Span::default(),
                }],
            )],
        };
        let symbols = SymbolicContext::new();
        let err = compile_program(&program, &symbols).unwrap_err();
        assert!(matches!(err, CompileError::InvalidAssignTarget));
    }

    #[test]
    fn and_compiles_to_a_short_circuit_jump() {
        let program = Program {
            items: vec![function(
                "f",
                vec!["a", "b"],
                vec![Stmt::Return {
                    value: Some(Expr::Binary {
                        op: BinaryOp::And,
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
            )],
        };
        let symbols = SymbolicContext::new();
        let compiled = compile_program(&program, &symbols).unwrap();
        let id = compiled.function_ids["f"];
        let chunk = &compiled.functions.get(id).unwrap().chunk;
        assert!(inox_bytecode::instructions(chunk)
            .any(|instr| instr.op == OpCode::AndJump));
    }
}
