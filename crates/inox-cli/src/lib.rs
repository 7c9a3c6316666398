//! Glue between the core runtime's separately-published crates: load an AST,
//! check it, compile it, and run its entry point. Pulled out of `main.rs` so
//! the pipeline itself has no dependency on `clap` and can be exercised by
//! tests directly, the way the teacher's `compiler::pipeline` module is kept
//! free of its own CLI framework.

pub mod compile;
pub mod config;
pub mod error;

use error::CliError;
use inox_checker::Checker;
use inox_context::{Context, Limits, PermissionSet};
use inox_value::{InoxStr, Value};
use inox_vm::Vm;
use std::sync::Arc;

pub use config::RunConfig;

/// Parses `source` (a JSON-encoded `inox_ast::Program`), checks it, compiles
/// it and runs the function named `entry_point` with no arguments.
pub fn run_program(
    source: &str,
    entry_point: &str,
    permissions: PermissionSet,
    limits: Limits,
) -> Result<Value, CliError> {
    let program: inox_ast::Program = serde_json::from_str(source)?;

    let check_result = Checker::new(permissions.clone()).check_program(&program);
    if check_result.diagnostics.has_errors() {
        return Err(CliError::Checked(check_result.diagnostics));
    }

    let compiled = compile::compile_program(&program, &check_result.symbols)?;
    let entry_id = *compiled
        .function_ids
        .get(entry_point)
        .ok_or(CliError::MissingEntryPoint(entry_point.to_string()))?;

    let ctx = Context::with_permissions_and_limits("run", permissions, limits);
    let functions = Arc::new(compiled.functions);
    let mut vm = Vm::new(Arc::clone(&functions), ctx);

    for (name, &id) in &compiled.function_ids {
        let data = inox_value::callable::InoxFunctionData {
            bytecode_id: id,
            captured: Arc::from(Vec::new()),
        };
        vm.set_global(InoxStr::new(name.as_str()), Value::InoxFunction(Arc::new(data)));
    }

    let entry_chunk = Arc::clone(
        &functions
            .get(entry_id)
            .expect("just registered by compile_program")
            .chunk,
    );
    Ok(vm.run(entry_chunk)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use inox_ast::{BinaryOp, Expr, FunctionDef, Item, Param, Program, Span, Stmt};

    fn program_returning_sum() -> Program {
        Program {
            items: vec![Item::FunctionDef(FunctionDef {
                name: "main".to_string(),
                params: vec![],
                variadic: false,
                return_pattern: None,
                body: vec![Stmt::Return {
                    value: Some(Expr::Binary {
                        op: BinaryOp::Add,
                        lhs: Box::new(Expr::IntLiteral {
                            value: 2,
                            span: Span::default(),
                        }),
                        rhs: Box::new(Expr::IntLiteral {
                            value: 3,
                            span: Span::default(),
                        }),
                        span: Span::default(),
                    }),
                    span: Span::default(),
                }],
                span: Span::default(),
            })],
        }
    }

    #[test]
    fn runs_a_checked_and_compiled_program() {
        let source = serde_json::to_string(&program_returning_sum()).unwrap();
        let result = run_program(&source, "main", PermissionSet::new(), Limits::new()).unwrap();
        assert_eq!(result, Value::Int(5));
    }

    #[test]
    fn unknown_entry_point_is_reported() {
        let source = serde_json::to_string(&program_returning_sum()).unwrap();
        let err = run_program(&source, "missing", PermissionSet::new(), Limits::new()).unwrap_err();
        assert!(matches!(err, CliError::MissingEntryPoint(_)));
    }

    #[test]
    fn a_program_that_fails_checking_never_reaches_the_vm() {
        let program = Program {
            items: vec![Item::FunctionDef(FunctionDef {
                name: "main".to_string(),
                params: vec![],
                variadic: false,
                return_pattern: None,
                body: vec![Stmt::Assign {
                    target: Expr::Identifier {
                        name: "undeclared".to_string(),
                        span: Span::default(),
                    },
                    value: Expr::IntLiteral {
                        value: 1,
                        span: Span::default(),
                    },
                    span: Span::default(),
                }],
                span: Span::default(),
            })],
        };
        let source = serde_json::to_string(&program).unwrap();
        let err = run_program(&source, "main", PermissionSet::new(), Limits::new()).unwrap_err();
        assert!(matches!(err, CliError::Checked(_)));
    }
}
