//! The symbolic evaluator proper (§4.6): walks a `Program`, threading a
//! [`ScopeStack`] of [`AbstractValue`]s and collecting [`Diagnostics`] along
//! the way. Never stops at the first problem — on an unrecoverable local
//! error it substitutes `AbstractValue::Any` and keeps going, so one run
//! reports everything wrong with a program (§7).

use crate::diagnostics::Diagnostics;
use crate::lower::lower_pattern_expr;
use crate::scope::ScopeStack;
use crate::symbols::SymbolicContext;
use inox_ast::{BinaryOp, Block, Expr, FunctionDef, Item, Program, Stmt, UnaryOp};
use inox_context::{Permission, PermissionEntity, PermissionKind, PermissionSet};
use inox_value::{AbstractValue, ValueKind};
use std::collections::HashMap;

pub struct Checker {
    symbols: SymbolicContext,
    scopes: ScopeStack,
    diagnostics: Diagnostics,
    /// Hover-style map from every checked expression's span to the abstract
    /// value the checker inferred for it (§4.6 "a type map keyed by span").
    types: HashMap<inox_ast::Span, AbstractValue>,
    /// The permissions the host intends to grant at run time, used only to
    /// warn at spawn sites that would otherwise fail with `PermissionDenied`
    /// (§4.3, §7 "Permission: never recovered locally").
    permissions: PermissionSet,
    current_return: Option<AbstractValue>,
}

pub struct CheckResult {
    pub diagnostics: Diagnostics,
    pub types: HashMap<inox_ast::Span, AbstractValue>,
    /// The pattern/namespace table as registered during this check, handed
    /// back so a downstream bytecode compiler resolves `Named`/`OfKindName`
    /// pattern references the same way the checker did rather than
    /// re-deriving them from scratch.
    pub symbols: SymbolicContext,
}

impl Checker {
    pub fn new(permissions: PermissionSet) -> Self {
        Self {
            symbols: SymbolicContext::new(),
            scopes: ScopeStack::new(),
            diagnostics: Diagnostics::new(),
            types: HashMap::new(),
            permissions,
            current_return: None,
        }
    }

    pub fn check_program(mut self, program: &Program) -> CheckResult {
        self.register_pattern_items(program);
        self.register_function_names(program);
        self.register_globals(program);
        for item in &program.items {
            if let Item::FunctionDef(f) = item {
                self.check_function(f);
            }
        }
        CheckResult {
            diagnostics: self.diagnostics,
            types: self.types,
            symbols: self.symbols,
        }
    }

    /// First pass: pattern and namespace definitions must be visible to
    /// every function body regardless of source order (§4.3).
    fn register_pattern_items(&mut self, program: &Program) {
        for item in &program.items {
            match item {
                Item::PatternDef { name, pattern, span } => {
                    match lower_pattern_expr(pattern, &self.symbols) {
                        Ok(lowered) => {
                            if !self.symbols.define_pattern(name.clone(), lowered) {
                                self.diagnostics.error(
                                    format!("pattern `{name}` is already defined"),
                                    *span,
                                );
                            }
                        }
                        Err(e) => self.diagnostics.error(e.to_string(), *span),
                    }
                }
                Item::PatternNamespaceDef { name, entries, span } => {
                    let mut lowered = HashMap::new();
                    for (member, expr) in entries {
                        match lower_pattern_expr(expr, &self.symbols) {
                            Ok(p) => {
                                lowered.insert(member.clone(), p);
                            }
                            Err(e) => self.diagnostics.error(e.to_string(), *span),
                        }
                    }
                    if !self.symbols.define_namespace(name.clone(), lowered) {
                        self.diagnostics
                            .error(format!("namespace `{name}` is already defined"), *span);
                    }
                }
                _ => {}
            }
        }
    }

    /// Pre-declares every top-level function's name as a global of
    /// abstract type `OfKind(InoxFunction)` so a forward reference or a
    /// `go`/call site naming it resolves during the per-function pass,
    /// regardless of source order (§4.3 function-call arity/type matching
    /// still happens at the call site via `Expr::Call`, not here).
    fn register_function_names(&mut self, program: &Program) {
        for item in &program.items {
            if let Item::FunctionDef(f) = item {
                self.scopes.declare_global(
                    f.name.clone(),
                    AbstractValue::OfKind(ValueKind::InoxFunction),
                );
            }
        }
    }

    fn register_globals(&mut self, program: &Program) {
        for item in &program.items {
            if let Item::GlobalDecl {
                name,
                declared_pattern,
                value,
                span,
            } = item
            {
                let inferred = self.check_expr(value);
                let declared = declared_pattern.as_ref().map(|p| self.lower_or_any(p));
                let bound = match declared {
                    Some(declared) if !inferred.is_subset_of(&declared) => {
                        self.diagnostics.error(
                            format!("global `{name}` does not match its declared pattern"),
                            *span,
                        );
                        declared
                    }
                    Some(declared) => declared,
                    None => inferred,
                };
                self.scopes.declare_global(name.clone(), bound);
            }
        }
    }

    fn lower_or_any(&mut self, pattern: &inox_ast::PatternExpr) -> AbstractValue {
        match lower_pattern_expr(pattern, &self.symbols) {
            Ok(p) => p.symbolic_value(),
            Err(_) => AbstractValue::Any,
        }
    }

    fn check_function(&mut self, f: &FunctionDef) {
        self.scopes.push_scope();
        for param in &f.params {
            let ty = param
                .pattern
                .as_ref()
                .map(|p| self.lower_or_any(p))
                .unwrap_or(AbstractValue::Any);
            self.scopes.declare_local(param.name.clone(), ty);
        }
        let declared_return = f.return_pattern.as_ref().map(|p| self.lower_or_any(p));
        self.current_return = Some(AbstractValue::Never);
        self.check_block(&f.body);
        let inferred_return = self.current_return.take().unwrap_or(AbstractValue::Never);
        if let Some(declared) = declared_return {
            if !inferred_return.is_subset_of(&declared) {
                self.diagnostics.error(
                    format!(
                        "function `{}` can return a value its declared pattern does not accept",
                        f.name
                    ),
                    f.span,
                );
            }
        }
        self.scopes.pop_scope();
    }

    fn check_block(&mut self, block: &Block) {
        for stmt in block {
            self.check_stmt(stmt);
        }
    }

    fn check_stmt(&mut self, stmt: &Stmt) {
        match stmt {
            Stmt::Expr(expr) => {
                self.check_expr(expr);
            }
            Stmt::Let {
                name,
                pattern,
                value,
                span,
            } => {
                let inferred = self.check_expr(value);
                let bound = match pattern {
                    Some(p) => {
                        let declared = self.lower_or_any(p);
                        if !inferred.is_subset_of(&declared) {
                            self.diagnostics.error(
                                format!("`{name}` does not match its declared pattern"),
                                *span,
                            );
                        }
                        declared
                    }
                    None => inferred,
                };
                self.scopes.declare_local(name.clone(), bound);
            }
            Stmt::Assign { target, value, span } => {
                let inferred = self.check_expr(value);
                self.check_assign_target(target, inferred, *span);
            }
            Stmt::CompoundAssign {
                op,
                target,
                value,
                span,
            } => {
                let lhs = self.check_expr(target);
                let rhs = self.check_expr(value);
                if !matches!(op, BinaryOp::Add) {
                    self.diagnostics
                        .error("only `+=` is supported as a compound assignment".to_string(), *span);
                }
                if lhs.kind_of() != Some(ValueKind::Int) || rhs.kind_of() != Some(ValueKind::Int) {
                    self.diagnostics.error(
                        "integer compound assignment requires both sides to be Int".to_string(),
                        *span,
                    );
                }
                self.check_assign_target(target, AbstractValue::Int, *span);
            }
            Stmt::If {
                cond,
                then_branch,
                else_branch,
                span: _,
            } => {
                // Narrowing applies to the `then` branch; the `else` branch
                // inherits the same narrowed scope rather than the negated
                // test, since negating a pattern test isn't modeled here.
                self.check_narrowing_condition(cond);
                let then_fork = self.scopes.fork();
                self.check_block(then_branch);
                let then_result = self.scopes.fork();
                self.scopes.restore(then_fork);
                match else_branch {
                    Some(else_block) => {
                        self.check_block(else_block);
                        let else_result = self.scopes.fork();
                        self.scopes.join(vec![then_result, else_result]);
                    }
                    None => {
                        self.scopes.join(vec![then_result, self.scopes.fork()]);
                    }
                }
            }
            Stmt::Return { value, span: _ } => {
                let returned = value
                    .as_ref()
                    .map(|v| self.check_expr(v))
                    .unwrap_or(AbstractValue::Nil);
                self.current_return = Some(AbstractValue::multivalue([
                    self.current_return.take().unwrap_or(AbstractValue::Never),
                    returned,
                ]));
            }
            Stmt::Raise { value, span: _ } => {
                self.check_expr(value);
            }
        }
    }

    fn check_assign_target(&mut self, target: &Expr, value: AbstractValue, span: inox_ast::Span) {
        match target {
            Expr::Identifier { name, .. } => {
                if !self.scopes.assign(name, value) {
                    self.diagnostics
                        .error(format!("assignment to undeclared name `{name}`"), span);
                }
            }
            Expr::Member { object, name, .. } => {
                // Member-chain narrowing is out of reach: `AbstractValue`
                // has no per-property representation, so property
                // assignment is tracked only at kind granularity.
                let obj = self.check_receiver_for_mutation(object, span);
                if !matches!(obj.kind_of(), Some(ValueKind::Object) | Some(ValueKind::Record) | None) {
                    self.diagnostics
                        .error(format!("`.{name}` requires an Object or Record"), span);
                }
            }
            Expr::Index { object, index, .. } => {
                let obj = self.check_receiver_for_mutation(object, span);
                self.check_expr(index);
                if !matches!(
                    obj.kind_of(),
                    Some(ValueKind::List) | Some(ValueKind::Dictionary) | Some(ValueKind::Mapping) | None
                ) {
                    self.diagnostics
                        .error("indexing requires a List, Dictionary or Mapping".to_string(), span);
                }
            }
            Expr::DynMember { object, name, .. } => {
                self.check_receiver_for_mutation(object, span);
                self.check_expr(name);
            }
            _ => {
                self.diagnostics
                    .error("invalid assignment target".to_string(), span);
            }
        }
    }

    /// Checks the object a property/index assignment mutates, raising a
    /// diagnostic when it is known to be a `Record` (§4.3 "mutation on
    /// read-only aborts with a diagnostic"). Records have no runtime
    /// mutation opcode at all, so this is caught here rather than left to
    /// fail at run time.
    fn check_receiver_for_mutation(&mut self, object: &Expr, span: inox_ast::Span) -> AbstractValue {
        let obj = self.check_expr(object);
        if obj.kind_of() == Some(ValueKind::Record) {
            self.diagnostics
                .error("cannot mutate a Record: mutation requires an Object".to_string(), span);
        }
        obj
    }

    /// Applies narrowing for the three test forms named in §4.6
    /// (`match`/`is`/`!= nil`) when the tested value is a bare identifier;
    /// any other shape (a member chain, a call) is checked for well-formedness
    /// but produces no narrowing, since `AbstractValue` cannot track
    /// per-property facts.
    fn check_narrowing_condition(&mut self, cond: &Expr) {
        if let Expr::PatternTest {
            value,
            pattern,
            negate,
            span: _,
        } = cond
        {
            self.check_expr(value);
            if let Expr::Identifier { name, .. } = value.as_ref() {
                let narrowed = self.lower_or_any(pattern);
                if !*negate {
                    self.scopes.assign(name, narrowed);
                }
            }
            return;
        }
        self.check_expr(cond);
    }

    fn check_expr(&mut self, expr: &Expr) -> AbstractValue {
        let (value, span) = self.infer_expr(expr);
        self.types.insert(span, value.clone());
        value
    }

    fn infer_expr(&mut self, expr: &Expr) -> (AbstractValue, inox_ast::Span) {
        match expr {
            Expr::IntLiteral { value, span } => (AbstractValue::ExactInt(*value), *span),
            Expr::FloatLiteral { span, .. } => (AbstractValue::Float, *span),
            Expr::BoolLiteral { value, span } => (AbstractValue::ExactBool(*value), *span),
            Expr::StringLiteral { value, span } => {
                (AbstractValue::ExactString(value.as_str().into()), *span)
            }
            Expr::NilLiteral { span } => (AbstractValue::Nil, *span),
            Expr::Identifier { name, span } => {
                let value = self.scopes.resolve(name).cloned().unwrap_or_else(|| {
                    self.diagnostics.error(format!("undeclared name `{name}`"), *span);
                    AbstractValue::Any
                });
                (value, *span)
            }
            Expr::Binary { op, lhs, rhs, span } => {
                let l = self.check_expr(lhs);
                let r = self.check_expr(rhs);
                (self.check_binary(*op, &l, &r, *span), *span)
            }
            Expr::Unary { op, operand, span } => {
                let v = self.check_expr(operand);
                let result = match op {
                    UnaryOp::Neg => {
                        if v.kind_of() != Some(ValueKind::Int) && v.kind_of() != Some(ValueKind::Float) {
                            self.diagnostics
                                .error("`-` requires a numeric operand".to_string(), *span);
                        }
                        v.widen_simple_values()
                    }
                    UnaryOp::Not => {
                        if v.kind_of() != Some(ValueKind::Bool) {
                            self.diagnostics
                                .error("`!` requires a Bool operand".to_string(), *span);
                        }
                        AbstractValue::Bool
                    }
                };
                (result, *span)
            }
            Expr::Member { object, name, span } => {
                let obj = self.check_expr(object);
                if !matches!(
                    obj.kind_of(),
                    Some(ValueKind::Object) | Some(ValueKind::Record) | None
                ) {
                    self.diagnostics.error(
                        format!("`.{name}` requires an Object or Record"),
                        *span,
                    );
                }
                (AbstractValue::Any, *span)
            }
            Expr::DynMember { object, name, span } => {
                self.check_expr(object);
                self.check_expr(name);
                (AbstractValue::Any, *span)
            }
            Expr::Index { object, index, span } => {
                let obj = self.check_expr(object);
                let idx = self.check_expr(index);
                if !matches!(
                    obj.kind_of(),
                    Some(ValueKind::List) | Some(ValueKind::Dictionary) | Some(ValueKind::Mapping) | None
                ) {
                    self.diagnostics
                        .error("indexing requires a List, Dictionary or Mapping".to_string(), *span);
                }
                let _ = idx;
                (AbstractValue::Any, *span)
            }
            Expr::Slice {
                object,
                start,
                end,
                span,
            } => {
                let obj = self.check_expr(object);
                if obj.kind_of() != Some(ValueKind::List) && obj.kind_of() != Some(ValueKind::String) {
                    self.diagnostics
                        .error("slicing requires a List or String".to_string(), *span);
                }
                if let Some(s) = start {
                    self.check_expr(s);
                }
                if let Some(e) = end {
                    self.check_expr(e);
                }
                (obj.widen_simple_values(), *span)
            }
            Expr::Call {
                callee,
                args,
                spread_last: _,
                must,
                span,
            } => {
                self.check_expr(callee);
                for arg in args {
                    self.check_expr(arg);
                }
                let result = if *must {
                    AbstractValue::Any
                } else {
                    AbstractValue::Any
                };
                (result, *span)
            }
            Expr::PatternCall { pattern, args, span } => {
                let narrowed = self.lower_or_any(pattern);
                for arg in args {
                    self.check_expr(arg);
                }
                (narrowed, *span)
            }
            Expr::PatternTest {
                value,
                pattern,
                negate: _,
                span,
            } => {
                self.check_expr(value);
                self.lower_or_any(pattern);
                (AbstractValue::Bool, *span)
            }
            Expr::ObjectLiteral { properties, span } => {
                for (_, v) in properties {
                    self.check_expr(v);
                }
                (AbstractValue::OfKind(ValueKind::Object), *span)
            }
            Expr::RecordLiteral { properties, span } => {
                for (_, v) in properties {
                    self.check_expr(v);
                }
                (AbstractValue::OfKind(ValueKind::Record), *span)
            }
            Expr::ListLiteral { elements, span } => {
                for e in elements {
                    self.check_expr(e);
                }
                (AbstractValue::OfKind(ValueKind::List), *span)
            }
            Expr::Spawn { callee, globals, span } => {
                self.check_expr(callee);
                match globals {
                    Some(inox_ast::SpawnGlobals::KeyList(_names)) => {}
                    Some(inox_ast::SpawnGlobals::ObjectLiteral(entries)) => {
                        for (_, v) in entries {
                            self.check_expr(v);
                        }
                    }
                    None => {}
                }
                self.check_spawn_permission(*span);
                (AbstractValue::Any, *span)
            }
        }
    }

    fn check_spawn_permission(&mut self, span: inox_ast::Span) {
        let required = Permission::new(
            PermissionKind::Create,
            PermissionEntity::Host("fiber".to_string()),
        );
        if !self.permissions.has_permission(&required) {
            self.diagnostics.warning(
                "spawning a fiber here requires a Create permission over host `fiber` that is not granted"
                    .to_string(),
                span,
            );
        }
    }

    fn check_binary(
        &mut self,
        op: BinaryOp,
        lhs: &AbstractValue,
        rhs: &AbstractValue,
        span: inox_ast::Span,
    ) -> AbstractValue {
        use BinaryOp::*;
        match op {
            Add | Sub | Mul | Div | Mod => {
                let numeric = |v: &AbstractValue| {
                    matches!(v.kind_of(), Some(ValueKind::Int) | Some(ValueKind::Float))
                };
                if !numeric(lhs) || !numeric(rhs) {
                    self.diagnostics
                        .error(format!("{op:?} requires numeric operands"), span);
                    return AbstractValue::Any;
                }
                if lhs.kind_of() == Some(ValueKind::Float) || rhs.kind_of() == Some(ValueKind::Float) {
                    AbstractValue::Float
                } else {
                    AbstractValue::Int
                }
            }
            Eq | Neq => AbstractValue::Bool,
            Lt | Lte | Gt | Gte => {
                let numeric = |v: &AbstractValue| {
                    matches!(v.kind_of(), Some(ValueKind::Int) | Some(ValueKind::Float))
                };
                if !numeric(lhs) || !numeric(rhs) {
                    self.diagnostics
                        .error(format!("{op:?} requires numeric operands"), span);
                }
                AbstractValue::Bool
            }
            And | Or => {
                if lhs.kind_of() != Some(ValueKind::Bool) || rhs.kind_of() != Some(ValueKind::Bool) {
                    self.diagnostics
                        .error(format!("{op:?} requires Bool operands"), span);
                }
                AbstractValue::Bool
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use inox_ast::{Param, Span};

    fn span() -> Span {
        Span::new(0, 1)
    }

    fn ident(name: &str) -> Expr {
        Expr::Identifier {
            name: name.to_string(),
            span: span(),
        }
    }

    fn int(value: i64) -> Expr {
        Expr::IntLiteral { value, span: span() }
    }

    fn boolean(value: bool) -> Expr {
        Expr::BoolLiteral { value, span: span() }
    }

    #[test]
    fn well_typed_function_has_no_diagnostics() {
        let program = Program {
            items: vec![Item::FunctionDef(FunctionDef {
                name: "add".to_string(),
                params: vec![
                    Param {
                        name: "a".to_string(),
                        pattern: Some(inox_ast::PatternExpr::OfKindName("int".to_string())),
                    },
                    Param {
                        name: "b".to_string(),
                        pattern: Some(inox_ast::PatternExpr::OfKindName("int".to_string())),
                    },
                ],
                variadic: false,
                return_pattern: Some(inox_ast::PatternExpr::OfKindName("int".to_string())),
                body: vec![Stmt::Return {
                    value: Some(Expr::Binary {
                        op: BinaryOp::Add,
                        lhs: Box::new(ident("a")),
                        rhs: Box::new(ident("b")),
                        span: span(),
                    }),
                    span: span(),
                }],
                span: span(),
            })],
        };
        let result = Checker::new(PermissionSet::new()).check_program(&program);
        assert!(!result.diagnostics.has_errors());
    }

    #[test]
    fn assigning_to_undeclared_name_is_an_error() {
        let program = Program {
            items: vec![Item::FunctionDef(FunctionDef {
                name: "f".to_string(),
                params: vec![],
                variadic: false,
                return_pattern: None,
                body: vec![Stmt::Assign {
                    target: ident("missing"),
                    value: int(1),
                    span: span(),
                }],
                span: span(),
            })],
        };
        let result = Checker::new(PermissionSet::new()).check_program(&program);
        assert!(result.diagnostics.has_errors());
    }

    #[test]
    fn mutating_a_record_property_is_an_error() {
        let program = Program {
            items: vec![Item::FunctionDef(FunctionDef {
                name: "f".to_string(),
                params: vec![],
                variadic: false,
                return_pattern: None,
                body: vec![
                    Stmt::Let {
                        name: "r".to_string(),
                        pattern: Some(inox_ast::PatternExpr::Record {
                            entries: vec![],
                            exact: false,
                        }),
                        value: Expr::RecordLiteral {
                            properties: vec![],
                            span: span(),
                        },
                        span: span(),
                    },
                    Stmt::Assign {
                        target: Expr::Member {
                            object: Box::new(ident("r")),
                            name: "x".to_string(),
                            span: span(),
                        },
                        value: int(1),
                        span: span(),
                    },
                ],
                span: span(),
            })],
        };
        let result = Checker::new(PermissionSet::new()).check_program(&program);
        assert!(result.diagnostics.has_errors());
    }

    #[test]
    fn adding_bool_and_int_is_an_error() {
        let program = Program {
            items: vec![Item::FunctionDef(FunctionDef {
                name: "f".to_string(),
                params: vec![],
                variadic: false,
                return_pattern: None,
                body: vec![Stmt::Expr(Expr::Binary {
                    op: BinaryOp::Add,
                    lhs: Box::new(boolean(true)),
                    rhs: Box::new(int(1)),
                    span: span(),
                })],
                span: span(),
            })],
        };
        let result = Checker::new(PermissionSet::new()).check_program(&program);
        assert!(result.diagnostics.has_errors());
    }

    #[test]
    fn spawn_without_permission_warns() {
        let program = Program {
            items: vec![
                Item::FunctionDef(FunctionDef {
                    name: "worker".to_string(),
                    params: vec![],
                    variadic: false,
                    return_pattern: None,
                    body: vec![],
                    span: span(),
                }),
                Item::FunctionDef(FunctionDef {
                    name: "f".to_string(),
                    params: vec![],
                    variadic: false,
                    return_pattern: None,
                    body: vec![Stmt::Expr(Expr::Spawn {
                        callee: Box::new(ident("worker")),
                        globals: None,
                        span: span(),
                    })],
                    span: span(),
                }),
            ],
        };
        let result = Checker::new(PermissionSet::new()).check_program(&program);
        assert!(!result.diagnostics.has_errors());
        assert_eq!(result.diagnostics.len(), 1);
    }
}
