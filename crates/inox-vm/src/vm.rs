//! The stack-machine dispatch loop (§4.5).
//!
//! Mirrors the teacher's bytecode interpreter structure — a flat value
//! stack, a vector of call frames, a `match` over the current opcode
//! inside a `loop` — but this loop interprets directly rather than driving
//! an LLVM codegen backend, since ahead-of-time compilation is out of
//! scope here (§1 Non-goals).

use crate::error::{VmError, VmResult};
use crate::frame::CallFrame;
use crate::function::FunctionTable;
use inox_bytecode::{decode_one, Chunk, OpCode, Operand};
use inox_context::Context;
use inox_pattern::Pattern;
use inox_value::callable::{ErrorData, GoFunctionHandle, InoxMessage, PatternHandle};
use inox_value::collections::{
    DictData, ListData, MappingData, ObjectData, Property, RecordData,
};
use inox_value::{AbstractValue, InoxStr, PatternLike, Value, ValueKind};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// Wraps an arbitrary set of patterns as a single `Any`-of-them pattern,
/// the runtime counterpart of `Pattern::Union` for patterns that arrived
/// on the stack as opaque `PatternHandle`s rather than a concrete `Pattern`
/// this crate can recompose structurally.
#[derive(Debug)]
struct RuntimeUnion(Vec<PatternHandle>);

impl PatternLike for RuntimeUnion {
    fn test(&self, value: &Value) -> bool {
        self.0.iter().any(|p| p.test(value))
    }
    fn type_name(&self) -> &'static str {
        "runtime-union-pattern"
    }
}

#[derive(Debug)]
struct RuntimeOptional(PatternHandle);

impl PatternLike for RuntimeOptional {
    fn test(&self, value: &Value) -> bool {
        value.is_nil() || self.0.test(value)
    }
    fn type_name(&self) -> &'static str {
        "runtime-optional-pattern"
    }
}

pub struct Vm {
    stack: Vec<Value>,
    frames: Vec<CallFrame>,
    globals: Arc<Mutex<HashMap<InoxStr, Value>>>,
    functions: Arc<FunctionTable>,
    ctx: Context,
}

impl Vm {
    pub fn new(functions: Arc<FunctionTable>, ctx: Context) -> Self {
        Self {
            stack: Vec::new(),
            frames: Vec::new(),
            globals: Arc::new(Mutex::new(HashMap::new())),
            functions,
            ctx,
        }
    }

    pub fn set_global(&self, name: impl Into<InoxStr>, value: Value) {
        self.globals
            .lock()
            .expect("globals lock poisoned")
            .insert(name.into(), value);
    }

    pub fn get_global(&self, name: &str) -> Option<Value> {
        self.globals
            .lock()
            .expect("globals lock poisoned")
            .get(name)
            .cloned()
    }

    fn push(&mut self, v: Value) {
        self.stack.push(v);
    }

    fn pop(&mut self) -> VmResult<Value> {
        self.stack.pop().ok_or(VmError::StackUnderflow)
    }

    fn pop_n(&mut self, n: usize) -> VmResult<Vec<Value>> {
        if self.stack.len() < n {
            return Err(VmError::StackUnderflow);
        }
        Ok(self.stack.split_off(self.stack.len() - n))
    }

    fn peek(&self, back: usize) -> VmResult<&Value> {
        let len = self.stack.len();
        len.checked_sub(back + 1)
            .and_then(|i| self.stack.get(i))
            .ok_or(VmError::StackUnderflow)
    }

    /// Run `chunk` as a fresh top-level call and return its final value.
    /// `chunk` should end in a `Return` (or fall off the end, which is
    /// treated as an implicit `return nil`).
    pub fn run(&mut self, chunk: Arc<Chunk>) -> VmResult<Value> {
        let base = self.stack.len();
        self.frames
            .push(CallFrame::new(chunk, base, Arc::from(Vec::new())));
        let depth = self.frames.len();
        self.execute_from(depth)
    }

    /// Step until the frame stack drops below `base_depth`, pushing back
    /// onto the value stack the result of every call frame that returns
    /// above that depth (§4.5 call/return convention) and returning the
    /// result of the one that drops below it.
    fn execute_from(&mut self, base_depth: usize) -> VmResult<Value> {
        loop {
            if self.ctx.is_cancelled() {
                return Err(VmError::Cancelled);
            }
            match self.step()? {
                Step::Continue => {}
                Step::Returned(value) => {
                    if self.frames.len() < base_depth {
                        return Ok(value);
                    }
                    self.push(value);
                }
            }
        }
    }

    fn current_chunk(&self) -> Arc<Chunk> {
        Arc::clone(&self.frames.last().expect("no active frame").chunk)
    }

    fn step(&mut self) -> VmResult<Step> {
        let chunk = self.current_chunk();
        let ip = self.frames.last().expect("no active frame").ip;
        let instr = decode_one(&chunk.code, ip).ok_or_else(|| {
            chunk
                .code
                .get(ip)
                .map(|b| VmError::UnknownOpcode(*b))
                .unwrap_or(VmError::UnknownOpcode(0))
        })?;
        self.frames.last_mut().unwrap().ip = instr.next_offset as usize;

        use OpCode::*;
        match instr.op {
            Nop => {}
            PushConst | MakePattern => {
                let Operand::U32(idx) = instr.operand else { unreachable!() };
                let v = chunk.constant(idx).ok_or(VmError::UnknownConstant(idx))?;
                self.push(v.clone());
            }
            PushNil => self.push(Value::Nil),
            PushTrue => self.push(Value::Bool(true)),
            PushFalse => self.push(Value::Bool(false)),
            Pop => {
                self.pop()?;
            }
            Dup => {
                let v = self.peek(0)?.clone();
                self.push(v);
            }
            Swap => {
                let len = self.stack.len();
                if len < 2 {
                    return Err(VmError::StackUnderflow);
                }
                self.stack.swap(len - 1, len - 2);
            }

            Add | Sub | Mul | Div | Mod => self.numeric_binop(instr.op)?,
            Neg => {
                let v = self.pop()?;
                self.push(match v {
                    Value::Int(i) => Value::Int(-i),
                    Value::Float(f) => Value::Float(-f),
                    other => {
                        return Err(VmError::TypeError(inox_value::ValueError::TypeMismatch {
                            op: "neg",
                            value_kind: other.kind().name(),
                        }))
                    }
                });
            }

            Eq => {
                let (b, a) = (self.pop()?, self.pop()?);
                self.push(Value::Bool(inox_value::value::equal(&a, &b, 64)));
            }
            Neq => {
                let (b, a) = (self.pop()?, self.pop()?);
                self.push(Value::Bool(!inox_value::value::equal(&a, &b, 64)));
            }
            Lt | Lte | Gt | Gte => self.comparison(instr.op)?,
            Not => {
                let v = self.pop_bool()?;
                self.push(Value::Bool(!v));
            }
            AndJump => {
                let Operand::U16(target) = instr.operand else { unreachable!() };
                let lhs = self.peek_bool()?;
                if lhs {
                    self.pop()?;
                } else {
                    self.frames.last_mut().unwrap().ip = target as usize;
                }
            }
            OrJump => {
                let Operand::U16(target) = instr.operand else { unreachable!() };
                let lhs = self.peek_bool()?;
                if lhs {
                    self.frames.last_mut().unwrap().ip = target as usize;
                } else {
                    self.pop()?;
                }
            }

            Jump => {
                let Operand::U16(target) = instr.operand else { unreachable!() };
                self.frames.last_mut().unwrap().ip = target as usize;
            }
            JumpIfFalse => {
                let Operand::U16(target) = instr.operand else { unreachable!() };
                if !self.pop_bool()? {
                    self.frames.last_mut().unwrap().ip = target as usize;
                }
            }
            JumpIfTrue => {
                let Operand::U16(target) = instr.operand else { unreachable!() };
                if self.pop_bool()? {
                    self.frames.last_mut().unwrap().ip = target as usize;
                }
            }
            Loop => {
                let Operand::U16(back) = instr.operand else { unreachable!() };
                self.frames.last_mut().unwrap().ip = (instr.next_offset - back as u32) as usize;
            }
            Call | MakeGoCall => {
                let Operand::U16U16(arg_count, flags) = instr.operand else { unreachable!() };
                return self.do_call(arg_count as usize, flags != 0);
            }
            Return => {
                let value = self.pop()?;
                let frame = self.frames.pop().expect("no active frame");
                self.stack.truncate(frame.stack_base);
                return Ok(Step::Returned(value));
            }
            Raise => {
                let v = self.pop()?;
                return Err(self.raise(v));
            }
            TryBegin => {
                // Handled structurally by the checker/compiler front end at
                // a higher level (exception table lookups are not modeled
                // in this bytecode layer); executing it is a no-op marker.
                let Operand::U16(_handler) = instr.operand else { unreachable!() };
            }
            TryEnd => {}

            GetLocal => {
                let Operand::U8(slot) = instr.operand else { unreachable!() };
                let base = self.frames.last().unwrap().stack_base;
                let v = self
                    .stack
                    .get(base + slot as usize)
                    .cloned()
                    .ok_or(VmError::StackUnderflow)?;
                self.push(v);
            }
            SetLocal => {
                let Operand::U8(slot) = instr.operand else { unreachable!() };
                let base = self.frames.last().unwrap().stack_base;
                let v = self.peek(0)?.clone();
                let idx = base + slot as usize;
                if idx >= self.stack.len() {
                    return Err(VmError::StackUnderflow);
                }
                self.stack[idx] = v;
            }
            GetGlobal => {
                let Operand::U32(idx) = instr.operand else { unreachable!() };
                let name = self.constant_name(&chunk, idx)?;
                let v = self
                    .get_global(name.as_str())
                    .ok_or_else(|| VmError::UnknownGlobal(name.as_str().to_string()))?;
                self.push(v);
            }
            SetGlobal => {
                let Operand::U32(idx) = instr.operand else { unreachable!() };
                let name = self.constant_name(&chunk, idx)?;
                let v = self.peek(0)?.clone();
                self.set_global(name, v);
            }
            GetUpvalue => {
                let Operand::U8(slot) = instr.operand else { unreachable!() };
                let v = self
                    .frames
                    .last()
                    .unwrap()
                    .upvalues
                    .get(slot as usize)
                    .cloned()
                    .ok_or(VmError::StackUnderflow)?;
                self.push(v);
            }
            SetUpvalue => {
                // Upvalues are captured-by-value snapshots (§3); mutating
                // one only affects this frame's own copy, not sibling
                // closures over the same source variable.
                let Operand::U8(slot) = instr.operand else { unreachable!() };
                let v = self.peek(0)?.clone();
                let frame = self.frames.last_mut().unwrap();
                let mut upvalues = frame.upvalues.to_vec();
                if slot as usize >= upvalues.len() {
                    return Err(VmError::StackUnderflow);
                }
                upvalues[slot as usize] = v;
                frame.upvalues = upvalues.into();
            }
            CloseUpvalue => {}

            MakeClosure => {
                let Operand::U32(fn_id) = instr.operand else { unreachable!() };
                let upvalue_count = self
                    .functions
                    .get(fn_id)
                    .ok_or(VmError::UnknownFunction(fn_id))?
                    .upvalue_count;
                let captured = self.pop_n(upvalue_count as usize)?;
                self.push(Value::InoxFunction(Arc::new(
                    inox_value::callable::InoxFunctionData {
                        bytecode_id: fn_id,
                        captured: captured.into(),
                    },
                )));
            }

            MakeList => {
                let Operand::U16(count) = instr.operand else { unreachable!() };
                let elements = self.pop_n(count as usize)?;
                self.push(Value::List(Arc::new(Mutex::new(ListData::new(elements)))));
            }
            MakeTuple => {
                let Operand::U16(count) = instr.operand else { unreachable!() };
                let elements = self.pop_n(count as usize)?;
                self.push(Value::Tuple(elements.into()));
            }
            MakeObject | MakeRecord => {
                let Operand::U16(count) = instr.operand else { unreachable!() };
                let pairs = self.pop_n(count as usize * 2)?;
                let properties = Self::pairs_to_properties(pairs)?;
                self.push(if instr.op == MakeObject {
                    Value::Object(ObjectData::new(properties))
                } else {
                    Value::Record(Arc::new(RecordData::new(properties)))
                });
            }
            MakeDict => {
                let Operand::U16(count) = instr.operand else { unreachable!() };
                let pairs = self.pop_n(count as usize * 2)?;
                let mut dict = DictData::new();
                for kv in pairs.chunks_exact(2) {
                    dict.set(kv[0].clone(), kv[1].clone());
                }
                self.push(Value::Dictionary(Arc::new(Mutex::new(dict))));
            }
            MakeMapping => {
                let Operand::U16(count) = instr.operand else { unreachable!() };
                let pairs = self.pop_n(count as usize * 2)?;
                let entries = pairs.chunks_exact(2).map(|kv| (kv[0].clone(), kv[1].clone())).collect();
                self.push(Value::Mapping(Arc::new(Mutex::new(MappingData { entries }))));
            }
            MakeKeyList => {
                let Operand::U16(count) = instr.operand else { unreachable!() };
                let names = self.pop_n(count as usize)?;
                let names: VmResult<Vec<InoxStr>> = names
                    .into_iter()
                    .map(|v| match v {
                        Value::Identifier(s) | Value::PropertyName(s) => Ok(s),
                        other => Err(VmError::TypeError(inox_value::ValueError::TypeMismatch {
                            op: "make-key-list",
                            value_kind: other.kind().name(),
                        })),
                    })
                    .collect();
                self.push(Value::KeyList(names?.into()));
            }

            Index => {
                let key = self.pop()?;
                let container = self.pop()?;
                self.push(Self::index_value(&container, &key)?);
            }
            SetIndex => {
                let value = self.pop()?;
                let key = self.pop()?;
                let container = self.pop()?;
                Self::set_index_value(&container, &key, value)?;
            }
            Append => {
                let value = self.pop()?;
                let container = self.pop()?;
                match &container {
                    Value::List(l) => l.lock().expect("list lock poisoned").append(value),
                    other => {
                        return Err(VmError::TypeError(inox_value::ValueError::TypeMismatch {
                            op: "append",
                            value_kind: other.kind().name(),
                        }))
                    }
                }
            }
            Slice => {
                let end = self.pop_int()?;
                let start = self.pop_int()?;
                let container = self.pop()?;
                self.push(match &container {
                    Value::List(l) => {
                        let elements = l.lock().expect("list lock poisoned").slice(start, end)?;
                        Value::List(Arc::new(Mutex::new(ListData::new(elements))))
                    }
                    Value::String(s) => {
                        let chars: Vec<char> = s.as_str().chars().collect();
                        let (s0, e0) = (start.max(0) as usize, end.max(0) as usize);
                        if s0 > e0 || e0 > chars.len() {
                            return Err(VmError::TypeError(inox_value::ValueError::OutOfBounds {
                                len: chars.len(),
                                index: end,
                            }));
                        }
                        Value::String(InoxStr::new(chars[s0..e0].iter().collect::<String>()))
                    }
                    other => {
                        return Err(VmError::TypeError(inox_value::ValueError::TypeMismatch {
                            op: "slice",
                            value_kind: other.kind().name(),
                        }))
                    }
                });
            }
            Len => {
                let v = self.pop()?;
                let len = inox_value::value::len(&v).ok_or(VmError::TypeError(
                    inox_value::ValueError::TypeMismatch {
                        op: "len",
                        value_kind: v.kind().name(),
                    },
                ))?;
                self.push(Value::Int(len as i64));
            }
            Iter => {
                // Leaves the container in place and pushes the initial
                // cursor on top; `IterNext` consumes both (§4.5 supplement:
                // the distilled spec named these opcodes without pinning
                // down a stack convention).
                self.push(Value::Int(0));
            }
            IterNext => {
                let Operand::U16(exit_target) = instr.operand else { unreachable!() };
                let cursor = self.pop_int()?;
                let container = self.peek(0)?.clone();
                let len = inox_value::value::len(&container).ok_or(VmError::TypeError(
                    inox_value::ValueError::TypeMismatch {
                        op: "iter-next",
                        value_kind: container.kind().name(),
                    },
                ))?;
                if cursor >= len as i64 {
                    self.pop()?; // drop container, iteration exhausted
                    self.frames.last_mut().unwrap().ip = exit_target as usize;
                } else {
                    let element = inox_value::value::at(&container, cursor)?;
                    self.push(Value::Int(cursor + 1));
                    self.push(element);
                }
            }
            GetProperty => {
                let Operand::U32(idx) = instr.operand else { unreachable!() };
                let name = self.constant_name(&chunk, idx)?;
                let container = self.pop()?;
                self.push(match &container {
                    Value::Object(o) => o.get(name.as_str()).unwrap_or(Value::Nil),
                    Value::Record(r) => r.get(name.as_str()).unwrap_or(Value::Nil),
                    other => {
                        return Err(VmError::TypeError(inox_value::ValueError::TypeMismatch {
                            op: "get-property",
                            value_kind: other.kind().name(),
                        }))
                    }
                });
            }
            SetProperty => {
                let Operand::U32(idx) = instr.operand else { unreachable!() };
                let name = self.constant_name(&chunk, idx)?;
                let value = self.pop()?;
                let container = self.pop()?;
                match &container {
                    Value::Object(o) => o.set(name.as_str(), value),
                    other => {
                        return Err(VmError::TypeError(inox_value::ValueError::TypeMismatch {
                            op: "set-property",
                            value_kind: other.kind().name(),
                        }))
                    }
                }
            }

            TestPattern => {
                let value = self.pop()?;
                let pattern = self.pop()?;
                let Value::Pattern(p) = pattern else {
                    return Err(VmError::TypeError(inox_value::ValueError::TypeMismatch {
                        op: "test-pattern",
                        value_kind: pattern.kind().name(),
                    }));
                };
                self.push(Value::Bool(p.test(&value)));
            }
            MakeUnion => {
                let Operand::U16(count) = instr.operand else { unreachable!() };
                let members = self.pop_n(count as usize)?;
                let handles: VmResult<Vec<PatternHandle>> = members
                    .into_iter()
                    .map(|v| match v {
                        Value::Pattern(p) => Ok(p),
                        other => Err(VmError::TypeError(inox_value::ValueError::TypeMismatch {
                            op: "make-union",
                            value_kind: other.kind().name(),
                        })),
                    })
                    .collect();
                self.push(Value::Pattern(Arc::new(RuntimeUnion(handles?))));
            }
            MakeOptional => {
                let v = self.pop()?;
                let Value::Pattern(p) = v else {
                    return Err(VmError::TypeError(inox_value::ValueError::TypeMismatch {
                        op: "make-optional",
                        value_kind: v.kind().name(),
                    }));
                };
                self.push(Value::Pattern(Arc::new(RuntimeOptional(p))));
            }

            Spawn => {
                let Operand::U16(capture_count) = instr.operand else { unreachable!() };
                let captures = self.pop_n(capture_count as usize)?;
                let callee = self.pop()?;
                let functions = Arc::clone(&self.functions);
                let globals = Arc::clone(&self.globals);
                let body_captures = captures.clone();
                inox_context::spawn(&self.ctx, &captures, move |child_ctx| {
                    let mut child_vm = Vm {
                        stack: Vec::new(),
                        frames: Vec::new(),
                        globals,
                        functions,
                        ctx: child_ctx,
                    };
                    child_vm
                        .call_value(callee, body_captures)
                        .unwrap_or(Value::Nil)
                })?;
                // Fire-and-forget (§5): the fiber communicates results back
                // via its own mailbox/graph, not a join value.
                self.push(Value::Nil);
            }
            Send => {
                let value = self.pop()?;
                inox_context::share::ensure_shareable(&value)?;
                self.ctx.mailbox_sender().send(value)?;
            }
            Receive => {
                let Operand::U16(_handler_table) = instr.operand else { unreachable!() };
                let value = self.ctx.receive()?;
                self.push(value);
            }
            BlockLock => {
                let v = self.pop()?;
                let Value::Object(o) = &v else {
                    return Err(VmError::TypeError(inox_value::ValueError::TypeMismatch {
                        op: "block-lock",
                        value_kind: v.kind().name(),
                    }));
                };
                loop {
                    let mut inner = o.inner.lock().expect("object lock poisoned");
                    if !inner.locked {
                        inner.locked = true;
                        break;
                    }
                    drop(inner);
                    may::coroutine::sleep(std::time::Duration::from_millis(1));
                }
                self.push(v);
            }
            BlockUnlock => {
                let v = self.pop()?;
                if let Value::Object(o) = &v {
                    o.inner.lock().expect("object lock poisoned").locked = false;
                }
                self.push(v);
            }
            Share => {
                let v = self.pop()?;
                if let Value::Object(o) = &v {
                    o.mark_shared();
                }
                self.push(v);
            }

            RegisterJob => {
                let Operand::U32(fn_id) = instr.operand else { unreachable!() };
                self.push(Value::LifetimeJob(Arc::new(
                    inox_value::actors::LifetimeJobData::new(fn_id),
                )));
            }
            EmitGraphEvent => {
                let value = self.pop()?;
                let text = self.pop()?;
                let Value::String(s) = text else {
                    return Err(VmError::TypeError(inox_value::ValueError::TypeMismatch {
                        op: "emit-graph-event",
                        value_kind: text.kind().name(),
                    }));
                };
                self.ctx.graph().record(s.as_str(), Some(value));
            }

            Must => {
                let v = self.pop()?;
                match v {
                    Value::List(l) => {
                        let mut data = l.lock().expect("list lock poisoned");
                        let err = data.elements.pop();
                        let result = data.elements.pop().unwrap_or(Value::Nil);
                        drop(data);
                        match err {
                            Some(Value::Error(e)) => return Err(VmError::Unhandled((*e).clone())),
                            _ => self.push(result),
                        }
                    }
                    other => self.push(other),
                }
            }
            Halt => return Err(VmError::Halted),
        }
        Ok(Step::Continue)
    }

    fn raise(&self, v: Value) -> VmError {
        match v {
            Value::Error(e) => VmError::Unhandled((*e).clone()),
            other => VmError::Unhandled(ErrorData {
                message: InoxMessage::from(other.kind().name()),
                data: Some(other),
            }),
        }
    }

    fn constant_name(&self, chunk: &Chunk, idx: u32) -> VmResult<InoxStr> {
        match chunk.constant(idx) {
            Some(Value::String(s)) | Some(Value::Identifier(s)) | Some(Value::PropertyName(s)) => {
                Ok(s.clone())
            }
            Some(other) => Err(VmError::TypeError(inox_value::ValueError::TypeMismatch {
                op: "resolve-name",
                value_kind: other.kind().name(),
            })),
            None => Err(VmError::UnknownConstant(idx)),
        }
    }

    fn pairs_to_properties(pairs: Vec<Value>) -> VmResult<Vec<Property>> {
        pairs
            .chunks_exact(2)
            .map(|kv| {
                let name = match &kv[0] {
                    Value::String(s) | Value::PropertyName(s) | Value::Identifier(s) => s.clone(),
                    other => {
                        return Err(VmError::TypeError(inox_value::ValueError::TypeMismatch {
                            op: "make-object",
                            value_kind: other.kind().name(),
                        }))
                    }
                };
                Ok(Property {
                    name,
                    value: kv[1].clone(),
                })
            })
            .collect()
    }

    fn index_value(container: &Value, key: &Value) -> VmResult<Value> {
        match container {
            Value::Dictionary(d) => Ok(d
                .lock()
                .expect("dictionary lock poisoned")
                .get(key)
                .cloned()
                .unwrap_or(Value::Nil)),
            _ => {
                let Value::Int(i) = key else {
                    return Err(VmError::TypeError(inox_value::ValueError::TypeMismatch {
                        op: "index",
                        value_kind: key.kind().name(),
                    }));
                };
                Ok(inox_value::value::at(container, *i)?)
            }
        }
    }

    fn set_index_value(container: &Value, key: &Value, value: Value) -> VmResult<()> {
        match container {
            Value::Dictionary(d) => {
                d.lock().expect("dictionary lock poisoned").set(key.clone(), value);
                Ok(())
            }
            Value::List(l) => {
                let Value::Int(i) = key else {
                    return Err(VmError::TypeError(inox_value::ValueError::TypeMismatch {
                        op: "set-index",
                        value_kind: key.kind().name(),
                    }));
                };
                Ok(l.lock().expect("list lock poisoned").set(*i, value)?)
            }
            other => Err(VmError::TypeError(inox_value::ValueError::TypeMismatch {
                op: "set-index",
                value_kind: other.kind().name(),
            })),
        }
    }

    /// Reads the top of the stack as a `Bool` without popping it, for the
    /// peek-and-jump opcodes that only consume the value on the taken path.
    fn peek_bool(&mut self) -> VmResult<bool> {
        match self.peek(0)? {
            Value::Bool(b) => Ok(*b),
            other => Err(VmError::TypeError(inox_value::ValueError::TypeMismatch {
                op: "bool-operand",
                value_kind: other.kind().name(),
            })),
        }
    }

    fn pop_bool(&mut self) -> VmResult<bool> {
        match self.pop()? {
            Value::Bool(b) => Ok(b),
            other => Err(VmError::TypeError(inox_value::ValueError::TypeMismatch {
                op: "bool-operand",
                value_kind: other.kind().name(),
            })),
        }
    }

    fn pop_int(&mut self) -> VmResult<i64> {
        match self.pop()? {
            Value::Int(i) => Ok(i),
            other => Err(VmError::TypeError(inox_value::ValueError::TypeMismatch {
                op: "int-operand",
                value_kind: other.kind().name(),
            })),
        }
    }

    fn numeric_binop(&mut self, op: OpCode) -> VmResult<()> {
        let (b, a) = (self.pop()?, self.pop()?);
        let result = match (&a, &b, op) {
            (Value::Int(x), Value::Int(y), OpCode::Add) => Value::Int(x + y),
            (Value::Int(x), Value::Int(y), OpCode::Sub) => Value::Int(x - y),
            (Value::Int(x), Value::Int(y), OpCode::Mul) => Value::Int(x * y),
            (Value::Int(x), Value::Int(y), OpCode::Div) => {
                if *y == 0 {
                    return Err(VmError::TypeError(inox_value::ValueError::TypeMismatch {
                        op: "div-by-zero",
                        value_kind: "int",
                    }));
                }
                Value::Int(x / y)
            }
            (Value::Int(x), Value::Int(y), OpCode::Mod) => {
                if *y == 0 {
                    return Err(VmError::TypeError(inox_value::ValueError::TypeMismatch {
                        op: "mod-by-zero",
                        value_kind: "int",
                    }));
                }
                Value::Int(x % y)
            }
            (x, y, op) if Self::is_numeric(x) && Self::is_numeric(y) => {
                let (xf, yf) = (Self::as_f64(x), Self::as_f64(y));
                match op {
                    OpCode::Add => Value::Float(xf + yf),
                    OpCode::Sub => Value::Float(xf - yf),
                    OpCode::Mul => Value::Float(xf * yf),
                    OpCode::Div => Value::Float(xf / yf),
                    OpCode::Mod => Value::Float(xf % yf),
                    _ => unreachable!(),
                }
            }
            _ => {
                return Err(VmError::TypeError(inox_value::ValueError::TypeMismatch {
                    op: "arithmetic",
                    value_kind: a.kind().name(),
                }))
            }
        };
        self.push(result);
        Ok(())
    }

    fn comparison(&mut self, op: OpCode) -> VmResult<()> {
        let (b, a) = (self.pop()?, self.pop()?);
        let ordering = match (&a, &b) {
            (Value::Int(x), Value::Int(y)) => x.partial_cmp(y),
            (Value::String(x), Value::String(y)) => x.as_str().partial_cmp(y.as_str()),
            (x, y) if Self::is_numeric(x) && Self::is_numeric(y) => {
                Self::as_f64(x).partial_cmp(&Self::as_f64(y))
            }
            _ => {
                return Err(VmError::TypeError(inox_value::ValueError::TypeMismatch {
                    op: "comparison",
                    value_kind: a.kind().name(),
                }))
            }
        };
        let Some(ordering) = ordering else {
            self.push(Value::Bool(false));
            return Ok(());
        };
        use std::cmp::Ordering::*;
        let result = match (op, ordering) {
            (OpCode::Lt, Less) => true,
            (OpCode::Lte, Less | Equal) => true,
            (OpCode::Gt, Greater) => true,
            (OpCode::Gte, Greater | Equal) => true,
            _ => false,
        };
        self.push(Value::Bool(result));
        Ok(())
    }

    fn is_numeric(v: &Value) -> bool {
        matches!(v, Value::Int(_) | Value::Float(_))
    }

    fn as_f64(v: &Value) -> f64 {
        match v {
            Value::Int(i) => *i as f64,
            Value::Float(f) => *f,
            _ => f64::NAN,
        }
    }

    fn call_value(&mut self, callee: Value, args: Vec<Value>) -> VmResult<Value> {
        match callee {
            Value::GoFunction(f) => self.call_go(f, args),
            Value::InoxFunction(f) => {
                let base = self.stack.len();
                for a in args {
                    self.push(a);
                }
                let function = self
                    .functions
                    .get(f.bytecode_id)
                    .ok_or(VmError::UnknownFunction(f.bytecode_id))?;
                self.frames
                    .push(CallFrame::new(Arc::clone(&function.chunk), base, Arc::clone(&f.captured)));
                let depth = self.frames.len();
                self.execute_from(depth)
            }
            other => Err(VmError::TypeError(inox_value::ValueError::TypeMismatch {
                op: "call",
                value_kind: other.kind().name(),
            })),
        }
    }

    fn call_go(&self, f: GoFunctionHandle, args: Vec<Value>) -> VmResult<Value> {
        f.call(&args).map_err(|e| {
            VmError::Unhandled(ErrorData {
                message: InoxMessage::from(e.0.as_str()),
                data: None,
            })
        })
    }

    fn do_call(&mut self, arg_count: usize, variadic_spread: bool) -> VmResult<Step> {
        let args = self.pop_n(arg_count)?;
        let callee = self.pop()?;
        match callee {
            Value::GoFunction(f) => {
                let result = self.call_go(f, args)?;
                self.push(result);
                Ok(Step::Continue)
            }
            Value::InoxFunction(f) => {
                let function = self
                    .functions
                    .get(f.bytecode_id)
                    .ok_or(VmError::UnknownFunction(f.bytecode_id))?;
                let args = if variadic_spread && function.variadic && !args.is_empty() {
                    let mut fixed: Vec<Value> = args[..args.len() - 1].to_vec();
                    fixed.push(args[args.len() - 1].clone());
                    fixed
                } else {
                    args
                };
                if !function.variadic && args.len() != function.arity as usize {
                    return Err(VmError::ArityMismatch {
                        expected: function.arity as usize,
                        got: args.len(),
                    });
                }
                let base = self.stack.len();
                let chunk = Arc::clone(&function.chunk);
                let upvalues = Arc::clone(&f.captured);
                for a in args {
                    self.push(a);
                }
                self.frames.push(CallFrame::new(chunk, base, upvalues));
                Ok(Step::Continue)
            }
            other => Err(VmError::TypeError(inox_value::ValueError::TypeMismatch {
                op: "call",
                value_kind: other.kind().name(),
            })),
        }
    }
}

enum Step {
    Continue,
    Returned(Value),
}

/// Build the symbolic approximation of a pattern-checked value, bridging
/// runtime patterns into the checker's lattice (used by `inox-checker`).
pub fn pattern_symbolic_value(pattern: &Pattern) -> AbstractValue {
    pattern.symbolic_value()
}

/// Matches a kind, used by host function registration to validate argument
/// shapes before a call crosses into Rust (§6).
pub fn value_matches_kind(value: &Value, kind: ValueKind) -> bool {
    value.kind() == kind
}

#[cfg(test)]
mod tests {
    use super::*;
    use inox_bytecode::{ChunkBuilder, Span};

    fn run_chunk(chunk: Chunk) -> Value {
        let functions = Arc::new(FunctionTable::new());
        let ctx = Context::new("test");
        let mut vm = Vm::new(functions, ctx);
        vm.run(Arc::new(chunk)).unwrap()
    }

    #[test]
    fn push_const_then_return() {
        let mut b = ChunkBuilder::new();
        b.emit_constant(OpCode::PushConst, Value::Int(41), Span::default());
        b.emit(OpCode::Return, Span::default());
        let result = run_chunk(b.finish());
        assert!(matches!(result, Value::Int(41)));
    }

    #[test]
    fn add_two_ints() {
        let mut b = ChunkBuilder::new();
        b.emit_constant(OpCode::PushConst, Value::Int(2), Span::default());
        b.emit_constant(OpCode::PushConst, Value::Int(3), Span::default());
        b.emit(OpCode::Add, Span::default());
        b.emit(OpCode::Return, Span::default());
        let result = run_chunk(b.finish());
        assert!(matches!(result, Value::Int(5)));
    }

    #[test]
    fn division_by_zero_is_a_vm_error() {
        let mut b = ChunkBuilder::new();
        b.emit_constant(OpCode::PushConst, Value::Int(1), Span::default());
        b.emit_constant(OpCode::PushConst, Value::Int(0), Span::default());
        b.emit(OpCode::Div, Span::default());
        b.emit(OpCode::Return, Span::default());
        let functions = Arc::new(FunctionTable::new());
        let ctx = Context::new("test");
        let mut vm = Vm::new(functions, ctx);
        assert!(vm.run(Arc::new(b.finish())).is_err());
    }

    #[test]
    fn jump_if_false_skips_the_then_branch() {
        let mut b = ChunkBuilder::new();
        b.emit(OpCode::PushFalse, Span::default());
        let patch = b.emit_jump(OpCode::JumpIfFalse, Span::default());
        b.emit_constant(OpCode::PushConst, Value::Int(1), Span::default());
        b.emit(OpCode::Return, Span::default());
        b.patch_jump(patch);
        b.emit_constant(OpCode::PushConst, Value::Int(2), Span::default());
        b.emit(OpCode::Return, Span::default());
        let result = run_chunk(b.finish());
        assert!(matches!(result, Value::Int(2)));
    }

    #[test]
    fn and_short_circuits_on_a_false_left_operand() {
        let mut b = ChunkBuilder::new();
        b.emit(OpCode::PushFalse, Span::default());
        let patch = b.emit_jump(OpCode::AndJump, Span::default());
        // Right operand: a Div-by-zero that must never run.
        b.emit_constant(OpCode::PushConst, Value::Int(1), Span::default());
        b.emit_constant(OpCode::PushConst, Value::Int(0), Span::default());
        b.emit(OpCode::Div, Span::default());
        b.patch_jump(patch);
        b.emit(OpCode::Return, Span::default());
        let result = run_chunk(b.finish());
        assert!(matches!(result, Value::Bool(false)));
    }

    #[test]
    fn and_evaluates_right_operand_when_left_is_true() {
        let mut b = ChunkBuilder::new();
        b.emit(OpCode::PushTrue, Span::default());
        let patch = b.emit_jump(OpCode::AndJump, Span::default());
        b.emit(OpCode::PushFalse, Span::default());
        b.patch_jump(patch);
        b.emit(OpCode::Return, Span::default());
        let result = run_chunk(b.finish());
        assert!(matches!(result, Value::Bool(false)));
    }

    #[test]
    fn or_short_circuits_on_a_true_left_operand() {
        let mut b = ChunkBuilder::new();
        b.emit(OpCode::PushTrue, Span::default());
        let patch = b.emit_jump(OpCode::OrJump, Span::default());
        // Right operand: a Div-by-zero that must never run.
        b.emit_constant(OpCode::PushConst, Value::Int(1), Span::default());
        b.emit_constant(OpCode::PushConst, Value::Int(0), Span::default());
        b.emit(OpCode::Div, Span::default());
        b.patch_jump(patch);
        b.emit(OpCode::Return, Span::default());
        let result = run_chunk(b.finish());
        assert!(matches!(result, Value::Bool(true)));
    }

    #[test]
    fn test_pattern_matches_int_kind() {
        let mut b = ChunkBuilder::new();
        b.emit_constant(
            OpCode::PushConst,
            Value::Pattern(Arc::new(Pattern::OfKind(ValueKind::Int))),
            Span::default(),
        );
        b.emit_constant(OpCode::PushConst, Value::Int(4), Span::default());
        b.emit(OpCode::TestPattern, Span::default());
        b.emit(OpCode::Return, Span::default());
        let result = run_chunk(b.finish());
        assert!(matches!(result, Value::Bool(true)));
    }

    #[test]
    fn make_list_then_index() {
        let mut b = ChunkBuilder::new();
        b.emit_constant(OpCode::PushConst, Value::Int(10), Span::default());
        b.emit_constant(OpCode::PushConst, Value::Int(20), Span::default());
        b.emit_u16(OpCode::MakeList, 2, Span::default());
        b.emit_constant(OpCode::PushConst, Value::Int(1), Span::default());
        b.emit(OpCode::Index, Span::default());
        b.emit(OpCode::Return, Span::default());
        let result = run_chunk(b.finish());
        assert!(matches!(result, Value::Int(20)));
    }

    #[test]
    fn local_slots_round_trip() {
        let mut b = ChunkBuilder::new();
        b.emit_constant(OpCode::PushConst, Value::Int(7), Span::default());
        b.emit_u8(OpCode::GetLocal, 0, Span::default());
        b.emit(OpCode::Return, Span::default());
        let result = run_chunk(b.finish());
        assert!(matches!(result, Value::Int(7)));
    }
}
