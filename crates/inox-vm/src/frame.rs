//! A single activation record on the VM's call stack (§4.5).

use inox_bytecode::Chunk;
use inox_value::Value;
use std::sync::Arc;

pub struct CallFrame {
    pub chunk: Arc<Chunk>,
    pub ip: usize,
    /// Index into the value stack where this frame's locals begin; local
    /// slot `n` is `stack[stack_base + n]`.
    pub stack_base: usize,
    pub upvalues: Arc<[Value]>,
}

impl CallFrame {
    pub fn new(chunk: Arc<Chunk>, stack_base: usize, upvalues: Arc<[Value]>) -> Self {
        Self {
            chunk,
            ip: 0,
            stack_base,
            upvalues,
        }
    }
}
