//! The compiled-function table: `Value::InoxFunction`/`LifetimeJob`/
//! `ReceptionHandler` all carry a `bytecode_id` rather than an owned
//! `Chunk`, so cloning one of those values stays O(1) (§3). The table
//! itself is append-only and shared read-only across every fiber.

use inox_bytecode::Chunk;
use inox_value::InoxStr;
use std::sync::Arc;

#[derive(Debug)]
pub struct CompiledFunction {
    pub name: Option<InoxStr>,
    pub chunk: Arc<Chunk>,
    pub arity: u8,
    pub variadic: bool,
    pub upvalue_count: u8,
}

#[derive(Debug, Default)]
pub struct FunctionTable {
    functions: Vec<CompiledFunction>,
}

impl FunctionTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, function: CompiledFunction) -> u32 {
        self.functions.push(function);
        (self.functions.len() - 1) as u32
    }

    pub fn get(&self, id: u32) -> Option<&CompiledFunction> {
        self.functions.get(id as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn register_returns_a_stable_id() {
        let mut table = FunctionTable::new();
        let id = table.register(CompiledFunction {
            name: None,
            chunk: Arc::new(Chunk::new()),
            arity: 0,
            variadic: false,
            upvalue_count: 0,
        });
        assert!(table.get(id).is_some());
    }
}
