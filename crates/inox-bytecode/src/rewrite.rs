//! In-place instruction rewriting that preserves every jump target.
//!
//! `map_instructions` only ever replaces one instruction's operand with
//! another of the *same width* — it cannot insert, delete, or change an
//! opcode's operand shape, because every absolute/relative jump offset in
//! the chunk was computed against the original byte layout. This is
//! intentionally narrow: the one real use so far is constant-pool
//! renumbering after compaction (see `inox-cli`'s strip-debug-info pass),
//! which only ever needs to replace a `U32` constant index with another.

use crate::chunk::Chunk;
use crate::decode::{instructions, Operand};

#[derive(Debug, Clone, PartialEq)]
pub enum RewriteError {
    /// The replacement operand's width did not match the original
    /// instruction's operand width.
    WidthMismatch { offset: u32 },
}

impl std::fmt::Display for RewriteError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RewriteError::WidthMismatch { offset } => {
                write!(f, "rewrite at offset {offset} changed operand width")
            }
        }
    }
}

impl std::error::Error for RewriteError {}

/// Rewrite every instruction's operand through `f`, leaving opcodes,
/// instruction count and the source map untouched. `f` receives the
/// decoded operand and must return one of the same shape.
pub fn map_instructions(
    chunk: &Chunk,
    mut f: impl FnMut(Operand) -> Operand,
) -> Result<Chunk, RewriteError> {
    let mut code = chunk.code.clone();
    for instr in instructions(chunk) {
        let replacement = f(instr.operand);
        let operand_start = instr.offset as usize + 1;
        match (instr.operand, replacement) {
            (Operand::None, Operand::None) => {}
            (Operand::U8(_), Operand::U8(v)) => code[operand_start] = v,
            (Operand::U16(_), Operand::U16(v)) => {
                code[operand_start..operand_start + 2].copy_from_slice(&v.to_be_bytes());
            }
            (Operand::U32(_), Operand::U32(v)) => {
                code[operand_start..operand_start + 4].copy_from_slice(&v.to_be_bytes());
            }
            (Operand::U16U16(_, _), Operand::U16U16(a, b)) => {
                code[operand_start..operand_start + 2].copy_from_slice(&a.to_be_bytes());
                code[operand_start + 2..operand_start + 4].copy_from_slice(&b.to_be_bytes());
            }
            _ => return Err(RewriteError::WidthMismatch { offset: instr.offset }),
        }
    }
    Ok(chunk.with_code(code))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::ChunkBuilder;
    use crate::opcode::OpCode;
    use crate::span::Span;
    use inox_value::Value;

    #[test]
    fn rewrites_constant_indices() {
        let mut b = ChunkBuilder::new();
        b.emit_constant(OpCode::PushConst, Value::Int(1), Span::default());
        let chunk = b.finish();
        let rewritten = map_instructions(&chunk, |op| match op {
            Operand::U32(_) => Operand::U32(41),
            other => other,
        })
        .unwrap();
        let instr = instructions(&rewritten).next().unwrap();
        assert_eq!(instr.operand, Operand::U32(41));
    }

    #[test]
    fn width_mismatch_is_rejected() {
        let mut b = ChunkBuilder::new();
        b.emit_constant(OpCode::PushConst, Value::Int(1), Span::default());
        let chunk = b.finish();
        let result = map_instructions(&chunk, |_| Operand::U8(0));
        assert!(result.is_err());
    }
}
