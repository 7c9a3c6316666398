//! Decoding a chunk's flat byte stream back into discrete instructions.
//! Both the disassembler and the bytecode-rewriting helper walk a chunk
//! through this same iterator, so they can never disagree about where one
//! instruction ends and the next begins.

use crate::chunk::Chunk;
use crate::opcode::{OpCode, OperandWidth};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operand {
    None,
    U8(u8),
    U16(u16),
    U32(u32),
    U16U16(u16, u16),
}

#[derive(Debug, Clone, Copy)]
pub struct Instruction {
    pub offset: u32,
    pub op: OpCode,
    pub operand: Operand,
    /// Offset of the next instruction, i.e. `offset + 1 + operand width`.
    pub next_offset: u32,
}

pub struct Instructions<'a> {
    code: &'a [u8],
    pos: usize,
}

pub fn instructions(chunk: &Chunk) -> Instructions<'_> {
    Instructions {
        code: &chunk.code,
        pos: 0,
    }
}

impl<'a> Iterator for Instructions<'a> {
    type Item = Instruction;

    fn next(&mut self) -> Option<Instruction> {
        let instr = decode_one(self.code, self.pos)?;
        self.pos = instr.next_offset as usize;
        Some(instr)
    }
}

/// Decode the single instruction starting at `offset`. Used both by the
/// `Instructions` iterator and by `inox-vm`'s dispatch loop, which tracks
/// its own instruction pointer instead of walking a full iterator per
/// step (a jump can move `ip` anywhere, not just forward to the next
/// iterator item).
pub fn decode_one(code: &[u8], offset: usize) -> Option<Instruction> {
    let byte = *code.get(offset)?;
    let op = OpCode::from_byte(byte)?;
    let width = op.operand_width();
    let operand_start = offset + 1;
    let operand_end = operand_start + width.byte_len();
    if operand_end > code.len() {
        return None;
    }
    let operand = match width {
        OperandWidth::None => Operand::None,
        OperandWidth::U8 => Operand::U8(code[operand_start]),
        OperandWidth::U16 => {
            Operand::U16(u16::from_be_bytes([code[operand_start], code[operand_start + 1]]))
        }
        OperandWidth::U32 => Operand::U32(u32::from_be_bytes([
            code[operand_start],
            code[operand_start + 1],
            code[operand_start + 2],
            code[operand_start + 3],
        ])),
        OperandWidth::U16U16 => {
            let a = u16::from_be_bytes([code[operand_start], code[operand_start + 1]]);
            let b = u16::from_be_bytes([code[operand_start + 2], code[operand_start + 3]]);
            Operand::U16U16(a, b)
        }
    };
    Some(Instruction {
        offset: offset as u32,
        op,
        operand,
        next_offset: operand_end as u32,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::ChunkBuilder;
    use crate::span::Span;
    use inox_value::Value;

    #[test]
    fn decodes_a_mixed_instruction_sequence() {
        let mut b = ChunkBuilder::new();
        b.emit_constant(OpCode::PushConst, Value::Int(1), Span::default());
        b.emit(OpCode::Pop, Span::default());
        let chunk = b.finish();
        let decoded: Vec<Instruction> = instructions(&chunk).collect();
        assert_eq!(decoded.len(), 2);
        assert_eq!(decoded[0].op, OpCode::PushConst);
        assert_eq!(decoded[0].operand, Operand::U32(0));
        assert_eq!(decoded[1].op, OpCode::Pop);
        assert_eq!(decoded[1].offset, 5);
    }
}
