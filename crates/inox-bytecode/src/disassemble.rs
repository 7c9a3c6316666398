//! Human-readable bytecode listing, used by CLI tooling and test failure
//! output. A supplement to the distilled spec (which described a
//! disassembler only in passing): grouping lines into a `Disassembly`
//! struct rather than returning a bare `String` lets callers filter or
//! diff listings programmatically, the way the teacher's own `--dump-ir`
//! flag returns structured data before the CLI layer renders it as text.

use crate::chunk::Chunk;
use crate::decode::{instructions, Operand};
use crate::opcode::OpCode;
use crate::span::Span;
use std::fmt;

#[derive(Debug, Clone)]
pub struct DisassemblyLine {
    pub offset: u32,
    pub op: OpCode,
    pub operand: Operand,
    pub span: Option<Span>,
}

#[derive(Debug, Clone, Default)]
pub struct Disassembly {
    pub lines: Vec<DisassemblyLine>,
}

impl Disassembly {
    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

impl fmt::Display for Disassembly {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for line in &self.lines {
            write!(f, "{:>6}  {}", line.offset, line.op.mnemonic())?;
            match line.operand {
                Operand::None => {}
                Operand::U8(v) => write!(f, " {v}")?,
                Operand::U16(v) => write!(f, " {v}")?,
                Operand::U32(v) => write!(f, " {v}")?,
                Operand::U16U16(a, b) => write!(f, " {a} {b}")?,
            }
            if let Some(span) = line.span {
                write!(f, "  ; {}..{}", span.start, span.end)?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

pub fn format_instructions(chunk: &Chunk) -> Disassembly {
    let lines = instructions(chunk)
        .map(|instr| DisassemblyLine {
            offset: instr.offset,
            op: instr.op,
            operand: instr.operand,
            span: chunk.span_at(instr.offset),
        })
        .collect();
    Disassembly { lines }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::ChunkBuilder;

    #[test]
    fn formats_one_line_per_instruction() {
        let mut b = ChunkBuilder::new();
        b.emit(OpCode::PushNil, Span::default());
        b.emit(OpCode::Pop, Span::default());
        let chunk = b.finish();
        let dis = format_instructions(&chunk);
        assert_eq!(dis.len(), 2);
        assert_eq!(dis.lines[0].op, OpCode::PushNil);
        let text = dis.to_string();
        assert!(text.contains("PushNil"));
        assert!(text.contains("Pop"));
    }
}
