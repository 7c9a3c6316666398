//! Bytecode chunk format: opcode table, chunk/constant-pool storage,
//! source maps, a disassembler and a width-preserving rewrite helper
//! (§4.4, §4.5).

pub mod builder;
pub mod chunk;
pub mod decode;
pub mod disassemble;
pub mod opcode;
pub mod rewrite;
pub mod span;

pub use builder::{ChunkBuilder, JumpPatch};
pub use chunk::{Chunk, SpanEntry};
pub use decode::{decode_one, instructions, Instruction, Instructions, Operand};
pub use disassemble::{format_instructions, Disassembly, DisassemblyLine};
pub use opcode::{OpCode, OperandWidth};
pub use rewrite::{map_instructions, RewriteError};
pub use span::Span;
