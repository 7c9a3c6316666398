//! Source-text byte spans (§4.6 supplement — a checker needs to underline a
//! range, not just point at a line; distinct from `inox_bytecode::Span`,
//! which covers *bytecode offsets* rather than source text).

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Span {
    pub start: u32,
    pub end: u32,
}

impl Span {
    pub fn new(start: u32, end: u32) -> Self {
        Self { start, end }
    }
}
