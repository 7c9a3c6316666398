//! A compiled unit of bytecode: the instruction stream, its constant pool,
//! and a source map from instruction offset to source span (§4.4).

use crate::span::Span;
use inox_value::Value;

/// One entry of the source map: every instruction starting at `offset`
/// (inclusive) up to the next entry's offset (exclusive) came from `span`.
/// Stored sorted by `offset` so lookup is a binary search.
#[derive(Debug, Clone, Copy)]
pub struct SpanEntry {
    pub offset: u32,
    pub span: Span,
}

#[derive(Debug, Default)]
pub struct Chunk {
    pub code: Vec<u8>,
    pub constants: Vec<Value>,
    spans: Vec<SpanEntry>,
}

impl Chunk {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that every instruction from here on (until the next call to
    /// `mark_span`) came from `span`. Called once per emitted instruction
    /// by `ChunkBuilder`, coalescing runs with the same span.
    pub fn mark_span(&mut self, span: Span) {
        let offset = self.code.len() as u32;
        if let Some(last) = self.spans.last_mut() {
            if last.span == span {
                return;
            }
        }
        self.spans.push(SpanEntry { offset, span });
    }

    /// The span responsible for the instruction at `offset`, if the chunk
    /// carries source-map data at all.
    pub fn span_at(&self, offset: u32) -> Option<Span> {
        match self.spans.binary_search_by_key(&offset, |e| e.offset) {
            Ok(i) => Some(self.spans[i].span),
            Err(0) => None,
            Err(i) => Some(self.spans[i - 1].span),
        }
    }

    pub fn add_constant(&mut self, value: Value) -> u32 {
        // Constants are not deduplicated by value identity here: Value
        // does not implement Hash (several kinds can't be), and a linear
        // equal-scan on every constant add would be quadratic in chunk
        // size for little benefit — compilers emitting the same literal
        // twice is rare enough not to optimize for.
        self.constants.push(value);
        (self.constants.len() - 1) as u32
    }

    pub fn constant(&self, index: u32) -> Option<&Value> {
        self.constants.get(index as usize)
    }

    pub fn len(&self) -> usize {
        self.code.len()
    }

    pub fn is_empty(&self) -> bool {
        self.code.is_empty()
    }

    /// Clone this chunk with its instruction bytes replaced wholesale,
    /// keeping the constant pool and source map as-is. Used by
    /// `rewrite::map_instructions`, whose contract guarantees instruction
    /// boundaries (and therefore the source map) never move.
    pub fn with_code(&self, code: Vec<u8>) -> Chunk {
        Chunk {
            code,
            constants: self.constants.clone(),
            spans: self.spans.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn span_at_finds_the_covering_entry() {
        let mut chunk = Chunk::new();
        chunk.mark_span(Span::new(0, 3));
        chunk.code.extend_from_slice(&[0x02]);
        chunk.mark_span(Span::new(3, 6));
        chunk.code.extend_from_slice(&[0x02]);
        assert_eq!(chunk.span_at(0), Some(Span::new(0, 3)));
        assert_eq!(chunk.span_at(1), Some(Span::new(3, 6)));
    }

    #[test]
    fn span_at_before_any_span_is_recorded_is_none() {
        let chunk = Chunk::new();
        assert_eq!(chunk.span_at(0), None);
    }

    #[test]
    fn adjacent_instructions_with_the_same_span_coalesce() {
        let mut chunk = Chunk::new();
        chunk.mark_span(Span::new(0, 3));
        chunk.code.push(0x02);
        chunk.mark_span(Span::new(0, 3));
        chunk.code.push(0x02);
        assert_eq!(chunk.spans.len(), 1);
    }

    #[test]
    fn add_constant_returns_stable_index() {
        let mut chunk = Chunk::new();
        let i = chunk.add_constant(Value::Int(1));
        assert_eq!(chunk.constant(i), Some(&Value::Int(1)));
    }
}
