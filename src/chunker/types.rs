//! Chunk and break-kind types.

/// The kind of separator a chunk ended on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BreakKind {
    /// Broke before a markdown level-2 heading (`\n## `).
    MarkdownHeader,
    /// Broke after a blank line (`\n\n`).
    Paragraph,
    /// Broke after a single newline.
    Newline,
    /// Broke after a sentence terminator (`. `, `! `, `? `).
    Sentence,
    /// No separator found in the scan window; broke at the target offset,
    /// or emitted the whole remainder within tail tolerance.
    Forced,
}

/// A single segment produced by [`chunk_text`](super::chunk_text).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    pub content: String,
    /// Char offset into the source text where this chunk begins (post-trim).
    pub start_pos: usize,
    /// Char offset into the source text where this chunk ends (post-trim).
    pub end_pos: usize,
    pub break_kind: BreakKind,
    /// Monotonic position of this chunk within the document.
    pub index: usize,
}
