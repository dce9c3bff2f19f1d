//! Deterministic text segmentation.
//!
//! Pure, synchronous, no I/O. Ported from the priority break-point scan of
//! the system this crate's domain was modeled on: scan backwards from a
//! target offset for the highest-priority separator, falling back to a
//! forced break at the target offset when none is found.

mod types;

pub use types::{BreakKind, Chunk};

/// Default target chunk size, in characters.
pub const DEFAULT_CHUNK_SIZE: usize = 5000;
/// Tail tolerance: a remainder at most `size * TAIL_TOLERANCE` is emitted
/// whole rather than split into an undersized final chunk.
pub const TAIL_TOLERANCE: f64 = 1.2;

/// Segment `text` into an ordered sequence of chunks using the default
/// target size and tolerance.
#[must_use]
pub fn chunk_text(text: &str) -> Vec<Chunk> {
    chunk_text_with_size(text, DEFAULT_CHUNK_SIZE)
}

/// Segment `text` into an ordered sequence of chunks with an explicit target
/// size (tail tolerance is [`TAIL_TOLERANCE`]).
#[must_use]
pub fn chunk_text_with_size(text: &str, target_size: usize) -> Vec<Chunk> {
    let chars: Vec<char> = text.chars().collect();
    let len = chars.len();
    let tail_threshold = (target_size as f64 * TAIL_TOLERANCE) as usize;

    let mut chunks = Vec::new();
    let mut start = 0usize;
    let mut index = 0usize;

    while start < len {
        let remaining = len - start;

        let (break_at, kind) = if remaining <= tail_threshold {
            (len, BreakKind::Forced)
        } else {
            let end = start + target_size;
            find_best_break_point(&chars, start, end)
        };

        let raw: String = chars[start..break_at].iter().collect();
        let trimmed = raw.trim();

        if !trimmed.is_empty() {
            // Recompute start/end offsets in the original (untrimmed) slice,
            // in chars, so callers can map back into the source text.
            let leading_ws = raw.len() - raw.trim_start().len();
            let chunk_start = start + raw[..leading_ws].chars().count();
            let chunk_end = chunk_start + trimmed.chars().count();

            chunks.push(Chunk {
                content: trimmed.to_string(),
                start_pos: chunk_start,
                end_pos: chunk_end,
                break_kind: kind,
                index,
            });
            index += 1;
        }

        start = break_at;
    }

    chunks
}

/// Scan backwards in `[start, end)` for the highest-priority separator.
/// Returns the offset to break at (exclusive of the separator text consumed
/// for header/paragraph breaks) and the [`BreakKind`] found.
fn find_best_break_point(chars: &[char], start: usize, end: usize) -> (usize, BreakKind) {
    let end = end.min(chars.len());
    let window: String = chars[start..end].iter().collect();

    // a. Markdown level-2 heading at line start: "\n## " — break BEFORE the heading.
    if let Some(rel) = window.rfind("\n## ") {
        return (start + char_len(&window[..rel + 1]), BreakKind::MarkdownHeader);
    }

    // b. Blank line: "\n\n" — break AFTER the blank line.
    if let Some(rel) = window.rfind("\n\n") {
        let cut = rel + 2;
        return (start + char_len(&window[..cut]), BreakKind::Paragraph);
    }

    // c. Single newline.
    if let Some(rel) = window.rfind('\n') {
        let cut = rel + 1;
        return (start + char_len(&window[..cut]), BreakKind::Newline);
    }

    // d. Sentence terminator followed by space: the rightmost match across
    // all three terminators, not the first terminator with any match.
    if let Some(rel) = [". ", "! ", "? "].iter().filter_map(|term| window.rfind(term)).max() {
        let cut = rel + 2; // every terminator above is 2 chars long
        return (start + char_len(&window[..cut]), BreakKind::Sentence);
    }

    (end, BreakKind::Forced)
}

fn char_len(s: &str) -> usize {
    s.chars().count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn short_text_yields_single_forced_chunk() {
        let chunks = chunk_text("Hello world.");
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].content, "Hello world.");
        assert_eq!(chunks[0].break_kind, BreakKind::Forced);
        assert_eq!(chunks[0].index, 0);
    }

    #[test]
    fn markdown_headings_split_at_heading_boundaries() {
        let input = "# Title\n\nIntro.\n\n## A\nAlpha\n\n## B\nBeta";
        let chunks = chunk_text_with_size(input, 20);
        assert!(chunks.len() > 1);
        for chunk in &chunks {
            if chunk.break_kind == BreakKind::MarkdownHeader {
                assert!(chunk.content.starts_with("## "));
            }
        }
        // indices are monotonic starting at 0
        for (i, c) in chunks.iter().enumerate() {
            assert_eq!(c.index, i);
        }
    }

    #[test]
    fn determinism() {
        let input = "# Title\n\nIntro.\n\n## A\nAlpha\n\n## B\nBeta, more text here. And more!";
        let a = chunk_text_with_size(input, 20);
        let b = chunk_text_with_size(input, 20);
        assert_eq!(a, b);
    }

    #[test]
    fn round_trip_preserves_non_whitespace_characters() {
        let input = "# Title\n\nIntro.\n\n## A\nAlpha\n\n## B\nBeta, more text here. And more!";
        let chunks = chunk_text_with_size(input, 20);
        let mut reconstructed: String = chunks.iter().map(|c| c.content.as_str()).collect::<Vec<_>>().join(" ");
        reconstructed.retain(|c| !c.is_whitespace());
        let mut expected = input.to_string();
        expected.retain(|c| !c.is_whitespace());
        assert_eq!(reconstructed, expected);
    }

    #[test]
    fn empty_chunks_are_discarded() {
        let input = "Hello.\n\n\n\nWorld.";
        let chunks = chunk_text_with_size(input, 5);
        assert!(chunks.iter().all(|c| !c.content.is_empty()));
    }

    proptest::proptest! {
        #[test]
        fn never_panics_on_arbitrary_input(s in ".*") {
            let _ = chunk_text_with_size(&s, 50);
        }

        #[test]
        fn chunk_indices_are_monotonic(s in "[ -~\n]{0,500}") {
            let chunks = chunk_text_with_size(&s, 30);
            for (i, c) in chunks.iter().enumerate() {
                prop_assert_eq!(c.index, i);
            }
        }
    }
}
