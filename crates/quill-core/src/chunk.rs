//! Markdown-aware text chunker.
//!
//! Splits a document into [`TextChunk`]s of at most `chunk_size`
//! characters, preferring structural boundaries. Each chunk records the
//! 1-indexed inclusive line range it covers in the source text, which the
//! indexer stores as [`ChunkMetadata`](crate::models::ChunkMetadata).
//!
//! # Algorithm
//!
//! 1. If the text fits in `chunk_size`, it is a single chunk.
//! 2. Otherwise pick the first separator from [`MARKDOWN_SEPARATORS`] that
//!    occurs in the text (headings first, then code fences, horizontal
//!    rules, paragraphs, lines, words) and cut the text in front of every
//!    occurrence.
//! 3. Greedily merge adjacent pieces while the merged span still fits.
//! 4. Pieces that are still too large recurse with the remaining, finer
//!    separators. The last resort is a hard split every `chunk_size` chars.
//! 5. Every span is trimmed; whitespace-only spans are dropped.
//!
//! Spans are byte ranges into the original text, so line numbers fall out
//! of counting newlines in front of each span.
//!
//! # Example
//!
//! ```rust
//! use quill_core::chunk::chunk_markdown;
//!
//! let chunks = chunk_markdown("# Title\n\nHello world.", 1000);
//! assert_eq!(chunks.len(), 1);
//! assert_eq!(chunks[0].start_line, 1);
//! assert_eq!(chunks[0].end_line, 3);
//! ```

use std::ops::Range;

/// Split points tried in order, coarsest first. The empty separator
/// means "split anywhere".
pub const MARKDOWN_SEPARATORS: &[&str] = &[
    "\n# ",
    "\n## ",
    "\n### ",
    "\n#### ",
    "\n##### ",
    "\n###### ",
    "```\n",
    "\n***\n",
    "\n---\n",
    "\n___\n",
    "\n\n",
    "\n",
    " ",
    "",
];

/// A slice of a document ready for embedding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextChunk {
    pub content: String,
    pub start_line: usize,
    pub end_line: usize,
}

/// Split markdown `text` into chunks of at most `chunk_size` characters.
///
/// Returns no chunks for empty or whitespace-only text. A `chunk_size` of
/// zero is treated as one.
pub fn chunk_markdown(text: &str, chunk_size: usize) -> Vec<TextChunk> {
    let max_chars = chunk_size.max(1);
    if text.trim().is_empty() {
        return Vec::new();
    }

    let mut spans = Vec::new();
    split_span(text, 0..text.len(), MARKDOWN_SEPARATORS, max_chars, &mut spans);

    let mut chunks = Vec::with_capacity(spans.len());
    let mut line = 1;
    let mut line_pos = 0;
    for span in spans {
        let slice = &text[span.clone()];
        let content = slice.trim();
        if content.is_empty() {
            continue;
        }
        let start = span.start + (slice.len() - slice.trim_start().len());
        line += count_newlines(&text[line_pos..start]);
        line_pos = start;
        chunks.push(TextChunk {
            content: content.to_string(),
            start_line: line,
            end_line: line + count_newlines(content),
        });
    }
    chunks
}

fn split_span(
    text: &str,
    span: Range<usize>,
    separators: &[&str],
    max_chars: usize,
    out: &mut Vec<Range<usize>>,
) {
    let slice = &text[span.clone()];
    if char_len(slice) <= max_chars {
        out.push(span);
        return;
    }

    let Some(pos) = separators
        .iter()
        .position(|sep| sep.is_empty() || slice.contains(sep))
    else {
        hard_split(text, span, max_chars, out);
        return;
    };
    let separator = separators[pos];
    if separator.is_empty() {
        hard_split(text, span, max_chars, out);
        return;
    }
    let finer = &separators[pos + 1..];

    let mut current: Option<Range<usize>> = None;
    for piece in cut_before(text, span, separator) {
        if char_len(&text[piece.clone()]) > max_chars {
            if let Some(cur) = current.take() {
                out.push(cur);
            }
            split_span(text, piece, finer, max_chars, out);
            continue;
        }
        current = match current.take() {
            Some(cur) if char_len(&text[cur.start..piece.end]) <= max_chars => {
                Some(cur.start..piece.end)
            }
            Some(cur) => {
                out.push(cur);
                Some(piece)
            }
            None => Some(piece),
        };
    }
    if let Some(cur) = current {
        out.push(cur);
    }
}

/// Cut `span` in front of every occurrence of `separator`.
fn cut_before(text: &str, span: Range<usize>, separator: &str) -> Vec<Range<usize>> {
    let slice = &text[span.clone()];
    let mut pieces = Vec::new();
    let mut start = span.start;
    for (idx, _) in slice.match_indices(separator) {
        let at = span.start + idx;
        if at > start {
            pieces.push(start..at);
            start = at;
        }
    }
    if start < span.end {
        pieces.push(start..span.end);
    }
    pieces
}

fn hard_split(text: &str, span: Range<usize>, max_chars: usize, out: &mut Vec<Range<usize>>) {
    let slice = &text[span.clone()];
    let mut start = span.start;
    let mut count = 0;
    for (idx, _) in slice.char_indices() {
        if count == max_chars {
            out.push(start..span.start + idx);
            start = span.start + idx;
            count = 0;
        }
        count += 1;
    }
    if start < span.end {
        out.push(start..span.end);
    }
}

fn char_len(s: &str) -> usize {
    s.chars().count()
}

fn count_newlines(s: &str) -> usize {
    s.bytes().filter(|b| *b == b'\n').count()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_small_text_single_chunk() {
        let chunks = chunk_markdown("Hello, world!", 1000);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].content, "Hello, world!");
        assert_eq!((chunks[0].start_line, chunks[0].end_line), (1, 1));
    }

    #[test]
    fn test_empty_and_blank_text() {
        assert!(chunk_markdown("", 1000).is_empty());
        assert!(chunk_markdown("  \n\n \t\n", 1000).is_empty());
    }

    #[test]
    fn test_splits_on_headings_with_line_numbers() {
        let text = "# Title\n\nIntro paragraph.\n\n## Section\n\nBody text here.";
        let chunks = chunk_markdown(text, 30);
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].content, "# Title\n\nIntro paragraph.");
        assert_eq!((chunks[0].start_line, chunks[0].end_line), (1, 3));
        assert_eq!(chunks[1].content, "## Section\n\nBody text here.");
        assert_eq!((chunks[1].start_line, chunks[1].end_line), (5, 7));
    }

    #[test]
    fn test_respects_chunk_size() {
        let text = (0..60)
            .map(|i| format!("Paragraph number {} with a few words.", i))
            .collect::<Vec<_>>()
            .join("\n\n");
        let chunks = chunk_markdown(&text, 120);
        assert!(chunks.len() > 1);
        for c in &chunks {
            assert!(c.content.chars().count() <= 120, "oversized: {:?}", c.content);
            assert!(c.start_line >= 1);
            assert!(c.start_line <= c.end_line);
        }
    }

    #[test]
    fn test_line_ranges_point_at_content() {
        let text = "alpha beta\n\ngamma delta\n\nepsilon zeta\n\neta theta";
        let lines: Vec<&str> = text.split('\n').collect();
        for c in chunk_markdown(text, 12) {
            let covered = lines[c.start_line - 1..c.end_line].join("\n");
            assert_eq!(covered.trim(), c.content);
        }
    }

    #[test]
    fn test_hard_split_long_word() {
        let text = "x".repeat(25);
        let chunks = chunk_markdown(&text, 10);
        let sizes: Vec<usize> = chunks.iter().map(|c| c.content.len()).collect();
        assert_eq!(sizes, vec![10, 10, 5]);
        assert!(chunks.iter().all(|c| c.start_line == 1 && c.end_line == 1));
    }

    #[test]
    fn test_multibyte_utf8_chars() {
        let text = "┌──────────────────┐\n│ Hello world      │\n└──────────────────┘";
        let chunks = chunk_markdown(text, 7);
        assert!(!chunks.is_empty());
        for c in &chunks {
            assert!(c.content.chars().count() <= 7);
        }
    }

    #[test]
    fn test_deterministic() {
        let text = "# A\n\nAlpha\n\n# B\n\nBeta\n\n# C\n\nGamma";
        assert_eq!(chunk_markdown(text, 8), chunk_markdown(text, 8));
    }
}
