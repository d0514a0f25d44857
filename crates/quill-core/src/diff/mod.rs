//! Structured line diff for reviewing proposed document edits.
//!
//! [`compute_diff`] turns an original and a modified document into an
//! ordered list of [`DiffBlock`]s: runs of unchanged lines and changed
//! regions. Changed regions can be annotated with word/character level
//! [`Token`]s on demand ([`ModifiedBlock::highlight`]) and resolved one
//! by one through a [`DiffReview`].
//!
//! Joining the original side of every block with `\n` reproduces the
//! original text; joining the modified side reproduces the modified text.
//!
//! # Example
//!
//! ```rust
//! use quill_core::diff::{compute_diff, DiffBlock};
//!
//! let blocks = compute_diff("a\nb\nc", "a\nB\nc");
//! assert_eq!(blocks.len(), 3);
//! assert!(matches!(&blocks[1], DiffBlock::Modified(m)
//!     if m.original_value.as_deref() == Some("b")
//!     && m.modified_value.as_deref() == Some("B")));
//! ```

mod myers;
mod review;
mod tokens;

use serde::{Deserialize, Serialize};

pub use myers::{common_len, diff_hunks, Hunk};
pub use review::{DiffReview, ReviewError};
pub use tokens::{highlight_tokens, tokenize_words};

/// Classification of a highlighted run of text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    Unchanged,
    Added,
    Removed,
}

/// A contiguous run of words or characters on one side of a change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
    pub text: String,
    pub kind: TokenKind,
}

impl Token {
    pub fn new(text: impl Into<String>, kind: TokenKind) -> Self {
        Self {
            text: text.into(),
            kind,
        }
    }
}

/// A changed region. A missing side is a pure insertion or deletion.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModifiedBlock {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub original_value: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub modified_value: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub original_tokens: Option<Vec<Token>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub modified_tokens: Option<Vec<Token>>,
}

impl ModifiedBlock {
    pub fn new(original_value: Option<String>, modified_value: Option<String>) -> Self {
        Self {
            original_value,
            modified_value,
            original_tokens: None,
            modified_tokens: None,
        }
    }

    /// Fill in the token annotations if they have not been computed yet.
    pub fn highlight(&mut self) -> &mut Self {
        if self.original_tokens.is_none() && self.modified_tokens.is_none() {
            let (original, modified) =
                highlight_tokens(self.original_value.as_deref(), self.modified_value.as_deref());
            self.original_tokens = original;
            self.modified_tokens = modified;
        }
        self
    }
}

/// One block of a structured diff.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum DiffBlock {
    /// One or more unchanged lines joined by `\n`.
    Unchanged { value: String },
    /// A contiguous changed region.
    Modified(ModifiedBlock),
}

impl DiffBlock {
    /// This block's contribution to the original document.
    pub fn original_side(&self) -> Option<&str> {
        match self {
            DiffBlock::Unchanged { value } => Some(value),
            DiffBlock::Modified(m) => m.original_value.as_deref(),
        }
    }

    /// This block's contribution to the modified document.
    pub fn modified_side(&self) -> Option<&str> {
        match self {
            DiffBlock::Unchanged { value } => Some(value),
            DiffBlock::Modified(m) => m.modified_value.as_deref(),
        }
    }

    pub fn is_modified(&self) -> bool {
        matches!(self, DiffBlock::Modified(_))
    }
}

/// Split on `\n`. The empty document has no lines.
fn split_lines(text: &str) -> Vec<&str> {
    if text.is_empty() {
        Vec::new()
    } else {
        text.split('\n').collect()
    }
}

/// Compute the structured line diff between two documents.
///
/// Total over all inputs:
/// - identical non-empty texts give one `Unchanged` block,
/// - two empty texts give no blocks,
/// - an empty original gives one `Modified` block with only `modified_value`,
/// - an empty modified text gives one `Modified` block with only `original_value`.
///
/// Tokens are not computed here; call [`ModifiedBlock::highlight`] or
/// [`highlight_all`] when the UI needs them.
pub fn compute_diff(original: &str, modified: &str) -> Vec<DiffBlock> {
    let old_lines = split_lines(original);
    let new_lines = split_lines(modified);

    let mut blocks = Vec::new();
    let mut cursor = 0;
    for hunk in diff_hunks(&old_lines, &new_lines) {
        if hunk.old.start > cursor {
            blocks.push(DiffBlock::Unchanged {
                value: old_lines[cursor..hunk.old.start].join("\n"),
            });
        }
        let original_value =
            (!hunk.old.is_empty()).then(|| old_lines[hunk.old.clone()].join("\n"));
        let modified_value =
            (!hunk.new.is_empty()).then(|| new_lines[hunk.new.clone()].join("\n"));
        blocks.push(DiffBlock::Modified(ModifiedBlock::new(original_value, modified_value)));
        cursor = hunk.old.end;
    }
    if cursor < old_lines.len() {
        blocks.push(DiffBlock::Unchanged {
            value: old_lines[cursor..].join("\n"),
        });
    }
    blocks
}

/// Highlight every `Modified` block in place.
pub fn highlight_all(blocks: &mut [DiffBlock]) {
    for block in blocks {
        if let DiffBlock::Modified(m) = block {
            m.highlight();
        }
    }
}

/// Rebuild one side of a diff by joining the blocks' sides with `\n`.
pub fn join_side<'a, F>(blocks: &'a [DiffBlock], side: F) -> String
where
    F: Fn(&'a DiffBlock) -> Option<&'a str>,
{
    blocks.iter().filter_map(side).collect::<Vec<_>>().join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn modified(original: Option<&str>, modified: Option<&str>) -> DiffBlock {
        DiffBlock::Modified(ModifiedBlock::new(
            original.map(str::to_string),
            modified.map(str::to_string),
        ))
    }

    fn unchanged(value: &str) -> DiffBlock {
        DiffBlock::Unchanged {
            value: value.to_string(),
        }
    }

    fn assert_roundtrip(o: &str, m: &str) {
        let blocks = compute_diff(o, m);
        let original = join_side(&blocks, DiffBlock::original_side);
        assert_eq!(original, o, "original side of {:?} -> {:?}", o, m);
        let modified = join_side(&blocks, DiffBlock::modified_side);
        assert_eq!(modified, m, "modified side of {:?} -> {:?}", o, m);
    }

    #[test]
    fn test_identity() {
        let text = "line one\nline two\n\nline four";
        assert_eq!(compute_diff(text, text), vec![unchanged(text)]);
        assert!(compute_diff("", "").is_empty());
    }

    #[test]
    fn test_creation_and_deletion() {
        assert_eq!(compute_diff("", "new\nfile"), vec![modified(None, Some("new\nfile"))]);
        assert_eq!(compute_diff("old\nfile", ""), vec![modified(Some("old\nfile"), None)]);
    }

    #[test]
    fn test_blocks_for_mixed_edit() {
        let o = "keep 1\nchange me\nkeep 2\ndelete me\nkeep 3";
        let m = "keep 1\nchanged\nkeep 2\nkeep 3\nappended";
        assert_eq!(
            compute_diff(o, m),
            vec![
                unchanged("keep 1"),
                modified(Some("change me"), Some("changed")),
                unchanged("keep 2"),
                modified(Some("delete me"), None),
                unchanged("keep 3"),
                modified(None, Some("appended")),
            ]
        );
    }

    #[test]
    fn test_roundtrip_on_assorted_inputs() {
        let cases = [
            ("", ""),
            ("", "\n"),
            ("\n", ""),
            ("a", "a\n"),
            ("a\n", "a"),
            ("Hello world", "Hello brave world"),
            ("one\ntwo\nthree", "three\ntwo\none"),
            ("x\n\n\ny", "x\ny"),
            ("a\nb\nc\nd\ne", "a\nc\nb\ne\nf"),
            ("same\nsame\nsame", "same\nsame"),
            ("trailing\n\n", "\n\ntrailing"),
        ];
        for (o, m) in cases {
            assert_roundtrip(o, m);
        }
    }

    #[test]
    fn test_full_rewrite_of_long_document() {
        let o: String = (0..3000).map(|i| format!("old line {}\n", i)).collect();
        let m: String = (0..3000).map(|i| format!("new line {}\n", i)).collect();

        let blocks = compute_diff(&o, &m);
        assert_eq!(
            blocks,
            vec![
                modified(Some(o.trim_end()), Some(m.trim_end())),
                unchanged(""),
            ]
        );
        assert_roundtrip(&o, &m);
    }

    #[test]
    fn test_scattered_edits_in_long_document() {
        let o: Vec<String> = (0..5000).map(|i| format!("line {}", i)).collect();
        let m: Vec<String> = o
            .iter()
            .enumerate()
            .map(|(i, l)| if i % 100 == 50 { format!("{} edited", l) } else { l.clone() })
            .collect();
        let (o, m) = (o.join("\n"), m.join("\n"));

        let blocks = compute_diff(&o, &m);
        assert_eq!(blocks.iter().filter(|b| b.is_modified()).count(), 50);
        assert_roundtrip(&o, &m);
    }

    #[test]
    fn test_trailing_newline_change_is_a_block() {
        let blocks = compute_diff("a", "a\n");
        assert_eq!(blocks, vec![unchanged("a"), modified(None, Some(""))]);
    }

    #[test]
    fn test_serialized_shape() {
        let json = serde_json::to_value(compute_diff("a", "b")).unwrap();
        assert_eq!(
            json,
            serde_json::json!([{ "type": "modified", "originalValue": "a", "modifiedValue": "b" }])
        );
        let json = serde_json::to_value(compute_diff("a", "a")).unwrap();
        assert_eq!(json, serde_json::json!([{ "type": "unchanged", "value": "a" }]));
    }
}
