//! Word and character level highlighting inside a changed region.
//!
//! Both sides are split into word, whitespace, and punctuation tokens and
//! diffed. A replacement of a single word (or of two short, mostly
//! similar strings) is refined to a character diff, so `color` ->
//! `colour` marks only the `u`.
//!
//! Original-side tokens are `Unchanged` or `Removed`; modified-side
//! tokens are `Unchanged` or `Added`. Concatenating one side's tokens
//! gives back that side's text exactly.

use super::myers::{common_len, diff_hunks};
use super::{Token, TokenKind};

/// Replacements at or below this many characters per side are candidates
/// for character-level refinement even when they span several words.
const NEAR_EQUAL_MAX_CHARS: usize = 32;

/// Minimum Dice similarity (`2 * common / total`) for character refinement.
const MIN_CHAR_SIMILARITY: f64 = 0.5;

/// Split text into word runs, whitespace runs, and single punctuation chars.
///
/// ```rust
/// use quill_core::diff::tokenize_words;
///
/// assert_eq!(tokenize_words("Hi, you  there"), vec!["Hi", ",", " ", "you", "  ", "there"]);
/// ```
pub fn tokenize_words(text: &str) -> Vec<&str> {
    #[derive(PartialEq)]
    enum Class {
        Word,
        Space,
        Other,
    }
    fn class(c: char) -> Class {
        if c.is_alphanumeric() || c == '_' {
            Class::Word
        } else if c.is_whitespace() {
            Class::Space
        } else {
            Class::Other
        }
    }

    let mut tokens = Vec::new();
    let mut start = 0;
    let mut prev: Option<Class> = None;
    for (idx, c) in text.char_indices() {
        let cls = class(c);
        let split = match &prev {
            Some(p) => *p != cls || cls == Class::Other,
            None => false,
        };
        if split {
            tokens.push(&text[start..idx]);
            start = idx;
        }
        prev = Some(cls);
    }
    if start < text.len() {
        tokens.push(&text[start..]);
    }
    tokens
}

/// Compute token annotations for both sides of a changed region.
///
/// A missing side yields `None`; a side without a counterpart is one
/// `Removed` (or `Added`) run.
pub fn highlight_tokens(
    original: Option<&str>,
    modified: Option<&str>,
) -> (Option<Vec<Token>>, Option<Vec<Token>>) {
    match (original, modified) {
        (None, None) => (None, None),
        (Some(o), None) => (Some(single(o, TokenKind::Removed)), None),
        (None, Some(m)) => (None, Some(single(m, TokenKind::Added))),
        (Some(o), Some(m)) => {
            let (old, new) = word_diff(o, m);
            (Some(old), Some(new))
        }
    }
}

fn single(text: &str, kind: TokenKind) -> Vec<Token> {
    let mut out = TokenRuns::default();
    out.push(text, kind);
    out.0
}

/// Appends runs, merging neighbours of the same kind and skipping empties.
#[derive(Default)]
struct TokenRuns(Vec<Token>);

impl TokenRuns {
    fn push(&mut self, text: &str, kind: TokenKind) {
        if text.is_empty() {
            return;
        }
        match self.0.last_mut() {
            Some(last) if last.kind == kind => last.text.push_str(text),
            _ => self.0.push(Token::new(text, kind)),
        }
    }
}

fn word_diff(original: &str, modified: &str) -> (Vec<Token>, Vec<Token>) {
    let a = tokenize_words(original);
    let b = tokenize_words(modified);
    let mut old = TokenRuns::default();
    let mut new = TokenRuns::default();

    let mut i = 0;
    for hunk in diff_hunks(&a, &b) {
        let same = a[i..hunk.old.start].concat();
        old.push(&same, TokenKind::Unchanged);
        new.push(&same, TokenKind::Unchanged);

        let removed = &a[hunk.old.clone()];
        let added = &b[hunk.new.clone()];
        if should_refine(removed, added) {
            char_diff(&removed.concat(), &added.concat(), &mut old, &mut new);
        } else {
            old.push(&removed.concat(), TokenKind::Removed);
            new.push(&added.concat(), TokenKind::Added);
        }
        i = hunk.old.end;
    }
    let same = a[i..].concat();
    old.push(&same, TokenKind::Unchanged);
    new.push(&same, TokenKind::Unchanged);

    (old.0, new.0)
}

fn should_refine(removed: &[&str], added: &[&str]) -> bool {
    if removed.is_empty() || added.is_empty() {
        return false;
    }
    let removed: Vec<char> = removed.concat().chars().collect();
    let added: Vec<char> = added.concat().chars().collect();
    let single_word = tokenize_words_len(&removed) == 1 && tokenize_words_len(&added) == 1;
    let short = removed.len() <= NEAR_EQUAL_MAX_CHARS && added.len() <= NEAR_EQUAL_MAX_CHARS;
    if !single_word && !short {
        return false;
    }
    let common = common_len(&removed, &added) as f64;
    2.0 * common / (removed.len() + added.len()) as f64 >= MIN_CHAR_SIMILARITY
}

fn tokenize_words_len(chars: &[char]) -> usize {
    tokenize_words(&chars.iter().collect::<String>()).len()
}

fn char_diff(original: &str, modified: &str, old: &mut TokenRuns, new: &mut TokenRuns) {
    let a: Vec<char> = original.chars().collect();
    let b: Vec<char> = modified.chars().collect();
    let text = |chars: &[char]| chars.iter().collect::<String>();

    let mut i = 0;
    for hunk in diff_hunks(&a, &b) {
        let same = text(&a[i..hunk.old.start]);
        old.push(&same, TokenKind::Unchanged);
        new.push(&same, TokenKind::Unchanged);
        old.push(&text(&a[hunk.old.clone()]), TokenKind::Removed);
        new.push(&text(&b[hunk.new.clone()]), TokenKind::Added);
        i = hunk.old.end;
    }
    let same = text(&a[i..]);
    old.push(&same, TokenKind::Unchanged);
    new.push(&same, TokenKind::Unchanged);
}
