//! Interactive accept/reject model over a computed diff.
//!
//! A [`DiffReview`] owns the block list while a user walks through the
//! proposed changes. Accepting a block collapses it to its modified text,
//! rejecting collapses it to its original text; a block whose chosen side
//! is absent disappears. Untouched changes default to the original text
//! when the review is finalized.

use thiserror::Error;

use super::{compute_diff, join_side, DiffBlock};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReviewError {
    #[error("no diff block at index {index} (review has {len} blocks)")]
    OutOfRange { index: usize, len: usize },

    #[error("diff block {0} is unchanged and cannot be accepted or rejected")]
    NotModified(usize),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Decision {
    Accept,
    Reject,
}

/// Block list under review.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiffReview {
    blocks: Vec<DiffBlock>,
}

impl DiffReview {
    pub fn new(blocks: Vec<DiffBlock>) -> Self {
        Self { blocks }
    }

    /// Diff two texts and start reviewing the result.
    pub fn from_texts(original: &str, modified: &str) -> Self {
        Self::new(compute_diff(original, modified))
    }

    pub fn blocks(&self) -> &[DiffBlock] {
        &self.blocks
    }

    /// Mutable access for lazily highlighting blocks.
    pub fn blocks_mut(&mut self) -> &mut [DiffBlock] {
        &mut self.blocks
    }

    /// Number of changes still awaiting a decision.
    pub fn pending(&self) -> usize {
        self.blocks.iter().filter(|b| b.is_modified()).count()
    }

    pub fn is_resolved(&self) -> bool {
        self.pending() == 0
    }

    /// Keep the modified side of block `index`.
    ///
    /// A pure deletion is confirmed by removing the block, which shifts
    /// the indices of later blocks down by one.
    pub fn accept_block(&mut self, index: usize) -> Result<(), ReviewError> {
        self.decide(index, Decision::Accept)
    }

    /// Keep the original side of block `index`.
    ///
    /// A rejected pure insertion is removed, which shifts the indices of
    /// later blocks down by one.
    pub fn reject_block(&mut self, index: usize) -> Result<(), ReviewError> {
        self.decide(index, Decision::Reject)
    }

    pub fn accept_all(&mut self) {
        self.decide_all(Decision::Accept);
    }

    pub fn reject_all(&mut self) {
        self.decide_all(Decision::Reject);
    }

    /// Produce the document text from the current state of the review.
    ///
    /// Undecided changes contribute their original text.
    pub fn finalize(&self) -> String {
        join_side(&self.blocks, DiffBlock::original_side)
    }

    fn decide(&mut self, index: usize, decision: Decision) -> Result<(), ReviewError> {
        let len = self.blocks.len();
        let block = self
            .blocks
            .get(index)
            .ok_or(ReviewError::OutOfRange { index, len })?;
        if !block.is_modified() {
            return Err(ReviewError::NotModified(index));
        }
        let block = self.blocks.remove(index);
        if let Some(resolved) = resolve(block, decision) {
            self.blocks.insert(index, resolved);
        }
        Ok(())
    }

    fn decide_all(&mut self, decision: Decision) {
        self.blocks = std::mem::take(&mut self.blocks)
            .into_iter()
            .filter_map(|b| resolve(b, decision))
            .collect();
    }
}

fn resolve(block: DiffBlock, decision: Decision) -> Option<DiffBlock> {
    match block {
        DiffBlock::Modified(m) => {
            let chosen = match decision {
                Decision::Accept => m.modified_value,
                Decision::Reject => m.original_value,
            };
            chosen.map(|value| DiffBlock::Unchanged { value })
        }
        unchanged => Some(unchanged),
    }
}
