//! Folding classified tokens into an [`ImportBatch`].

use serde::Serialize;

use crate::types::{ClassifiedToken, ImportBatch};

/// Counts gathered while folding a token stream.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DedupStats {
    /// Tokens seen, including misses and duplicates.
    pub seen: usize,
    /// Tokens classified as unrecognized.
    pub misses: usize,
    /// Recognized tokens whose value was already in the batch.
    pub duplicates: usize,
}

/// Fold classified tokens into a fresh batch.
pub fn dedup<I>(tokens: I) -> (ImportBatch, DedupStats)
where
    I: IntoIterator<Item = ClassifiedToken>,
{
    let mut batch = ImportBatch::new();
    let mut stats = DedupStats::default();
    for token in tokens {
        stats.seen += 1;
        if !token.kind.is_recognized() {
            stats.misses += 1;
        } else if !batch.insert(token) {
            stats.duplicates += 1;
        }
    }
    (batch, stats)
}
