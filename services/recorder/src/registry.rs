//! Token registry
//!
//! Merges the instrument sets from the day's resolution calls into one
//! subscription list, deduplicating by token while preserving first-seen
//! order, and keeps a per-category count for validation logging.

use rustc_hash::{FxHashMap, FxHashSet};
use tracing::info;

/// Resolution category a token came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenCategory {
    /// Futures contracts
    Futures,
    /// Option contracts
    Options,
    /// Cash equities
    Equities,
    /// Index instruments
    Indices,
}

impl TokenCategory {
    /// Label for logs
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Futures => "futures",
            Self::Options => "options",
            Self::Equities => "equities",
            Self::Indices => "indices",
        }
    }
}

/// The merged, ordered subscription list for one pipeline
#[derive(Debug, Default)]
pub struct TokenRegistry {
    tokens: Vec<u32>,
    seen: FxHashSet<u32>,
    counts: FxHashMap<TokenCategory, usize>,
}

impl TokenRegistry {
    /// Empty registry
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge one category's tokens. Duplicates (within or across
    /// categories) are dropped; first-seen order wins.
    pub fn add<I>(&mut self, category: TokenCategory, tokens: I)
    where
        I: IntoIterator<Item = u32>,
    {
        let mut offered = 0usize;
        for token in tokens {
            offered += 1;
            if self.seen.insert(token) {
                self.tokens.push(token);
            }
        }
        *self.counts.entry(category).or_insert(0) += offered;
    }

    /// The merged subscription list, first-seen order
    #[must_use]
    pub fn tokens(&self) -> &[u32] {
        &self.tokens
    }

    /// Tokens offered for a category (before dedup)
    #[must_use]
    pub fn count(&self, category: TokenCategory) -> usize {
        self.counts.get(&category).copied().unwrap_or(0)
    }

    /// Unique tokens in the merged list
    #[must_use]
    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    /// True when nothing was resolved
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// Log the per-category counts and the merged total
    pub fn log_summary(&self, pipeline: &str) {
        for (category, count) in &self.counts {
            info!(pipeline, category = category.label(), count, "resolved");
        }
        info!(pipeline, total = self.tokens.len(), "subscription list merged");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dedup_preserves_first_seen_order() {
        let mut registry = TokenRegistry::new();
        registry.add(TokenCategory::Futures, [1, 2, 1]);
        registry.add(TokenCategory::Options, [3, 2]);

        assert_eq!(registry.tokens(), &[1, 2, 3]);
        assert_eq!(registry.count(TokenCategory::Futures), 3);
        assert_eq!(registry.count(TokenCategory::Options), 2);
        assert_eq!(registry.len(), 3);
    }
}
