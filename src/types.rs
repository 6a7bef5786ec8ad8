//! Core data model types for reference ingestion.
//!
//! Acquired text is split into [`Token`]s, each token is given a [`TokenKind`], and the
//! recognized ones are folded into an [`ImportBatch`]. Submitting a batch yields one
//! [`ImportOutcome`] per token, aggregated into an [`ImportSummary`].

use std::borrow::Borrow;
use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};

/// A trimmed, de-quoted string extracted from input.
///
/// Equality is exact (case-sensitive) string equality.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Token(String);

impl Token {
    /// Create a token from an already-cleaned string.
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Borrow the token text.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Length of the token in bytes.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the token is the empty string.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for Token {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Token {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for Token {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Semantic kind assigned to a token by the classifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenKind {
    /// A URL pointing at a channel or other resource.
    Reference,
    /// A playlist identifier (recognized prefix or the watch-later sentinel).
    PlaylistId,
    /// An 11-character video identifier.
    VideoId,
    /// Matched no rule; never enters a batch.
    Unrecognized,
}

impl TokenKind {
    /// Whether tokens of this kind may be submitted.
    pub fn is_recognized(self) -> bool {
        !matches!(self, Self::Unrecognized)
    }
}

/// A token together with its assigned kind.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ClassifiedToken {
    pub value: Token,
    pub kind: TokenKind,
}

impl ClassifiedToken {
    pub fn new(value: impl Into<Token>, kind: TokenKind) -> Self {
        Self {
            value: value.into(),
            kind,
        }
    }
}

/// Shape of tabular input as found by the structure detector.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TabularLayout {
    /// Header fields in column order, as written (untrimmed).
    pub header_fields: Vec<String>,
    /// Column holding the primary reference, if one was identified.
    pub reference_column_index: Option<usize>,
}

/// Deduplicated set of recognized tokens produced by one ingestion cycle.
///
/// Tokens are unique by `value`; inserting an existing value is a no-op. Iteration yields
/// tokens in first-seen order, although consumers must not depend on it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportBatch {
    tokens: Vec<ClassifiedToken>,
    seen: HashSet<Token>,
}

impl ImportBatch {
    /// Create an empty batch.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a classified token.
    ///
    /// Returns `true` if the token was added, `false` if its value was already present or its
    /// kind is [`TokenKind::Unrecognized`].
    pub fn insert(&mut self, token: ClassifiedToken) -> bool {
        if !token.kind.is_recognized() || self.seen.contains(&token.value) {
            return false;
        }
        self.seen.insert(token.value.clone());
        self.tokens.push(token);
        true
    }

    /// Whether a token with this value is in the batch.
    pub fn contains(&self, value: &str) -> bool {
        self.seen.contains(value)
    }

    /// Kind recorded for `value`, if present.
    pub fn kind_of(&self, value: &str) -> Option<TokenKind> {
        self.tokens
            .iter()
            .find(|t| t.value.as_str() == value)
            .map(|t| t.kind)
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ClassifiedToken> {
        self.tokens.iter()
    }

    /// Number of tokens of the given kind.
    pub fn count_of(&self, kind: TokenKind) -> usize {
        self.tokens.iter().filter(|t| t.kind == kind).count()
    }
}

impl IntoIterator for ImportBatch {
    type Item = ClassifiedToken;
    type IntoIter = std::vec::IntoIter<ClassifiedToken>;

    fn into_iter(self) -> Self::IntoIter {
        self.tokens.into_iter()
    }
}

impl Serialize for ImportBatch {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.tokens.serialize(serializer)
    }
}

/// Result of submitting a single token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "reason", rename_all = "snake_case")]
pub enum OutcomeStatus {
    Resolved,
    Failed(String),
    Skipped,
}

/// Per-token result of batch submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImportOutcome {
    pub token: ClassifiedToken,
    pub status: OutcomeStatus,
}

/// Aggregate of all outcomes for one submitted batch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ImportSummary {
    /// Outcomes in settle order (not batch order).
    pub outcomes: Vec<ImportOutcome>,
    pub resolved: usize,
    pub failed: usize,
    pub skipped: usize,
}

impl ImportSummary {
    /// Fold an outcome into the aggregate.
    pub fn record(&mut self, outcome: ImportOutcome) {
        match outcome.status {
            OutcomeStatus::Resolved => self.resolved += 1,
            OutcomeStatus::Failed(_) => self.failed += 1,
            OutcomeStatus::Skipped => self.skipped += 1,
        }
        self.outcomes.push(outcome);
    }

    /// Total number of settled items.
    pub fn total(&self) -> usize {
        self.outcomes.len()
    }

    /// Outcomes that failed, with their reasons.
    pub fn failures(&self) -> impl Iterator<Item = (&Token, &str)> {
        self.outcomes.iter().filter_map(|o| match &o.status {
            OutcomeStatus::Failed(reason) => Some((&o.token.value, reason.as_str())),
            _ => None,
        })
    }
}

impl fmt::Display for ImportSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "total={}, resolved={}, failed={}, skipped={}",
            self.total(),
            self.resolved,
            self.failed,
            self.skipped
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn batch_insert_is_idempotent_per_value() {
        let mut batch = ImportBatch::new();
        assert!(batch.insert(ClassifiedToken::new("PLabc", TokenKind::PlaylistId)));
        assert!(!batch.insert(ClassifiedToken::new("PLabc", TokenKind::PlaylistId)));
        assert_eq!(batch.len(), 1);
    }

    #[test]
    fn batch_rejects_unrecognized_tokens() {
        let mut batch = ImportBatch::new();
        assert!(!batch.insert(ClassifiedToken::new("junk", TokenKind::Unrecognized)));
        assert!(batch.is_empty());
    }

    #[test]
    fn token_equality_is_case_sensitive() {
        let mut batch = ImportBatch::new();
        batch.insert(ClassifiedToken::new("PLabc", TokenKind::PlaylistId));
        batch.insert(ClassifiedToken::new("PLABC", TokenKind::PlaylistId));
        assert_eq!(batch.len(), 2);
        assert!(batch.contains("PLABC"));
        assert_eq!(batch.kind_of("PLabc"), Some(TokenKind::PlaylistId));
    }

    #[test]
    fn summary_counts_by_status() {
        let mut summary = ImportSummary::default();
        let token = ClassifiedToken::new("dQw4w9WgXcQ", TokenKind::VideoId);
        summary.record(ImportOutcome {
            token: token.clone(),
            status: OutcomeStatus::Resolved,
        });
        summary.record(ImportOutcome {
            token: token.clone(),
            status: OutcomeStatus::Failed("not found".to_string()),
        });
        summary.record(ImportOutcome {
            token,
            status: OutcomeStatus::Skipped,
        });

        assert_eq!((summary.resolved, summary.failed, summary.skipped), (1, 1, 1));
        assert_eq!(summary.total(), 3);
        assert_eq!(summary.failures().next().map(|(_, r)| r), Some("not found"));
        assert_eq!(summary.to_string(), "total=3, resolved=1, failed=1, skipped=1");
    }
}
