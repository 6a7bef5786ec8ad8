//! Classification and deduplication of extracted tokens.
//!
//! Operates on the [`crate::types::Token`] stream produced by ingestion:
//!
//! - [`classify()`]: assign each token a [`crate::types::TokenKind`]
//! - [`dedup()`]: fold classified tokens into an [`crate::types::ImportBatch`]
//!
//! ## Example: classify → dedup
//!
//! ```rust
//! use refbatch::processing::{classify_token, dedup};
//! use refbatch::types::{Token, TokenKind};
//!
//! let tokens = ["PLxyz123", "dQw4w9WgXcQ", "PLxyz123", "not-a-token"]
//!     .into_iter()
//!     .map(Token::from)
//!     .map(classify_token);
//!
//! let (batch, stats) = dedup(tokens);
//! assert_eq!(batch.len(), 2);
//! assert_eq!(batch.kind_of("dQw4w9WgXcQ"), Some(TokenKind::VideoId));
//! assert_eq!((stats.misses, stats.duplicates), (1, 1));
//! ```

pub mod classify;
pub mod dedup;

pub use classify::{classify, classify_row_token, classify_token};
pub use dedup::{dedup, DedupStats};
