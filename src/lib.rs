//! `refbatch` turns user-supplied lists of channel, playlist and video references into a
//! deduplicated, classified [`types::ImportBatch`], and drives that batch through an external
//! resolver with bounded concurrency and live progress.
//!
//! Input is either a single pasted string or the bytes of a dropped/selected file
//! ([`ingestion::RawSource`]). No schema is required: the structure detector finds the
//! reference column of tabular exports by header name (falling back to the second column),
//! and plain lists are scanned on commas, semicolons and tabs.
//!
//! ## What gets recognized
//!
//! - [`types::TokenKind::Reference`]: anything containing `youtube.com` or `youtu.be`
//! - [`types::TokenKind::PlaylistId`]: `PL…`, `UU…`, `LL…`, `FL…`, `RD…`, `OL…`, `UL…`, `PU…`,
//!   or the watch-later sentinel `WL`
//! - [`types::TokenKind::VideoId`]: 11 characters of `[A-Za-z0-9_-]` whose last character is
//!   a valid final digit of a 64-bit id (`not-a-token` is not an id)
//!
//! Everything else is dropped. Tabular exports only accept full `youtube.com` references in
//! their reference column.
//!
//! ## Quick example: analyze text
//!
//! ```rust
//! use refbatch::ingestion::{analyze_text, IngestionOptions};
//! use refbatch::types::TokenKind;
//!
//! # fn main() -> Result<(), refbatch::IngestionError> {
//! let report = analyze_text(
//!     "Name,Link\nAlpha,https://youtube.com/@alpha\nAlpha,https://youtube.com/@alpha\n",
//!     &IngestionOptions::default(),
//! )?;
//! assert_eq!(report.batch.len(), 1);
//! assert_eq!(report.batch.kind_of("https://youtube.com/@alpha"), Some(TokenKind::Reference));
//! # Ok(())
//! # }
//! ```
//!
//! ## Full cycle: acquire → confirm → completed
//!
//! ```rust
//! use std::sync::Arc;
//!
//! use refbatch::execution::{DryRunResolver, SubmitOptions};
//! use refbatch::ingestion::{IngestionOptions, RawSource};
//! use refbatch::session::{IngestionSession, IngestionState};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), refbatch::IngestionError> {
//! let mut session = IngestionSession::new(
//!     Arc::new(DryRunResolver),
//!     IngestionOptions::default(),
//!     SubmitOptions::default(),
//! );
//!
//! session.acquire(RawSource::text("PLxyz123, dQw4w9WgXcQ; not-a-token"));
//! assert!(session.can_submit());
//!
//! let summary = session.confirm_submit().await?;
//! assert_eq!(summary.resolved, 2);
//! assert!(matches!(session.state(), IngestionState::Completed(_)));
//! # Ok(())
//! # }
//! ```
//!
//! ## Modules
//!
//! - [`ingestion`]: acquisition, structure detection, tokenization and the analysis entrypoints
//! - [`processing`]: classification and deduplication
//! - [`execution`]: batch submission, cancellation tokens, metrics
//! - [`session`]: the ingestion state machine
//! - [`types`]: tokens, batches and outcomes
//! - [`error`]: error types

pub mod error;
pub mod execution;
pub mod ingestion;
pub mod processing;
pub mod session;
pub mod types;

pub use error::{IngestionError, IngestionResult};
