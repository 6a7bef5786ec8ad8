//! Source acquisition and synchronous analysis.
//!
//! Most callers should use [`analyze_source`] (from [`unified`]) which:
//!
//! - decodes the acquired [`RawSource`]
//! - picks an [`ImportMode`] (configured, or inferred from the file extension)
//! - detects structure, tokenizes, classifies and deduplicates into an [`AnalysisReport`]
//! - optionally reports success/failure/alerts to an [`IngestionObserver`]
//!
//! The individual stages are also available under:
//! - [`source`]
//! - [`detect`]
//! - [`tokenize`]

pub mod detect;
pub mod observability;
pub mod source;
pub mod tokenize;
pub mod unified;

pub use detect::{ColumnRule, ColumnRules, Detection, FallbackIndex, HeaderContains, detect_structure};
pub use observability::{
    CompositeObserver, FileObserver, IngestionContext, IngestionObserver, IngestionSeverity, IngestionStats,
    TracingObserver,
};
pub use source::RawSource;
pub use unified::{
    AnalysisReport, ImportMode, IngestionOptions, analyze_path, analyze_source, analyze_text, analyze_with_mode,
};
