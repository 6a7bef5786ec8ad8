//! Unified analysis entrypoint.
//!
//! Most callers should use [`analyze_source`], which turns an acquired
//! [`RawSource`] into an [`AnalysisReport`] holding the deduplicated
//! [`crate::types::ImportBatch`].
//!
//! - If [`IngestionOptions::mode`] is `None`, the mode is inferred from the source's file
//!   extension (`.csv` → [`ImportMode::ReferenceTable`], `.txt`/`.list` →
//!   [`ImportMode::FreeScan`], anything else or pasted text → [`ImportMode::Auto`]).
//! - If an [`super::observability::IngestionObserver`] is provided, success/failure/alerts are
//!   reported to it.
//!
//! Analysis is synchronous and pure apart from observer callbacks.

use std::fmt;
use std::path::Path;
use std::sync::Arc;

use serde::Serialize;
use tracing::debug;

use crate::error::{IngestionError, IngestionResult};
use crate::processing::{classify_row_token, classify_token, dedup};
use crate::types::{ClassifiedToken, ImportBatch, TabularLayout};

use super::detect::{ColumnRules, Detection, detect_structure, non_empty_lines};
use super::observability::{IngestionContext, IngestionObserver, IngestionSeverity, IngestionStats};
use super::source::RawSource;
use super::tokenize::{DEFAULT_DELIMITERS, tokenize_free, tokenize_rows};

/// How acquired text is read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ImportMode {
    /// Tabular if the input has a header and data rows, free-scan otherwise.
    ///
    /// Any two non-empty lines count as header plus row, so one-per-line lists need `FreeScan`.
    Auto,
    /// Tabular reference export; a header plus at least one data row is required.
    ReferenceTable,
    /// Delimited list of mixed references and identifiers.
    FreeScan,
}

impl ImportMode {
    /// Infer a mode from a file extension (case-insensitive).
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "csv" => Some(Self::ReferenceTable),
            "txt" | "list" | "tsv" => Some(Self::FreeScan),
            _ => None,
        }
    }
}

/// Options controlling analysis.
///
/// Use [`Default`] for common cases.
#[derive(Clone)]
pub struct IngestionOptions {
    /// If `None`, infer the mode from the source (see [`ImportMode::from_extension`]).
    pub mode: Option<ImportMode>,
    /// Ordered reference-column rules for tabular input.
    pub column_rules: ColumnRules,
    /// Free-scan delimiters.
    pub delimiters: Vec<char>,
    /// Optional observer for logging/alerts.
    pub observer: Option<Arc<dyn IngestionObserver>>,
    /// Severity threshold at which `on_alert` is invoked.
    pub alert_at_or_above: IngestionSeverity,
}

impl fmt::Debug for IngestionOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IngestionOptions")
            .field("mode", &self.mode)
            .field("column_rules", &self.column_rules)
            .field("delimiters", &self.delimiters)
            .field("observer_set", &self.observer.is_some())
            .field("alert_at_or_above", &self.alert_at_or_above)
            .finish()
    }
}

impl Default for IngestionOptions {
    fn default() -> Self {
        Self {
            mode: None,
            column_rules: ColumnRules::default(),
            delimiters: DEFAULT_DELIMITERS.to_vec(),
            observer: None,
            alert_at_or_above: IngestionSeverity::Critical,
        }
    }
}

impl IngestionOptions {
    /// Mode used for `source`: the configured one, else the extension hint, else `Auto`.
    pub fn mode_for(&self, source: &RawSource) -> ImportMode {
        self.mode
            .or_else(|| source.extension().and_then(|e| ImportMode::from_extension(&e)))
            .unwrap_or(ImportMode::Auto)
    }
}

/// Result of analyzing one source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AnalysisReport {
    /// Deduplicated recognized tokens.
    pub batch: ImportBatch,
    /// Layout used in row mode; `None` for free-scan.
    pub layout: Option<TabularLayout>,
    /// Mode the source was analyzed with.
    pub mode: ImportMode,
    pub stats: IngestionStats,
}

/// Analyze an acquired source.
///
/// Decoding failures are reported like any other analysis failure.
pub fn analyze_source(source: RawSource, options: &IngestionOptions) -> IngestionResult<AnalysisReport> {
    let ctx = IngestionContext {
        source: source.display_name().to_owned(),
        mode: options.mode_for(&source),
    };
    let result = source
        .into_text()
        .and_then(|text| analyze_with_mode(&text, ctx.mode, options));
    report(options, &ctx, &result);
    result
}

/// Read and analyze a file.
pub fn analyze_path(path: impl AsRef<Path>, options: &IngestionOptions) -> IngestionResult<AnalysisReport> {
    let path = path.as_ref();
    match RawSource::from_path(path) {
        Ok(source) => analyze_source(source, options),
        Err(e) => {
            let ctx = IngestionContext {
                source: path.display().to_string(),
                mode: options.mode.unwrap_or(ImportMode::Auto),
            };
            let result = Err(e);
            report(options, &ctx, &result);
            result
        }
    }
}

/// Analyze manually entered text.
pub fn analyze_text(text: &str, options: &IngestionOptions) -> IngestionResult<AnalysisReport> {
    analyze_source(RawSource::text(text), options)
}

/// Run detection, tokenization, classification and deduplication without reporting.
pub fn analyze_with_mode(
    text: &str,
    mode: ImportMode,
    options: &IngestionOptions,
) -> IngestionResult<AnalysisReport> {
    match mode {
        ImportMode::FreeScan => Ok(free_scan(non_empty_lines(text), options)),
        ImportMode::Auto => {
            let detection = detect_structure(text, &options.column_rules)?;
            match detection.layout {
                Some(_) => row_scan(detection, ImportMode::Auto),
                None => Ok(free_scan(detection.lines, options).with_mode(ImportMode::Auto)),
            }
        }
        ImportMode::ReferenceTable => {
            let detection = detect_structure(text, &options.column_rules)?;
            if detection.layout.is_none() {
                return Err(IngestionError::structural(
                    "no data rows: expected a header line followed by at least one row",
                ));
            }
            row_scan(detection, ImportMode::ReferenceTable)
        }
    }
}

fn free_scan(lines: Vec<String>, options: &IngestionOptions) -> AnalysisReport {
    let tokens = tokenize_free(&lines, &options.delimiters);
    let token_count = tokens.len();
    let (batch, dedup_stats) = dedup(tokens.into_iter().map(classify_token));
    debug!(tokens = token_count, batch = batch.len(), "free-scan analysis");

    AnalysisReport {
        stats: IngestionStats {
            tokens: token_count,
            batch: batch.len(),
            misses: dedup_stats.misses,
            duplicates: dedup_stats.duplicates,
            rejected_rows: 0,
        },
        batch,
        layout: None,
        mode: ImportMode::FreeScan,
    }
}

fn row_scan(detection: Detection, mode: ImportMode) -> IngestionResult<AnalysisReport> {
    let column = detection
        .layout
        .as_ref()
        .and_then(|l| l.reference_column_index)
        .ok_or_else(|| IngestionError::structural("no identifiable reference column"))?;

    let tokens = tokenize_rows(detection.data_lines(), column);
    let token_count = tokens.len();
    let classified = tokens.into_iter().map(|value| {
        let kind = classify_row_token(value.as_str());
        ClassifiedToken { value, kind }
    });
    let (batch, dedup_stats) = dedup(classified);
    debug!(column, tokens = token_count, batch = batch.len(), "row analysis");

    Ok(AnalysisReport {
        stats: IngestionStats {
            tokens: token_count,
            batch: batch.len(),
            misses: 0,
            duplicates: dedup_stats.duplicates,
            rejected_rows: dedup_stats.misses,
        },
        batch,
        layout: detection.layout,
        mode,
    })
}

impl AnalysisReport {
    fn with_mode(mut self, mode: ImportMode) -> Self {
        self.mode = mode;
        self
    }
}

fn report(options: &IngestionOptions, ctx: &IngestionContext, result: &IngestionResult<AnalysisReport>) {
    let Some(obs) = options.observer.as_ref() else {
        return;
    };
    match result {
        Ok(report) => obs.on_success(ctx, report.stats),
        Err(e) => {
            let sev = severity_for_error(e);
            obs.on_failure(ctx, sev, e);
            if sev >= options.alert_at_or_above {
                obs.on_alert(ctx, sev, e);
            }
        }
    }
}

pub(crate) fn severity_for_error(e: &IngestionError) -> IngestionSeverity {
    match e {
        IngestionError::Io(_) => IngestionSeverity::Critical,
        IngestionError::Csv(err) => match err.kind() {
            ::csv::ErrorKind::Io(_) => IngestionSeverity::Critical,
            _ => IngestionSeverity::Error,
        },
        IngestionError::Decode { .. } | IngestionError::Structural { .. } => IngestionSeverity::Error,
        IngestionError::EmptyBatch => IngestionSeverity::Info,
        IngestionError::InvalidTransition { .. } | IngestionError::Cancelled => IngestionSeverity::Warning,
    }
}
