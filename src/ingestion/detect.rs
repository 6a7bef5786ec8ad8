//! Structure detection: single-value vs. tabular input, and which column holds the reference.
//!
//! Column selection is an ordered list of [`ColumnRule`]s; the first rule that returns a
//! column wins. The default list is:
//!
//! 1. [`HeaderContains`]`("url")`: first header (trimmed, case-insensitive) containing `url`,
//!    scanning left to right. Catches `Channel URL`, `URL del canal`, `url` and so on.
//! 2. [`FallbackIndex`]`(1)`: the second column, when the header has at least two fields.
//!
//! Extra locales or header conventions are supported by adding rules, not by editing
//! [`detect_structure`].

use std::fmt;
use std::sync::Arc;

use tracing::debug;

use crate::error::{IngestionError, IngestionResult};
use crate::types::TabularLayout;

/// A header matcher that proposes the reference column.
pub trait ColumnRule: Send + Sync + fmt::Debug {
    /// Return the reference column index for `headers`, or `None` if this rule does not apply.
    fn pick(&self, headers: &[String]) -> Option<usize>;
}

/// Picks the first header whose trimmed, lower-cased text contains `needle`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderContains {
    needle: String,
}

impl HeaderContains {
    pub fn new(needle: impl AsRef<str>) -> Self {
        Self {
            needle: needle.as_ref().trim().to_lowercase(),
        }
    }
}

impl ColumnRule for HeaderContains {
    fn pick(&self, headers: &[String]) -> Option<usize> {
        headers
            .iter()
            .position(|h| h.trim().to_lowercase().contains(&self.needle))
    }
}

/// Picks a fixed column index when the header is wide enough to have it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FallbackIndex(pub usize);

impl ColumnRule for FallbackIndex {
    fn pick(&self, headers: &[String]) -> Option<usize> {
        (headers.len() > self.0).then_some(self.0)
    }
}

/// Ordered list of column rules; first match wins.
#[derive(Clone)]
pub struct ColumnRules {
    rules: Vec<Arc<dyn ColumnRule>>,
}

impl ColumnRules {
    /// An empty rule list. Every tabular input fails detection until rules are added.
    pub fn empty() -> Self {
        Self { rules: Vec::new() }
    }

    /// Append a rule with the lowest priority.
    pub fn with_rule(mut self, rule: impl ColumnRule + 'static) -> Self {
        self.rules.push(Arc::new(rule));
        self
    }

    /// Insert a rule with the highest priority.
    pub fn with_priority_rule(mut self, rule: impl ColumnRule + 'static) -> Self {
        self.rules.insert(0, Arc::new(rule));
        self
    }

    /// Apply rules in order and return the first proposed column.
    pub fn pick(&self, headers: &[String]) -> Option<usize> {
        self.rules.iter().find_map(|r| r.pick(headers))
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

impl Default for ColumnRules {
    fn default() -> Self {
        Self::empty()
            .with_rule(HeaderContains::new("url"))
            .with_rule(FallbackIndex(1))
    }
}

impl fmt::Debug for ColumnRules {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.rules.iter()).finish()
    }
}

/// Result of structure detection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Detection {
    /// Present only for input with at least two non-empty lines.
    pub layout: Option<TabularLayout>,
    /// Non-empty lines in input order, header included.
    pub lines: Vec<String>,
}

impl Detection {
    /// Lines after the header. Empty when no layout was found.
    pub fn data_lines(&self) -> &[String] {
        match self.layout {
            Some(_) => self.lines.get(1..).unwrap_or_default(),
            None => &[],
        }
    }
}

/// Split text into non-empty lines, accepting `\n`, `\r\n` and lone `\r` line endings.
pub fn non_empty_lines(text: &str) -> Vec<String> {
    text.split(['\n', '\r'])
        .filter(|line| !line.trim().is_empty())
        .map(str::to_owned)
        .collect()
}

/// Split one line on commas, honoring double-quoted fields.
pub(crate) fn split_csv_line(line: &str) -> IngestionResult<Vec<String>> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(line.as_bytes());
    match rdr.records().next() {
        Some(record) => Ok(record?.iter().map(str::to_owned).collect()),
        None => Ok(Vec::new()),
    }
}

/// Decide whether `text` is tabular and, if so, locate its reference column.
///
/// - Fewer than two non-empty lines: no layout (`Ok` with `layout == None`).
/// - Otherwise the first line is the header and `rules` choose the column; if no rule
///   applies the result is [`IngestionError::Structural`].
pub fn detect_structure(text: &str, rules: &ColumnRules) -> IngestionResult<Detection> {
    let lines = non_empty_lines(text);
    if lines.len() < 2 {
        debug!(lines = lines.len(), "input is not tabular");
        return Ok(Detection {
            layout: None,
            lines,
        });
    }

    let header_fields = split_csv_line(&lines[0])?;
    let index = rules.pick(&header_fields).ok_or_else(|| {
        IngestionError::structural(format!(
            "no identifiable reference column (headers={header_fields:?})"
        ))
    })?;
    debug!(column = index, header = ?header_fields, "reference column selected");

    Ok(Detection {
        layout: Some(TabularLayout {
            header_fields,
            reference_column_index: Some(index),
        }),
        lines,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers(fields: &[&str]) -> Vec<String> {
        fields.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn url_header_wins_regardless_of_position() {
        let rules = ColumnRules::default();
        assert_eq!(rules.pick(&headers(&["Channel URL"])), Some(0));
        assert_eq!(rules.pick(&headers(&["Id", "Title", " channel url "])), Some(2));
        assert_eq!(rules.pick(&headers(&["Id", "URL del canal", "Url"])), Some(1));
    }

    #[test]
    fn second_column_is_the_fallback() {
        let rules = ColumnRules::default();
        assert_eq!(rules.pick(&headers(&["Name", "Link"])), Some(1));
        assert_eq!(rules.pick(&headers(&["Name"])), None);
    }

    #[test]
    fn priority_rule_runs_before_defaults() {
        let rules = ColumnRules::default().with_priority_rule(HeaderContains::new("Kanal"));
        assert_eq!(rules.pick(&headers(&["Kanal", "Video URL"])), Some(0));
    }

    #[test]
    fn single_line_has_no_layout() {
        let det = detect_structure("Channel URL\n\n  \n", &ColumnRules::default()).unwrap();
        assert!(det.layout.is_none());
        assert_eq!(det.lines, vec!["Channel URL".to_string()]);
        assert!(det.data_lines().is_empty());
    }

    #[test]
    fn mixed_line_endings_are_normalized() {
        let det = detect_structure("Name,Link\r\nA,x\rB,y\n", &ColumnRules::default()).unwrap();
        assert_eq!(det.lines.len(), 3);
        assert_eq!(det.data_lines().len(), 2);
    }

    #[test]
    fn single_column_without_url_header_is_structural_error() {
        let err = detect_structure("Name\nAlpha\n", &ColumnRules::default()).unwrap_err();
        assert!(err.is_structural());
        assert!(err.to_string().contains("no identifiable reference column"));
    }

    #[test]
    fn quoted_header_commas_do_not_split() {
        let det = detect_structure("\"Name, full\",Link\nA,x\n", &ColumnRules::default()).unwrap();
        let layout = det.layout.unwrap();
        assert_eq!(layout.header_fields.len(), 2);
        assert_eq!(layout.reference_column_index, Some(1));
    }
}
