//! Token extraction.
//!
//! - Row mode reads one field per data line from the detected reference column.
//! - Free-scan mode splits every line on a delimiter set (comma, semicolon, tab by default).
//!
//! Both return tokens in input order; duplicates are kept until deduplication.

use tracing::trace;

use crate::types::Token;

use super::detect::split_csv_line;

/// Delimiters used by free-scan mode unless configured otherwise.
pub const DEFAULT_DELIMITERS: [char; 3] = [',', ';', '\t'];

/// Extract one token per data line from column `column`.
///
/// Lines with too few fields, unparseable lines and empty cells are skipped silently.
pub fn tokenize_rows(data_lines: &[String], column: usize) -> Vec<Token> {
    let mut out = Vec::with_capacity(data_lines.len());
    for (idx, line) in data_lines.iter().enumerate() {
        let fields = match split_csv_line(line) {
            Ok(fields) => fields,
            Err(e) => {
                trace!(line = idx + 2, error = %e, "skipping unparseable row");
                continue;
            }
        };
        let Some(raw) = fields.get(column) else {
            trace!(line = idx + 2, fields = fields.len(), "skipping short row");
            continue;
        };
        let cleaned = clean_field(raw, &['"']);
        if !cleaned.is_empty() {
            out.push(Token::new(cleaned));
        }
    }
    out
}

/// Split every line on `delimiters` and return the non-empty cleaned fields.
pub fn tokenize_free(lines: &[String], delimiters: &[char]) -> Vec<Token> {
    lines
        .iter()
        .flat_map(|line| line.trim().split(delimiters))
        .map(|field| clean_field(field, &['"', '\'']))
        .filter(|field| !field.is_empty())
        .map(Token::new)
        .collect()
}

/// Trim whitespace and one pair of matching surrounding quotes.
pub fn clean_field<'a>(raw: &'a str, quotes: &[char]) -> &'a str {
    let trimmed = raw.trim();
    for &q in quotes {
        if let Some(inner) = trimmed
            .strip_prefix(q)
            .and_then(|rest| rest.strip_suffix(q))
        {
            return inner.trim();
        }
    }
    trimmed
}
