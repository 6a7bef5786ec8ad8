//! Source acquisition: manual text entry or the bytes of a dropped/selected file.

use std::path::Path;

use crate::error::{IngestionError, IngestionResult};

const UTF8_BOM: &str = "\u{feff}";

/// Display name used for manually entered text.
pub const PASTED_TEXT_NAME: &str = "pasted text";

/// Acquired input, consumed once by analysis.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RawSource {
    /// A single string typed or pasted by the user.
    Text(String),
    /// Content of a dropped or selected file.
    File { display_name: String, content: Vec<u8> },
}

impl RawSource {
    /// Manual entry.
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text(text.into())
    }

    /// File content already read by the caller (e.g. a drag-and-drop payload).
    pub fn file(display_name: impl Into<String>, content: impl Into<Vec<u8>>) -> Self {
        Self::File {
            display_name: display_name.into(),
            content: content.into(),
        }
    }

    /// Read a file from disk.
    ///
    /// The display name is the file name component of `path`.
    pub fn from_path(path: impl AsRef<Path>) -> IngestionResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read(path)?;
        let display_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Ok(Self::File {
            display_name,
            content,
        })
    }

    /// Name shown to the user for this source.
    pub fn display_name(&self) -> &str {
        match self {
            Self::Text(_) => PASTED_TEXT_NAME,
            Self::File { display_name, .. } => display_name,
        }
    }

    /// Lower-cased extension of the file name, if any.
    pub fn extension(&self) -> Option<String> {
        match self {
            Self::Text(_) => None,
            Self::File { display_name, .. } => Path::new(display_name)
                .extension()
                .and_then(|e| e.to_str())
                .map(|e| e.to_ascii_lowercase()),
        }
    }

    /// Decode the source into text.
    ///
    /// File content must be UTF-8; a leading byte-order mark is dropped.
    pub fn into_text(self) -> IngestionResult<String> {
        match self {
            Self::Text(text) => Ok(strip_bom(text)),
            Self::File {
                display_name,
                content,
            } => String::from_utf8(content)
                .map(strip_bom)
                .map_err(|e| IngestionError::Decode {
                    name: display_name,
                    message: e.utf8_error().to_string(),
                }),
        }
    }
}

fn strip_bom(text: String) -> String {
    match text.strip_prefix(UTF8_BOM) {
        Some(rest) => rest.to_owned(),
        None => text,
    }
}
