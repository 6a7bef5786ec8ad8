use thiserror::Error;

/// Convenience result type for ingestion operations.
pub type IngestionResult<T> = Result<T, IngestionError>;

/// Error type returned by ingestion and session functions.
///
/// A single enum shared by acquisition, analysis and the session state machine. Per-item
/// resolution failures are not represented here: they become
/// [`crate::types::OutcomeStatus::Failed`] entries and never abort a batch.
#[derive(Debug, Error)]
pub enum IngestionError {
    /// Underlying I/O error (e.g. file not found, permission denied).
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Tabular input could not be read as CSV.
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    /// The acquired bytes are not valid UTF-8 text.
    #[error("cannot decode '{name}' as UTF-8 text: {message}")]
    Decode { name: String, message: String },

    /// The input's shape could not be determined (no reference column, no data rows).
    #[error("structural error: {message}")]
    Structural { message: String },

    /// A session entry point was called in a state that does not allow it.
    #[error("cannot {action} while {state}")]
    InvalidTransition {
        action: &'static str,
        state: &'static str,
    },

    /// Submission was requested for a batch with zero classified tokens.
    #[error("nothing to submit: the batch is empty")]
    EmptyBatch,

    /// The ingestion cycle was cancelled while the batch was being submitted.
    #[error("ingestion cycle was cancelled")]
    Cancelled,
}

impl IngestionError {
    pub(crate) fn structural(message: impl Into<String>) -> Self {
        Self::Structural {
            message: message.into(),
        }
    }

    /// Whether this error belongs to the structural class (unreadable source or unusable shape).
    ///
    /// Structural errors end the current cycle in
    /// [`crate::session::IngestionState::StructuralFailure`].
    pub fn is_structural(&self) -> bool {
        matches!(
            self,
            Self::Io(_) | Self::Csv(_) | Self::Decode { .. } | Self::Structural { .. }
        )
    }
}
