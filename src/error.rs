use thiserror::Error;

// ---------------------------------------------------------------------------
// Workflow error taxonomy
// ---------------------------------------------------------------------------

/// Everything a workflow transition can report back to the user.
///
/// None of these are fatal: the session stays in its current state and the
/// message is shown as an advisory so the user can satisfy the precondition
/// and retry.
#[derive(Debug, Error)]
pub enum WorkflowError {
    /// A step was attempted before its required data exists.
    #[error("{0}")]
    MissingPrecondition(String),

    /// Target/feature choice violates the selection rules.
    #[error("invalid selection: {0}")]
    InvalidSelection(String),

    /// A named column is missing or has an incompatible type.
    #[error("column '{column}': {reason}")]
    Column { column: String, reason: String },

    /// Uploaded file extension not recognised, or archive contents unusable.
    #[error("unsupported format: {0}")]
    UnsupportedFormat(String),

    /// The requested capability exists in the UI but not in the code yet.
    #[error("'{0}' is not implemented yet")]
    Unimplemented(String),

    /// Prediction count differs from spatial feature count.
    #[error("spatial data has {spatial} features but predictions have {predictions} rows")]
    ShapeMismatch { spatial: usize, predictions: usize },

    /// Parse or I/O failure from the ingestion layer.
    #[error(transparent)]
    Ingest(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, WorkflowError>;
