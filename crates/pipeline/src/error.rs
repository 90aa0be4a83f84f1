use reliquary_core::error::CoreError;

/// Error type for pipeline operations.
///
/// Wraps [`CoreError`] for domain failures and adds database and I/O
/// variants for the persistence and filesystem edges of the pipeline.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience alias for pipeline results.
pub type PipelineResult<T> = Result<T, PipelineError>;
