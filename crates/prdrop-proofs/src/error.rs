use std::path::PathBuf;

use thiserror::Error;

/// Errors raised by proving and verification engines.
#[derive(Error, Debug)]
pub enum EngineError {
    /// An artifact could not be read or written.
    #[error("failed to access {}: {source}", path.display())]
    Artifact {
        /// Path of the artifact.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// An artifact is not valid JSON of the expected shape.
    #[error("malformed artifact {}: {source}", path.display())]
    Format {
        /// Path of the artifact.
        path: PathBuf,
        /// Underlying parse error.
        source: serde_json::Error,
    },

    /// A key does not belong to the running protocol, backend or circuit.
    #[error("key mismatch: expected {expected}, found {found}")]
    VersionMismatch {
        /// What the running engine expects.
        expected: String,
        /// What the key carries.
        found: String,
    },

    /// An external prover or verifier program failed.
    #[error("external program failed: {0}")]
    Process(String),

    /// A blocking proving task panicked or was cancelled.
    #[error("proving task failed: {0}")]
    Join(#[from] tokio::task::JoinError),

    /// Public inputs do not fit the claim layout.
    #[error("invalid public inputs: {0}")]
    Layout(#[from] prdrop_core::PublicInputError),

    /// Inputs or outputs could not be encoded.
    #[error("encoding failed: {0}")]
    Encoding(#[from] serde_json::Error),

    /// Backend-specific failure.
    #[error("backend error: {0}")]
    Backend(String),
}

impl EngineError {
    pub(crate) fn artifact(path: impl Into<PathBuf>) -> impl FnOnce(std::io::Error) -> Self {
        let path = path.into();
        move |source| Self::Artifact { path, source }
    }

    pub(crate) fn format(path: impl Into<PathBuf>) -> impl FnOnce(serde_json::Error) -> Self {
        let path = path.into();
        move |source| Self::Format { path, source }
    }
}
