//! Errors raised while loading or querying the graph

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum GraphError {
    #[error("failed to read element data from {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid element data: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("element `{0}` is defined more than once")]
    DuplicateElement(String),

    /// A recipe names an ingredient that no element defines.
    #[error("recipe for `{target}` references undefined element `{missing}`")]
    DanglingReference { target: String, missing: String },

    /// An element is, transitively, its own prerequisite.
    #[error("recipe cycle detected: {}", path.join(" -> "))]
    Cycle { path: Vec<String> },

    #[error("element not found: {0}")]
    ElementNotFound(String),
}

impl GraphError {
    /// Integrity errors abort startup; lookups are recoverable.
    pub fn is_integrity_error(&self) -> bool {
        matches!(
            self,
            GraphError::DuplicateElement(_)
                | GraphError::DanglingReference { .. }
                | GraphError::Cycle { .. }
        )
    }
}
