//! Pipeline error taxonomy.
//!
//! Network and missing-artifact failures are never recovered locally;
//! they propagate up to `main` and fail the run.

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised by the pipeline stages and the artifact store.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Transport failure or non-success status from the remote API.
    #[error("request to {url} failed: {message}")]
    Network { url: String, message: String },

    /// The remote API answered with a body that is not the expected JSON.
    #[error("malformed JSON from {url}: {message}")]
    Decode { url: String, message: String },

    /// An item endpoint returned something other than a JSON object.
    #[error("item {id} returned {found} instead of an object")]
    UnexpectedPayload { id: u64, found: String },

    /// A stage's input artifact does not exist or cannot be read.
    #[error("upstream artifact missing: {}", path.display())]
    MissingArtifact { path: PathBuf },

    /// Another run currently holds the store's lock.
    #[error("another run holds the lock at {}", path.display())]
    Locked { path: PathBuf },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Csv(#[from] csv::Error),
}

impl PipelineError {
    pub(crate) fn network(url: &str, err: impl std::fmt::Display) -> Self {
        Self::Network {
            url: url.to_string(),
            message: err.to_string(),
        }
    }

    pub(crate) fn decode(url: &str, err: impl std::fmt::Display) -> Self {
        Self::Decode {
            url: url.to_string(),
            message: err.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, PipelineError>;
