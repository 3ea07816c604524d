//! Error taxonomy for the retrieval and synthesis core.
//!
//! Mirrors the five-way split in the design doc: configuration errors are
//! fatal at startup, ingestion errors abort only the affected document,
//! retrieval errors are recovered locally into empty results, and
//! generation errors are surfaced to the caller as `SYNTH_FAIL`. Guardrail
//! parse failures are not represented here — an unparseable verdict is a
//! `passed = false` result, not an error (see `synthesis::guardrail`).

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("ingestion failed for {path}: {reason}")]
    Ingestion { path: String, reason: String },

    #[error("retrieval error: {0}")]
    Retrieval(String),

    #[error("generation backend error: {0}")]
    Generation(String),

    #[error("store error: {0}")]
    Store(#[from] rusqlite::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, CoreError>;
