//! Crate-wide error type.
//!
//! No error is recovered locally: every failure aborts the current
//! top-level operation and is returned with a human-readable message.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// Raised by the CCL evaluator: compilation, validation, or field
    /// iteration.
    #[error("evaluator error: {0}")]
    Evaluator(#[from] crate::ccl::Error),

    /// IR construction saw a syntax shape it does not recognise.
    #[error("parse error: {0}")]
    Parse(String),

    /// Canonicalisation or schema JSON encoding failed.
    #[error("format error: {0}")]
    Format(String),

    /// The inference path runs on untrusted input; panics from the AST
    /// builder are caught and surfaced here.
    #[error("inference error: {0}")]
    Inference(String),

    /// Unexpected syntax variant encountered while expanding a merge.
    #[error("merge error: {0}")]
    Merge(String),
}

pub type Result<T> = std::result::Result<T, Error>;
