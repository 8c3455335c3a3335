//! Binder errors
//!
//! Only option loading and markup parsing hand these back to callers.
//! Inside an update or event pass every error is logged and the offending
//! write is skipped.

use thiserror::Error;

/// Binder result type
pub type Result<T> = std::result::Result<T, BindError>;

#[derive(Debug, Error)]
pub enum BindError {
    #[error("can't set {path}[{variable}] because it's undefined")]
    UndefinedContainer { path: String, variable: String },

    #[error("can't set {path}[{variable}]: the container is a computed value")]
    Detached { path: String, variable: String },

    #[error("can't set {path}[{variable}]: the container is a {kind}, not an object or array")]
    NotAContainer {
        path: String,
        variable: String,
        kind: &'static str,
    },

    #[error("can't set {path}[{index}]: index is past the end (length {len})")]
    IndexOutOfRange {
        path: String,
        index: String,
        len: usize,
    },

    #[error("can't set {path}[{variable}]: arrays only take numeric indices")]
    NotAnIndex { path: String, variable: String },

    #[error("control has no target member")]
    EmptyPath,

    #[error("invalid binder options: {0}")]
    Options(#[from] serde_json::Error),

    #[error("failed to read markup: {0}")]
    Markup(#[from] std::io::Error),
}
