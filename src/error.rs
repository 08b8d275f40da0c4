//! Crate-wide error taxonomy (§7) shared by every processor and by the
//! HTTP bridge's envelope mapping.

use thiserror::Error;

/// The five error kinds named by the design, each with a fixed handling
/// policy. Individual processors raise these directly rather than ad hoc
/// `anyhow::Error`s, so the bridge can map them to the right status code
/// and the bus path can apply the right degrade-or-drop behavior.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("validation error: {0}")]
    Validation(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("transient resource error: {0}")]
    Transient(String),

    #[error("model error: {0}")]
    Model(String),

    #[error("fatal error: {0}")]
    Fatal(String),
}

impl PipelineError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn transient(msg: impl Into<String>) -> Self {
        Self::Transient(msg.into())
    }

    pub fn model(msg: impl Into<String>) -> Self {
        Self::Model(msg.into())
    }

    pub fn fatal(msg: impl Into<String>) -> Self {
        Self::Fatal(msg.into())
    }

    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Fatal(_))
    }
}

pub type PipelineResult<T> = Result<T, PipelineError>;
