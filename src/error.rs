use crate::templates::SkeletonKind;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum QuizcutError {
    #[error("line {line}: {message}")]
    Format { line: usize, message: String },

    #[error("video cue '{cue}' does not match the next segment ({expected})")]
    CueMismatch { cue: String, expected: String },

    #[error("skeleton '{kind}' is missing or incompatible: {reason}")]
    TemplateMissing { kind: SkeletonKind, reason: String },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    ConfigError(#[from] config::ConfigError),
}

impl QuizcutError {
    pub(crate) fn format(line: usize, message: impl Into<String>) -> Self {
        Self::Format {
            line,
            message: message.into(),
        }
    }

    pub(crate) fn template(kind: SkeletonKind, reason: impl Into<String>) -> Self {
        Self::TemplateMissing {
            kind,
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, QuizcutError>;
