use thiserror::Error;

/// Rejected input values.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoreError {
    #[error("invalid disk id '{0}': expected a positive integer")]
    InvalidDiskId(String),

    #[error("invalid drive letter '{0}': expected a single letter optionally followed by ':'")]
    InvalidDriveLetter(String),

    #[error("invalid ensure value '{0}': expected Present or Absent")]
    InvalidEnsure(String),
}

/// Failure reported by one of the OS collaborators.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HostError {
    #[error("{operation} failed for {target}: {detail}")]
    Os {
        operation: &'static str,
        target: String,
        detail: String,
        code: Option<u32>,
    },

    #[error("{0} requires Windows")]
    Unsupported(&'static str),
}

impl HostError {
    pub fn os(operation: &'static str, target: impl Into<String>, detail: impl ToString) -> Self {
        HostError::Os {
            operation,
            target: target.into(),
            detail: detail.to_string(),
            code: None,
        }
    }

    pub fn with_code(self, value: u32) -> Self {
        match self {
            HostError::Os {
                operation,
                target,
                detail,
                ..
            } => HostError::Os {
                operation,
                target,
                detail,
                code: Some(value),
            },
            other => other,
        }
    }

    pub fn code(&self) -> Option<u32> {
        match self {
            HostError::Os { code, .. } => *code,
            HostError::Unsupported(_) => None,
        }
    }
}
