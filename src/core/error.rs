use std::borrow::Cow;

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ProjectionError {
    /// Rejected at the boundary before any formula runs.
    #[error("invalid {field}: {reason}")]
    InvalidInput {
        field: &'static str,
        reason: Cow<'static, str>,
    },

    /// A formula produced a value outside the representable range.
    #[error("{what} overflowed; reduce the horizon, rate or amounts")]
    Overflow { what: &'static str },
}

impl ProjectionError {
    pub fn invalid(field: &'static str, reason: impl Into<Cow<'static, str>>) -> Self {
        Self::InvalidInput {
            field,
            reason: reason.into(),
        }
    }

    pub fn is_invalid_input(&self) -> bool {
        matches!(self, Self::InvalidInput { .. })
    }
}

pub(crate) fn finite(what: &'static str, value: f64) -> Result<f64, ProjectionError> {
    if value.is_finite() {
        Ok(value)
    } else {
        log::warn!("{what} is not finite ({value})");
        Err(ProjectionError::Overflow { what })
    }
}
