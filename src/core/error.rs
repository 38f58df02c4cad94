use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum SimError {
    #[error("invalid configuration for '{field}': {reason}")]
    InvalidConfiguration { field: &'static str, reason: String },
}

pub type SimResult<T> = Result<T, SimError>;

pub(crate) fn invalid(field: &'static str, reason: impl Into<String>) -> SimError {
    SimError::InvalidConfiguration {
        field,
        reason: reason.into(),
    }
}

pub(crate) fn ensure_finite_non_negative(field: &'static str, value: f64) -> SimResult<()> {
    if !value.is_finite() {
        return Err(invalid(field, format!("must be finite, got {value}")));
    }
    if value < 0.0 {
        return Err(invalid(field, format!("must be >= 0, got {value}")));
    }
    Ok(())
}
