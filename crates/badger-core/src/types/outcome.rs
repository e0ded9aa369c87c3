//! Tagged result for operations that fall back to a safe default.
//!
//! Classification and extraction never abort the message flow when a model
//! call fails; they substitute a conservative default instead. `Outcome`
//! keeps that substitution visible to the caller rather than silently
//! blending fallbacks with real results.

/// A value that may have been produced by a fallback path.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome<T> {
    /// The operation produced a full-fidelity value.
    Ok(T),
    /// The operation fell back to a default; `reason` says why.
    Degraded { value: T, reason: String },
}

impl<T> Outcome<T> {
    /// Create a degraded outcome with the given fallback value and reason.
    pub fn degraded(value: T, reason: impl Into<String>) -> Self {
        Self::Degraded {
            value,
            reason: reason.into(),
        }
    }

    /// Borrow the inner value regardless of fidelity.
    pub fn value(&self) -> &T {
        match self {
            Self::Ok(value) => value,
            Self::Degraded { value, .. } => value,
        }
    }

    /// Consume the outcome and return the inner value.
    pub fn into_value(self) -> T {
        match self {
            Self::Ok(value) => value,
            Self::Degraded { value, .. } => value,
        }
    }

    /// Whether this outcome came from a fallback path.
    pub fn is_degraded(&self) -> bool {
        matches!(self, Self::Degraded { .. })
    }

    /// The degradation reason, if any.
    pub fn degraded_reason(&self) -> Option<&str> {
        match self {
            Self::Ok(_) => None,
            Self::Degraded { reason, .. } => Some(reason.as_str()),
        }
    }

    /// Map the inner value, preserving the fidelity tag.
    pub fn map<U, F: FnOnce(T) -> U>(self, f: F) -> Outcome<U> {
        match self {
            Self::Ok(value) => Outcome::Ok(f(value)),
            Self::Degraded { value, reason } => Outcome::Degraded {
                value: f(value),
                reason,
            },
        }
    }
}
