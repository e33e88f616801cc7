use thiserror::Error;

/// Engine result type.
pub type Result<T> = std::result::Result<T, Error>;

/// Error taxonomy surfaced to collaborators (views, CLI scripts).
///
/// `RateLimited` and `NotFound` are expected outcomes and must be matched on,
/// not treated as fatal. The engine never retries on its own; retry policy
/// belongs to the caller.
#[derive(Debug, Error)]
pub enum Error {
    /// A referenced entity does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// A foreign key (sender, receiver, parent, editor) does not resolve.
    #[error("integrity violation: {0}")]
    IntegrityViolation(String),

    /// Message creation throttled by the rate guard.
    #[error("rate limited")]
    RateLimited,

    /// Propagated on behalf of callers; the engine itself never produces
    /// this; identity is trusted to be established upstream.
    #[error("unauthorized")]
    Unauthorized,

    /// The underlying store failed.
    #[error("storage error: {0}")]
    Storage(String),
}

impl Error {
    /// Stable error code for API responses and logs.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "NOT_FOUND",
            Self::IntegrityViolation(_) => "INTEGRITY_VIOLATION",
            Self::RateLimited => "RATE_LIMITED",
            Self::Unauthorized => "UNAUTHORIZED",
            Self::Storage(_) => "STORAGE_ERROR",
        }
    }

    /// Whether the caller can reasonably recover by changing the request.
    #[must_use]
    pub const fn is_recoverable(&self) -> bool {
        matches!(self, Self::NotFound(_) | Self::RateLimited)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_are_stable() {
        assert_eq!(Error::NotFound("x".into()).code(), "NOT_FOUND");
        assert_eq!(Error::RateLimited.code(), "RATE_LIMITED");
        assert_eq!(
            Error::IntegrityViolation("y".into()).code(),
            "INTEGRITY_VIOLATION"
        );
    }

    #[test]
    fn recoverable_errors() {
        assert!(Error::RateLimited.is_recoverable());
        assert!(Error::NotFound("m".into()).is_recoverable());
        assert!(!Error::Storage("disk".into()).is_recoverable());
    }
}
