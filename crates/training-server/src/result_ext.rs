//! Result extension trait for logging errors with context.

use std::fmt::Display;
use tracing::error;

/// Extension trait for logging errors with context.
///
/// Adds a `log` method to `Result` types that logs errors with the
/// provided context message and the caller's source location.
pub trait ResultExt<T, E> {
    /// Log the error with context if this is an `Err` variant.
    ///
    /// ```ignore
    /// use specchem_training::result_ext::ResultExt;
    ///
    /// let profile = queries::get_profile(&pool, id).await.log("loading profile")?;
    /// ```
    fn log<S: ToString>(self, context: S) -> Result<T, E>;
}

impl<T, E: Display> ResultExt<T, E> for Result<T, E> {
    #[track_caller]
    fn log<S: ToString>(self, context: S) -> Result<T, E> {
        if let Err(ref e) = self {
            let caller_location = std::panic::Location::caller();
            error!(
                target: "specchem_training",
                error = %e,
                file = %format!("{}:{}", caller_location.file(), caller_location.line()),
                context = %context.to_string(),
                "Operation failed"
            );
        }
        self
    }
}

/// Extension trait for logging unexpected `None` values.
pub trait OptionResultExt<T> {
    fn log_none<S: ToString>(self, context: S) -> Option<T>;
}

impl<T> OptionResultExt<T> for Option<T> {
    #[track_caller]
    fn log_none<S: ToString>(self, context: S) -> Option<T> {
        if self.is_none() {
            let caller_location = std::panic::Location::caller();
            tracing::warn!(
                target: "specchem_training",
                file = %format!("{}:{}", caller_location.file(), caller_location.line()),
                context = %context.to_string(),
                "Expected value was None"
            );
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_result_ext_passes_through() {
        let ok: Result<i32, &str> = Ok(42);
        assert_eq!(ok.log("loading course").unwrap(), 42);

        let err: Result<i32, &str> = Err("connection reset");
        assert_eq!(err.log("loading course").unwrap_err(), "connection reset");
    }

    #[test]
    fn test_option_ext_passes_through() {
        assert_eq!(Some(7).log_none("section lookup"), Some(7));
        assert!(None::<i32>.log_none("section lookup").is_none());
    }
}
