//! Error types for Pacer timers
//!
//! Errors fall into three groups:
//! - **Configuration** errors are returned synchronously by the call that
//!   violated a precondition (`InvalidInterval`, `AlreadyStarted`, ...)
//! - **Fatal** errors end a single timer instance (a failing clock)
//! - **Callback** errors are never returned to the caller at all. They are
//!   captured by the timer loop as [`CallbackError`] and handed to the
//!   [`TimerObserver`](crate::timing::TimerObserver)
//!
//! # Error Codes
//!
//! Each [`TimerError`] variant has a stable error code (e.g. `ALREADY_STARTED`)
//! suitable for log aggregation and programmatic handling.
//!
//! # Example
//!
//! ```rust
//! use std::time::Duration;
//! use pacer_core::error::{ErrorCategory, TimerError};
//! use pacer_core::Timer;
//!
//! let err = Timer::from_fn(Duration::ZERO, Default::default(), || Ok::<(), TimerError>(()))
//!     .unwrap_err();
//!
//! assert_eq!(err.error_code(), "INVALID_INTERVAL");
//! assert_eq!(err.category(), ErrorCategory::Configuration);
//! assert!(!err.is_fatal());
//! ```

use std::error::Error as StdError;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::timing::TimerState;

/// Result type alias for timer operations
pub type Result<T> = std::result::Result<T, TimerError>;

/// Boxed error type accepted from user callbacks
pub type BoxError = Box<dyn StdError + Send + Sync + 'static>;

/// Error category for grouping related errors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// A precondition was violated at the call site
    Configuration,
    /// The timer instance can no longer keep its guarantees and has stopped
    Fatal,
}

/// Errors returned by timer operations
#[derive(Error, Debug)]
pub enum TimerError {
    // ═══════════════════════════════════════════════════════════════════════
    // Configuration errors (raised synchronously, never ignored)
    // ═══════════════════════════════════════════════════════════════════════

    /// The interval was zero
    #[error("Invalid interval: {interval_ms}ms. The interval must be greater than zero.")]
    InvalidInterval { interval_ms: u128 },

    /// `start()` was called on a timer that is not in the CREATED state
    #[error("Timer already started (state: {state}). Construct a new timer to run again.")]
    AlreadyStarted { state: TimerState },

    /// `start()` was called outside of a tokio runtime
    #[error("No tokio runtime available. Call start() from within a runtime or use start_on().")]
    NoRuntime,

    /// Timer configuration could not be parsed or is inconsistent
    #[error("Invalid timer configuration: {reason}")]
    InvalidConfig { reason: String },

    /// JSON deserialization of a configuration failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // ═══════════════════════════════════════════════════════════════════════
    // Fatal errors (terminal for the affected timer only)
    // ═══════════════════════════════════════════════════════════════════════

    /// The clock failed to suspend until the next wake instant
    #[error("Clock fault: {reason}. The timer has been stopped.")]
    ClockFault { reason: String },
}

impl TimerError {
    /// Returns true if this error terminated a running timer
    pub fn is_fatal(&self) -> bool {
        self.category() == ErrorCategory::Fatal
    }

    /// Returns true if this error was caused by a bad call or bad input
    pub fn is_configuration(&self) -> bool {
        self.category() == ErrorCategory::Configuration
    }

    /// Returns the error category for grouping
    pub fn category(&self) -> ErrorCategory {
        match self {
            TimerError::InvalidInterval { .. }
            | TimerError::AlreadyStarted { .. }
            | TimerError::NoRuntime
            | TimerError::InvalidConfig { .. }
            | TimerError::Json(_) => ErrorCategory::Configuration,

            TimerError::ClockFault { .. } => ErrorCategory::Fatal,
        }
    }

    /// Returns the stable error code for this error
    pub fn error_code(&self) -> &'static str {
        match self {
            TimerError::InvalidInterval { .. } => "INVALID_INTERVAL",
            TimerError::AlreadyStarted { .. } => "ALREADY_STARTED",
            TimerError::NoRuntime => "NO_RUNTIME",
            TimerError::InvalidConfig { .. } => "INVALID_CONFIG",
            TimerError::Json(_) => "JSON_ERROR",
            TimerError::ClockFault { .. } => "CLOCK_FAULT",
        }
    }
}

/// Failure reported by a single callback invocation
///
/// These never leave the timer loop; the tick still counts and the loop
/// moves on to the next scheduled wake.
#[derive(Error, Debug)]
pub enum CallbackError {
    /// The callback returned an error
    #[error("callback failed: {0}")]
    Failed(#[source] BoxError),

    /// The callback panicked
    #[error("callback panicked: {message}")]
    Panicked { message: String },
}

impl CallbackError {
    /// Wrap any error returned by a callback
    pub fn failed<E>(err: E) -> Self
    where
        E: Into<BoxError>,
    {
        CallbackError::Failed(err.into())
    }

    /// Build from a panic payload caught with `catch_unwind`
    pub(crate) fn from_panic(payload: Box<dyn std::any::Any + Send>) -> Self {
        let message = if let Some(s) = payload.downcast_ref::<&str>() {
            (*s).to_string()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else {
            "non-string panic payload".to_string()
        };
        CallbackError::Panicked { message }
    }

    /// Returns true if the callback panicked rather than returning an error
    pub fn is_panic(&self) -> bool {
        matches!(self, CallbackError::Panicked { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_categories() {
        assert_eq!(
            TimerError::InvalidInterval { interval_ms: 0 }.category(),
            ErrorCategory::Configuration
        );
        assert_eq!(
            TimerError::AlreadyStarted {
                state: TimerState::Running
            }
            .category(),
            ErrorCategory::Configuration
        );
        assert_eq!(
            TimerError::ClockFault {
                reason: "test".to_string()
            }
            .category(),
            ErrorCategory::Fatal
        );
    }

    #[test]
    fn test_error_codes() {
        assert_eq!(TimerError::NoRuntime.error_code(), "NO_RUNTIME");
        assert_eq!(
            TimerError::AlreadyStarted {
                state: TimerState::Stopped
            }
            .error_code(),
            "ALREADY_STARTED"
        );
        assert_eq!(
            TimerError::ClockFault {
                reason: "x".to_string()
            }
            .error_code(),
            "CLOCK_FAULT"
        );
    }

    #[test]
    fn test_fatal_and_configuration_flags() {
        let fault = TimerError::ClockFault {
            reason: "sleep failed".to_string(),
        };
        assert!(fault.is_fatal());
        assert!(!fault.is_configuration());

        let invalid = TimerError::InvalidInterval { interval_ms: 0 };
        assert!(invalid.is_configuration());
        assert!(!invalid.is_fatal());
    }

    #[test]
    fn test_error_messages_are_helpful() {
        let msg = TimerError::AlreadyStarted {
            state: TimerState::Stopped,
        }
        .to_string();
        assert!(msg.contains("stopped"));
        assert!(msg.contains("new timer"));
    }

    #[test]
    fn test_callback_error_from_panic_payload() {
        let err = CallbackError::from_panic(Box::new("boom"));
        assert!(err.is_panic());
        assert_eq!(err.to_string(), "callback panicked: boom");

        let err = CallbackError::from_panic(Box::new(String::from("owned boom")));
        assert!(err.to_string().contains("owned boom"));

        let err = CallbackError::from_panic(Box::new(42_u32));
        assert!(err.to_string().contains("non-string"));
    }

    #[test]
    fn test_callback_error_wraps_source() {
        let err = CallbackError::failed("disk full");
        assert!(!err.is_panic());
        assert!(err.to_string().contains("disk full"));
        assert!(StdError::source(&err).is_some());
    }
}
