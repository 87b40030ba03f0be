//! Common error infrastructure for items-core.
//!
//! Container and item operations follow a "never throw" contract: rejected or
//! clamped mutations log a warning and return an empty or partial result. The
//! typed errors in this crate belong to the lower-level primitives (item list
//! placement, graph application, save loading, equipment authority) and to
//! callers that want to surface a failure instead of a sentinel value.
//!
//! Domain errors live next to the code that produces them (`ItemListError`
//! in [`crate::container`], `GraphError` in [`crate::collection`], ...). They
//! all implement [`ItemsError`] so callers can classify them uniformly.

/// Severity level of an error, used for categorization and recovery strategies.
///
/// - **Recoverable**: capacity or rule rejections; the caller may retry with
///   a smaller amount or another container
/// - **Validation**: invalid input such as a null definition or unknown tag
/// - **Internal**: invariant breaks that indicate a bug in the caller
/// - **Fatal**: corrupted state that cannot be continued from
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ErrorSeverity {
    /// Rejected or clamped by capacity or rules.
    ///
    /// Examples: container full, stack limit reached, slot occupied
    Recoverable,

    /// Invalid input, should not retry without changes.
    ///
    /// Examples: unknown container id, unknown item definition
    Validation,

    /// Unexpected state inconsistency.
    ///
    /// Examples: mutation without authority, item listed twice
    Internal,

    /// Unrecoverable state corruption.
    Fatal,
}

impl ErrorSeverity {
    /// Returns a human-readable description of this severity level.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Recoverable => "recoverable",
            Self::Validation => "validation",
            Self::Internal => "internal",
            Self::Fatal => "fatal",
        }
    }

    /// Returns true if this error is potentially recoverable.
    pub const fn is_recoverable(&self) -> bool {
        matches!(self, Self::Recoverable)
    }

    /// Returns true if this error indicates an internal bug.
    pub const fn is_internal(&self) -> bool {
        matches!(self, Self::Internal | Self::Fatal)
    }
}

/// Common trait for all items-core errors.
///
/// # Implementation Guidelines
///
/// - Use `#[derive(thiserror::Error)]` for the Display/Error impl
/// - Classify severity based on recoverability, not impact
/// - Error codes are SCREAMING_SNAKE_CASE and stable across releases
pub trait ItemsError: core::fmt::Display + core::fmt::Debug {
    /// Returns the severity level of this error.
    fn severity(&self) -> ErrorSeverity;

    /// Returns a stable error code for logging and metrics.
    fn error_code(&self) -> &'static str {
        core::any::type_name::<Self>()
    }
}
