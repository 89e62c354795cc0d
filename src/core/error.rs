//! Error handling infrastructure.
//!
//! The library never panics or unwinds across an FFI boundary. Every fallible
//! entry point returns a [`GfxError`] (or, across `extern "C"`, latches one
//! and returns a sentinel) drawn from a fixed set of nine kinds.
//!
//! # Error code ranges
//!
//! | Code | Kind |
//! |------|------|
//! | 0 | none (success) |
//! | 1 | invalid_value |
//! | 2 | invalid_enum |
//! | 3 | invalid_operation |
//! | 4 | out_of_resources |
//! | 5 | internal_error |
//! | 6 | stack_overflow |
//! | 7 | stack_underflow |
//! | 8 | out_of_memory |

use std::cell::RefCell;
use thiserror::Error;

/// FFI-compatible error code. Matches the numbering in the error table above.
pub type GfxErrorCode = i32;

/// The nine error kinds the core can raise.
///
/// A call that sets an error is a no-op for its other side effects; the
/// latch records only the first error in a sequence until it is read.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GfxError {
    /// Numeric or bitmask argument out of range (negative size, undefined
    /// bit, degenerate ortho/frustum, unknown context id).
    #[error("invalid value: {0}")]
    InvalidValue(String),
    /// Enum argument not in the accepted set.
    #[error("invalid enum: {0}")]
    InvalidEnum(String),
    /// begin/end interlock violated, no active context, or scene/primitive
    /// nesting violated.
    #[error("invalid operation: {0}")]
    InvalidOperation(String),
    /// Context pool exhausted.
    #[error("out of resources")]
    OutOfResources,
    /// Reserved for conditions the implementation cannot otherwise classify.
    #[error("internal error: {0}")]
    InternalError(String),
    /// `push` when the current stack already holds 100 entries.
    #[error("stack overflow")]
    StackOverflow,
    /// `pop` when the current stack holds exactly 1 entry.
    #[error("stack underflow")]
    StackUnderflow,
    /// Allocation failure.
    #[error("out of memory")]
    OutOfMemory,
}

impl GfxError {
    /// The FFI-compatible numeric code for this error.
    pub const fn code(&self) -> GfxErrorCode {
        match self {
            GfxError::InvalidValue(_) => 1,
            GfxError::InvalidEnum(_) => 2,
            GfxError::InvalidOperation(_) => 3,
            GfxError::OutOfResources => 4,
            GfxError::InternalError(_) => 5,
            GfxError::StackOverflow => 6,
            GfxError::StackUnderflow => 7,
            GfxError::OutOfMemory => 8,
        }
    }

    /// The static message returned by `get_error_string` for this error's
    /// code. Does not include the dynamic detail carried by some variants.
    pub const fn code_message(code: GfxErrorCode) -> &'static str {
        match code {
            0 => "no error",
            1 => "invalid value",
            2 => "invalid enum",
            3 => "invalid operation",
            4 => "out of resources",
            5 => "internal error",
            6 => "stack overflow",
            7 => "stack underflow",
            8 => "out of memory",
            _ => "unknown error code",
        }
    }
}

impl From<std::io::Error> for GfxError {
    fn from(err: std::io::Error) -> Self {
        GfxError::InvalidValue(format!("I/O error: {err}"))
    }
}

/// Result alias used throughout the core.
pub type GfxResult<T> = Result<T, GfxError>;

thread_local! {
    static LAST_ERROR: RefCell<Option<GfxError>> = const { RefCell::new(None) };
}

/// Latches `error` as the current error, unless one is already latched.
///
/// The first error in a sequence wins until [`take_last_error`] reads it.
pub fn latch_error(error: GfxError) {
    LAST_ERROR.with(|slot| {
        let mut slot = slot.borrow_mut();
        if slot.is_none() {
            log::warn!("{error}");
            *slot = Some(error);
        }
    });
}

/// Returns the first latched error since the last call, clearing the latch.
///
/// Mirrors `get_error`'s reset-on-read semantics.
pub fn take_last_error() -> Option<GfxError> {
    LAST_ERROR.with(|slot| slot.borrow_mut().take())
}

/// Returns the numeric code of the first latched error, clearing the latch.
/// Returns `0` (none) if nothing is latched.
pub fn take_last_error_code() -> GfxErrorCode {
    take_last_error().map(|e| e.code()).unwrap_or(0)
}
