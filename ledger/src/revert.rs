//! Typed reverts.
//!
//! A [`Revert`] aborts the current call frame. The ledger restores the state
//! captured when the frame was entered, then hands the revert to the caller,
//! which may handle it or let it bubble up with `?`.
//!
//! Access-control failures are a separate variant so that callers can assert
//! "this was rejected because the caller lacks permission" without matching
//! on error-name strings.

use alloy_primitives::{Address, U256};
use thiserror::Error;

use crate::abi::Selector;

/// Solidity panic codes the targets can raise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PanicCode {
    /// `assert` failed (0x01).
    Assertion,
    /// Checked arithmetic over- or underflowed (0x11).
    ArithmeticOverflow,
    /// Division or modulo by zero (0x12).
    DivisionByZero,
}

impl PanicCode {
    /// The numeric panic code.
    #[must_use]
    pub const fn code(self) -> u8 {
        match self {
            Self::Assertion => 0x01,
            Self::ArithmeticOverflow => 0x11,
            Self::DivisionByZero => 0x12,
        }
    }
}

impl std::fmt::Display for PanicCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "0x{:02x}", self.code())
    }
}

/// Reason a call frame aborted.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Revert {
    /// The caller is not permitted to perform the operation.
    #[error("unauthorized: {error}")]
    Unauthorized { error: &'static str },
    /// A named custom error (`revert SomeError()`).
    #[error("custom error {error}")]
    Custom { error: &'static str },
    /// A `require(cond, "message")` failure.
    #[error("reverted: {0}")]
    Message(String),
    /// A revert with empty return data (Vyper `assert`).
    #[error("reverted without reason")]
    Bare,
    /// A Solidity panic.
    #[error("panic {0}")]
    Panic(PanicCode),
    /// A native-currency transfer exceeded the sender's balance.
    #[error("{account} holds {available} wei, needs {required}")]
    InsufficientBalance {
        account: Address,
        available: U256,
        required: U256,
    },
    /// Calldata or return data could not be decoded.
    #[error("invalid calldata: {detail}")]
    InvalidCalldata { detail: String },
    /// No function matches the selector and the contract has no fallback.
    #[error("{contract} has no function {selector}")]
    UnknownSelector {
        contract: &'static str,
        selector: Selector,
    },
    /// Value was sent to a function that is not payable.
    #[error("{contract} does not accept value")]
    NotPayable { contract: &'static str },
    /// The nested call depth limit was reached.
    #[error("call depth {depth} exceeds limit")]
    CallDepthExceeded { depth: usize },
}

impl Revert {
    /// `require`-style revert with a message.
    pub fn message(message: impl Into<String>) -> Self {
        Self::Message(message.into())
    }

    /// Whether this revert is a tagged access-control failure.
    #[must_use]
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Unauthorized { .. })
    }

    /// Name of the custom or access-control error, if the revert carries one.
    #[must_use]
    pub fn error_name(&self) -> Option<&'static str> {
        match self {
            Self::Unauthorized { error } | Self::Custom { error } => Some(error),
            _ => None,
        }
    }

    pub(crate) fn invalid_calldata(detail: impl Into<String>) -> Self {
        Self::InvalidCalldata {
            detail: detail.into(),
        }
    }
}

/// Result of executing contract code.
pub type CallResult<T> = Result<T, Revert>;

/// `require(condition, message)`.
///
/// # Errors
///
/// Returns [`Revert::Message`] when `condition` is false.
pub fn require(condition: bool, message: &str) -> CallResult<()> {
    if condition {
        Ok(())
    } else {
        Err(Revert::message(message))
    }
}

/// `if (!condition) revert Error();`
///
/// # Errors
///
/// Returns [`Revert::Custom`] when `condition` is false.
pub fn ensure(condition: bool, error: &'static str) -> CallResult<()> {
    if condition {
        Ok(())
    } else {
        Err(Revert::Custom { error })
    }
}

/// Vyper-style `assert condition`: reverts with no data.
///
/// # Errors
///
/// Returns [`Revert::Bare`] when `condition` is false.
pub fn check(condition: bool) -> CallResult<()> {
    if condition {
        Ok(())
    } else {
        Err(Revert::Bare)
    }
}

/// Access-control check: `if (!condition) revert Error();`, tagged unauthorized.
///
/// # Errors
///
/// Returns [`Revert::Unauthorized`] when `condition` is false.
pub fn authorize(condition: bool, error: &'static str) -> CallResult<()> {
    if condition {
        Ok(())
    } else {
        Err(Revert::Unauthorized { error })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn authorize_tags_failures_as_unauthorized() {
        let err = authorize(false, "CallerNotAllowed").unwrap_err();
        assert!(err.is_unauthorized());
        assert_eq!(err.error_name(), Some("CallerNotAllowed"));
        assert!(authorize(true, "CallerNotAllowed").is_ok());
    }

    #[test]
    fn custom_errors_are_not_unauthorized() {
        let err = ensure(false, "RepayFailed").unwrap_err();
        assert!(!err.is_unauthorized());
        assert_eq!(err.error_name(), Some("RepayFailed"));
    }

    #[test]
    fn panic_display_uses_solidity_code() {
        assert_eq!(
            Revert::Panic(PanicCode::ArithmeticOverflow).to_string(),
            "panic 0x11"
        );
    }
}
