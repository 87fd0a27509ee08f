//! Vault error types

use thiserror::Error;
use types::{AuthError, ErrorCategory, FixedPointError, ValidationError};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum VaultError {
    #[error("Nothing to deposit")]
    NothingToDeposit,

    #[error("Nothing to withdraw")]
    NothingToWithdraw,

    #[error("Withdraw amount exceeds balance")]
    WithdrawExceedsBalance,

    #[error("Pausable: paused")]
    Paused,

    #[error("Pausable: not paused")]
    NotPaused,

    #[error("performanceFee cannot be more than MAX_PERFORMANCE_FEE")]
    PerformanceFeeTooHigh,

    #[error("callFee cannot be more than MAX_CALL_FEE")]
    CallFeeTooHigh,

    #[error("withdrawFee cannot be more than MAX_WITHDRAW_FEE")]
    WithdrawFeeTooHigh,

    #[error("withdrawFeePeriod cannot be more than MAX_WITHDRAW_FEE_PERIOD")]
    WithdrawFeePeriodTooLong,

    #[error("withdraw: not good")]
    InsufficientStake,

    #[error(transparent)]
    Unauthorized(#[from] AuthError),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Math(#[from] FixedPointError),
}

impl VaultError {
    pub fn category(&self) -> ErrorCategory {
        use VaultError::*;
        match self {
            Paused | NotPaused => ErrorCategory::Lifecycle,
            Unauthorized(_) => ErrorCategory::Authorization,
            Math(_) => ErrorCategory::Arithmetic,
            _ => ErrorCategory::InputValidation,
        }
    }
}
