//! Escrow and gauge error types

use thiserror::Error;
use types::{AuthError, ErrorCategory, FixedPointError, Timestamp};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EscrowError {
    #[error("Zero value")]
    ZeroValue,

    #[error("Withdraw old tokens first")]
    WithdrawOldTokensFirst,

    #[error("Can only lock until time in the future")]
    LockNotInFuture,

    #[error("Voting lock can be 4 years max")]
    LockTooLong,

    #[error("No existing lock found")]
    NoExistingLock,

    #[error("Cannot add to expired lock. Withdraw")]
    ExpiredLock,

    #[error("Lock expired")]
    LockExpired,

    #[error("Nothing is locked")]
    NothingLocked,

    #[error("Can only increase lock duration")]
    CanOnlyIncreaseDuration,

    #[error("The lock didn't expire")]
    LockNotExpired,

    #[error("timestamp {now} precedes last checkpoint {last}")]
    StaleTimestamp { now: Timestamp, last: Timestamp },

    #[error(transparent)]
    Math(#[from] FixedPointError),
}

impl EscrowError {
    pub fn category(&self) -> ErrorCategory {
        use EscrowError::*;
        match self {
            LockExpired | ExpiredLock | LockNotExpired | WithdrawOldTokensFirst => {
                ErrorCategory::Lifecycle
            }
            Math(_) => ErrorCategory::Arithmetic,
            _ => ErrorCategory::InputValidation,
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GaugeError {
    #[error("gauge already added")]
    GaugeAlreadyAdded,

    #[error("invalid gauge type")]
    InvalidGaugeType,

    #[error("gauge not added")]
    GaugeNotAdded,

    #[error("gauge killed")]
    GaugeKilled,

    #[error("gauge not killed")]
    GaugeNotKilled,

    #[error("Currently in admin only period")]
    AdminOnlyPeriod,

    #[error("Your token lock expires too soon")]
    LockExpiresTooSoon,

    #[error("You used all your voting power")]
    AllVotingPowerUsed,

    #[error("Cannot vote so often")]
    VoteTooOften,

    #[error("Used too much power")]
    TooMuchPowerUsed,

    #[error("delay should exceed WEEK")]
    DelayTooShort,

    #[error("admin only period should be less than WEEK")]
    AdminOnlyPeriodTooLong,

    #[error("length mismatch")]
    LengthMismatch,

    #[error(transparent)]
    Unauthorized(#[from] AuthError),
}

impl GaugeError {
    pub fn category(&self) -> ErrorCategory {
        use GaugeError::*;
        match self {
            GaugeKilled | GaugeNotKilled | AdminOnlyPeriod | LockExpiresTooSoon | VoteTooOften => {
                ErrorCategory::Lifecycle
            }
            AllVotingPowerUsed | TooMuchPowerUsed => ErrorCategory::SlippageGuard,
            Unauthorized(_) => ErrorCategory::Authorization,
            _ => ErrorCategory::InputValidation,
        }
    }
}
