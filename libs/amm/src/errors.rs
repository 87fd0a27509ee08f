//! StableSwap error types
//!
//! Display strings are the rejection messages surfaced to callers.

use thiserror::Error;
use types::{AuthError, ErrorCategory, FixedPointError, ValidationError};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StableSwapError {
    #[error("Killed")]
    Killed,

    #[error("Initial deposit requires all coins")]
    InitialDepositRequiresAllCoins,

    #[error("D1 must be greater than D0")]
    InvariantNotIncreased,

    #[error("Slippage screwed you")]
    Slippage,

    #[error("Inconsistent quantity")]
    InconsistentQuantity,

    #[error("Withdrawal resulted in fewer coins than expected")]
    WithdrawalBelowMinimum,

    #[error("Exchange resulted in fewer coins than expected")]
    ExchangeBelowMinimum,

    #[error("Not enough coins removed")]
    NotEnoughCoinsRemoved,

    #[error("zero total supply")]
    ZeroTotalSupply,

    #[error("zero tokens burned")]
    ZeroTokensBurned,

    #[error("ERC20: burn amount exceeds balance")]
    BurnExceedsBalance,

    #[error("ERC20: transfer amount exceeds balance")]
    TransferExceedsBalance,

    #[error("Excess balance")]
    ExcessBalance,

    #[error("Exceeds maximum input")]
    ExceedsMaximumInput,

    #[error("same coin")]
    SameCoin,

    #[error("coin index {index} out of range")]
    CoinOutOfRange { index: usize },

    #[error("expected {expected} amounts, got {got}")]
    WrongCoinCount { expected: usize, got: usize },

    #[error("{solver} did not converge")]
    DidNotConverge { solver: &'static str },

    #[error("dev: too early")]
    RampTooEarly,

    #[error("dev: insufficient time")]
    InsufficientTime,

    #[error("_future_A must be between 0 and MAX_A")]
    FutureAOutOfRange,

    #[error("Illegal parameter _future_A")]
    FutureAChangeTooLarge,

    #[error("active action")]
    ActiveAction,

    #[error("no active action")]
    NoActiveAction,

    #[error("Fee exceeds maximum")]
    FeeExceedsMaximum,

    #[error("Admin fee exceeds maximum")]
    AdminFeeExceedsMaximum,

    #[error("Exceeded deadline")]
    ExceededDeadline,

    #[error("Invalid pool configuration: {0}")]
    InvalidConfig(String),

    #[error(transparent)]
    Unauthorized(#[from] AuthError),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Math(#[from] FixedPointError),
}

impl StableSwapError {
    pub fn category(&self) -> ErrorCategory {
        use StableSwapError::*;
        match self {
            Slippage | WithdrawalBelowMinimum | ExchangeBelowMinimum | NotEnoughCoinsRemoved
            | ExceedsMaximumInput => ErrorCategory::SlippageGuard,
            Killed | ExceededDeadline | RampTooEarly | InsufficientTime | ActiveAction
            | NoActiveAction => ErrorCategory::Lifecycle,
            Unauthorized(_) => ErrorCategory::Authorization,
            DidNotConverge { .. } | Math(_) | InvariantNotIncreased => ErrorCategory::Arithmetic,
            _ => ErrorCategory::InputValidation,
        }
    }
}
