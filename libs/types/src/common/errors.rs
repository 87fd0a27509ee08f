//! Error types for fixed-point arithmetic, authorization and identifier validation
//!
//! Engine crates wrap these in their own `thiserror` enums and classify every
//! rejection with [`ErrorCategory`].

use serde::Serialize;
use thiserror::Error;

/// Broad classification of a rejected operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// Zero amounts, out-of-range fees or periods; rejected before any state change
    InputValidation,
    /// Minimum-output and maximum-burn checks; rejected after computing the result
    SlippageGuard,
    /// Caller lacks the owner/admin/operator role
    Authorization,
    /// Killed pool, killed gauge, admin-only window, expired locks
    Lifecycle,
    /// Overflow, underflow or a solver that failed to converge
    Arithmetic,
}

/// Errors that can occur during typed ID validation
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Address string is not 20 bytes of hex
    #[error("Invalid address '{input}': expected 0x-prefixed 20-byte hex")]
    InvalidAddress { input: String },

    /// Zero address where a real account is required
    #[error("Cannot be zero address")]
    ZeroAddress,
}

/// Errors that can occur during fixed-point arithmetic operations
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FixedPointError {
    /// Result exceeds the 256-bit range
    #[error("Overflow in {op}")]
    Overflow { op: &'static str },

    /// Subtraction went below zero
    #[error("Underflow in {op}")]
    Underflow { op: &'static str },

    /// Division by zero in fixed-point arithmetic
    #[error("Division by zero in fixed-point arithmetic")]
    DivisionByZero,

    /// Invalid decimal string format
    #[error("Invalid decimal string: '{input}' - expected numeric format")]
    InvalidDecimal { input: String },

    /// Negative decimal where only amounts are allowed
    #[error("Negative amount: {value}")]
    Negative { value: String },

    /// Value has more fractional digits than the token carries
    #[error("Precision loss: {value} cannot be represented with {decimals} decimals")]
    PrecisionLoss { value: String, decimals: u32 },
}

/// Role checks failed
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum AuthError {
    #[error("Ownable: caller is not the owner")]
    NotOwner,

    #[error("admin: wut?")]
    NotAdmin,

    #[error("Not operator")]
    NotOperator,
}
