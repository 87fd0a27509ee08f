//! # Ballast Types - Shared Ledger Primitives
//!
//! ## Purpose
//!
//! Common vocabulary for the Ballast accounting engines (share vault, StableSwap
//! pools, vote-escrow and gauge voting). Every engine is a deterministic ledger
//! driven by a caller-supplied [`Tx`] context, so the types here cover:
//!
//! - **Identity**: [`Address`] accounts and the [`Roles`] table used for
//!   authorization checks.
//! - **Time**: [`Timestamp`] seconds supplied by the caller, never wall-clock.
//! - **Numbers**: 1e18 fixed-point amounts stored as `U256` with checked
//!   arithmetic ([`U256Ext`]) and exact conversion to and from
//!   `rust_decimal::Decimal` for configuration and reporting.
//! - **Errors**: [`FixedPointError`], [`AuthError`], [`ValidationError`] and the
//!   [`ErrorCategory`] classification shared by all engine error enums.

pub mod common;
pub mod context;

pub use common::errors::{AuthError, ErrorCategory, FixedPointError, ValidationError};
pub use common::fixed_point::{
    decimal_to_amount, amount_to_decimal, pow10, U256Ext, BPS_DENOMINATOR, WAD,
};
pub use common::identifiers::{account, parse_address, Address, Timestamp};
pub use context::{Roles, Tx};

/// 256-bit unsigned integer used for every pool and vault quantity
pub use ethers_core::types::U256;
