//! Account identifiers and timestamps
//!
//! Accounts are plain 20-byte addresses; the engines never derive or verify
//! them, they only compare them against the [`Roles`](crate::Roles) table and
//! key per-user ledgers by them.

use crate::common::errors::ValidationError;
pub use ethers_core::types::Address;

/// Seconds since the Unix epoch, as supplied by the caller (block time)
pub type Timestamp = u64;

/// Parse a `0x`-prefixed (or bare) 40-character hex address
pub fn parse_address(input: &str) -> Result<Address, ValidationError> {
    let trimmed = input.trim();
    let digits = trimmed.strip_prefix("0x").unwrap_or(trimmed);
    let bytes = hex::decode(digits).map_err(|_| ValidationError::InvalidAddress {
        input: input.to_string(),
    })?;
    if bytes.len() != 20 {
        return Err(ValidationError::InvalidAddress {
            input: input.to_string(),
        });
    }
    Ok(Address::from_slice(&bytes))
}

/// Deterministic account for simulations and tests: `0x00..00{n}`
pub fn account(n: u64) -> Address {
    Address::from_low_u64_be(n)
}
