//! Per-call context and role table
//!
//! Every engine operation receives a [`Tx`] carrying the caller and the block
//! timestamp. Authorization is a pure comparison against a [`Roles`] value
//! owned by the engine, so there is no ambient global state.

use crate::common::errors::{AuthError, ValidationError};
use crate::common::identifiers::{Address, Timestamp};
use serde::{Deserialize, Serialize};

/// Caller identity and current timestamp for one operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Tx {
    pub sender: Address,
    pub timestamp: Timestamp,
}

impl Tx {
    pub fn new(sender: Address, timestamp: Timestamp) -> Self {
        Self { sender, timestamp }
    }

    /// Same caller at a different time
    pub fn at(&self, timestamp: Timestamp) -> Self {
        Self {
            sender: self.sender,
            timestamp,
        }
    }
}

/// Privileged accounts of an engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Roles {
    /// Can change roles and protocol parameters
    pub owner: Address,
    /// Day-to-day administration (fees, pause, emergency actions)
    pub admin: Address,
    /// Receives protocol fees
    pub treasury: Address,
    /// Keeper-style automation account
    pub operator: Address,
}

impl Roles {
    /// All roles held by a single account
    pub fn single(account: Address) -> Self {
        Self {
            owner: account,
            admin: account,
            treasury: account,
            operator: account,
        }
    }

    pub fn require_owner(&self, tx: &Tx) -> Result<(), AuthError> {
        if tx.sender == self.owner {
            Ok(())
        } else {
            Err(AuthError::NotOwner)
        }
    }

    pub fn require_admin(&self, tx: &Tx) -> Result<(), AuthError> {
        if tx.sender == self.admin {
            Ok(())
        } else {
            Err(AuthError::NotAdmin)
        }
    }

    pub fn require_operator(&self, tx: &Tx) -> Result<(), AuthError> {
        if tx.sender == self.operator {
            Ok(())
        } else {
            Err(AuthError::NotOperator)
        }
    }

    /// Reject the zero address for role assignments
    pub fn non_zero(address: Address) -> Result<Address, ValidationError> {
        if address.is_zero() {
            Err(ValidationError::ZeroAddress)
        } else {
            Ok(address)
        }
    }
}
