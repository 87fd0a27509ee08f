//! Vault operation results
//!
//! Token movements are reported here rather than performed.

use serde::Serialize;
use types::{Address, Timestamp, U256};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DepositEvent {
    pub sender: Address,
    pub amount: U256,
    pub shares: U256,
    pub last_deposited_time: Timestamp,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WithdrawEvent {
    pub sender: Address,
    /// Paid to the sender, net of the withdrawal fee
    pub amount: U256,
    pub shares: U256,
    /// Paid to the treasury
    pub fee: U256,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HarvestEvent {
    pub sender: Address,
    /// Paid to the treasury
    pub performance_fee: U256,
    /// Paid to the caller
    pub call_fee: U256,
}
