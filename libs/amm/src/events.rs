//! Structured results returned by pool operations
//!
//! Each mutating call returns one of these instead of emitting a log entry;
//! the fields are what an indexer needs to rebuild the pool history.

use serde::Serialize;
use types::{Address, Timestamp, U256};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AddLiquidityEvent {
    pub provider: Address,
    pub token_amounts: Vec<U256>,
    pub fees: Vec<U256>,
    pub invariant: U256,
    pub token_supply: U256,
    /// LP tokens minted to the provider
    pub minted: U256,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RemoveLiquidityEvent {
    pub provider: Address,
    pub token_amounts: Vec<U256>,
    pub fees: Vec<U256>,
    pub token_supply: U256,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RemoveLiquidityImbalanceEvent {
    pub provider: Address,
    pub token_amounts: Vec<U256>,
    pub fees: Vec<U256>,
    pub invariant: U256,
    pub token_supply: U256,
    /// LP tokens burned from the provider
    pub burned: U256,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RemoveLiquidityOneEvent {
    pub provider: Address,
    pub index: usize,
    pub token_amount: U256,
    pub coin_amount: U256,
    pub fee: U256,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TokenExchangeEvent {
    pub buyer: Address,
    pub sold_id: usize,
    pub tokens_sold: U256,
    pub bought_id: usize,
    pub tokens_bought: U256,
    /// Portion of the trading fee credited to admin balances, in coin `bought_id` units
    pub admin_fee: U256,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RampAEvent {
    pub old_a: U256,
    pub new_a: U256,
    pub initial_time: Timestamp,
    pub future_time: Timestamp,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StopRampAEvent {
    pub a: U256,
    pub t: Timestamp,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommitNewFeeEvent {
    pub deadline: Timestamp,
    pub fee: U256,
    pub admin_fee: U256,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewFeeEvent {
    pub fee: U256,
    pub admin_fee: U256,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AdminFeesEvent {
    pub recipient: Address,
    pub amounts: Vec<U256>,
}
