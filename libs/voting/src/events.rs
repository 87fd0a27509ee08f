//! Escrow and gauge operation results

use crate::gauge::GaugeKey;
use serde::Serialize;
use types::{Address, Timestamp, U256};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DepositKind {
    DepositFor,
    CreateLock,
    IncreaseLockAmount,
    IncreaseUnlockTime,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DepositEvent {
    pub provider: Address,
    pub value: u128,
    pub locktime: Timestamp,
    pub kind: DepositKind,
    pub ts: Timestamp,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WithdrawEvent {
    pub provider: Address,
    pub value: u128,
    pub ts: Timestamp,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SupplyEvent {
    pub prev_supply: i128,
    pub supply: i128,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AddTypeEvent {
    pub name: String,
    pub type_id: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewTypeWeightEvent {
    pub type_id: usize,
    pub time: Timestamp,
    pub weight: U256,
    pub total_weight: U256,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewGaugeEvent {
    pub gauge: GaugeKey,
    pub gauge_type: usize,
    pub weight: U256,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewGaugeWeightEvent {
    pub gauge: GaugeKey,
    pub time: Timestamp,
    pub weight: U256,
    pub total_weight: U256,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VoteForGaugeEvent {
    pub time: Timestamp,
    pub user: Address,
    pub gauge: GaugeKey,
    /// Share of the user's power in basis points
    pub weight: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct KillGaugeEvent {
    pub gauge: GaugeKey,
    /// Voters whose power was returned
    pub refunded_voters: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AdminVoteEvent {
    pub time: Timestamp,
    pub gauge: GaugeKey,
    /// Weight added per second until `end`
    pub slope: U256,
    pub end: Timestamp,
}
