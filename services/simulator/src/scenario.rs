//! Scenario files
//!
//! A scenario is JSON: a start time (engine deployment) and a list of steps,
//! each with a timestamp, a sender and an operation. Amounts are decimal
//! strings in token units and are converted with the token's decimals.
//!
//! ```json
//! {
//!   "start": 1700000000,
//!   "steps": [
//!     { "at": 1700000000, "sender": "0x0000000000000000000000000000000000000002",
//!       "op": "vault_deposit", "amount": "100" }
//!   ]
//! }
//! ```

use anyhow::{bail, Context, Result};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::path::Path;
use types::{Address, Timestamp};
use voting::GaugeKey;

#[derive(Debug, Clone, Deserialize)]
pub struct Scenario {
    /// Deployment time of every engine
    pub start: Timestamp,
    pub steps: Vec<Step>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Step {
    pub at: Timestamp,
    pub sender: Address,
    #[serde(flatten)]
    pub op: Op,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Op {
    VaultDeposit {
        amount: Decimal,
    },
    VaultWithdraw {
        shares: Decimal,
    },
    VaultWithdrawAll,
    VaultHarvest,
    /// Rewards earned by the vault's staking venue
    VaultAccrue {
        amount: Decimal,
    },
    VaultPause,
    VaultUnpause,

    AddLiquidity {
        pool: String,
        amounts: Vec<Decimal>,
        #[serde(default)]
        min_mint: Decimal,
    },
    RemoveLiquidity {
        pool: String,
        amount: Decimal,
    },
    RemoveLiquidityOneCoin {
        pool: String,
        amount: Decimal,
        i: usize,
        #[serde(default)]
        min_amount: Decimal,
    },
    Exchange {
        pool: String,
        i: usize,
        j: usize,
        dx: Decimal,
        #[serde(default)]
        min_dy: Decimal,
    },
    RampA {
        pool: String,
        future_a: u64,
        future_time: Timestamp,
    },
    KillPool {
        pool: String,
    },

    CreateLock {
        amount: Decimal,
        unlock_time: Timestamp,
    },
    IncreaseLockAmount {
        amount: Decimal,
    },
    IncreaseUnlockTime {
        unlock_time: Timestamp,
    },
    EscrowWithdraw,

    AddGauge {
        gauge: GaugeKey,
        gauge_type: usize,
        #[serde(default)]
        weight: u64,
    },
    Vote {
        gauge: GaugeKey,
        /// Basis points of the sender's voting power
        weight: u64,
    },
    KillGauge {
        gauge: GaugeKey,
    },
    GaugeRelativeWeight {
        gauge: GaugeKey,
    },
}

impl Op {
    pub fn name(&self) -> &'static str {
        match self {
            Op::VaultDeposit { .. } => "vault_deposit",
            Op::VaultWithdraw { .. } => "vault_withdraw",
            Op::VaultWithdrawAll => "vault_withdraw_all",
            Op::VaultHarvest => "vault_harvest",
            Op::VaultAccrue { .. } => "vault_accrue",
            Op::VaultPause => "vault_pause",
            Op::VaultUnpause => "vault_unpause",
            Op::AddLiquidity { .. } => "add_liquidity",
            Op::RemoveLiquidity { .. } => "remove_liquidity",
            Op::RemoveLiquidityOneCoin { .. } => "remove_liquidity_one_coin",
            Op::Exchange { .. } => "exchange",
            Op::RampA { .. } => "ramp_a",
            Op::KillPool { .. } => "kill_pool",
            Op::CreateLock { .. } => "create_lock",
            Op::IncreaseLockAmount { .. } => "increase_lock_amount",
            Op::IncreaseUnlockTime { .. } => "increase_unlock_time",
            Op::EscrowWithdraw => "escrow_withdraw",
            Op::AddGauge { .. } => "add_gauge",
            Op::Vote { .. } => "vote",
            Op::KillGauge { .. } => "kill_gauge",
            Op::GaugeRelativeWeight { .. } => "gauge_relative_weight",
        }
    }
}

impl Scenario {
    pub fn from_json(json: &str) -> Result<Self> {
        let scenario: Scenario =
            serde_json::from_str(json).context("Failed to parse scenario")?;
        scenario.validate()?;
        Ok(scenario)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read scenario {:?}", path))?;
        Self::from_json(&json)
    }

    /// Steps must not go back in time, nor start before deployment
    pub fn validate(&self) -> Result<()> {
        let mut last = self.start;
        for (index, step) in self.steps.iter().enumerate() {
            if step.at < last {
                bail!(
                    "step {} at {} precedes the previous time {}",
                    index,
                    step.at,
                    last
                );
            }
            last = step.at;
        }
        Ok(())
    }
}
