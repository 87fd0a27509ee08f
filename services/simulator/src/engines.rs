//! Engine set and step execution

use crate::scenario::{Op, Step};
use amm::{StableSwapError, StableSwapPool};
use anyhow::{Context, Result};
use config::EngineConfig;
use rust_decimal::Decimal;
use serde::Serialize;
use serde_json::{json, Value};
use std::collections::BTreeMap;
use thiserror::Error;
use tracing::{debug, info};
use types::{
    amount_to_decimal, decimal_to_amount, ErrorCategory, FixedPointError, Timestamp, Tx, U256,
};
use vault::{ShareVault, StakingPool, VaultError};
use voting::{EscrowError, GaugeController, GaugeError, VotingEscrow};

/// Vault token, LP token and escrowed token precision
const TOKEN_DECIMALS: u32 = 18;

#[derive(Debug, Error)]
pub enum StepError {
    #[error(transparent)]
    Vault(#[from] VaultError),

    #[error(transparent)]
    Pool(#[from] StableSwapError),

    #[error(transparent)]
    Escrow(#[from] EscrowError),

    #[error(transparent)]
    Gauge(#[from] GaugeError),

    #[error(transparent)]
    Amount(#[from] FixedPointError),

    #[error("unknown pool {0}")]
    UnknownPool(String),

    #[error("pool {pool} expects {expected} amounts, got {got}")]
    AmountCount {
        pool: String,
        expected: usize,
        got: usize,
    },

    #[error("failed to encode event: {0}")]
    Encode(#[from] serde_json::Error),
}

impl StepError {
    /// Engine classification; `None` for malformed steps
    pub fn category(&self) -> Option<ErrorCategory> {
        match self {
            StepError::Vault(e) => Some(e.category()),
            StepError::Pool(e) => Some(e.category()),
            StepError::Escrow(e) => Some(e.category()),
            StepError::Gauge(e) => Some(e.category()),
            StepError::Amount(_) => Some(ErrorCategory::Arithmetic),
            _ => None,
        }
    }
}

/// Outcome of one replayed step, printed as a JSON line
#[derive(Debug, Clone, Serialize)]
pub struct Report {
    pub step: usize,
    pub at: Timestamp,
    pub op: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub event: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<ErrorCategory>,
}

impl Report {
    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

fn emit<T: Serialize>(event: &T) -> Result<Value, StepError> {
    Ok(serde_json::to_value(event)?)
}

fn amount(value: Decimal) -> Result<U256, StepError> {
    Ok(decimal_to_amount(value, TOKEN_DECIMALS)?)
}

fn lock_amount(value: Decimal) -> Result<u128, StepError> {
    let amount = amount(value)?;
    if amount > U256::from(u128::MAX) {
        return Err(FixedPointError::Overflow { op: "lock amount" }.into());
    }
    Ok(amount.as_u128())
}

/// Every engine a scenario can touch
pub struct Engines {
    pub vault: ShareVault<StakingPool>,
    pub pools: BTreeMap<String, StableSwapPool>,
    pub escrow: VotingEscrow,
    pub gauges: GaugeController,
    pool_decimals: BTreeMap<String, Vec<u32>>,
}

impl Engines {
    /// Deploy every configured engine at `deployed_at`
    pub fn from_config(config: &EngineConfig, deployed_at: Timestamp) -> Result<Self> {
        let roles = config.resolve_roles()?;

        let vault = ShareVault::new(&config.vault, roles, StakingPool::new())
            .context("Failed to create share vault")?;

        let mut pools = BTreeMap::new();
        let mut pool_decimals = BTreeMap::new();
        for (name, settings) in &config.pools {
            let pool = StableSwapPool::new(settings, roles.owner, deployed_at)
                .with_context(|| format!("Failed to create pool {}", name))?;
            pools.insert(name.clone(), pool);
            pool_decimals.insert(name.clone(), settings.coin_decimals.clone());
        }

        let gauges = GaugeController::new(&config.voting, roles, deployed_at)
            .context("Failed to create gauge controller")?;

        info!(
            pools = pools.len(),
            gauge_types = gauges.n_gauge_types(),
            deployed_at,
            "Engines deployed"
        );

        Ok(Self {
            vault,
            pools,
            escrow: VotingEscrow::new(deployed_at),
            gauges,
            pool_decimals,
        })
    }

    /// Replay steps in order, reporting each one
    pub fn replay(&mut self, steps: &[Step]) -> Vec<Report> {
        steps
            .iter()
            .enumerate()
            .map(|(index, step)| self.run(index, step))
            .collect()
    }

    pub fn run(&mut self, index: usize, step: &Step) -> Report {
        let op = step.op.name();
        match self.apply(step) {
            Ok(event) => {
                debug!(step = index, op, "applied");
                Report {
                    step: index,
                    at: step.at,
                    op,
                    event: Some(event),
                    error: None,
                    category: None,
                }
            }
            Err(e) => {
                info!(step = index, op, error = %e, "rejected");
                Report {
                    step: index,
                    at: step.at,
                    op,
                    event: None,
                    error: Some(e.to_string()),
                    category: e.category(),
                }
            }
        }
    }

    /// Execute one step; a rejected step leaves every engine untouched
    pub fn apply(&mut self, step: &Step) -> Result<Value, StepError> {
        let tx = Tx::new(step.sender, step.at);

        match &step.op {
            Op::VaultDeposit { amount: value } => emit(&self.vault.deposit(&tx, amount(*value)?)?),
            Op::VaultWithdraw { shares } => emit(&self.vault.withdraw(&tx, amount(*shares)?)?),
            Op::VaultWithdrawAll => emit(&self.vault.withdraw_all(&tx)?),
            Op::VaultHarvest => emit(&self.vault.harvest(&tx)?),
            Op::VaultAccrue { amount: value } => {
                self.vault.source_mut().accrue(amount(*value)?)?;
                Ok(json!({ "pending": self.vault.calculate_total_pending_cake_rewards() }))
            }
            Op::VaultPause => {
                self.vault.pause(&tx)?;
                Ok(json!({ "paused": true }))
            }
            Op::VaultUnpause => {
                self.vault.unpause(&tx)?;
                Ok(json!({ "paused": false }))
            }

            Op::AddLiquidity {
                pool,
                amounts,
                min_mint,
            } => {
                let amounts = self.coin_amounts(pool, amounts)?;
                let min_mint = amount(*min_mint)?;
                let pool = self.pool_mut(pool)?;
                let native_value = pool
                    .native_coin()
                    .map(|i| amounts[i])
                    .unwrap_or_default();
                emit(&pool.add_liquidity(&tx, &amounts, min_mint, native_value)?)
            }
            Op::RemoveLiquidity {
                pool,
                amount: value,
            } => {
                let value = amount(*value)?;
                let pool = self.pool_mut(pool)?;
                let min_amounts = vec![U256::zero(); pool.n_coins()];
                emit(&pool.remove_liquidity(&tx, value, &min_amounts)?)
            }
            Op::RemoveLiquidityOneCoin {
                pool,
                amount: value,
                i,
                min_amount,
            } => {
                let min_amount = self.coin_amount(pool, *i, *min_amount)?;
                let value = amount(*value)?;
                emit(&self
                    .pool_mut(pool)?
                    .remove_liquidity_one_coin(&tx, value, *i, min_amount)?)
            }
            Op::Exchange {
                pool,
                i,
                j,
                dx,
                min_dy,
            } => {
                let dx = self.coin_amount(pool, *i, *dx)?;
                let min_dy = self.coin_amount(pool, *j, *min_dy)?;
                let pool = self.pool_mut(pool)?;
                let native_value = if pool.native_coin() == Some(*i) {
                    dx
                } else {
                    U256::zero()
                };
                let event = pool.exchange(&tx, *i, *j, dx, min_dy, native_value)?;
                // The swap is committed; a missing price must not reject the step
                let price = pool
                    .get_virtual_price(tx.timestamp)
                    .ok()
                    .and_then(|price| amount_to_decimal(price, TOKEN_DECIMALS).ok());
                Ok(json!({
                    "exchange": emit(&event)?,
                    "virtual_price": price,
                }))
            }
            Op::RampA {
                pool,
                future_a,
                future_time,
            } => emit(&self.pool_mut(pool)?.ramp_a(&tx, *future_a, *future_time)?),
            Op::KillPool { pool } => {
                self.pool_mut(pool)?.kill_me(&tx)?;
                Ok(json!({ "killed": pool }))
            }

            Op::CreateLock {
                amount: value,
                unlock_time,
            } => {
                let value = lock_amount(*value)?;
                let (deposit, supply) = self.escrow.create_lock(&tx, value, *unlock_time)?;
                Ok(json!({ "deposit": emit(&deposit)?, "supply": emit(&supply)? }))
            }
            Op::IncreaseLockAmount { amount: value } => {
                let value = lock_amount(*value)?;
                let (deposit, supply) = self.escrow.increase_lock_amount(&tx, value)?;
                Ok(json!({ "deposit": emit(&deposit)?, "supply": emit(&supply)? }))
            }
            Op::IncreaseUnlockTime { unlock_time } => {
                let (deposit, supply) = self.escrow.increase_unlock_time(&tx, *unlock_time)?;
                Ok(json!({ "deposit": emit(&deposit)?, "supply": emit(&supply)? }))
            }
            Op::EscrowWithdraw => {
                let (withdraw, supply) = self.escrow.withdraw(&tx)?;
                Ok(json!({ "withdraw": emit(&withdraw)?, "supply": emit(&supply)? }))
            }

            Op::AddGauge {
                gauge,
                gauge_type,
                weight,
            } => emit(&self
                .gauges
                .add_gauge(&tx, *gauge, *gauge_type, U256::from(*weight))?),
            Op::Vote { gauge, weight } => emit(&self.gauges.vote_for_gauge_weights(
                &tx,
                &self.escrow,
                *gauge,
                *weight,
            )?),
            Op::KillGauge { gauge } => emit(&self.gauges.kill_gauge(&tx, *gauge)?),
            Op::GaugeRelativeWeight { gauge } => {
                let weight = self.gauges.gauge_relative_weight_write(&tx, *gauge)?;
                Ok(json!({
                    "gauge": gauge,
                    "relative_weight": amount_to_decimal(weight, TOKEN_DECIMALS)?,
                }))
            }
        }
    }

    fn pool_mut(&mut self, name: &str) -> Result<&mut StableSwapPool, StepError> {
        self.pools
            .get_mut(name)
            .ok_or_else(|| StepError::UnknownPool(name.to_string()))
    }

    fn decimals(&self, pool: &str) -> Result<&[u32], StepError> {
        self.pool_decimals
            .get(pool)
            .map(Vec::as_slice)
            .ok_or_else(|| StepError::UnknownPool(pool.to_string()))
    }

    /// Convert a coin amount with that coin's decimals
    fn coin_amount(&self, pool: &str, i: usize, value: Decimal) -> Result<U256, StepError> {
        let decimals = self.decimals(pool)?;
        // Out-of-range indices are left for the pool to reject
        let d = decimals.get(i).copied().unwrap_or(TOKEN_DECIMALS);
        Ok(decimal_to_amount(value, d)?)
    }

    fn coin_amounts(&self, pool: &str, values: &[Decimal]) -> Result<Vec<U256>, StepError> {
        let decimals = self.decimals(pool)?;
        if values.len() != decimals.len() {
            return Err(StepError::AmountCount {
                pool: pool.to_string(),
                expected: decimals.len(),
                got: values.len(),
            });
        }
        values
            .iter()
            .zip(decimals)
            .map(|(value, d)| decimal_to_amount(*value, *d).map_err(StepError::from))
            .collect()
    }
}
