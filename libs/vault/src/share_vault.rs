//! Share vault ledger
//!
//! Shares are minted against `balance_of()` measured before the deposit lands,
//! so existing holders are never diluted. Idle funds are staked right after
//! every deposit and harvest.
//!
//! Rounding: share issuance and redemption both floor, leaving dust in the
//! vault rather than overpaying a user. That dust stays behind after a full exit.

use crate::errors::VaultError;
use crate::events::{DepositEvent, HarvestEvent, WithdrawEvent};
use crate::yield_source::{StakingPool, YieldSource};
use config::protocol::vault::{
    MAX_CALL_FEE, MAX_PERFORMANCE_FEE, MAX_WITHDRAW_FEE, MAX_WITHDRAW_FEE_PERIOD,
};
use config::VaultSettings;
use serde::Serialize;
use std::collections::HashMap;
use tracing::{debug, info, warn};
use types::{Address, Roles, Timestamp, Tx, U256Ext, BPS_DENOMINATOR, U256, WAD};

/// Per-depositor position
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct VaultUserInfo {
    pub shares: U256,
    pub last_deposited_time: Timestamp,
    /// Underlying value of the position right after the user's last action
    pub cake_at_last_user_action: U256,
    pub last_user_action_time: Timestamp,
}

/// Auto-compounding vault over a [`YieldSource`]
#[derive(Debug, Clone)]
pub struct ShareVault<S: YieldSource = StakingPool> {
    roles: Roles,
    source: S,
    /// Tokens held by the vault and not staked
    idle: U256,
    total_shares: U256,
    users: HashMap<Address, VaultUserInfo>,

    performance_fee: u64,
    call_fee: u64,
    withdraw_fee: u64,
    withdraw_fee_period: u64,

    last_harvested_time: Timestamp,
    paused: bool,
}

impl<S: YieldSource> ShareVault<S> {
    pub fn new(settings: &VaultSettings, roles: Roles, source: S) -> Result<Self, VaultError> {
        Self::check_performance_fee(settings.performance_fee)?;
        Self::check_call_fee(settings.call_fee)?;
        Self::check_withdraw_fee(settings.withdraw_fee)?;
        Self::check_withdraw_fee_period(settings.withdraw_fee_period)?;
        Roles::non_zero(roles.treasury)?;

        info!(
            "Vault created: performance_fee={} call_fee={} withdraw_fee={} period={}s",
            settings.performance_fee,
            settings.call_fee,
            settings.withdraw_fee,
            settings.withdraw_fee_period
        );

        Ok(Self {
            roles,
            source,
            idle: U256::zero(),
            total_shares: U256::zero(),
            users: HashMap::new(),
            performance_fee: settings.performance_fee,
            call_fee: settings.call_fee,
            withdraw_fee: settings.withdraw_fee,
            withdraw_fee_period: settings.withdraw_fee_period,
            last_harvested_time: 0,
            paused: false,
        })
    }

    // ----- user operations -----

    /// Deposit `amount` and mint shares at the current price
    pub fn deposit(&mut self, tx: &Tx, amount: U256) -> Result<DepositEvent, VaultError> {
        self.when_not_paused()?;
        if amount.is_zero() {
            return Err(VaultError::NothingToDeposit);
        }

        let pool = self.balance_of();
        let shares = if self.total_shares.is_zero() {
            amount
        } else {
            amount.mul_div(self.total_shares, pool)?
        };

        let total_shares = self.total_shares.try_add(shares)?;
        let idle = self.idle.try_add(amount)?;
        let balance_after = idle.try_add(self.source.staked())?;

        let mut user = self.user_info(&tx.sender);
        user.shares = user.shares.try_add(shares)?;
        user.last_deposited_time = tx.timestamp;
        user.cake_at_last_user_action = user.shares.mul_div(balance_after, total_shares)?;
        user.last_user_action_time = tx.timestamp;

        self.source.stake(idle)?;
        self.idle = U256::zero();
        self.total_shares = total_shares;
        self.users.insert(tx.sender, user);

        debug!(sender = ?tx.sender, amount = %amount, shares = %shares, "deposit");

        Ok(DepositEvent {
            sender: tx.sender,
            amount,
            shares,
            last_deposited_time: tx.timestamp,
        })
    }

    /// Redeem `shares` for their share of the vault balance
    ///
    /// Allowed while paused. A fee goes to the treasury when the sender
    /// deposited within the last `withdraw_fee_period`.
    pub fn withdraw(&mut self, tx: &Tx, shares: U256) -> Result<WithdrawEvent, VaultError> {
        let mut user = self.user_info(&tx.sender);
        if shares.is_zero() {
            return Err(VaultError::NothingToWithdraw);
        }
        if shares > user.shares {
            return Err(VaultError::WithdrawExceedsBalance);
        }

        let mut current_amount = self.balance_of().mul_div(shares, self.total_shares)?;
        let total_shares = self.total_shares - shares;
        user.shares -= shares;

        let mut idle = self.idle;
        if idle < current_amount {
            let shortfall = current_amount - idle;
            let returned = self.source.unstake(shortfall)?;
            idle = idle.try_add(returned)?;
            if returned < shortfall {
                current_amount = idle;
            }
        }

        let fee = if tx.timestamp
            < user
                .last_deposited_time
                .saturating_add(self.withdraw_fee_period)
        {
            current_amount.mul_div(U256::from(self.withdraw_fee), U256::from(BPS_DENOMINATOR))?
        } else {
            U256::zero()
        };
        let payout = current_amount - fee;
        idle -= current_amount;

        user.cake_at_last_user_action = if user.shares.is_zero() {
            U256::zero()
        } else {
            user.shares
                .mul_div(idle.try_add(self.source.staked())?, total_shares)?
        };
        user.last_user_action_time = tx.timestamp;

        self.idle = idle;
        self.total_shares = total_shares;
        self.users.insert(tx.sender, user);

        debug!(
            sender = ?tx.sender,
            shares = %shares,
            amount = %payout,
            fee = %fee,
            "withdraw"
        );

        Ok(WithdrawEvent {
            sender: tx.sender,
            amount: payout,
            shares,
            fee,
        })
    }

    pub fn withdraw_all(&mut self, tx: &Tx) -> Result<WithdrawEvent, VaultError> {
        let shares = self.user_info(&tx.sender).shares;
        self.withdraw(tx, shares)
    }

    /// Claim source rewards, pay the performance and call fees, restake the rest
    pub fn harvest(&mut self, tx: &Tx) -> Result<HarvestEvent, VaultError> {
        self.when_not_paused()?;

        let reward = self.source.harvest()?;
        let idle = self.idle.try_add(reward)?;
        let bps = U256::from(BPS_DENOMINATOR);
        let performance_fee = idle.mul_div(U256::from(self.performance_fee), bps)?;
        let call_fee = idle.mul_div(U256::from(self.call_fee), bps)?;
        let remaining = idle.try_sub(performance_fee)?.try_sub(call_fee)?;

        self.source.stake(remaining)?;
        self.idle = U256::zero();
        self.last_harvested_time = tx.timestamp;

        debug!(
            caller = ?tx.sender,
            reward = %reward,
            performance_fee = %performance_fee,
            call_fee = %call_fee,
            "harvest"
        );

        Ok(HarvestEvent {
            sender: tx.sender,
            performance_fee,
            call_fee,
        })
    }

    // ----- views -----

    /// Idle plus staked funds
    pub fn balance_of(&self) -> U256 {
        self.idle.saturating_add(self.source.staked())
    }

    /// Funds held by the vault and not staked
    pub fn available(&self) -> U256 {
        self.idle
    }

    /// Underlying per 1e18 shares; 1e18 before the first deposit
    pub fn price_per_full_share(&self) -> Result<U256, VaultError> {
        if self.total_shares.is_zero() {
            return Ok(WAD);
        }
        Ok(self.balance_of().mul_div(WAD, self.total_shares)?)
    }

    /// Call fee a harvest would pay right now
    pub fn calculate_harvest_cake_rewards(&self) -> Result<U256, VaultError> {
        Ok(self
            .calculate_total_pending_cake_rewards()
            .mul_div(U256::from(self.call_fee), U256::from(BPS_DENOMINATOR))?)
    }

    /// Pending source rewards plus idle funds
    pub fn calculate_total_pending_cake_rewards(&self) -> U256 {
        self.source.pending_reward().saturating_add(self.idle)
    }

    pub fn user_info(&self, user: &Address) -> VaultUserInfo {
        self.users.get(user).copied().unwrap_or_default()
    }

    pub fn total_shares(&self) -> U256 {
        self.total_shares
    }

    pub fn performance_fee(&self) -> u64 {
        self.performance_fee
    }

    pub fn call_fee(&self) -> u64 {
        self.call_fee
    }

    pub fn withdraw_fee(&self) -> u64 {
        self.withdraw_fee
    }

    pub fn withdraw_fee_period(&self) -> u64 {
        self.withdraw_fee_period
    }

    pub fn last_harvested_time(&self) -> Timestamp {
        self.last_harvested_time
    }

    pub fn paused(&self) -> bool {
        self.paused
    }

    pub fn roles(&self) -> &Roles {
        &self.roles
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// Direct access to the venue, e.g. to accrue simulated rewards
    pub fn source_mut(&mut self) -> &mut S {
        &mut self.source
    }

    // ----- admin -----

    pub fn set_admin(&mut self, tx: &Tx, admin: Address) -> Result<(), VaultError> {
        self.roles.require_owner(tx)?;
        self.roles.admin = Roles::non_zero(admin)?;
        info!(admin = ?admin, "Vault admin changed");
        Ok(())
    }

    pub fn set_treasury(&mut self, tx: &Tx, treasury: Address) -> Result<(), VaultError> {
        self.roles.require_owner(tx)?;
        self.roles.treasury = Roles::non_zero(treasury)?;
        info!(treasury = ?treasury, "Vault treasury changed");
        Ok(())
    }

    pub fn set_performance_fee(&mut self, tx: &Tx, fee: u64) -> Result<(), VaultError> {
        self.roles.require_admin(tx)?;
        Self::check_performance_fee(fee)?;
        self.performance_fee = fee;
        info!("Performance fee set to {} bps", fee);
        Ok(())
    }

    pub fn set_call_fee(&mut self, tx: &Tx, fee: u64) -> Result<(), VaultError> {
        self.roles.require_admin(tx)?;
        Self::check_call_fee(fee)?;
        self.call_fee = fee;
        info!("Call fee set to {} bps", fee);
        Ok(())
    }

    pub fn set_withdraw_fee(&mut self, tx: &Tx, fee: u64) -> Result<(), VaultError> {
        self.roles.require_admin(tx)?;
        Self::check_withdraw_fee(fee)?;
        self.withdraw_fee = fee;
        info!("Withdraw fee set to {} bps", fee);
        Ok(())
    }

    pub fn set_withdraw_fee_period(&mut self, tx: &Tx, period: u64) -> Result<(), VaultError> {
        self.roles.require_admin(tx)?;
        Self::check_withdraw_fee_period(period)?;
        self.withdraw_fee_period = period;
        info!("Withdraw fee period set to {}s", period);
        Ok(())
    }

    /// Pull every staked token back into the vault, forfeiting pending rewards
    ///
    /// Shares are untouched; users keep withdrawing from the idle balance.
    pub fn emergency_withdraw(&mut self, tx: &Tx) -> Result<U256, VaultError> {
        self.roles.require_admin(tx)?;
        let returned = self.source.emergency_withdraw()?;
        self.idle = self.idle.try_add(returned)?;
        warn!(returned = %returned, "Emergency withdraw from yield source");
        Ok(returned)
    }

    /// Admin or operator; only the admin can unpause
    pub fn pause(&mut self, tx: &Tx) -> Result<(), VaultError> {
        self.roles
            .require_operator(tx)
            .or_else(|_| self.roles.require_admin(tx))?;
        self.when_not_paused()?;
        self.paused = true;
        info!("Vault paused");
        Ok(())
    }

    pub fn unpause(&mut self, tx: &Tx) -> Result<(), VaultError> {
        self.roles.require_admin(tx)?;
        if !self.paused {
            return Err(VaultError::NotPaused);
        }
        self.paused = false;
        info!("Vault unpaused");
        Ok(())
    }

    // ----- internals -----

    fn when_not_paused(&self) -> Result<(), VaultError> {
        if self.paused {
            return Err(VaultError::Paused);
        }
        Ok(())
    }

    fn check_performance_fee(fee: u64) -> Result<(), VaultError> {
        if fee > MAX_PERFORMANCE_FEE {
            warn!("Rejected performance fee {} bps", fee);
            return Err(VaultError::PerformanceFeeTooHigh);
        }
        Ok(())
    }

    fn check_call_fee(fee: u64) -> Result<(), VaultError> {
        if fee > MAX_CALL_FEE {
            warn!("Rejected call fee {} bps", fee);
            return Err(VaultError::CallFeeTooHigh);
        }
        Ok(())
    }

    fn check_withdraw_fee(fee: u64) -> Result<(), VaultError> {
        if fee > MAX_WITHDRAW_FEE {
            warn!("Rejected withdraw fee {} bps", fee);
            return Err(VaultError::WithdrawFeeTooHigh);
        }
        Ok(())
    }

    fn check_withdraw_fee_period(period: u64) -> Result<(), VaultError> {
        if period > MAX_WITHDRAW_FEE_PERIOD {
            warn!("Rejected withdraw fee period {}s", period);
            return Err(VaultError::WithdrawFeePeriodTooLong);
        }
        Ok(())
    }
}
