//! StableSwap pool ledger
//!
//! Holds coin balances, admin fee balances, the LP token ledger and the pool
//! parameters (amplification ramp, fees, kill switch). Every mutating call
//! validates and computes on local copies first and commits only when all
//! checks pass, so an error never leaves a partial update behind.
//!
//! Amounts passed in and out are in each coin's own decimals; the solvers work
//! on balances normalized to 1e18 through per-coin precision multipliers.

use crate::errors::StableSwapError;
use crate::events::{
    AddLiquidityEvent, AdminFeesEvent, CommitNewFeeEvent, NewFeeEvent, RampAEvent,
    RemoveLiquidityEvent, RemoveLiquidityImbalanceEvent, RemoveLiquidityOneEvent,
    StopRampAEvent, TokenExchangeEvent,
};
use crate::lp_token::LpToken;
use crate::stableswap_math::StableSwapMath;
use config::protocol::stableswap::{
    ADMIN_ACTIONS_DELAY, FEE_DENOMINATOR, KILL_DEADLINE_DT, MAX_A, MAX_ADMIN_FEE, MAX_A_CHANGE,
    MAX_COINS, MAX_FEE, MIN_COINS, MIN_RAMP_TIME, PRECISION_DECIMALS,
};
use config::PoolSettings;
use tracing::{debug, info};
use types::{pow10, Address, AuthError, Roles, Timestamp, Tx, U256Ext, U256, WAD};

/// Steps allowed when refining a `get_dx` estimate to the exact minimal input
const MAX_DX_REFINEMENT: usize = 32;

/// Curve-style StableSwap pool for two or three coins
#[derive(Debug, Clone)]
pub struct StableSwapPool {
    n_coins: usize,
    precision_mul: Vec<U256>,
    rates: Vec<U256>,
    native_coin: Option<usize>,
    owner: Address,

    balances: Vec<U256>,
    admin_balances: Vec<U256>,
    lp: LpToken,

    fee: U256,
    admin_fee: U256,
    future_fee: U256,
    future_admin_fee: U256,
    admin_actions_deadline: Timestamp,

    initial_a: U256,
    future_a: U256,
    initial_a_time: Timestamp,
    future_a_time: Timestamp,

    kill_deadline: Timestamp,
    is_killed: bool,
}

impl StableSwapPool {
    /// Deploy a pool at `deployed_at`; the kill window starts here
    pub fn new(
        settings: &PoolSettings,
        owner: Address,
        deployed_at: Timestamp,
    ) -> Result<Self, StableSwapError> {
        let n_coins = settings.coin_decimals.len();
        if !(MIN_COINS..=MAX_COINS).contains(&n_coins) {
            return Err(StableSwapError::InvalidConfig(format!(
                "{} coins, expected {} to {}",
                n_coins, MIN_COINS, MAX_COINS
            )));
        }
        if let Some(d) = settings
            .coin_decimals
            .iter()
            .find(|d| **d > PRECISION_DECIMALS)
        {
            return Err(StableSwapError::InvalidConfig(format!(
                "{} decimals exceeds {}",
                d, PRECISION_DECIMALS
            )));
        }
        if matches!(settings.native_coin, Some(i) if i >= n_coins) {
            return Err(StableSwapError::CoinOutOfRange {
                index: settings.native_coin.unwrap_or_default(),
            });
        }
        if settings.a == 0 || settings.a >= MAX_A {
            return Err(StableSwapError::FutureAOutOfRange);
        }
        if settings.fee > MAX_FEE {
            return Err(StableSwapError::FeeExceedsMaximum);
        }
        if settings.admin_fee > MAX_ADMIN_FEE {
            return Err(StableSwapError::AdminFeeExceedsMaximum);
        }
        let owner = Roles::non_zero(owner)?;

        let precision_mul: Vec<U256> = settings
            .coin_decimals
            .iter()
            .map(|d| pow10(PRECISION_DECIMALS - d))
            .collect();
        let rates = precision_mul.iter().map(|m| *m * WAD).collect();

        info!(
            "Deployed {}-coin StableSwap pool: A={}, fee={}, admin_fee={}",
            n_coins, settings.a, settings.fee, settings.admin_fee
        );

        Ok(Self {
            n_coins,
            precision_mul,
            rates,
            native_coin: settings.native_coin,
            owner,
            balances: vec![U256::zero(); n_coins],
            admin_balances: vec![U256::zero(); n_coins],
            lp: LpToken::default(),
            fee: U256::from(settings.fee),
            admin_fee: U256::from(settings.admin_fee),
            future_fee: U256::zero(),
            future_admin_fee: U256::zero(),
            admin_actions_deadline: 0,
            initial_a: U256::from(settings.a),
            future_a: U256::from(settings.a),
            initial_a_time: 0,
            future_a_time: 0,
            kill_deadline: deployed_at + KILL_DEADLINE_DT,
            is_killed: false,
        })
    }

    // ----- views -----

    pub fn n_coins(&self) -> usize {
        self.n_coins
    }

    pub fn owner(&self) -> Address {
        self.owner
    }

    pub fn balances(&self) -> &[U256] {
        &self.balances
    }

    pub fn admin_balances(&self) -> &[U256] {
        &self.admin_balances
    }

    pub fn total_supply(&self) -> U256 {
        self.lp.total_supply()
    }

    pub fn lp_balance_of(&self, owner: &Address) -> U256 {
        self.lp.balance_of(owner)
    }

    pub fn fee(&self) -> U256 {
        self.fee
    }

    pub fn admin_fee(&self) -> U256 {
        self.admin_fee
    }

    pub fn future_fee(&self) -> U256 {
        self.future_fee
    }

    pub fn future_admin_fee(&self) -> U256 {
        self.future_admin_fee
    }

    pub fn admin_actions_deadline(&self) -> Timestamp {
        self.admin_actions_deadline
    }

    pub fn future_a(&self) -> U256 {
        self.future_a
    }

    pub fn future_a_time(&self) -> Timestamp {
        self.future_a_time
    }

    pub fn is_killed(&self) -> bool {
        self.is_killed
    }

    pub fn kill_deadline(&self) -> Timestamp {
        self.kill_deadline
    }

    pub fn native_coin(&self) -> Option<usize> {
        self.native_coin
    }

    /// Amplification at `now`, linearly interpolated while a ramp is active
    pub fn a(&self, now: Timestamp) -> U256 {
        let t1 = self.future_a_time;
        let a1 = self.future_a;
        if now >= t1 {
            return a1;
        }

        let a0 = self.initial_a;
        let t0 = self.initial_a_time;
        if now <= t0 {
            return a0;
        }
        let elapsed = U256::from(now - t0);
        let span = U256::from(t1 - t0);
        if a1 > a0 {
            a0 + (a1 - a0) * elapsed / span
        } else {
            a0 - (a0 - a1) * elapsed / span
        }
    }

    /// LP token price in 1e18 units of the invariant
    pub fn get_virtual_price(&self, now: Timestamp) -> Result<U256, StableSwapError> {
        let supply = self.lp.total_supply();
        if supply.is_zero() {
            return Err(StableSwapError::ZeroTotalSupply);
        }
        let d = self.get_d_mem(&self.balances, self.a(now))?;
        Ok(d.mul_div(WAD, supply)?)
    }

    /// LP amount minted (`deposit`) or burned for `amounts`, ignoring fees
    ///
    /// An empty pool quotes the invariant of the seed deposit.
    pub fn calc_token_amount(
        &self,
        amounts: &[U256],
        deposit: bool,
        now: Timestamp,
    ) -> Result<U256, StableSwapError> {
        self.check_amounts(amounts)?;
        let amp = self.a(now);
        let d0 = self.get_d_mem(&self.balances, amp)?;

        let mut new_balances = self.balances.clone();
        for (balance, amount) in new_balances.iter_mut().zip(amounts) {
            *balance = if deposit {
                balance.try_add(*amount)?
            } else {
                balance.try_sub(*amount)?
            };
        }
        let d1 = self.get_d_mem(&new_balances, amp)?;

        let supply = self.lp.total_supply();
        if supply.is_zero() {
            return if deposit {
                Ok(d1)
            } else {
                Err(StableSwapError::ZeroTotalSupply)
            };
        }

        let diff = if deposit {
            d1.try_sub(d0)?
        } else {
            d0.try_sub(d1)?
        };
        Ok(diff.mul_div(supply, d0)?)
    }

    /// Output of coin `j` for `dx` of coin `i`, after the trading fee
    pub fn get_dy(
        &self,
        i: usize,
        j: usize,
        dx: U256,
        now: Timestamp,
    ) -> Result<U256, StableSwapError> {
        self.check_pair(i, j)?;
        let xp = self.xp_mem(&self.balances)?;

        let x = xp[i].try_add(dx.mul_div(self.rates[i], WAD)?)?;
        let y = StableSwapMath::get_y(i, j, x, &xp, self.a(now))?;
        let dy = xp[j]
            .try_sub(y)?
            .try_sub(U256::one())?
            .mul_div(WAD, self.rates[j])?;
        let fee = self.fee.mul_div(dy, U256::from(FEE_DENOMINATOR))?;
        Ok(dy.try_sub(fee)?)
    }

    /// Smallest input of coin `i` whose [`get_dy`](Self::get_dy) quote reaches `dy`
    ///
    /// Starts from the inverted-curve estimate and walks it by single units
    /// until it is the exact minimum, so `get_dy(get_dx(dy)) >= dy` always holds.
    pub fn get_dx(
        &self,
        i: usize,
        j: usize,
        dy: U256,
        max_dx: U256,
        now: Timestamp,
    ) -> Result<U256, StableSwapError> {
        self.check_pair(i, j)?;
        let fee_denominator = U256::from(FEE_DENOMINATOR);
        let dy_with_fee = dy.mul_div(fee_denominator, fee_denominator.try_sub(self.fee)?)?;
        if dy_with_fee >= self.balances[j] {
            return Err(StableSwapError::ExcessBalance);
        }

        let xp = self.xp_mem(&self.balances)?;
        let y = xp[j].try_sub(dy_with_fee.mul_div(self.rates[j], WAD)?)?;
        let x = StableSwapMath::get_y(j, i, y, &xp, self.a(now))?;
        let mut dx = x
            .try_sub(xp[i])?
            .mul_div(WAD, self.rates[i])?
            .try_add(U256::one())?;

        let covers = |amount: U256| {
            self.get_dy(i, j, amount, now)
                .map(|quote| quote >= dy)
                .unwrap_or(false)
        };

        let mut steps = 0;
        while !covers(dx) {
            if steps == MAX_DX_REFINEMENT {
                return Err(StableSwapError::DidNotConverge { solver: "get_dx" });
            }
            dx = dx.try_add(U256::one())?;
            steps += 1;
        }
        for _ in 0..MAX_DX_REFINEMENT {
            if dx.is_zero() || !covers(dx - U256::one()) {
                break;
            }
            dx -= U256::one();
        }

        if dx > max_dx {
            return Err(StableSwapError::ExceedsMaximumInput);
        }
        Ok(dx)
    }

    /// Payout and fee for burning `token_amount` LP tokens into coin `i`
    pub fn calc_withdraw_one_coin(
        &self,
        token_amount: U256,
        i: usize,
        now: Timestamp,
    ) -> Result<(U256, U256), StableSwapError> {
        self.check_index(i)?;
        let supply = self.lp.total_supply();
        if supply.is_zero() {
            return Err(StableSwapError::ZeroTotalSupply);
        }

        let amp = self.a(now);
        let fee = self.imbalance_fee_rate()?;
        let fee_denominator = U256::from(FEE_DENOMINATOR);
        let xp = self.xp_mem(&self.balances)?;

        let d0 = StableSwapMath::get_d(&xp, amp)?;
        let d1 = d0.try_sub(token_amount.mul_div(d0, supply)?)?;
        let new_y = StableSwapMath::get_y_d(amp, i, &xp, d1)?;

        let dy_0 = xp[i].try_sub(new_y)?.try_div(self.precision_mul[i])?;

        let mut xp_reduced = xp.clone();
        for (j, reduced) in xp_reduced.iter_mut().enumerate() {
            let scaled = xp[j].mul_div(d1, d0)?;
            let dx_expected = if j == i {
                scaled.try_sub(new_y)?
            } else {
                xp[j].try_sub(scaled)?
            };
            *reduced = reduced.try_sub(fee.mul_div(dx_expected, fee_denominator)?)?;
        }

        let dy = xp_reduced[i].try_sub(StableSwapMath::get_y_d(amp, i, &xp_reduced, d1)?)?;
        // Withdraw one unit less to absorb solver rounding
        let dy = dy.try_sub(U256::one())?.try_div(self.precision_mul[i])?;

        Ok((dy, dy_0.try_sub(dy)?))
    }

    // ----- liquidity -----

    /// Deposit coins and mint LP tokens
    ///
    /// `native_value` is the native-asset amount attached to the call; it must
    /// equal the native coin's amount, or zero for pools without one.
    pub fn add_liquidity(
        &mut self,
        tx: &Tx,
        amounts: &[U256],
        min_mint_amount: U256,
        native_value: U256,
    ) -> Result<AddLiquidityEvent, StableSwapError> {
        if self.is_killed {
            return Err(StableSwapError::Killed);
        }
        self.check_amounts(amounts)?;
        let expected_native = self.native_coin.map(|k| amounts[k]).unwrap_or_default();
        if native_value != expected_native {
            return Err(StableSwapError::InconsistentQuantity);
        }

        let amp = self.a(tx.timestamp);
        let old_balances = self.balances.clone();
        let token_supply = self.lp.total_supply();

        let d0 = if token_supply.is_zero() {
            U256::zero()
        } else {
            self.get_d_mem(&old_balances, amp)?
        };

        let mut new_balances = old_balances.clone();
        for (balance, amount) in new_balances.iter_mut().zip(amounts) {
            if token_supply.is_zero() && amount.is_zero() {
                return Err(StableSwapError::InitialDepositRequiresAllCoins);
            }
            *balance = balance.try_add(*amount)?;
        }

        let d1 = self.get_d_mem(&new_balances, amp)?;
        if d1 <= d0 {
            return Err(StableSwapError::InvariantNotIncreased);
        }

        let mut fees = vec![U256::zero(); self.n_coins];
        let mut admin_fees = vec![U256::zero(); self.n_coins];
        let mut committed = new_balances.clone();

        let mint_amount = if token_supply.is_zero() {
            d1
        } else {
            let fee = self.imbalance_fee_rate()?;
            let fee_denominator = U256::from(FEE_DENOMINATOR);
            for i in 0..self.n_coins {
                let ideal_balance = d1.mul_div(old_balances[i], d0)?;
                let difference = ideal_balance.abs_diff(new_balances[i]);
                fees[i] = fee.mul_div(difference, fee_denominator)?;
                admin_fees[i] = fees[i].mul_div(self.admin_fee, fee_denominator)?;
                committed[i] = new_balances[i].try_sub(admin_fees[i])?;
                new_balances[i] = new_balances[i].try_sub(fees[i])?;
            }
            let d2 = self.get_d_mem(&new_balances, amp)?;
            token_supply.mul_div(d2.try_sub(d0)?, d0)?
        };

        if mint_amount < min_mint_amount {
            return Err(StableSwapError::Slippage);
        }

        let admin_balances = Self::credit(&self.admin_balances, &admin_fees)?;
        self.lp.mint(tx.sender, mint_amount)?;
        self.balances = committed;
        self.admin_balances = admin_balances;

        debug!(
            provider = ?tx.sender,
            minted = %mint_amount,
            invariant = %d1,
            "add_liquidity"
        );

        Ok(AddLiquidityEvent {
            provider: tx.sender,
            token_amounts: amounts.to_vec(),
            fees,
            invariant: d1,
            token_supply: self.lp.total_supply(),
            minted: mint_amount,
        })
    }

    /// Burn LP tokens for a proportional share of every coin, without fees
    ///
    /// Still available while the pool is killed.
    pub fn remove_liquidity(
        &mut self,
        tx: &Tx,
        amount: U256,
        min_amounts: &[U256],
    ) -> Result<RemoveLiquidityEvent, StableSwapError> {
        self.check_amounts(min_amounts)?;
        let total_supply = self.lp.total_supply();
        if total_supply.is_zero() {
            return Err(StableSwapError::ZeroTotalSupply);
        }
        self.lp.ensure_burnable(&tx.sender, amount)?;

        let mut amounts = Vec::with_capacity(self.n_coins);
        let mut new_balances = self.balances.clone();
        for i in 0..self.n_coins {
            let value = self.balances[i].mul_div(amount, total_supply)?;
            if value < min_amounts[i] {
                return Err(StableSwapError::WithdrawalBelowMinimum);
            }
            new_balances[i] = new_balances[i].try_sub(value)?;
            amounts.push(value);
        }

        self.lp.burn(tx.sender, amount)?;
        self.balances = new_balances;

        debug!(provider = ?tx.sender, burned = %amount, "remove_liquidity");

        Ok(RemoveLiquidityEvent {
            provider: tx.sender,
            token_amounts: amounts,
            fees: vec![U256::zero(); self.n_coins],
            token_supply: self.lp.total_supply(),
        })
    }

    /// Withdraw exact coin amounts, burning at most `max_burn_amount` LP tokens
    pub fn remove_liquidity_imbalance(
        &mut self,
        tx: &Tx,
        amounts: &[U256],
        max_burn_amount: U256,
    ) -> Result<RemoveLiquidityImbalanceEvent, StableSwapError> {
        if self.is_killed {
            return Err(StableSwapError::Killed);
        }
        self.check_amounts(amounts)?;
        let token_supply = self.lp.total_supply();
        if token_supply.is_zero() {
            return Err(StableSwapError::ZeroTotalSupply);
        }

        let fee = self.imbalance_fee_rate()?;
        let fee_denominator = U256::from(FEE_DENOMINATOR);
        let amp = self.a(tx.timestamp);

        let old_balances = self.balances.clone();
        let mut new_balances = old_balances.clone();
        for (balance, amount) in new_balances.iter_mut().zip(amounts) {
            *balance = balance.try_sub(*amount)?;
        }
        let d0 = self.get_d_mem(&old_balances, amp)?;
        let d1 = self.get_d_mem(&new_balances, amp)?;

        let mut fees = vec![U256::zero(); self.n_coins];
        let mut admin_fees = vec![U256::zero(); self.n_coins];
        let mut committed = new_balances.clone();
        for i in 0..self.n_coins {
            let ideal_balance = d1.mul_div(old_balances[i], d0)?;
            let difference = ideal_balance.abs_diff(new_balances[i]);
            fees[i] = fee.mul_div(difference, fee_denominator)?;
            admin_fees[i] = fees[i].mul_div(self.admin_fee, fee_denominator)?;
            committed[i] = new_balances[i].try_sub(admin_fees[i])?;
            new_balances[i] = new_balances[i].try_sub(fees[i])?;
        }
        let d2 = self.get_d_mem(&new_balances, amp)?;

        let token_amount = d0.try_sub(d2)?.mul_div(token_supply, d0)?;
        if token_amount.is_zero() {
            return Err(StableSwapError::ZeroTokensBurned);
        }
        // Burn one extra unit to cover rounding
        let token_amount = token_amount.try_add(U256::one())?;
        if token_amount > max_burn_amount {
            return Err(StableSwapError::Slippage);
        }
        self.lp.ensure_burnable(&tx.sender, token_amount)?;

        let admin_balances = Self::credit(&self.admin_balances, &admin_fees)?;
        self.lp.burn(tx.sender, token_amount)?;
        self.balances = committed;
        self.admin_balances = admin_balances;

        debug!(
            provider = ?tx.sender,
            burned = %token_amount,
            "remove_liquidity_imbalance"
        );

        Ok(RemoveLiquidityImbalanceEvent {
            provider: tx.sender,
            token_amounts: amounts.to_vec(),
            fees,
            invariant: d1,
            token_supply: self.lp.total_supply(),
            burned: token_amount,
        })
    }

    /// Burn LP tokens for a single coin
    pub fn remove_liquidity_one_coin(
        &mut self,
        tx: &Tx,
        token_amount: U256,
        i: usize,
        min_amount: U256,
    ) -> Result<RemoveLiquidityOneEvent, StableSwapError> {
        if self.is_killed {
            return Err(StableSwapError::Killed);
        }
        let (dy, dy_fee) = self.calc_withdraw_one_coin(token_amount, i, tx.timestamp)?;
        if dy < min_amount {
            return Err(StableSwapError::NotEnoughCoinsRemoved);
        }
        self.lp.ensure_burnable(&tx.sender, token_amount)?;

        let admin_part = dy_fee.mul_div(self.admin_fee, U256::from(FEE_DENOMINATOR))?;
        let new_balance = self.balances[i].try_sub(dy.try_add(admin_part)?)?;
        let new_admin_balance = self.admin_balances[i].try_add(admin_part)?;

        self.lp.burn(tx.sender, token_amount)?;
        self.balances[i] = new_balance;
        self.admin_balances[i] = new_admin_balance;

        debug!(
            provider = ?tx.sender,
            coin = i,
            paid = %dy,
            fee = %dy_fee,
            "remove_liquidity_one_coin"
        );

        Ok(RemoveLiquidityOneEvent {
            provider: tx.sender,
            index: i,
            token_amount,
            coin_amount: dy,
            fee: dy_fee,
        })
    }

    // ----- trading -----

    /// Swap `dx` of coin `i` for at least `min_dy` of coin `j`
    pub fn exchange(
        &mut self,
        tx: &Tx,
        i: usize,
        j: usize,
        dx: U256,
        min_dy: U256,
        native_value: U256,
    ) -> Result<TokenExchangeEvent, StableSwapError> {
        if self.is_killed {
            return Err(StableSwapError::Killed);
        }
        self.check_pair(i, j)?;
        let expected_native = if self.native_coin == Some(i) {
            dx
        } else {
            U256::zero()
        };
        if native_value != expected_native {
            return Err(StableSwapError::InconsistentQuantity);
        }

        let old_balances = &self.balances;
        let xp = self.xp_mem(old_balances)?;
        let fee_denominator = U256::from(FEE_DENOMINATOR);

        let x = xp[i].try_add(dx.mul_div(self.rates[i], WAD)?)?;
        let y = StableSwapMath::get_y(i, j, x, &xp, self.a(tx.timestamp))?;

        let dy = xp[j].try_sub(y)?.try_sub(U256::one())?;
        let dy_fee = dy.mul_div(self.fee, fee_denominator)?;
        let dy = dy.try_sub(dy_fee)?.mul_div(WAD, self.rates[j])?;
        if dy < min_dy {
            return Err(StableSwapError::ExchangeBelowMinimum);
        }

        let dy_admin_fee = dy_fee
            .mul_div(self.admin_fee, fee_denominator)?
            .mul_div(WAD, self.rates[j])?;

        let new_i = old_balances[i].try_add(dx)?;
        let new_j = old_balances[j].try_sub(dy)?.try_sub(dy_admin_fee)?;
        let new_admin_j = self.admin_balances[j].try_add(dy_admin_fee)?;

        self.balances[i] = new_i;
        self.balances[j] = new_j;
        self.admin_balances[j] = new_admin_j;

        debug!(
            buyer = ?tx.sender,
            sold = %dx,
            bought = %dy,
            "exchange {} -> {}",
            i,
            j
        );

        Ok(TokenExchangeEvent {
            buyer: tx.sender,
            sold_id: i,
            tokens_sold: dx,
            bought_id: j,
            tokens_bought: dy,
            admin_fee: dy_admin_fee,
        })
    }

    /// Move LP tokens between accounts
    pub fn transfer_lp(
        &mut self,
        tx: &Tx,
        to: Address,
        amount: U256,
    ) -> Result<(), StableSwapError> {
        self.lp.transfer(tx.sender, to, amount)
    }

    // ----- admin -----

    /// Start a linear ramp of A towards `future_a`, ending at `future_time`
    pub fn ramp_a(
        &mut self,
        tx: &Tx,
        future_a: u64,
        future_time: Timestamp,
    ) -> Result<RampAEvent, StableSwapError> {
        self.only_owner(tx)?;
        let now = tx.timestamp;
        if now < self.initial_a_time + MIN_RAMP_TIME {
            return Err(StableSwapError::RampTooEarly);
        }
        if future_time < now + MIN_RAMP_TIME {
            return Err(StableSwapError::InsufficientTime);
        }

        let initial_a = self.a(now);
        if future_a == 0 || future_a >= MAX_A {
            return Err(StableSwapError::FutureAOutOfRange);
        }
        let future_a = U256::from(future_a);
        let max_change = U256::from(MAX_A_CHANGE);
        let within_bounds = if future_a >= initial_a {
            future_a <= initial_a * max_change
        } else {
            future_a * max_change >= initial_a
        };
        if !within_bounds {
            return Err(StableSwapError::FutureAChangeTooLarge);
        }

        self.initial_a = initial_a;
        self.future_a = future_a;
        self.initial_a_time = now;
        self.future_a_time = future_time;

        info!("Ramping A from {} to {} by {}", initial_a, future_a, future_time);

        Ok(RampAEvent {
            old_a: initial_a,
            new_a: future_a,
            initial_time: now,
            future_time,
        })
    }

    /// Freeze A at its current interpolated value
    pub fn stop_ramp_a(&mut self, tx: &Tx) -> Result<StopRampAEvent, StableSwapError> {
        self.only_owner(tx)?;
        let now = tx.timestamp;
        let current_a = self.a(now);

        self.initial_a = current_a;
        self.future_a = current_a;
        self.initial_a_time = now;
        self.future_a_time = now;

        info!("Stopped A ramp at {}", current_a);

        Ok(StopRampAEvent { a: current_a, t: now })
    }

    /// First phase of a fee change; applies after `ADMIN_ACTIONS_DELAY`
    pub fn commit_new_fee(
        &mut self,
        tx: &Tx,
        new_fee: u64,
        new_admin_fee: u64,
    ) -> Result<CommitNewFeeEvent, StableSwapError> {
        self.only_owner(tx)?;
        if self.admin_actions_deadline != 0 {
            return Err(StableSwapError::ActiveAction);
        }
        if new_fee > MAX_FEE {
            return Err(StableSwapError::FeeExceedsMaximum);
        }
        if new_admin_fee > MAX_ADMIN_FEE {
            return Err(StableSwapError::AdminFeeExceedsMaximum);
        }

        let deadline = tx.timestamp + ADMIN_ACTIONS_DELAY;
        self.admin_actions_deadline = deadline;
        self.future_fee = U256::from(new_fee);
        self.future_admin_fee = U256::from(new_admin_fee);

        info!("Committed new fee {} / admin fee {}, deadline {}", new_fee, new_admin_fee, deadline);

        Ok(CommitNewFeeEvent {
            deadline,
            fee: self.future_fee,
            admin_fee: self.future_admin_fee,
        })
    }

    pub fn apply_new_fee(&mut self, tx: &Tx) -> Result<NewFeeEvent, StableSwapError> {
        self.only_owner(tx)?;
        if tx.timestamp < self.admin_actions_deadline {
            return Err(StableSwapError::InsufficientTime);
        }
        if self.admin_actions_deadline == 0 {
            return Err(StableSwapError::NoActiveAction);
        }

        self.admin_actions_deadline = 0;
        self.fee = self.future_fee;
        self.admin_fee = self.future_admin_fee;

        info!("Applied new fee {} / admin fee {}", self.fee, self.admin_fee);

        Ok(NewFeeEvent {
            fee: self.fee,
            admin_fee: self.admin_fee,
        })
    }

    /// Cancel a committed fee change
    pub fn revert_new_parameters(&mut self, tx: &Tx) -> Result<(), StableSwapError> {
        self.only_owner(tx)?;
        self.admin_actions_deadline = 0;
        Ok(())
    }

    /// Drain accumulated admin fees to the owner
    pub fn withdraw_admin_fees(&mut self, tx: &Tx) -> Result<AdminFeesEvent, StableSwapError> {
        self.only_owner(tx)?;
        let amounts = std::mem::replace(&mut self.admin_balances, vec![U256::zero(); self.n_coins]);
        info!(recipient = ?tx.sender, "Withdrew admin fees");
        Ok(AdminFeesEvent {
            recipient: tx.sender,
            amounts,
        })
    }

    /// Return accumulated admin fees to the liquidity providers
    pub fn donate_admin_fees(&mut self, tx: &Tx) -> Result<(), StableSwapError> {
        self.only_owner(tx)?;
        let balances = Self::credit(&self.balances, &self.admin_balances)?;
        self.balances = balances;
        self.admin_balances = vec![U256::zero(); self.n_coins];
        info!("Donated admin fees to the pool");
        Ok(())
    }

    /// Halt trading and imbalanced deposits/withdrawals
    pub fn kill_me(&mut self, tx: &Tx) -> Result<(), StableSwapError> {
        self.only_owner(tx)?;
        if self.kill_deadline <= tx.timestamp {
            return Err(StableSwapError::ExceededDeadline);
        }
        self.is_killed = true;
        info!("Pool killed");
        Ok(())
    }

    pub fn unkill_me(&mut self, tx: &Tx) -> Result<(), StableSwapError> {
        self.only_owner(tx)?;
        self.is_killed = false;
        info!("Pool unkilled");
        Ok(())
    }

    pub fn transfer_ownership(
        &mut self,
        tx: &Tx,
        new_owner: Address,
    ) -> Result<(), StableSwapError> {
        self.only_owner(tx)?;
        self.owner = Roles::non_zero(new_owner)?;
        info!(new_owner = ?self.owner, "Ownership transferred");
        Ok(())
    }

    // ----- internals -----

    fn only_owner(&self, tx: &Tx) -> Result<(), StableSwapError> {
        if tx.sender != self.owner {
            return Err(AuthError::NotOwner.into());
        }
        Ok(())
    }

    fn check_amounts(&self, amounts: &[U256]) -> Result<(), StableSwapError> {
        if amounts.len() != self.n_coins {
            return Err(StableSwapError::WrongCoinCount {
                expected: self.n_coins,
                got: amounts.len(),
            });
        }
        Ok(())
    }

    fn check_index(&self, i: usize) -> Result<(), StableSwapError> {
        if i >= self.n_coins {
            return Err(StableSwapError::CoinOutOfRange { index: i });
        }
        Ok(())
    }

    fn check_pair(&self, i: usize, j: usize) -> Result<(), StableSwapError> {
        self.check_index(i)?;
        self.check_index(j)?;
        if i == j {
            return Err(StableSwapError::SameCoin);
        }
        Ok(())
    }

    /// Balances normalized to 1e18
    fn xp_mem(&self, balances: &[U256]) -> Result<Vec<U256>, StableSwapError> {
        balances
            .iter()
            .zip(&self.rates)
            .map(|(balance, rate)| Ok(rate.mul_div(*balance, WAD)?))
            .collect()
    }

    fn get_d_mem(&self, balances: &[U256], amp: U256) -> Result<U256, StableSwapError> {
        StableSwapMath::get_d(&self.xp_mem(balances)?, amp)
    }

    /// Per-coin fee charged on imbalance: `fee·n / (4·(n-1))`
    fn imbalance_fee_rate(&self) -> Result<U256, StableSwapError> {
        let n = U256::from(self.n_coins);
        Ok(self
            .fee
            .try_mul(n)?
            .try_div(U256::from(4 * (self.n_coins - 1)))?)
    }

    fn credit(balances: &[U256], amounts: &[U256]) -> Result<Vec<U256>, StableSwapError> {
        balances
            .iter()
            .zip(amounts)
            .map(|(balance, amount)| Ok(balance.try_add(*amount)?))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use types::account;

    const OWNER: u64 = 1;

    fn wad(n: u64) -> U256 {
        U256::from(n) * WAD
    }

    fn settings(decimals: Vec<u32>, fee: u64) -> PoolSettings {
        PoolSettings {
            coin_decimals: decimals,
            native_coin: None,
            a: 1000,
            fee,
            admin_fee: 5_000_000_000,
        }
    }

    fn tx(n: u64, t: Timestamp) -> Tx {
        Tx::new(account(n), t)
    }

    #[test]
    fn test_seed_mints_invariant() {
        let mut pool = StableSwapPool::new(&settings(vec![18, 18], 0), account(OWNER), 0).unwrap();
        let event = pool
            .add_liquidity(&tx(2, 10), &[wad(100), wad(100)], U256::zero(), U256::zero())
            .unwrap();
        assert_eq!(event.minted, wad(200));
        assert_eq!(pool.total_supply(), wad(200));
        assert_eq!(pool.lp_balance_of(&account(2)), wad(200));
    }

    #[test]
    fn test_seed_requires_all_coins() {
        let mut pool = StableSwapPool::new(&settings(vec![18, 18], 0), account(OWNER), 0).unwrap();
        let err = pool
            .add_liquidity(&tx(2, 10), &[wad(100), U256::zero()], U256::zero(), U256::zero())
            .unwrap_err();
        assert_eq!(err, StableSwapError::InitialDepositRequiresAllCoins);
        assert_eq!(err.to_string(), "Initial deposit requires all coins");
    }

    #[test]
    fn test_mixed_decimals_normalize() {
        let mut pool = StableSwapPool::new(&settings(vec![18, 6], 0), account(OWNER), 0).unwrap();
        let event = pool
            .add_liquidity(
                &tx(2, 10),
                &[wad(100), U256::from(100_000_000u64)],
                U256::zero(),
                U256::zero(),
            )
            .unwrap();
        assert_eq!(event.minted, wad(200));
    }

    #[test]
    fn test_a_interpolates_during_ramp() {
        let mut pool = StableSwapPool::new(&settings(vec![18, 18], 0), account(OWNER), 0).unwrap();
        let start = 2 * MIN_RAMP_TIME;
        pool.ramp_a(&tx(OWNER, start), 2000, start + 10 * MIN_RAMP_TIME)
            .unwrap();

        assert_eq!(pool.a(start), U256::from(1000));
        assert_eq!(pool.a(start + 5 * MIN_RAMP_TIME), U256::from(1500));
        assert_eq!(pool.a(start + 10 * MIN_RAMP_TIME), U256::from(2000));
        assert_eq!(pool.a(start + 20 * MIN_RAMP_TIME), U256::from(2000));
    }

    #[test]
    fn test_quote_before_ramp_start_uses_initial_a() {
        let mut pool = StableSwapPool::new(&settings(vec![18, 18], 0), account(OWNER), 0).unwrap();
        pool.add_liquidity(&tx(2, 10), &[wad(100), wad(100)], U256::zero(), U256::zero())
            .unwrap();
        let before_ramp = pool.get_dy(0, 1, wad(1), 10).unwrap();

        let start = 2 * MIN_RAMP_TIME;
        pool.ramp_a(&tx(OWNER, start), 2000, start + 10 * MIN_RAMP_TIME)
            .unwrap();

        let stale = start / 2;
        assert_eq!(pool.a(stale), U256::from(1000));
        assert_eq!(pool.get_dy(0, 1, wad(1), stale).unwrap(), before_ramp);
        assert!(pool.get_virtual_price(stale).is_ok());
    }

    #[test]
    fn test_owner_only_actions() {
        let mut pool = StableSwapPool::new(&settings(vec![18, 18], 0), account(OWNER), 0).unwrap();
        let err = pool.kill_me(&tx(2, 10)).unwrap_err();
        assert_eq!(err.to_string(), "Ownable: caller is not the owner");
        assert_eq!(err.category(), types::ErrorCategory::Authorization);
    }

    #[test]
    fn test_invalid_settings_rejected() {
        assert!(StableSwapPool::new(&settings(vec![18], 0), account(OWNER), 0).is_err());
        assert!(StableSwapPool::new(&settings(vec![18, 24], 0), account(OWNER), 0).is_err());
        assert_eq!(
            StableSwapPool::new(&settings(vec![18, 18], MAX_FEE + 1), account(OWNER), 0)
                .unwrap_err(),
            StableSwapError::FeeExceedsMaximum
        );
    }
}
