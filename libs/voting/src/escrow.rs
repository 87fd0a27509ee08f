//! Vote-escrow ledger
//!
//! Locking `amount` until `end` grants voting power
//! `amount / MAXTIME * (end - t)`, decaying linearly to zero at `end`.
//! Lock ends are rounded down to whole weeks, so the aggregate curve only
//! changes slope at week boundaries. Those changes are scheduled in
//! `slope_changes` and applied by a week-by-week sweep on every checkpoint;
//! once the curve is spent the sweep jumps straight to the checkpoint time.
//!
//! History is append-only: the global curve lives in `point_history` (one
//! entry per epoch) and each user has their own `user_point_history`. Past
//! balances are answered by binary search over those histories, and the sum
//! of all user balances equals the total supply at any timestamp.

use crate::errors::EscrowError;
use crate::events::{DepositEvent, DepositKind, SupplyEvent, WithdrawEvent};
use crate::power::VotingPowerSource;
use config::protocol::escrow::{MAXTIME, WEEK};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use tracing::debug;
use types::{Address, FixedPointError, Timestamp, Tx};

const MAXTIME_I: i128 = MAXTIME as i128;

/// Point on a voting-power curve: `bias - slope * (t - ts)`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Point {
    pub bias: i128,
    pub slope: i128,
    pub ts: Timestamp,
}

impl Point {
    /// Curve value at `t >= ts`, clamped at zero
    pub fn value_at(&self, t: Timestamp) -> i128 {
        let dt = t.saturating_sub(self.ts) as i128;
        self.bias
            .saturating_sub(self.slope.saturating_mul(dt))
            .max(0)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct LockedBalance {
    pub amount: i128,
    pub end: Timestamp,
}

/// Round a timestamp down to its week boundary
pub fn week_floor(t: Timestamp) -> Timestamp {
    t / WEEK * WEEK
}

#[derive(Debug, Clone)]
pub struct VotingEscrow {
    supply: i128,
    locked: HashMap<Address, LockedBalance>,
    epoch: usize,
    point_history: Vec<Point>,
    user_point_history: HashMap<Address, Vec<Point>>,
    slope_changes: BTreeMap<Timestamp, i128>,
}

impl VotingEscrow {
    pub fn new(deployed_at: Timestamp) -> Self {
        Self {
            supply: 0,
            locked: HashMap::new(),
            epoch: 0,
            point_history: vec![Point {
                ts: deployed_at,
                ..Point::default()
            }],
            user_point_history: HashMap::new(),
            slope_changes: BTreeMap::new(),
        }
    }

    // ----- lock operations -----

    /// Lock `value` until `unlock_time`, rounded down to a week
    pub fn create_lock(
        &mut self,
        tx: &Tx,
        value: u128,
        unlock_time: Timestamp,
    ) -> Result<(DepositEvent, SupplyEvent), EscrowError> {
        self.check_time(tx.timestamp)?;
        let now = tx.timestamp;
        let unlock_time = week_floor(unlock_time);
        let locked = self.locked(&tx.sender);

        if value == 0 {
            return Err(EscrowError::ZeroValue);
        }
        if locked.amount != 0 {
            return Err(EscrowError::WithdrawOldTokensFirst);
        }
        if unlock_time <= now {
            return Err(EscrowError::LockNotInFuture);
        }
        if unlock_time > now + MAXTIME {
            return Err(EscrowError::LockTooLong);
        }

        self.deposit_for_internal(
            tx.sender,
            value,
            unlock_time,
            locked,
            DepositKind::CreateLock,
            now,
        )
    }

    /// Add `value` to the sender's live lock without changing its end
    pub fn increase_lock_amount(
        &mut self,
        tx: &Tx,
        value: u128,
    ) -> Result<(DepositEvent, SupplyEvent), EscrowError> {
        self.check_time(tx.timestamp)?;
        let locked = self.locked(&tx.sender);
        Self::check_top_up(value, &locked, tx.timestamp)?;
        self.deposit_for_internal(
            tx.sender,
            value,
            0,
            locked,
            DepositKind::IncreaseLockAmount,
            tx.timestamp,
        )
    }

    /// Extend the sender's live lock to `unlock_time`, rounded down to a week
    pub fn increase_unlock_time(
        &mut self,
        tx: &Tx,
        unlock_time: Timestamp,
    ) -> Result<(DepositEvent, SupplyEvent), EscrowError> {
        self.check_time(tx.timestamp)?;
        let now = tx.timestamp;
        let locked = self.locked(&tx.sender);
        let unlock_time = week_floor(unlock_time);

        if locked.end <= now {
            return Err(EscrowError::LockExpired);
        }
        if locked.amount <= 0 {
            return Err(EscrowError::NothingLocked);
        }
        if unlock_time <= locked.end {
            return Err(EscrowError::CanOnlyIncreaseDuration);
        }
        if unlock_time > now + MAXTIME {
            return Err(EscrowError::LockTooLong);
        }

        self.deposit_for_internal(
            tx.sender,
            0,
            unlock_time,
            locked,
            DepositKind::IncreaseUnlockTime,
            now,
        )
    }

    /// Top up someone else's live lock
    pub fn deposit_for(
        &mut self,
        tx: &Tx,
        user: Address,
        value: u128,
    ) -> Result<(DepositEvent, SupplyEvent), EscrowError> {
        self.check_time(tx.timestamp)?;
        let locked = self.locked(&user);
        Self::check_top_up(value, &locked, tx.timestamp)?;
        self.deposit_for_internal(user, value, 0, locked, DepositKind::DepositFor, tx.timestamp)
    }

    /// Release an expired lock
    pub fn withdraw(&mut self, tx: &Tx) -> Result<(WithdrawEvent, SupplyEvent), EscrowError> {
        self.check_time(tx.timestamp)?;
        let now = tx.timestamp;
        let locked = self.locked(&tx.sender);
        if now < locked.end {
            return Err(EscrowError::LockNotExpired);
        }

        let value = locked.amount;
        let prev_supply = self.supply;
        self.supply = prev_supply - value;
        self.locked.insert(tx.sender, LockedBalance::default());
        self.checkpoint_internal(Some((tx.sender, locked, LockedBalance::default())), now);

        debug!(provider = ?tx.sender, value, "escrow withdraw");

        Ok((
            WithdrawEvent {
                provider: tx.sender,
                value: value as u128,
                ts: now,
            },
            SupplyEvent {
                prev_supply,
                supply: self.supply,
            },
        ))
    }

    /// Record a global checkpoint without touching any lock
    pub fn checkpoint(&mut self, tx: &Tx) -> Result<(), EscrowError> {
        self.check_time(tx.timestamp)?;
        self.checkpoint_internal(None, tx.timestamp);
        Ok(())
    }

    // ----- views -----

    /// Voting power of `user` at `t`
    pub fn balance_of(&self, user: &Address, t: Timestamp) -> i128 {
        let Some(history) = self.user_point_history.get(user) else {
            return 0;
        };
        match history.partition_point(|p| p.ts <= t) {
            0 => 0,
            idx => history[idx - 1].value_at(t),
        }
    }

    /// Voting power of `user` extrapolated from their latest point
    pub fn balance_of_now(&self, user: &Address, now: Timestamp) -> i128 {
        self.user_point_history
            .get(user)
            .and_then(|history| history.last())
            .map(|point| point.value_at(now))
            .unwrap_or(0)
    }

    /// Total voting power at `t`
    pub fn total_supply(&self, t: Timestamp) -> i128 {
        match self.point_history.partition_point(|p| p.ts <= t) {
            0 => 0,
            idx => self.supply_at(self.point_history[idx - 1], t),
        }
    }

    pub fn locked(&self, user: &Address) -> LockedBalance {
        self.locked.get(user).copied().unwrap_or_default()
    }

    pub fn locked_end(&self, user: &Address) -> Timestamp {
        self.locked(user).end
    }

    pub fn get_last_user_slope(&self, user: &Address) -> i128 {
        self.user_point_history
            .get(user)
            .and_then(|history| history.last())
            .map(|point| point.slope)
            .unwrap_or(0)
    }

    /// Number of points recorded for `user`
    pub fn user_point_epoch(&self, user: &Address) -> usize {
        self.user_point_history.get(user).map_or(0, Vec::len)
    }

    pub fn user_point_history(&self, user: &Address) -> &[Point] {
        self.user_point_history
            .get(user)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Total amount of locked tokens
    pub fn supply(&self) -> i128 {
        self.supply
    }

    pub fn epoch(&self) -> usize {
        self.epoch
    }

    pub fn point_history(&self) -> &[Point] {
        &self.point_history
    }

    pub fn slope_change(&self, t: Timestamp) -> i128 {
        self.slope_changes.get(&t).copied().unwrap_or(0)
    }

    // ----- internals -----

    fn check_time(&self, now: Timestamp) -> Result<(), EscrowError> {
        let last = self.point_history[self.epoch].ts;
        if now < last {
            return Err(EscrowError::StaleTimestamp { now, last });
        }
        Ok(())
    }

    fn check_top_up(value: u128, locked: &LockedBalance, now: Timestamp) -> Result<(), EscrowError> {
        if value == 0 {
            return Err(EscrowError::ZeroValue);
        }
        if locked.amount <= 0 {
            return Err(EscrowError::NoExistingLock);
        }
        if locked.end <= now {
            return Err(EscrowError::ExpiredLock);
        }
        Ok(())
    }

    fn deposit_for_internal(
        &mut self,
        user: Address,
        value: u128,
        unlock_time: Timestamp,
        old_locked: LockedBalance,
        kind: DepositKind,
        now: Timestamp,
    ) -> Result<(DepositEvent, SupplyEvent), EscrowError> {
        let overflow = || FixedPointError::Overflow { op: "lock amount" };
        let value_i = i128::try_from(value).map_err(|_| overflow())?;
        let supply = self.supply.checked_add(value_i).ok_or_else(overflow)?;

        let mut new_locked = old_locked;
        new_locked.amount = new_locked.amount.checked_add(value_i).ok_or_else(overflow)?;
        if unlock_time != 0 {
            new_locked.end = unlock_time;
        }

        let prev_supply = self.supply;
        self.supply = supply;
        self.locked.insert(user, new_locked);
        self.checkpoint_internal(Some((user, old_locked, new_locked)), now);

        debug!(
            provider = ?user,
            value,
            locktime = new_locked.end,
            kind = ?kind,
            "escrow deposit"
        );

        Ok((
            DepositEvent {
                provider: user,
                value,
                locktime: new_locked.end,
                kind,
                ts: now,
            },
            SupplyEvent {
                prev_supply,
                supply,
            },
        ))
    }

    /// Sweep the global curve up to `now`, then apply a user's lock change
    fn checkpoint_internal(
        &mut self,
        change: Option<(Address, LockedBalance, LockedBalance)>,
        now: Timestamp,
    ) {
        let mut u_old = Point::default();
        let mut u_new = Point::default();
        let mut old_dslope = 0i128;
        let mut new_dslope = 0i128;

        if let Some((_, old_locked, new_locked)) = change {
            if old_locked.end > now && old_locked.amount > 0 {
                u_old.slope = old_locked.amount / MAXTIME_I;
                u_old.bias = u_old.slope * (old_locked.end - now) as i128;
            }
            if new_locked.end > now && new_locked.amount > 0 {
                u_new.slope = new_locked.amount / MAXTIME_I;
                u_new.bias = u_new.slope * (new_locked.end - now) as i128;
            }

            old_dslope = self.slope_change(old_locked.end);
            if new_locked.end != 0 {
                new_dslope = if new_locked.end == old_locked.end {
                    old_dslope
                } else {
                    self.slope_change(new_locked.end)
                };
            }
        }

        let mut last_point = self.point_history[self.epoch];
        let mut last_checkpoint = last_point.ts;
        let mut t_i = week_floor(last_checkpoint);
        let mut epoch = self.epoch;

        loop {
            // Nothing left to apply: the curve is flat or spent until `now`
            let idle = (last_point.slope == 0 || last_point.bias == 0)
                && self
                    .slope_changes
                    .range(last_checkpoint.saturating_add(1)..=now)
                    .next()
                    .is_none();
            let next = t_i.saturating_add(WEEK);
            let mut d_slope = 0;
            if idle || next > now {
                t_i = now;
            } else {
                t_i = next;
                d_slope = self.slope_change(t_i);
            }
            let dt = (t_i - last_checkpoint) as i128;
            last_point.bias = last_point
                .bias
                .saturating_sub(last_point.slope.saturating_mul(dt));
            last_point.slope += d_slope;
            last_point.bias = last_point.bias.max(0);
            last_point.slope = last_point.slope.max(0);
            last_checkpoint = t_i;
            last_point.ts = t_i;
            epoch += 1;
            if t_i == now {
                break;
            }
            self.point_history.push(last_point);
        }
        self.epoch = epoch;

        if change.is_some() {
            last_point.slope = (last_point.slope + u_new.slope - u_old.slope).max(0);
            last_point.bias = (last_point.bias + u_new.bias - u_old.bias).max(0);
        }
        self.point_history.push(last_point);

        if let Some((user, old_locked, new_locked)) = change {
            if old_locked.end > now {
                // Cancel the old lock's scheduled slope drop
                old_dslope += u_old.slope;
                if new_locked.end == old_locked.end {
                    old_dslope -= u_new.slope;
                }
                self.slope_changes.insert(old_locked.end, old_dslope);
            }
            if new_locked.end > now && new_locked.end > old_locked.end {
                new_dslope -= u_new.slope;
                self.slope_changes.insert(new_locked.end, new_dslope);
            }

            u_new.ts = now;
            self.user_point_history.entry(user).or_default().push(u_new);
        }
    }

    /// Extrapolate a global point to `t`, applying scheduled slope changes
    ///
    /// Between scheduled changes the curve is linear, so only the weeks that
    /// carry a change are visited.
    fn supply_at(&self, point: Point, t: Timestamp) -> i128 {
        let mut last_point = point;
        for (&t_i, &d_slope) in self
            .slope_changes
            .range(last_point.ts.saturating_add(1)..=t)
        {
            last_point.bias -= last_point.slope * (t_i - last_point.ts) as i128;
            last_point.slope += d_slope;
            last_point.ts = t_i;
        }
        let dt = (t - last_point.ts) as i128;
        last_point.bias = last_point
            .bias
            .saturating_sub(last_point.slope.saturating_mul(dt));
        last_point.bias.max(0)
    }
}

impl VotingPowerSource for VotingEscrow {
    fn get_last_user_slope(&self, user: &Address) -> i128 {
        VotingEscrow::get_last_user_slope(self, user)
    }

    fn locked_end(&self, user: &Address) -> Timestamp {
        VotingEscrow::locked_end(self, user)
    }
}
