//! Gauge-weight controller
//!
//! Escrow holders spread their voting power over gauges. A vote of `w` basis
//! points contributes `slope * w / 10000` per second of remaining lock time,
//! so gauge weights decay exactly like the escrow curve and drop out when the
//! voter's lock ends.
//!
//! Three curves are tracked at week boundaries:
//!
//! - per gauge (`points_weight`, with scheduled slope drops in `changes_weight`)
//! - per gauge type (`points_sum` / `changes_sum`)
//! - overall (`points_total`), the type sums scaled by the type weights
//!
//! Curves are filled lazily: every write first sweeps the affected curve
//! forward week by week up to the next boundary, then edits the point for
//! that boundary. Votes therefore take effect from the next week.

use crate::errors::GaugeError;
use crate::escrow::week_floor;
use crate::events::{
    AddTypeEvent, AdminVoteEvent, KillGaugeEvent, NewGaugeEvent, NewGaugeWeightEvent,
    NewTypeWeightEvent, VoteForGaugeEvent,
};
use crate::power::VotingPowerSource;
use config::protocol::escrow::WEEK;
use config::protocol::gauge::{MAX_FILL_WEEKS, MAX_USER_POWER, MULTIPLIER};
use config::VotingSettings;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use tracing::{debug, info, warn};
use types::{Address, Roles, Timestamp, Tx, U256Ext, U256};

/// A gauge is identified by its address and the chain it pays out on
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct GaugeKey {
    pub address: Address,
    pub chain_id: u64,
}

impl GaugeKey {
    pub fn new(address: Address, chain_id: u64) -> Self {
        Self { address, chain_id }
    }
}

/// Weight curve point: `bias` at the boundary, falling by `slope` per second
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct WeightPoint {
    pub bias: U256,
    pub slope: U256,
}

/// A single vote's contribution to one gauge
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct VoteSlope {
    pub slope: U256,
    /// Basis points of the voter's power
    pub power: u64,
    pub end: Timestamp,
}

/// First week boundary strictly after `t`
fn next_week(t: Timestamp) -> Timestamp {
    week_floor(t.saturating_add(WEEK))
}

/// Sweep a decaying curve from `t` to the first boundary after `now`,
/// at most `MAX_FILL_WEEKS` weeks at a time
fn sweep_decay(
    points: &mut BTreeMap<Timestamp, WeightPoint>,
    changes: Option<&BTreeMap<Timestamp, U256>>,
    mut t: Timestamp,
    now: Timestamp,
) -> (U256, Timestamp) {
    let mut pt = points.get(&t).copied().unwrap_or_default();
    for _ in 0..MAX_FILL_WEEKS {
        if t > now {
            break;
        }
        t += WEEK;
        let d_bias = pt.slope.saturating_mul(U256::from(WEEK));
        if pt.bias > d_bias {
            pt.bias -= d_bias;
            let d_slope = changes
                .and_then(|c| c.get(&t))
                .copied()
                .unwrap_or_default();
            pt.slope = pt.slope.saturating_sub(d_slope);
        } else {
            pt = WeightPoint::default();
        }
        points.insert(t, pt);
    }
    (pt.bias, t)
}

/// `max(a + b, c) - c` without underflow
fn add_then_remove(a: U256, b: U256, c: U256) -> U256 {
    a.saturating_add(b).max(c) - c
}

#[derive(Debug, Clone)]
pub struct GaugeController {
    roles: Roles,
    weight_vote_delay: u64,
    admin_only_period: u64,

    type_names: Vec<String>,
    gauges: Vec<GaugeKey>,
    gauge_types: HashMap<GaugeKey, usize>,
    killed: HashSet<GaugeKey>,

    vote_user_slopes: HashMap<(Address, GaugeKey), VoteSlope>,
    vote_user_power: HashMap<Address, u64>,
    last_user_vote: HashMap<(Address, GaugeKey), Timestamp>,
    voters: HashMap<GaugeKey, BTreeSet<Address>>,
    admin_votes: HashMap<GaugeKey, VoteSlope>,

    points_weight: HashMap<GaugeKey, BTreeMap<Timestamp, WeightPoint>>,
    changes_weight: HashMap<GaugeKey, BTreeMap<Timestamp, U256>>,
    time_weight: HashMap<GaugeKey, Timestamp>,

    points_sum: Vec<BTreeMap<Timestamp, WeightPoint>>,
    changes_sum: Vec<BTreeMap<Timestamp, U256>>,
    time_sum: Vec<Timestamp>,

    points_total: BTreeMap<Timestamp, U256>,
    time_total: Timestamp,

    points_type_weight: Vec<BTreeMap<Timestamp, U256>>,
    time_type_weight: Vec<Timestamp>,
}

impl GaugeController {
    /// Create a controller and register the configured gauge types
    pub fn new(
        settings: &VotingSettings,
        roles: Roles,
        deployed_at: Timestamp,
    ) -> Result<Self, GaugeError> {
        Self::check_vote_delay(settings.weight_vote_delay)?;
        Self::check_admin_only_period(settings.admin_only_period)?;

        let mut controller = Self {
            roles,
            weight_vote_delay: settings.weight_vote_delay,
            admin_only_period: settings.admin_only_period,
            type_names: Vec::new(),
            gauges: Vec::new(),
            gauge_types: HashMap::new(),
            killed: HashSet::new(),
            vote_user_slopes: HashMap::new(),
            vote_user_power: HashMap::new(),
            last_user_vote: HashMap::new(),
            voters: HashMap::new(),
            admin_votes: HashMap::new(),
            points_weight: HashMap::new(),
            changes_weight: HashMap::new(),
            time_weight: HashMap::new(),
            points_sum: Vec::new(),
            changes_sum: Vec::new(),
            time_sum: Vec::new(),
            points_total: BTreeMap::new(),
            time_total: week_floor(deployed_at),
            points_type_weight: Vec::new(),
            time_type_weight: Vec::new(),
        };

        for gauge_type in &settings.gauge_types {
            controller.add_type_internal(
                gauge_type.name.clone(),
                U256::from(gauge_type.weight),
                deployed_at,
            );
        }

        Ok(controller)
    }

    // ----- admin: types and gauges -----

    pub fn add_type(
        &mut self,
        tx: &Tx,
        name: impl Into<String>,
        weight: U256,
    ) -> Result<AddTypeEvent, GaugeError> {
        self.roles.require_admin(tx)?;
        Ok(self.add_type_internal(name.into(), weight, tx.timestamp))
    }

    /// Register a gauge with an initial weight effective from next week
    pub fn add_gauge(
        &mut self,
        tx: &Tx,
        key: GaugeKey,
        gauge_type: usize,
        weight: U256,
    ) -> Result<NewGaugeEvent, GaugeError> {
        self.roles.require_admin(tx)?;
        if gauge_type >= self.type_names.len() {
            return Err(GaugeError::InvalidGaugeType);
        }
        if self.gauge_types.contains_key(&key) {
            return Err(GaugeError::GaugeAlreadyAdded);
        }

        let now = tx.timestamp;
        let next_time = next_week(now);
        self.gauges.push(key);
        self.gauge_types.insert(key, gauge_type);

        if !weight.is_zero() {
            let type_weight = self.fill_type_weight(gauge_type, now);
            let old_sum = self.fill_sum(gauge_type, now);
            let old_total = self.fill_total(now);

            self.points_sum[gauge_type]
                .entry(next_time)
                .or_default()
                .bias = old_sum.saturating_add(weight);
            self.time_sum[gauge_type] = next_time;
            self.points_total.insert(
                next_time,
                old_total.saturating_add(type_weight.saturating_mul(weight)),
            );
            self.time_total = next_time;
            self.points_weight
                .entry(key)
                .or_default()
                .entry(next_time)
                .or_default()
                .bias = weight;
        }
        if self.time_sum[gauge_type] == 0 {
            self.time_sum[gauge_type] = next_time;
        }
        self.time_weight.insert(key, next_time);

        info!(gauge = ?key, gauge_type, weight = %weight, "Gauge added");

        Ok(NewGaugeEvent {
            gauge: key,
            gauge_type,
            weight,
        })
    }

    pub fn change_type_weight(
        &mut self,
        tx: &Tx,
        type_id: usize,
        weight: U256,
    ) -> Result<NewTypeWeightEvent, GaugeError> {
        self.roles.require_admin(tx)?;
        if type_id >= self.type_names.len() {
            return Err(GaugeError::InvalidGaugeType);
        }
        Ok(self.change_type_weight_internal(type_id, weight, tx.timestamp))
    }

    /// Override a gauge's weight from next week; scheduled vote decay continues
    pub fn change_gauge_weight(
        &mut self,
        tx: &Tx,
        key: GaugeKey,
        weight: U256,
    ) -> Result<NewGaugeWeightEvent, GaugeError> {
        self.roles.require_admin(tx)?;
        let gauge_type = self.gauge_type_of(&key)?;
        if self.killed.contains(&key) {
            return Err(GaugeError::GaugeKilled);
        }

        let now = tx.timestamp;
        let old_gauge_weight = self.fill_weight(&key, now);
        let type_weight = self.fill_type_weight(gauge_type, now);
        let old_sum = self.fill_sum(gauge_type, now);
        let total_weight = self.fill_total(now);
        let next_time = next_week(now);

        self.points_weight
            .entry(key)
            .or_default()
            .entry(next_time)
            .or_default()
            .bias = weight;
        self.time_weight.insert(key, next_time);

        let new_sum = old_sum.saturating_add(weight).saturating_sub(old_gauge_weight);
        self.points_sum[gauge_type]
            .entry(next_time)
            .or_default()
            .bias = new_sum;
        self.time_sum[gauge_type] = next_time;

        let total_weight = total_weight
            .saturating_add(new_sum.saturating_mul(type_weight))
            .saturating_sub(old_sum.saturating_mul(type_weight));
        self.points_total.insert(next_time, total_weight);
        self.time_total = next_time;

        info!(gauge = ?key, weight = %weight, "Gauge weight changed");

        Ok(NewGaugeWeightEvent {
            gauge: key,
            time: now,
            weight,
            total_weight,
        })
    }

    /// Disable a gauge and hand its voters their power back
    ///
    /// The gauge's weight leaves its type sum and the total from next week on
    /// and its relative weight reads zero immediately. Voters may vote again
    /// elsewhere right away.
    pub fn kill_gauge(&mut self, tx: &Tx, key: GaugeKey) -> Result<KillGaugeEvent, GaugeError> {
        self.roles.require_admin(tx)?;
        let gauge_type = self.gauge_type_of(&key)?;
        if self.killed.contains(&key) {
            return Err(GaugeError::GaugeKilled);
        }

        let now = tx.timestamp;
        let next_time = next_week(now);
        self.fill_weight(&key, now);
        self.fill_total(now);

        let gauge_point = self
            .points_weight
            .get(&key)
            .and_then(|points| points.get(&next_time))
            .copied()
            .unwrap_or_default();
        let sum_point = self.points_sum[gauge_type].entry(next_time).or_default();
        sum_point.bias = sum_point.bias.saturating_sub(gauge_point.bias);
        sum_point.slope = sum_point.slope.saturating_sub(gauge_point.slope);

        if let Some(changes) = self.changes_weight.remove(&key) {
            let type_changes = &mut self.changes_sum[gauge_type];
            for (t, d_slope) in changes.range(next_time + 1..) {
                if let Some(scheduled) = type_changes.get_mut(t) {
                    *scheduled = scheduled.saturating_sub(*d_slope);
                }
            }
        }
        self.points_weight
            .entry(key)
            .or_default()
            .insert(next_time, WeightPoint::default());
        self.time_weight.insert(key, next_time);

        let voters = self.voters.remove(&key).unwrap_or_default();
        for voter in &voters {
            if let Some(vote) = self.vote_user_slopes.remove(&(*voter, key)) {
                let power = self.vote_user_power.entry(*voter).or_default();
                *power = power.saturating_sub(vote.power);
            }
            self.last_user_vote.remove(&(*voter, key));
        }
        self.admin_votes.remove(&key);
        self.killed.insert(key);
        self.fill_total(now);

        warn!(gauge = ?key, voters = voters.len(), "Gauge killed");

        Ok(KillGaugeEvent {
            gauge: key,
            refunded_voters: voters.len(),
        })
    }

    /// Re-enable voting on a killed gauge; it restarts from zero weight
    pub fn unkill_gauge(&mut self, tx: &Tx, key: GaugeKey) -> Result<(), GaugeError> {
        self.roles.require_admin(tx)?;
        self.gauge_type_of(&key)?;
        if !self.killed.remove(&key) {
            return Err(GaugeError::GaugeNotKilled);
        }
        info!(gauge = ?key, "Gauge unkilled");
        Ok(())
    }

    pub fn set_weight_vote_delay(&mut self, tx: &Tx, delay: u64) -> Result<(), GaugeError> {
        self.roles.require_admin(tx)?;
        Self::check_vote_delay(delay)?;
        self.weight_vote_delay = delay;
        info!("Weight vote delay set to {}s", delay);
        Ok(())
    }

    pub fn set_admin_only_period(&mut self, tx: &Tx, period: u64) -> Result<(), GaugeError> {
        self.roles.require_admin(tx)?;
        Self::check_admin_only_period(period)?;
        self.admin_only_period = period;
        info!("Admin only period set to {}s", period);
        Ok(())
    }

    // ----- voting -----

    /// Allocate `user_weight` basis points of the sender's power to `key`
    ///
    /// A weight of zero withdraws an earlier vote.
    pub fn vote_for_gauge_weights(
        &mut self,
        tx: &Tx,
        source: &impl VotingPowerSource,
        key: GaugeKey,
        user_weight: u64,
    ) -> Result<VoteForGaugeEvent, GaugeError> {
        let now = tx.timestamp;
        let user = tx.sender;
        let gauge_type = self.gauge_type_of(&key)?;
        if self.killed.contains(&key) {
            return Err(GaugeError::GaugeKilled);
        }

        let next_time = next_week(now);
        if self.admin_only_period > 0 && next_time - now <= self.admin_only_period {
            return Err(GaugeError::AdminOnlyPeriod);
        }

        let slope = source.get_last_user_slope(&user).max(0) as u128;
        let lock_end = source.locked_end(&user);
        if lock_end <= next_time {
            return Err(GaugeError::LockExpiresTooSoon);
        }
        if user_weight > MAX_USER_POWER {
            return Err(GaugeError::AllVotingPowerUsed);
        }
        if let Some(last) = self.last_user_vote.get(&(user, key)) {
            if now < last.saturating_add(self.weight_vote_delay) {
                return Err(GaugeError::VoteTooOften);
            }
        }

        let old_slope = self
            .vote_user_slopes
            .get(&(user, key))
            .copied()
            .unwrap_or_default();
        let new_slope = VoteSlope {
            slope: U256::from(slope).saturating_mul(U256::from(user_weight))
                / U256::from(MAX_USER_POWER),
            power: user_weight,
            end: lock_end,
        };

        let power_used = self.vote_user_power(&user) + new_slope.power - old_slope.power;
        if power_used > MAX_USER_POWER {
            return Err(GaugeError::TooMuchPowerUsed);
        }

        self.apply_vote(key, gauge_type, old_slope, new_slope, now);

        self.vote_user_power.insert(user, power_used);
        if user_weight == 0 {
            self.vote_user_slopes.remove(&(user, key));
            if let Some(voters) = self.voters.get_mut(&key) {
                voters.remove(&user);
            }
        } else {
            self.vote_user_slopes.insert((user, key), new_slope);
            self.voters.entry(key).or_default().insert(user);
        }
        self.last_user_vote.insert((user, key), now);

        debug!(user = ?user, gauge = ?key, weight = user_weight, "vote");

        Ok(VoteForGaugeEvent {
            time: now,
            user,
            gauge: key,
            weight: user_weight,
        })
    }

    /// Apply several votes; either all of them land or none does
    pub fn vote_for_gauge_weights_bulk(
        &mut self,
        tx: &Tx,
        source: &impl VotingPowerSource,
        keys: &[GaugeKey],
        weights: &[u64],
    ) -> Result<Vec<VoteForGaugeEvent>, GaugeError> {
        if keys.len() != weights.len() {
            return Err(GaugeError::LengthMismatch);
        }

        let mut staged = self.clone();
        let events = keys
            .iter()
            .zip(weights)
            .map(|(key, weight)| staged.vote_for_gauge_weights(tx, source, *key, *weight))
            .collect::<Result<Vec<_>, _>>()?;
        *self = staged;
        Ok(events)
    }

    /// Admin vote adding `slope` weight per second of time left until `end`
    ///
    /// Independent of any escrow lock: no vote delay, admin-only window or
    /// power cap applies. A zero slope withdraws the admin vote.
    pub fn vote_from_admin(
        &mut self,
        tx: &Tx,
        key: GaugeKey,
        slope: U256,
        end: Timestamp,
    ) -> Result<AdminVoteEvent, GaugeError> {
        self.roles.require_admin(tx)?;
        let gauge_type = self.gauge_type_of(&key)?;
        if self.killed.contains(&key) {
            return Err(GaugeError::GaugeKilled);
        }

        let now = tx.timestamp;
        let end = week_floor(end);
        if !slope.is_zero() && end <= next_week(now) {
            return Err(GaugeError::LockExpiresTooSoon);
        }

        let old_slope = self.admin_votes.get(&key).copied().unwrap_or_default();
        let new_slope = VoteSlope {
            slope,
            power: 0,
            end: if slope.is_zero() { 0 } else { end },
        };
        self.apply_vote(key, gauge_type, old_slope, new_slope, now);

        if slope.is_zero() {
            self.admin_votes.remove(&key);
        } else {
            self.admin_votes.insert(key, new_slope);
        }

        info!(gauge = ?key, slope = %slope, end, "Admin vote");

        Ok(AdminVoteEvent {
            time: now,
            gauge: key,
            slope,
            end: new_slope.end,
        })
    }

    // ----- checkpoints -----

    /// Fill the total and every type curve up to next week
    pub fn checkpoint(&mut self, tx: &Tx) {
        self.fill_total(tx.timestamp);
    }

    pub fn checkpoint_gauge(&mut self, tx: &Tx, key: GaugeKey) -> Result<(), GaugeError> {
        self.gauge_type_of(&key)?;
        self.fill_weight(&key, tx.timestamp);
        self.fill_total(tx.timestamp);
        Ok(())
    }

    /// Checkpoint a gauge, then read its relative weight at `tx.timestamp`
    pub fn gauge_relative_weight_write(
        &mut self,
        tx: &Tx,
        key: GaugeKey,
    ) -> Result<U256, GaugeError> {
        self.checkpoint_gauge(tx, key)?;
        Ok(self.gauge_relative_weight(&key, tx.timestamp))
    }

    // ----- views -----

    /// Share of the total weight held by `key` during the week containing `t`,
    /// scaled to 1e18; zero for killed or unknown gauges
    pub fn gauge_relative_weight(&self, key: &GaugeKey, t: Timestamp) -> U256 {
        if self.killed.contains(key) {
            return U256::zero();
        }
        let Some(&gauge_type) = self.gauge_types.get(key) else {
            return U256::zero();
        };

        let t = week_floor(t);
        let total_weight = self.points_total(t);
        if total_weight.is_zero() {
            return U256::zero();
        }

        let type_weight = self.type_weight_at(gauge_type, t);
        let gauge_weight = self.points_weight(key, t).bias;
        type_weight
            .saturating_mul(gauge_weight)
            .mul_div(U256::from(MULTIPLIER), total_weight)
            .unwrap_or_default()
    }

    /// Gauge weight at the latest checkpoint
    pub fn get_gauge_weight(&self, key: &GaugeKey) -> U256 {
        let t = self.time_weight.get(key).copied().unwrap_or_default();
        self.points_weight(key, t).bias
    }

    pub fn get_total_weight(&self) -> U256 {
        self.points_total(self.time_total)
    }

    pub fn get_type_weight(&self, type_id: usize) -> U256 {
        self.time_type_weight
            .get(type_id)
            .map(|t| self.type_weight_at(type_id, *t))
            .unwrap_or_default()
    }

    pub fn get_weights_sum_per_type(&self, type_id: usize) -> U256 {
        self.time_sum
            .get(type_id)
            .and_then(|t| self.points_sum[type_id].get(t))
            .map(|pt| pt.bias)
            .unwrap_or_default()
    }

    /// Basis points of voting power `user` has allocated
    pub fn vote_user_power(&self, user: &Address) -> u64 {
        self.vote_user_power.get(user).copied().unwrap_or_default()
    }

    pub fn vote_user_slope(&self, user: &Address, key: &GaugeKey) -> VoteSlope {
        self.vote_user_slopes
            .get(&(*user, *key))
            .copied()
            .unwrap_or_default()
    }

    /// Timestamp of the user's last vote on `key`, zero if none
    pub fn last_user_vote(&self, user: &Address, key: &GaugeKey) -> Timestamp {
        self.last_user_vote
            .get(&(*user, *key))
            .copied()
            .unwrap_or_default()
    }

    pub fn points_weight(&self, key: &GaugeKey, t: Timestamp) -> WeightPoint {
        self.points_weight
            .get(key)
            .and_then(|points| points.get(&t))
            .copied()
            .unwrap_or_default()
    }

    pub fn points_total(&self, t: Timestamp) -> U256 {
        self.points_total.get(&t).copied().unwrap_or_default()
    }

    pub fn gauge_type(&self, key: &GaugeKey) -> Option<usize> {
        self.gauge_types.get(key).copied()
    }

    pub fn gauges(&self) -> &[GaugeKey] {
        &self.gauges
    }

    pub fn n_gauge_types(&self) -> usize {
        self.type_names.len()
    }

    pub fn type_name(&self, type_id: usize) -> Option<&str> {
        self.type_names.get(type_id).map(String::as_str)
    }

    pub fn is_killed(&self, key: &GaugeKey) -> bool {
        self.killed.contains(key)
    }

    pub fn weight_vote_delay(&self) -> u64 {
        self.weight_vote_delay
    }

    pub fn admin_only_period(&self) -> u64 {
        self.admin_only_period
    }

    // ----- internals -----

    fn gauge_type_of(&self, key: &GaugeKey) -> Result<usize, GaugeError> {
        self.gauge_types
            .get(key)
            .copied()
            .ok_or(GaugeError::GaugeNotAdded)
    }

    fn check_vote_delay(delay: u64) -> Result<(), GaugeError> {
        if delay < WEEK {
            warn!("Rejected weight vote delay {}s", delay);
            return Err(GaugeError::DelayTooShort);
        }
        Ok(())
    }

    fn check_admin_only_period(period: u64) -> Result<(), GaugeError> {
        if period >= WEEK {
            warn!("Rejected admin only period {}s", period);
            return Err(GaugeError::AdminOnlyPeriodTooLong);
        }
        Ok(())
    }

    fn type_weight_at(&self, type_id: usize, t: Timestamp) -> U256 {
        self.points_type_weight
            .get(type_id)
            .and_then(|points| points.get(&t))
            .copied()
            .unwrap_or_default()
    }

    fn add_type_internal(&mut self, name: String, weight: U256, now: Timestamp) -> AddTypeEvent {
        let type_id = self.type_names.len();
        self.type_names.push(name.clone());
        self.points_sum.push(BTreeMap::new());
        self.changes_sum.push(BTreeMap::new());
        self.time_sum.push(0);
        self.points_type_weight.push(BTreeMap::new());
        self.time_type_weight.push(0);

        if !weight.is_zero() {
            self.change_type_weight_internal(type_id, weight, now);
        }

        info!(type_id, name = %name, "Gauge type added");
        AddTypeEvent { name, type_id }
    }

    fn change_type_weight_internal(
        &mut self,
        type_id: usize,
        weight: U256,
        now: Timestamp,
    ) -> NewTypeWeightEvent {
        let old_weight = self.fill_type_weight(type_id, now);
        let old_sum = self.fill_sum(type_id, now);
        let total_weight = self.fill_total(now);
        let next_time = next_week(now);

        let total_weight = total_weight
            .saturating_add(old_sum.saturating_mul(weight))
            .saturating_sub(old_sum.saturating_mul(old_weight));
        self.points_total.insert(next_time, total_weight);
        self.points_type_weight[type_id].insert(next_time, weight);
        self.time_total = next_time;
        self.time_type_weight[type_id] = next_time;

        info!(type_id, weight = %weight, "Type weight changed");

        NewTypeWeightEvent {
            type_id,
            time: now,
            weight,
            total_weight,
        }
    }

    /// Replace `old` with `new` on the gauge and type curves from next week
    fn apply_vote(
        &mut self,
        key: GaugeKey,
        gauge_type: usize,
        old: VoteSlope,
        new: VoteSlope,
        now: Timestamp,
    ) {
        let next_time = next_week(now);
        let old_bias = old
            .slope
            .saturating_mul(U256::from(old.end.saturating_sub(next_time)));
        let new_bias = new
            .slope
            .saturating_mul(U256::from(new.end.saturating_sub(next_time)));

        let old_weight_bias = self.fill_weight(&key, now);
        let old_sum_bias = self.fill_sum(gauge_type, now);

        let weight_point = self
            .points_weight
            .entry(key)
            .or_default()
            .entry(next_time)
            .or_default();
        weight_point.bias = add_then_remove(old_weight_bias, new_bias, old_bias);
        if old.end > next_time {
            weight_point.slope = add_then_remove(weight_point.slope, new.slope, old.slope);
        } else {
            weight_point.slope = weight_point.slope.saturating_add(new.slope);
        }

        let sum_point = self.points_sum[gauge_type].entry(next_time).or_default();
        sum_point.bias = add_then_remove(old_sum_bias, new_bias, old_bias);
        if old.end > next_time {
            sum_point.slope = add_then_remove(sum_point.slope, new.slope, old.slope);
        } else {
            sum_point.slope = sum_point.slope.saturating_add(new.slope);
        }

        if old.end > now {
            // Cancel the old vote's scheduled drop
            for changes in [
                self.changes_weight.entry(key).or_default(),
                &mut self.changes_sum[gauge_type],
            ] {
                if let Some(scheduled) = changes.get_mut(&old.end) {
                    *scheduled = scheduled.saturating_sub(old.slope);
                }
            }
        }
        if !new.slope.is_zero() {
            for changes in [
                self.changes_weight.entry(key).or_default(),
                &mut self.changes_sum[gauge_type],
            ] {
                let scheduled = changes.entry(new.end).or_default();
                *scheduled = scheduled.saturating_add(new.slope);
            }
        }

        self.fill_total(now);
    }

    fn fill_weight(&mut self, key: &GaugeKey, now: Timestamp) -> U256 {
        let t = self.time_weight.get(key).copied().unwrap_or_default();
        if t == 0 {
            return U256::zero();
        }
        let points = self.points_weight.entry(*key).or_default();
        let (bias, t) = sweep_decay(points, self.changes_weight.get(key), t, now);
        self.time_weight.insert(*key, t);
        bias
    }

    fn fill_sum(&mut self, type_id: usize, now: Timestamp) -> U256 {
        let t = self.time_sum[type_id];
        if t == 0 {
            return U256::zero();
        }
        let (bias, t) = sweep_decay(
            &mut self.points_sum[type_id],
            self.changes_sum.get(type_id),
            t,
            now,
        );
        self.time_sum[type_id] = t;
        bias
    }

    fn fill_type_weight(&mut self, type_id: usize, now: Timestamp) -> U256 {
        let mut t = self.time_type_weight[type_id];
        if t == 0 {
            return U256::zero();
        }
        let points = &mut self.points_type_weight[type_id];
        let weight = points.get(&t).copied().unwrap_or_default();
        for _ in 0..MAX_FILL_WEEKS {
            if t > now {
                break;
            }
            t += WEEK;
            points.insert(t, weight);
        }
        self.time_type_weight[type_id] = t;
        weight
    }

    fn fill_total(&mut self, now: Timestamp) -> U256 {
        let mut t = self.time_total;
        if t > now {
            t -= WEEK;
        }
        let mut total = self.points_total(t);

        for type_id in 0..self.type_names.len() {
            self.fill_sum(type_id, now);
            self.fill_type_weight(type_id, now);
        }

        for _ in 0..MAX_FILL_WEEKS {
            if t > now {
                break;
            }
            t += WEEK;
            total = (0..self.type_names.len()).fold(U256::zero(), |acc, type_id| {
                let type_sum = self.points_sum[type_id]
                    .get(&t)
                    .map(|pt| pt.bias)
                    .unwrap_or_default();
                acc.saturating_add(type_sum.saturating_mul(self.type_weight_at(type_id, t)))
            });
            self.points_total.insert(t, total);
        }
        self.time_total = t;
        total
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use config::protocol::DAY;
    use config::GaugeTypeSettings;
    use types::account;

    const T0: Timestamp = 100 * WEEK;

    /// Every user holds the same lock
    struct FixedPower {
        slope: i128,
        end: Timestamp,
    }

    impl VotingPowerSource for FixedPower {
        fn get_last_user_slope(&self, _user: &Address) -> i128 {
            self.slope
        }

        fn locked_end(&self, _user: &Address) -> Timestamp {
            self.end
        }
    }

    fn admin() -> Tx {
        Tx::new(account(1), T0)
    }

    fn gauge(n: u64) -> GaugeKey {
        GaugeKey::new(account(100 + n), 56)
    }

    fn settings() -> VotingSettings {
        VotingSettings {
            gauge_types: vec![GaugeTypeSettings {
                name: "pools".to_string(),
                weight: 1,
            }],
            ..VotingSettings::default()
        }
    }

    fn controller_with_gauges(n: u64) -> GaugeController {
        let mut controller =
            GaugeController::new(&settings(), Roles::single(account(1)), T0).unwrap();
        for i in 0..n {
            controller
                .add_gauge(&admin(), gauge(i), 0, U256::zero())
                .unwrap();
        }
        controller
    }

    fn year_lock() -> FixedPower {
        FixedPower {
            slope: 1_000,
            end: T0 + 52 * WEEK,
        }
    }

    #[test]
    fn test_new_validates_windows() {
        let roles = Roles::single(account(1));
        let short_delay = VotingSettings {
            weight_vote_delay: WEEK - 1,
            ..settings()
        };
        assert_eq!(
            GaugeController::new(&short_delay, roles, T0).unwrap_err(),
            GaugeError::DelayTooShort
        );

        let long_window = VotingSettings {
            admin_only_period: WEEK,
            ..settings()
        };
        assert_eq!(
            GaugeController::new(&long_window, roles, T0).unwrap_err(),
            GaugeError::AdminOnlyPeriodTooLong
        );

        let controller = GaugeController::new(&settings(), roles, T0).unwrap();
        assert_eq!(controller.n_gauge_types(), 1);
        assert_eq!(controller.type_name(0), Some("pools"));
        assert_eq!(controller.get_type_weight(0), U256::one());
    }

    #[test]
    fn test_fill_advances_bounded_weeks() {
        let mut controller = controller_with_gauges(1);
        let span = MAX_FILL_WEEKS as u64 * WEEK;
        let total_from = controller.time_total;
        let weight_from = controller.time_weight[&gauge(0)];

        let far = Tx::new(account(9), u64::MAX);
        controller.checkpoint_gauge(&far, gauge(0)).unwrap();
        assert_eq!(controller.time_total, total_from + span);
        assert_eq!(controller.time_weight[&gauge(0)], weight_from + span);

        // The next call resumes where the last one stopped
        controller.checkpoint(&far);
        assert_eq!(controller.time_total, total_from + 2 * span);
        assert!(controller.gauge_relative_weight(&gauge(0), u64::MAX).is_zero());
    }

    #[test]
    fn test_add_gauge_guards() {
        let mut controller = controller_with_gauges(1);

        assert_eq!(
            controller.add_gauge(&admin(), gauge(0), 0, U256::zero()),
            Err(GaugeError::GaugeAlreadyAdded)
        );
        assert_eq!(
            controller.add_gauge(&admin(), gauge(1), 3, U256::zero()),
            Err(GaugeError::InvalidGaugeType)
        );
        assert_eq!(
            controller.add_gauge(&Tx::new(account(9), T0), gauge(1), 0, U256::zero()),
            Err(GaugeError::Unauthorized(types::AuthError::NotAdmin))
        );
        assert_eq!(controller.gauges(), &[gauge(0)]);
    }

    #[test]
    fn test_vote_takes_effect_next_week() {
        let mut controller = controller_with_gauges(2);
        let voter = Tx::new(account(2), T0);

        controller
            .vote_for_gauge_weights(&voter, &year_lock(), gauge(0), 10_000)
            .unwrap();

        let next = T0 + WEEK;
        let expected = U256::from(1_000u64 * 51 * WEEK);
        assert_eq!(controller.points_weight(&gauge(0), next).bias, expected);
        assert_eq!(controller.points_weight(&gauge(0), next).slope, U256::from(1_000));
        assert_eq!(controller.points_total(next), expected);
        assert!(controller.gauge_relative_weight(&gauge(0), T0).is_zero());
        assert_eq!(
            controller.gauge_relative_weight(&gauge(0), next),
            U256::from(MULTIPLIER)
        );
        assert!(controller.gauge_relative_weight(&gauge(1), next).is_zero());
    }

    #[test]
    fn test_weight_decays_to_zero_at_lock_end() {
        let mut controller = controller_with_gauges(1);
        let lock = FixedPower {
            slope: 1_000,
            end: T0 + 4 * WEEK,
        };
        controller
            .vote_for_gauge_weights(&Tx::new(account(2), T0), &lock, gauge(0), 10_000)
            .unwrap();

        controller
            .checkpoint_gauge(&admin().at(T0 + 2 * WEEK), gauge(0))
            .unwrap();
        assert_eq!(
            controller.get_gauge_weight(&gauge(0)),
            U256::from(1_000u64 * WEEK)
        );

        controller
            .checkpoint_gauge(&admin().at(T0 + 5 * WEEK), gauge(0))
            .unwrap();
        assert!(controller.get_gauge_weight(&gauge(0)).is_zero());
        assert!(controller.points_weight(&gauge(0), T0 + 4 * WEEK).slope.is_zero());
        assert!(controller.get_total_weight().is_zero());
    }

    #[test]
    fn test_power_limits() {
        let mut controller = controller_with_gauges(2);
        let voter = Tx::new(account(2), T0);
        let lock = year_lock();

        assert_eq!(
            controller.vote_for_gauge_weights(&voter, &lock, gauge(0), 10_001),
            Err(GaugeError::AllVotingPowerUsed)
        );
        controller
            .vote_for_gauge_weights(&voter, &lock, gauge(0), 6_000)
            .unwrap();
        assert_eq!(
            controller.vote_for_gauge_weights(&voter, &lock, gauge(1), 5_000),
            Err(GaugeError::TooMuchPowerUsed)
        );
        controller
            .vote_for_gauge_weights(&voter, &lock, gauge(1), 4_000)
            .unwrap();
        assert_eq!(controller.vote_user_power(&voter.sender), 10_000);
    }

    #[test]
    fn test_vote_delay_and_lock_expiry() {
        let mut controller = controller_with_gauges(1);
        let voter = Tx::new(account(2), T0);
        let lock = year_lock();

        controller
            .vote_for_gauge_weights(&voter, &lock, gauge(0), 5_000)
            .unwrap();
        assert_eq!(
            controller.vote_for_gauge_weights(&voter.at(T0 + DAY), &lock, gauge(0), 2_000),
            Err(GaugeError::VoteTooOften)
        );
        controller
            .vote_for_gauge_weights(&voter.at(T0 + 10 * DAY), &lock, gauge(0), 2_000)
            .unwrap();
        assert_eq!(controller.vote_user_power(&voter.sender), 2_000);
        assert_eq!(controller.last_user_vote(&voter.sender, &gauge(0)), T0 + 10 * DAY);

        let short = FixedPower {
            slope: 1_000,
            end: T0 + WEEK,
        };
        assert_eq!(
            controller.vote_for_gauge_weights(&Tx::new(account(3), T0), &short, gauge(0), 1),
            Err(GaugeError::LockExpiresTooSoon)
        );
    }

    #[test]
    fn test_kill_refunds_voters() {
        let mut controller = controller_with_gauges(2);
        let lock = year_lock();
        for user in [2, 3] {
            controller
                .vote_for_gauge_weights(&Tx::new(account(user), T0), &lock, gauge(0), 10_000)
                .unwrap();
        }

        let event = controller.kill_gauge(&admin(), gauge(0)).unwrap();
        assert_eq!(event.refunded_voters, 2);
        assert!(controller.is_killed(&gauge(0)));
        assert!(controller.gauge_relative_weight(&gauge(0), T0 + WEEK).is_zero());
        assert!(controller.points_total(T0 + WEEK).is_zero());
        assert!(controller.get_weights_sum_per_type(0).is_zero());
        assert_eq!(controller.vote_user_power(&account(2)), 0);

        // Refunded power is usable at once, even within the vote delay
        controller
            .vote_for_gauge_weights(&Tx::new(account(2), T0 + 1), &lock, gauge(1), 10_000)
            .unwrap();
        assert_eq!(
            controller.vote_for_gauge_weights(&Tx::new(account(3), T0), &lock, gauge(0), 1),
            Err(GaugeError::GaugeKilled)
        );
        assert_eq!(controller.kill_gauge(&admin(), gauge(0)), Err(GaugeError::GaugeKilled));

        controller.unkill_gauge(&admin(), gauge(0)).unwrap();
        assert_eq!(controller.unkill_gauge(&admin(), gauge(0)), Err(GaugeError::GaugeNotKilled));
        assert!(controller.get_gauge_weight(&gauge(0)).is_zero());
    }

    #[test]
    fn test_admin_only_period() {
        let mut settings = settings();
        settings.admin_only_period = DAY;
        let mut controller =
            GaugeController::new(&settings, Roles::single(account(1)), T0).unwrap();
        controller
            .add_gauge(&admin(), gauge(0), 0, U256::zero())
            .unwrap();

        let late = Tx::new(account(2), T0 + WEEK - 3_600);
        assert_eq!(
            controller.vote_for_gauge_weights(&late, &year_lock(), gauge(0), 100),
            Err(GaugeError::AdminOnlyPeriod)
        );
        controller
            .vote_from_admin(&admin().at(T0 + WEEK - 3_600), gauge(0), U256::from(5), T0 + 10 * WEEK)
            .unwrap();
        assert_eq!(
            controller.points_weight(&gauge(0), T0 + WEEK).bias,
            U256::from(5 * 9 * WEEK)
        );
    }

    #[test]
    fn test_bulk_vote_is_atomic() {
        let mut controller = controller_with_gauges(2);
        let voter = Tx::new(account(2), T0);
        let lock = year_lock();

        assert_eq!(
            controller.vote_for_gauge_weights_bulk(&voter, &lock, &[gauge(0)], &[1, 2]),
            Err(GaugeError::LengthMismatch)
        );
        assert_eq!(
            controller.vote_for_gauge_weights_bulk(
                &voter,
                &lock,
                &[gauge(0), gauge(1)],
                &[7_000, 7_000]
            ),
            Err(GaugeError::TooMuchPowerUsed)
        );
        assert_eq!(controller.vote_user_power(&voter.sender), 0);
        assert!(controller.points_total(T0 + WEEK).is_zero());

        let events = controller
            .vote_for_gauge_weights_bulk(&voter, &lock, &[gauge(0), gauge(1)], &[7_000, 3_000])
            .unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(controller.vote_user_power(&voter.sender), 10_000);
    }
}
