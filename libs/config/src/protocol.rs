//! Protocol constants
//!
//! Hard limits enforced by the engines. Configuration values are validated
//! against these caps at load time and again by the engine setters.

/// Length of one day in seconds
pub const DAY: u64 = 86_400;

/// Share vault limits and defaults (fees in basis points)
pub mod vault {
    use super::DAY;

    /// 5%
    pub const MAX_PERFORMANCE_FEE: u64 = 500;

    /// 1%
    pub const MAX_CALL_FEE: u64 = 100;

    /// 1%
    pub const MAX_WITHDRAW_FEE: u64 = 100;

    /// 72 hours
    pub const MAX_WITHDRAW_FEE_PERIOD: u64 = 3 * DAY;

    pub const DEFAULT_PERFORMANCE_FEE: u64 = 200;
    pub const DEFAULT_CALL_FEE: u64 = 25;
    pub const DEFAULT_WITHDRAW_FEE: u64 = 10;
    pub const DEFAULT_WITHDRAW_FEE_PERIOD: u64 = 3 * DAY;
}

/// StableSwap pool limits
pub mod stableswap {
    use super::DAY;

    /// Fees are expressed with 1e10 precision
    pub const FEE_DENOMINATOR: u64 = 10_000_000_000;

    /// Normalized balance precision
    pub const PRECISION_DECIMALS: u32 = 18;

    /// 50%
    pub const MAX_FEE: u64 = 5_000_000_000;

    /// 100%
    pub const MAX_ADMIN_FEE: u64 = 10_000_000_000;

    pub const MAX_A: u64 = 1_000_000;
    pub const MAX_A_CHANGE: u64 = 10;

    pub const ADMIN_ACTIONS_DELAY: u64 = 3 * DAY;
    pub const MIN_RAMP_TIME: u64 = DAY;

    /// Pools can only be killed within this window after deployment
    pub const KILL_DEADLINE_DT: u64 = 2 * 30 * DAY;

    /// Newton iteration cap for the invariant solvers
    pub const MAX_ITERATION: usize = 255;

    pub const MIN_COINS: usize = 2;
    pub const MAX_COINS: usize = 3;
}

/// Vote-escrow curve parameters
pub mod escrow {
    use super::DAY;

    /// Lock ends and slope changes are aligned to this boundary
    pub const WEEK: u64 = 7 * DAY;

    /// Four years
    pub const MAXTIME: u64 = 4 * 365 * DAY;
}

/// Gauge controller parameters
pub mod gauge {
    use super::DAY;

    /// 1e18 scale for relative weights
    pub const MULTIPLIER: u128 = 1_000_000_000_000_000_000;

    /// Full voting power of a user, in basis points
    pub const MAX_USER_POWER: u64 = 10_000;

    pub const DEFAULT_WEIGHT_VOTE_DELAY: u64 = 10 * DAY;

    /// Window before each week boundary where only the admin may vote (0 = disabled)
    pub const DEFAULT_ADMIN_ONLY_PERIOD: u64 = 0;

    /// Most weeks a single fill advances a weight curve; later calls resume
    pub const MAX_FILL_WEEKS: usize = 500;
}
