//! Voting power seam between the escrow and the gauge controller

use types::{Address, Timestamp};

/// Read access to a user's escrowed voting power
pub trait VotingPowerSource {
    /// Voting power the user loses per second
    fn get_last_user_slope(&self, user: &Address) -> i128;

    /// When the user's lock ends
    fn locked_end(&self, user: &Address) -> Timestamp;
}
