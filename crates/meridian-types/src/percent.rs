//! Percent values on the protocol basis: 100% == 10_000.

use crate::config::PERCENT_100;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A percentage expressed in hundredths of a percent (basis points x 1).
///
/// `Percent(10_000)` is 100%, `Percent(50)` is 0.5%.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Percent(pub u16);

impl Percent {
    pub const ZERO: Percent = Percent(0);
    pub const FULL: Percent = Percent(PERCENT_100);

    pub fn from_whole(percent: u16) -> Self {
        Percent(percent * 100)
    }

    pub fn is_valid(&self) -> bool {
        self.0 <= PERCENT_100
    }

    /// `amount * self / 100%`, in i128 to avoid intermediate overflow.
    pub fn of(&self, amount: i64) -> i64 {
        ((amount as i128 * self.0 as i128) / PERCENT_100 as i128) as i64
    }
}

impl fmt::Display for Percent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:02}%", self.0 / 100, self.0 % 100)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn percent_of_amount() {
        assert_eq!(Percent::from_whole(50).of(200), 100);
        assert_eq!(Percent(1).of(1_000_000), 100);
        assert_eq!(Percent::FULL.of(777), 777);
    }

    #[test]
    fn validity_bound() {
        assert!(Percent(10_000).is_valid());
        assert!(!Percent(10_001).is_valid());
    }
}
