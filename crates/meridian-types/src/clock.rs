//! Head-block clock supplied by the surrounding block-application driver.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Current chain head as seen by evaluators and sweeps.
///
/// The core never reads wall-clock time; every time-dependent rule is
/// evaluated against this snapshot so replay is deterministic.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockClock {
    pub head_block_number: u32,
    pub head_block_time: DateTime<Utc>,
}

impl BlockClock {
    pub fn new(head_block_number: u32, head_block_time: DateTime<Utc>) -> Self {
        Self {
            head_block_number,
            head_block_time,
        }
    }

    /// Genesis clock: block 0 at the unix epoch.
    pub fn genesis() -> Self {
        Self::new(0, DateTime::UNIX_EPOCH)
    }

    /// Advance by `blocks` blocks at the protocol block interval.
    pub fn advance(&mut self, blocks: u32) {
        self.head_block_number += blocks;
        self.head_block_time +=
            chrono::Duration::seconds(crate::config::BLOCK_INTERVAL_SECS * blocks as i64);
    }
}

impl Default for BlockClock {
    fn default() -> Self {
        Self::genesis()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn advance_moves_number_and_time_together() {
        let mut clock = BlockClock::genesis();
        clock.advance(10);
        assert_eq!(clock.head_block_number, 10);
        assert_eq!(
            clock.head_block_time.timestamp(),
            10 * crate::config::BLOCK_INTERVAL_SECS
        );
    }
}
