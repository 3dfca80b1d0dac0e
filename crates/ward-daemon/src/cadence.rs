//! Fixed-cadence scheduling
//!
//! Cycles start every `period` regardless of how long the previous one
//! took. A cycle that overruns the period is followed immediately by the
//! next one.

use std::time::Duration;

/// Time left to sleep after a cycle that took `elapsed`
pub fn remaining(period: Duration, elapsed: Duration) -> Duration {
    period.saturating_sub(elapsed)
}
