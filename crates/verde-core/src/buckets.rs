//! # Distribution Bucketizer
//!
//! Classifies daily sale totals into the four fixed amount ranges the
//! dashboard histogram uses: `[0,100]`, `(100,500]`, `(500,1000]`,
//! `(1000,∞)`. Boundary values belong to the lower bucket — the chain is
//! a `≤` comparison at each threshold in ascending order, so a 100.00 day
//! lands in the first bucket and a 100.01 day in the second.

use serde::{Deserialize, Serialize};

use crate::report::DailySummary;

// Thresholds in cents.
const UPPER_LOW: i64 = 100_00;
const UPPER_MID: i64 = 500_00;
const UPPER_HIGH: i64 = 1_000_00;

/// Histogram of daily totals. All four labels are always present,
/// defaulting to 0, and the counts sum to the number of input days.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Distribution {
    /// Daily totals up to and including $100.00.
    #[serde(rename = "0-100")]
    pub up_to_100: usize,
    /// ($100.00, $500.00].
    #[serde(rename = "101-500")]
    pub up_to_500: usize,
    /// ($500.00, $1000.00].
    #[serde(rename = "501-1000")]
    pub up_to_1000: usize,
    /// Above $1000.00.
    #[serde(rename = "1001+")]
    pub over_1000: usize,
}

impl Distribution {
    /// Buckets each day's total amount. Pure and deterministic.
    pub fn from_daily(summaries: &[DailySummary]) -> Self {
        let mut dist = Distribution::default();
        for day in summaries {
            if day.total_cents <= UPPER_LOW {
                dist.up_to_100 += 1;
            } else if day.total_cents <= UPPER_MID {
                dist.up_to_500 += 1;
            } else if day.total_cents <= UPPER_HIGH {
                dist.up_to_1000 += 1;
            } else {
                dist.over_1000 += 1;
            }
        }
        dist
    }

    /// Total number of bucketed days.
    pub fn total(&self) -> usize {
        self.up_to_100 + self.up_to_500 + self.up_to_1000 + self.over_1000
    }
}
