//! Read-only summaries of a database, for display by a front end.

use snafu::ensure;

use crate::entry::Timestamp;
use crate::error::{InvalidBucketWidthSnafu, Result};
use crate::scheduler::Scheduler;

pub const DAY: f64 = 24.0 * 60.0 * 60.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Summary {
    pub cards: usize,
    pub due: usize,
    pub retention_ratio: Option<f64>,
}

pub fn summary(scheduler: &Scheduler, now: Timestamp) -> Summary {
    Summary {
        cards: scheduler.len(),
        due: scheduler.due_count_at(now),
        retention_ratio: scheduler.retention_ratio(),
    }
}

/// Bucket index of `value` for buckets of `width`: bucket 0 holds values up to
/// `origin`, bucket `k` those in `(origin + (k - 1) * width, origin + k * width]`.
/// Kept as a float so that far-off values can be compared before any cast.
fn bucket_of(value: f64, origin: f64, width: f64) -> f64 {
    ((value - origin) / width).ceil().max(0.0)
}

/// Number of entries on enabled sides that become due on each of the next
/// `days` days. Overdue entries count towards day 0, entries beyond the horizon
/// are left out.
pub fn due_forecast(scheduler: &Scheduler, now: Timestamp, days: usize) -> Vec<usize> {
    let enabled = scheduler.enabled();
    let mut counts = vec![0; days];
    let dues = scheduler.cards().flat_map(|card| {
        card.entries()
            .iter()
            .zip(enabled)
            .filter(|(_, enabled)| **enabled)
            .map(|(entry, _)| entry.due)
    });
    for due in dues {
        let day = bucket_of(due, now, DAY);
        if day < days as f64 {
            counts[day as usize] += 1;
        }
    }
    counts
}

/// Number of entries per proficiency range of `width` seconds, over `buckets`
/// ranges. The last bucket also takes every longer proficiency.
pub fn proficiency_histogram(
    scheduler: &Scheduler,
    width: f64,
    buckets: usize,
) -> Result<Vec<usize>> {
    ensure!(
        width.is_finite() && width > 0.0,
        InvalidBucketWidthSnafu { width }
    );
    let mut counts = vec![0; buckets];
    let Some(last) = buckets.checked_sub(1) else {
        return Ok(counts);
    };
    let proficiencies = scheduler
        .cards()
        .flat_map(|card| card.entries().iter().map(|entry| entry.proficiency));
    for proficiency in proficiencies {
        let bucket = bucket_of(proficiency, 0.0, width).min(last as f64);
        counts[bucket as usize] += 1;
    }
    Ok(counts)
}
