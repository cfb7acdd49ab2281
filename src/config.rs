use snafu::ensure;

use crate::error::{InvalidConfigSnafu, Result};

pub const DEFAULT_MAX_ACTIVE_CARDS: usize = 48;
pub const DEFAULT_PROF_SCALE: f64 = 1.75;
pub const DEFAULT_TIME_SCALE: f64 = 1.0;
pub const DEFAULT_FAIL_DIVISOR: f64 = 16.0;

/// Tunable parameters of the review algorithm and the load-time rebase.
#[derive(Debug, Clone, PartialEq)]
pub struct SchedulerConfig {
    /// Size of the window of soonest-due cards protected by the rebase on load.
    pub max_active_cards: usize,
    /// Growth factor applied to the proficiency after a correct answer.
    pub prof_scale: f64,
    /// Weight of the random bonus for answering an overdue entry correctly.
    pub time_scale: f64,
    /// Shrink divisor applied to the proficiency after an incorrect answer.
    pub fail_divisor: f64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            max_active_cards: DEFAULT_MAX_ACTIVE_CARDS,
            prof_scale: DEFAULT_PROF_SCALE,
            time_scale: DEFAULT_TIME_SCALE,
            fail_divisor: DEFAULT_FAIL_DIVISOR,
        }
    }
}

impl SchedulerConfig {
    pub fn validate(&self) -> Result<()> {
        ensure!(
            self.max_active_cards > 0,
            InvalidConfigSnafu {
                reason: "max_active_cards must be at least 1",
            }
        );
        ensure!(
            self.prof_scale.is_finite() && self.prof_scale > 0.0,
            InvalidConfigSnafu {
                reason: format!("prof_scale must be positive, got {}", self.prof_scale),
            }
        );
        ensure!(
            self.time_scale.is_finite() && self.time_scale >= 0.0,
            InvalidConfigSnafu {
                reason: format!("time_scale must not be negative, got {}", self.time_scale),
            }
        );
        ensure!(
            self.fail_divisor.is_finite() && self.fail_divisor > 0.0,
            InvalidConfigSnafu {
                reason: format!("fail_divisor must be positive, got {}", self.fail_divisor),
            }
        );
        Ok(())
    }
}
