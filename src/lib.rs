mod card;
mod config;
mod entry;
mod error;
mod persistence;
mod scheduler;
pub mod stats;
#[cfg(test)]
mod test_helpers;

pub use card::Card;
pub use config::{
    DEFAULT_FAIL_DIVISOR, DEFAULT_MAX_ACTIVE_CARDS, DEFAULT_PROF_SCALE, DEFAULT_TIME_SCALE,
    SchedulerConfig,
};
pub use entry::{
    Entry, INITIAL_DUE_JITTER, INITIAL_PROFICIENCY, MIN_PROFICIENCY, Timestamp, now,
};
pub use error::{Result, VocabError};
pub use persistence::{Loaded, Version, VersionSkew, backup_path, decode, encode};
pub use scheduler::{
    Answer, RETENTION_SAMPLE_INTERVAL, Retention, RetentionSample, ReviewOutcome, Scheduler,
};
