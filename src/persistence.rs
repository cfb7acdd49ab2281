//! The on-disk database record.
//!
//! A database is stored as a single JSON object. Everything except `langs`,
//! `retention` and `cards` may be missing, in which case the defaults of a newly
//! created database are used; unknown fields are ignored so that files written by
//! newer versions still load.

use std::ffi::OsString;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use itertools::Itertools;
use log::{info, warn};
use serde::{Deserialize, Serialize};
use snafu::{ResultExt, ensure};

use crate::card::Card;
use crate::config::SchedulerConfig;
use crate::entry::{Entry, MIN_PROFICIENCY, Timestamp, now};
use crate::error::{InvalidRecordSnafu, IoSnafu, ParseSnafu, Result, SerializeSnafu, VocabError};
use crate::scheduler::{Retention, RetentionSample, Scheduler};

/// `[major, minor, patch, tag]`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Version(pub u32, pub u32, pub u32, pub String);

impl Version {
    /// The record version written by this crate.
    pub fn current() -> Self {
        Version(2, 2, 0, "final".to_string())
    }

    fn release(&self) -> (u32, u32) {
        (self.0, self.1)
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.0, self.1, self.2)?;
        if !self.3.is_empty() && self.3 != "final" {
            write!(f, "-{}", self.3)?;
        }
        Ok(())
    }
}

/// A record written by a newer release than this one. It is loaded anyway.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionSkew {
    pub found: Version,
    pub supported: Version,
}

impl fmt::Display for VersionSkew {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "database was written by version {} but this is version {}, some data may be ignored",
            self.found, self.supported
        )
    }
}

#[derive(Debug)]
pub struct Loaded {
    pub scheduler: Scheduler,
    pub version_skew: Option<VersionSkew>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Record {
    langs: Vec<String>,
    enabled: Option<Vec<bool>>,
    version: Option<Version>,
    retention: (f64, f64),
    rethist: Option<Vec<(Timestamp, f64)>>,
    maxcards: Option<usize>,
    profscale: Option<f64>,
    timescale: Option<f64>,
    faildiv: Option<f64>,
    cards: Vec<CardRecord>,
}

#[derive(Debug, Serialize, Deserialize)]
struct CardRecord {
    entries: Vec<EntryRecord>,
    added: Option<Timestamp>,
    comment: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
struct EntryRecord {
    text: String,
    proficiency: Option<f64>,
    due: Option<Timestamp>,
}

impl From<&Entry> for EntryRecord {
    fn from(entry: &Entry) -> Self {
        Self {
            text: entry.text.clone(),
            proficiency: Some(entry.proficiency),
            due: Some(entry.due),
        }
    }
}

impl From<&Card> for CardRecord {
    fn from(card: &Card) -> Self {
        Self {
            entries: card.entries().iter().map(EntryRecord::from).collect(),
            added: Some(card.added()),
            comment: Some(card.comment.clone()),
        }
    }
}

impl From<&Scheduler> for Record {
    fn from(scheduler: &Scheduler) -> Self {
        let config = scheduler.config();
        let retention = scheduler.retention();
        // cards_by_due gives a deterministic order for equal `added` times
        let cards = scheduler
            .cards_by_due()
            .into_iter()
            .sorted_by(|a, b| a.added().total_cmp(&b.added()))
            .map(CardRecord::from)
            .collect();
        Self {
            langs: scheduler.sides().to_vec(),
            enabled: Some(scheduler.enabled().to_vec()),
            version: Some(Version::current()),
            retention: (retention.correct, retention.total),
            rethist: Some(
                scheduler
                    .retention_history()
                    .iter()
                    .map(|sample| (sample.at, sample.ratio))
                    .collect(),
            ),
            maxcards: Some(config.max_active_cards),
            profscale: Some(config.prof_scale),
            timescale: Some(config.time_scale),
            faildiv: Some(config.fail_divisor),
            cards,
        }
    }
}

fn check_time(value: f64, what: &str) -> Result<f64> {
    ensure!(
        value.is_finite(),
        InvalidRecordSnafu {
            reason: format!("{what} must be a finite timestamp, got {value}"),
        }
    );
    Ok(value)
}

fn check_amount(value: f64, what: &str) -> Result<f64> {
    ensure!(
        value.is_finite() && value >= 0.0,
        InvalidRecordSnafu {
            reason: format!("{what} must be a non-negative number, got {value}"),
        }
    );
    Ok(value)
}

impl EntryRecord {
    fn into_entry(self, now: Timestamp, rng: &mut impl rand::Rng) -> Result<Entry> {
        let mut entry = Entry::new(self.text, now, rng);
        if let Some(proficiency) = self.proficiency {
            // older converted files store 0 for entries that were never reviewed
            entry.proficiency = check_amount(proficiency, "proficiency")?.max(MIN_PROFICIENCY);
        }
        if let Some(due) = self.due {
            entry.due = check_time(due, "due")?;
        }
        Ok(entry)
    }
}

impl Record {
    fn into_loaded(self, now: Timestamp) -> Result<Loaded> {
        let sides = self.langs.len();
        ensure!(
            sides > 0,
            InvalidRecordSnafu {
                reason: "langs must name at least one side",
            }
        );

        let enabled = self.enabled.unwrap_or_else(|| vec![true; sides]);
        ensure!(
            enabled.len() == sides,
            InvalidRecordSnafu {
                reason: format!("{} enabled flags for {sides} langs", enabled.len()),
            }
        );

        let defaults = SchedulerConfig::default();
        let config = SchedulerConfig {
            max_active_cards: self.maxcards.unwrap_or(defaults.max_active_cards),
            prof_scale: self.profscale.unwrap_or(defaults.prof_scale),
            time_scale: self.timescale.unwrap_or(defaults.time_scale),
            fail_divisor: self.faildiv.unwrap_or(defaults.fail_divisor),
        };
        config
            .validate()
            .map_err(|err| VocabError::InvalidRecord {
                reason: err.to_string(),
            })?;

        let (correct, total) = self.retention;
        let retention = Retention {
            correct: check_amount(correct, "retention")?,
            total: check_amount(total, "retention")?,
        };

        let retention_history = self
            .rethist
            .unwrap_or_default()
            .into_iter()
            .map(|(at, ratio)| -> Result<RetentionSample> {
                ensure!(
                    (0.0..=1.0).contains(&ratio),
                    InvalidRecordSnafu {
                        reason: format!("rethist ratio must lie in [0, 1], got {ratio}"),
                    }
                );
                Ok(RetentionSample {
                    at: check_time(at, "rethist")?,
                    ratio,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let mut rng = rand::rng();
        let cards = self
            .cards
            .into_iter()
            .enumerate()
            .map(|(i, card)| -> Result<Card> {
                ensure!(
                    card.entries.len() == sides,
                    InvalidRecordSnafu {
                        reason: format!(
                            "card {i} has {} entries for {sides} langs",
                            card.entries.len()
                        ),
                    }
                );
                let entries = card
                    .entries
                    .into_iter()
                    .map(|entry| entry.into_entry(now, &mut rng))
                    .collect::<Result<Vec<_>>>()?;
                let added = match card.added {
                    Some(added) => check_time(added, "added")?,
                    None => now,
                };
                Ok(Card::with_added(
                    entries,
                    card.comment.unwrap_or_default(),
                    added,
                ))
            })
            .collect::<Result<Vec<_>>>()?;

        let current = Version::current();
        let version_skew = self
            .version
            .filter(|found| found.release() > current.release())
            .map(|found| VersionSkew {
                found,
                supported: current,
            });
        if let Some(skew) = &version_skew {
            warn!("{skew}");
        }

        let scheduler =
            Scheduler::from_parts(self.langs, enabled, config, retention, retention_history, cards);
        Ok(Loaded {
            scheduler,
            version_skew,
        })
    }
}

/// Serializes the complete state, cards sorted by creation time.
pub fn encode(scheduler: &Scheduler) -> Result<String> {
    serde_json::to_string_pretty(&Record::from(scheduler)).context(SerializeSnafu)
}

/// Parses a record. Missing values are filled in relative to `now`. No rebase is done.
pub fn decode(text: &str, now: Timestamp) -> Result<Loaded> {
    let record: Record = serde_json::from_str(text).context(ParseSnafu)?;
    record.into_loaded(now)
}

/// `<path>.bak`, where the previous version of a database is kept.
pub fn backup_path(path: &Path) -> PathBuf {
    let mut backup = OsString::from(path.as_os_str());
    backup.push(".bak");
    PathBuf::from(backup)
}

impl Scheduler {
    pub fn load(path: impl AsRef<Path>) -> Result<Loaded> {
        Self::load_at(path, now())
    }

    /// Reads a database and applies the backlog rebase relative to `now`.
    pub fn load_at(path: impl AsRef<Path>, now: Timestamp) -> Result<Loaded> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).context(IoSnafu { path })?;
        let mut loaded = decode(&text, now)?;
        loaded.scheduler.rebase_at(now);
        info!(
            "loaded {} cards from {}",
            loaded.scheduler.len(),
            path.display()
        );
        Ok(loaded)
    }

    pub fn save(&mut self, path: impl AsRef<Path>) -> Result<()> {
        self.save_at(path, now())
    }

    /// Writes the complete database, keeping the previous file as `<path>.bak`.
    ///
    /// A failed backup is logged and does not stop the save.
    pub fn save_at(&mut self, path: impl AsRef<Path>, now: Timestamp) -> Result<()> {
        let path = path.as_ref();
        self.sample_retention_at(now);
        let text = encode(self)?;

        if path.exists() {
            let backup = backup_path(path);
            if let Err(err) = fs::copy(path, &backup) {
                warn!("could not back up {} to {}: {err}", path.display(), backup.display());
            }
        }
        fs::write(path, text).context(IoSnafu { path })?;

        self.mark_clean();
        info!("saved {} cards to {}", self.len(), path.display());
        Ok(())
    }
}
