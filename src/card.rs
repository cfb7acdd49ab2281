use crate::entry::{Entry, Timestamp, now};

/// A set of entries, one per side of the database, reviewed together.
///
/// Which sides take part in scheduling is decided by the owning
/// [`Scheduler`](crate::Scheduler), so the due queries take its enablement mask.
/// Prefer the scheduler's own `due_at`/`due_entry`/`is_due` wrappers.
#[derive(Debug, Clone, PartialEq)]
pub struct Card {
    entries: Vec<Entry>,
    pub comment: String,
    added: Timestamp,
}

impl Card {
    pub fn new(entries: Vec<Entry>, comment: impl Into<String>) -> Self {
        Self::with_added(entries, comment, now())
    }

    pub fn with_added(entries: Vec<Entry>, comment: impl Into<String>, added: Timestamp) -> Self {
        Self {
            entries,
            comment: comment.into(),
            added,
        }
    }

    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    /// The entries can be edited in place, but never added or removed.
    pub fn entries_mut(&mut self) -> &mut [Entry] {
        &mut self.entries
    }

    pub fn entry(&self, side: usize) -> Option<&Entry> {
        self.entries.get(side)
    }

    pub fn added(&self) -> Timestamp {
        self.added
    }

    pub fn texts(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|entry| entry.text.as_str())
    }

    fn enabled_entries<'a>(
        &'a self,
        enabled: &'a [bool],
    ) -> impl Iterator<Item = (usize, &'a Entry)> + 'a {
        self.entries
            .iter()
            .enumerate()
            .filter(|(side, _)| enabled.get(*side).copied().unwrap_or(false))
    }

    /// Earliest due time of the enabled entries, or infinity if no side is enabled.
    pub fn due_at(&self, enabled: &[bool]) -> Timestamp {
        self.enabled_entries(enabled)
            .map(|(_, entry)| entry.due)
            .fold(f64::INFINITY, f64::min)
    }

    pub fn is_due_at(&self, enabled: &[bool], now: Timestamp) -> bool {
        now >= self.due_at(enabled)
    }

    /// Index of the enabled entry that should be shown next. Ties go to the lower side.
    pub fn due_side(&self, enabled: &[bool]) -> Option<usize> {
        self.enabled_entries(enabled)
            .min_by(|(_, a), (_, b)| a.cmp_due(b))
            .map(|(side, _)| side)
    }

    pub fn due_entry(&self, enabled: &[bool]) -> Option<&Entry> {
        self.due_side(enabled).map(|side| &self.entries[side])
    }
}

impl std::fmt::Display for Card {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut texts = self.texts();
        if let Some(first) = texts.next() {
            write!(f, "{first}")?;
        }
        for text in texts {
            write!(f, "\t{text}")?;
        }
        if !self.comment.is_empty() {
            write!(f, "\t\t# {}", self.comment)?;
        }
        Ok(())
    }
}
