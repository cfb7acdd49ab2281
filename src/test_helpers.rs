use crate::{Card, Entry, Scheduler, Timestamp};

/// A fixed point in time, 2023-11-14 22:13:20 UTC.
pub const NOW: Timestamp = 1_700_000_000.0;

/// A card whose entries have the default proficiency and the given due times.
pub fn card(entries: &[(&str, Timestamp)]) -> Card {
    let entries = entries
        .iter()
        .map(|(text, due)| Entry::with_state(*text, 60.0, *due))
        .collect();
    Card::with_added(entries, "", NOW - 86_400.0)
}

pub fn scheduler(sides: &[&str]) -> Scheduler {
    Scheduler::new(sides.iter().copied())
        .unwrap()
        .with_seed(42)
}

/// Compares two schedulers by everything that is persisted, ignoring card order.
pub fn assert_same_state(a: &Scheduler, b: &Scheduler) {
    assert_eq!(a.sides(), b.sides());
    assert_eq!(a.enabled(), b.enabled());
    assert_eq!(a.config(), b.config());
    assert_eq!(a.retention(), b.retention());
    assert_eq!(a.retention_history(), b.retention_history());
    let sorted = |s: &Scheduler| {
        let mut cards: Vec<Card> = s.cards().cloned().collect();
        cards.sort_by(|x, y| {
            x.added()
                .total_cmp(&y.added())
                .then_with(|| x.entries()[0].text.cmp(&y.entries()[0].text))
        });
        cards
    };
    assert_eq!(sorted(a), sorted(b));
}
