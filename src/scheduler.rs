use std::cmp::{Ordering, Reverse};
use std::collections::HashMap;

use itertools::Itertools;
use log::{debug, info};
use priority_queue::PriorityQueue;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use snafu::ensure;
use strum::{Display, EnumIter};

use crate::card::Card;
use crate::config::SchedulerConfig;
use crate::entry::{Entry, MIN_PROFICIENCY, Timestamp, now};
use crate::error::{
    InvalidSideSnafu, NoSidesSnafu, Result, SideCountMismatchSnafu, VocabError,
};

/// At most one retention sample is recorded per this many seconds.
pub const RETENTION_SAMPLE_INTERVAL: f64 = 60.0 * 60.0;

type CardId = u64;

/// Due time with a total order, so it can rank cards in the queue.
#[derive(Debug, Clone, Copy)]
struct DueKey(Timestamp);

impl PartialEq for DueKey {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for DueKey {}

impl PartialOrd for DueKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for DueKey {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0)
    }
}

// high priority for early due, then for earlier insertion
type Rank = Reverse<(DueKey, CardId)>;

fn rank(enabled: &[bool], card: &Card, id: CardId) -> Rank {
    Reverse((DueKey(card.due_at(enabled)), id))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumIter)]
#[strum(serialize_all = "lowercase")]
pub enum Answer {
    Correct,
    Incorrect,
}

impl From<bool> for Answer {
    fn from(correct: bool) -> Self {
        if correct {
            Answer::Correct
        } else {
            Answer::Incorrect
        }
    }
}

/// Proficiency-weighted tally of review answers.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Retention {
    pub correct: f64,
    pub total: f64,
}

impl Retention {
    /// `None` until something has been reviewed.
    pub fn ratio(&self) -> Option<f64> {
        (self.total > 0.0).then(|| self.correct / self.total)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetentionSample {
    pub at: Timestamp,
    pub ratio: f64,
}

/// What a review did to the reviewed entry.
#[derive(Debug, Clone, PartialEq)]
pub struct ReviewOutcome {
    pub side: usize,
    pub answer: Answer,
    pub previous_proficiency: f64,
    pub proficiency: f64,
    pub due: Timestamp,
}

/// Maps the time an entry sat overdue onto a multiplier that reaches 24 after one day.
pub(crate) fn overdue_scale(overdue: f64) -> f64 {
    24.0 * (overdue / 3600.0 * 0.125 + 1.0).ln() / (24.0_f64 * 0.125 + 1.0).ln()
}

/// Owns every card of a vocabulary database and decides what to review next.
///
/// Cards are kept in a priority queue ordered by [`Card::due_at`]. A card's rank
/// changes whenever one of its entries is reviewed, so reviewing works by
/// taking the card out with [`pop`](Self::pop) and handing it back through
/// [`record_review`](Self::record_review), which reinserts it. A caller that
/// pops a card and then abandons the review must return it with
/// [`put_back`](Self::put_back), otherwise the card is lost.
#[derive(Debug, Clone)]
pub struct Scheduler {
    sides: Vec<String>,
    enabled: Vec<bool>,
    config: SchedulerConfig,
    retention: Retention,
    retention_history: Vec<RetentionSample>,
    cards: HashMap<CardId, Card>,
    queue: PriorityQueue<CardId, Rank>,
    next_id: CardId,
    rng: StdRng,
    dirty: bool,
}

impl Scheduler {
    pub fn new<I, S>(sides: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::with_config(sides, SchedulerConfig::default())
    }

    pub fn with_config<I, S>(sides: I, config: SchedulerConfig) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let sides: Vec<String> = sides.into_iter().map(Into::into).collect();
        ensure!(!sides.is_empty(), NoSidesSnafu);
        config.validate()?;
        let enabled = vec![true; sides.len()];
        Ok(Self {
            sides,
            enabled,
            config,
            retention: Retention::default(),
            retention_history: Vec::new(),
            cards: HashMap::new(),
            queue: PriorityQueue::new(),
            next_id: 0,
            rng: StdRng::from_os_rng(),
            dirty: false,
        })
    }

    /// Replaces the random source, for reproducible jitter and review bonuses.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = StdRng::seed_from_u64(seed);
        self
    }

    /// Rebuilds a scheduler from decoded parts. The result counts as persisted.
    pub(crate) fn from_parts(
        sides: Vec<String>,
        enabled: Vec<bool>,
        config: SchedulerConfig,
        retention: Retention,
        retention_history: Vec<RetentionSample>,
        cards: Vec<Card>,
    ) -> Self {
        let mut scheduler = Self {
            sides,
            enabled,
            config,
            retention,
            retention_history,
            cards: HashMap::with_capacity(cards.len()),
            queue: PriorityQueue::with_capacity(cards.len()),
            next_id: 0,
            rng: StdRng::from_os_rng(),
            dirty: false,
        };
        for card in cards {
            scheduler.insert(card);
        }
        scheduler
    }

    pub fn sides(&self) -> &[String] {
        &self.sides
    }

    pub fn enabled(&self) -> &[bool] {
        &self.enabled
    }

    /// Includes or excludes a side from scheduling and review, re-ranking every card.
    pub fn set_enabled(&mut self, side: usize, enabled: bool) -> Result<()> {
        ensure!(
            side < self.sides.len(),
            InvalidSideSnafu {
                side,
                sides: self.sides.len(),
            }
        );
        if self.enabled[side] != enabled {
            self.enabled[side] = enabled;
            self.rerank_all();
            self.dirty = true;
            debug!("side {} ({}) enabled: {enabled}", side, self.sides[side]);
        }
        Ok(())
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    pub fn set_config(&mut self, config: SchedulerConfig) -> Result<()> {
        config.validate()?;
        if config != self.config {
            self.config = config;
            self.dirty = true;
        }
        Ok(())
    }

    pub fn retention(&self) -> Retention {
        self.retention
    }

    pub fn retention_ratio(&self) -> Option<f64> {
        self.retention.ratio()
    }

    pub fn retention_history(&self) -> &[RetentionSample] {
        &self.retention_history
    }

    /// Appends the current retention ratio to the history, unless a sample was
    /// taken less than [`RETENTION_SAMPLE_INTERVAL`] ago or nothing was reviewed yet.
    pub fn sample_retention_at(&mut self, now: Timestamp) -> bool {
        let Some(ratio) = self.retention.ratio() else {
            return false;
        };
        if let Some(last) = self.retention_history.last() {
            if now < last.at + RETENTION_SAMPLE_INTERVAL {
                return false;
            }
        }
        self.retention_history.push(RetentionSample { at: now, ratio });
        self.dirty = true;
        true
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub(crate) fn mark_clean(&mut self) {
        self.dirty = false;
    }

    pub fn len(&self) -> usize {
        self.cards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }

    /// All cards in no particular order.
    pub fn cards(&self) -> impl Iterator<Item = &Card> {
        self.cards.values()
    }

    /// All cards in the order they would be popped.
    pub fn cards_by_due(&self) -> Vec<&Card> {
        self.queue
            .iter()
            .sorted_by(|(_, a), (_, b)| b.cmp(a))
            .filter_map(|(id, _)| self.cards.get(id))
            .collect()
    }

    pub fn due_at(&self, card: &Card) -> Timestamp {
        card.due_at(&self.enabled)
    }

    pub fn is_due(&self, card: &Card) -> bool {
        self.is_due_at(card, now())
    }

    pub fn is_due_at(&self, card: &Card, now: Timestamp) -> bool {
        card.is_due_at(&self.enabled, now)
    }

    pub fn due_side(&self, card: &Card) -> Option<usize> {
        card.due_side(&self.enabled)
    }

    pub fn due_entry<'a>(&self, card: &'a Card) -> Option<&'a Entry> {
        card.due_entry(&self.enabled)
    }

    pub fn due_count_at(&self, now: Timestamp) -> usize {
        self.cards
            .values()
            .filter(|card| card.is_due_at(&self.enabled, now))
            .count()
    }

    fn insert(&mut self, card: Card) {
        let id = self.next_id;
        self.next_id += 1;
        self.queue.push(id, rank(&self.enabled, &card, id));
        self.cards.insert(id, card);
    }

    fn take(&mut self, id: CardId) -> Option<Card> {
        self.queue.remove(&id);
        self.cards.remove(&id)
    }

    fn rerank_all(&mut self) {
        for (id, card) in &self.cards {
            self.queue
                .change_priority(id, rank(&self.enabled, card, *id));
        }
    }

    /// The soonest-due card accepted by `matches`.
    fn find<F>(&self, mut matches: F) -> Option<CardId>
    where
        F: FnMut(&Card) -> bool,
    {
        self.queue
            .iter()
            .filter(|(id, _)| self.cards.get(*id).is_some_and(&mut matches))
            .max_by_key(|(_, rank)| **rank)
            .map(|(id, _)| *id)
    }

    pub fn add(&mut self, card: Card) -> Result<()> {
        ensure!(
            card.entries().len() == self.sides.len(),
            SideCountMismatchSnafu {
                expected: self.sides.len(),
                found: card.entries().len(),
            }
        );
        self.insert(card);
        self.dirty = true;
        Ok(())
    }

    /// Returns a popped card that was not reviewed. Same as [`add`](Self::add).
    pub fn put_back(&mut self, card: Card) -> Result<()> {
        self.add(card)
    }

    /// Creates a card with fresh entries, one text per side.
    pub fn add_new<I, S>(&mut self, texts: I, comment: impl Into<String>) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.add_new_at(texts, comment, now())
    }

    pub fn add_new_at<I, S>(
        &mut self,
        texts: I,
        comment: impl Into<String>,
        now: Timestamp,
    ) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let entries = texts
            .into_iter()
            .map(|text| Entry::new(text, now, &mut self.rng))
            .collect();
        self.add(Card::with_added(entries, comment, now))
    }

    pub fn peek(&self) -> Result<&Card> {
        self.queue
            .peek()
            .and_then(|(id, _)| self.cards.get(id))
            .ok_or(VocabError::EmptyQueue)
    }

    pub fn pop(&mut self) -> Result<Card> {
        let (id, _) = self.queue.pop().ok_or(VocabError::EmptyQueue)?;
        let card = self.cards.remove(&id).ok_or(VocabError::EmptyQueue)?;
        self.dirty = true;
        Ok(card)
    }

    /// Removes the soonest-due card accepted by `matches`.
    pub fn remove<F>(&mut self, matches: F) -> Option<Card>
    where
        F: FnMut(&Card) -> bool,
    {
        let id = self.find(matches)?;
        let card = self.take(id)?;
        self.dirty = true;
        debug!("removed card {card}");
        Some(card)
    }

    /// Removes a card that has an entry with exactly this text.
    pub fn remove_by_text(&mut self, text: &str) -> Option<Card> {
        self.remove(|card| card.texts().any(|t| t == text))
    }

    /// Applies `edit` to the soonest-due card accepted by `matches` and re-ranks it.
    pub fn edit<F, G>(&mut self, matches: F, edit: G) -> bool
    where
        F: FnMut(&Card) -> bool,
        G: FnOnce(&mut Card),
    {
        let Some(id) = self.find(matches) else {
            return false;
        };
        let Some(card) = self.cards.get_mut(&id) else {
            return false;
        };
        edit(card);
        self.queue
            .change_priority(&id, rank(&self.enabled, card, id));
        self.dirty = true;
        true
    }

    pub fn record_review(
        &mut self,
        card: Card,
        side: usize,
        answer: Answer,
    ) -> Result<ReviewOutcome> {
        self.record_review_at(card, side, answer, now())
    }

    /// Updates the proficiency and due time of `card`'s entry on `side` after
    /// the learner answered it, then puts the card back into the queue.
    ///
    /// An invalid `side` is reported after the card was put back unchanged. A card
    /// whose entry count does not match the sides cannot belong to this
    /// scheduler and is rejected.
    pub fn record_review_at(
        &mut self,
        mut card: Card,
        side: usize,
        answer: Answer,
        now: Timestamp,
    ) -> Result<ReviewOutcome> {
        ensure!(
            card.entries().len() == self.sides.len(),
            SideCountMismatchSnafu {
                expected: self.sides.len(),
                found: card.entries().len(),
            }
        );
        if side >= card.entries().len() {
            self.insert(card);
            return InvalidSideSnafu {
                side,
                sides: self.sides.len(),
            }
            .fail();
        }

        let entry = &mut card.entries_mut()[side];
        let previous_proficiency = entry.proficiency;
        match answer {
            Answer::Correct => {
                let bonus = self.config.time_scale
                    * self.rng.random::<f64>()
                    * 3600.0
                    * overdue_scale(entry.overdue_at(now));
                entry.proficiency = self.config.prof_scale * previous_proficiency + bonus;
                self.retention.total += previous_proficiency;
                self.retention.correct += previous_proficiency;
            }
            Answer::Incorrect => {
                entry.proficiency =
                    (previous_proficiency / self.config.fail_divisor).max(MIN_PROFICIENCY);
                // the post-update proficiency is counted here, unlike the correct branch
                self.retention.total += entry.proficiency;
            }
        }
        entry.due = now + entry.proficiency;

        let outcome = ReviewOutcome {
            side,
            answer,
            previous_proficiency,
            proficiency: entry.proficiency,
            due: entry.due,
        };
        debug!(
            "{answer} answer for {:?}: proficiency {:.0}s -> {:.0}s",
            entry.text, previous_proficiency, outcome.proficiency
        );
        self.insert(card);
        self.dirty = true;
        Ok(outcome)
    }

    /// Reviews whichever enabled side of `card` is due first.
    pub fn answer(&mut self, card: Card, answer: Answer) -> Result<ReviewOutcome> {
        self.answer_at(card, answer, now())
    }

    pub fn answer_at(
        &mut self,
        card: Card,
        answer: Answer,
        now: Timestamp,
    ) -> Result<ReviewOutcome> {
        match self.due_side(&card) {
            Some(side) => self.record_review_at(card, side, answer, now),
            None => {
                self.add(card)?;
                Err(VocabError::NoEnabledSide)
            }
        }
    }

    /// Caps the review backlog at `max_active_cards` cards.
    ///
    /// If the `max_active_cards`-th soonest card is already due, every entry due
    /// after it is pushed back by the time that card has been overdue, so only
    /// the active window is due now. Returns the applied offset.
    pub fn rebase_at(&mut self, now: Timestamp) -> Option<f64> {
        let window = self.config.max_active_cards;
        if self.cards.len() <= window {
            return None;
        }
        let boundary = self
            .cards
            .values()
            .map(|card| card.due_at(&self.enabled))
            .sorted_by(f64::total_cmp)
            .nth(window - 1)?;
        if boundary > now {
            return None;
        }

        let offset = now - boundary;
        let mut shifted = 0;
        for card in self.cards.values_mut() {
            for entry in card.entries_mut() {
                if entry.due > boundary {
                    entry.due += offset;
                    shifted += 1;
                }
            }
        }
        self.rerank_all();
        self.dirty = true;
        info!(
            "rebased {shifted} entries by {:.1} hours to keep {window} cards active",
            offset / 3600.0
        );
        Some(offset)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DEFAULT_MAX_ACTIVE_CARDS;
    use crate::entry::INITIAL_PROFICIENCY;
    use crate::test_helpers::{NOW, card, scheduler};
    use rand::seq::SliceRandom;
    use strum::IntoEnumIterator;

    fn assert_peek_is_global_min(scheduler: &Scheduler) {
        let Ok(top) = scheduler.peek() else {
            assert!(scheduler.is_empty());
            return;
        };
        let min = scheduler
            .cards()
            .map(|card| scheduler.due_at(card))
            .fold(f64::INFINITY, f64::min);
        assert_eq!(scheduler.due_at(top), min);
    }

    #[test]
    fn scenario_pop_returns_added_card() -> Result<()> {
        let mut db = scheduler(&["en", "de"]);
        db.add(card(&[("cat", NOW - 10.0), ("Katze", NOW - 20.0)]))?;

        let popped = db.pop()?;
        assert_eq!(popped.texts().collect::<Vec<_>>(), ["cat", "Katze"]);
        assert_eq!(db.due_entry(&popped).unwrap().text, "Katze");
        assert!(db.is_empty());
        Ok(())
    }

    #[test]
    fn scenario_incorrect_review_hits_the_floor() -> Result<()> {
        let mut db = scheduler(&["en", "de"]);
        let mut cat = card(&[("cat", NOW), ("Katze", NOW + 100.0)]);
        cat.entries_mut()[0].proficiency = 960.0;

        let outcome = db.record_review_at(cat, 0, Answer::Incorrect, NOW)?;
        assert_eq!(outcome.proficiency, 60.0);
        assert_eq!(outcome.due, NOW + 60.0);

        let cat = db.pop()?;
        assert_eq!(cat.entries()[0].proficiency, 60.0);
        assert_eq!(cat.entries()[0].due, NOW + 60.0);
        assert_eq!(cat.entries()[1].due, NOW + 100.0);
        Ok(())
    }

    #[test]
    fn equal_dues_pop_in_insertion_order() -> Result<()> {
        let mut db = scheduler(&["en", "de"]);
        db.add(card(&[("cat", NOW), ("Katze", NOW)]))?;
        db.add(card(&[("dog", NOW), ("Hund", NOW)]))?;

        let first = db.pop()?;
        let second = db.pop()?;
        assert_eq!(first.entries()[0].text, "cat");
        assert_eq!(second.entries()[0].text, "dog");
        assert!(matches!(db.pop(), Err(VocabError::EmptyQueue)));

        // a round trip behaves like a fresh insertion
        db.put_back(first)?;
        db.put_back(second)?;
        assert_eq!(db.pop()?.entries()[0].text, "cat");
        Ok(())
    }

    #[test]
    fn empty_queue_errors() {
        let mut db = scheduler(&["en"]);
        assert!(matches!(db.peek(), Err(VocabError::EmptyQueue)));
        assert!(matches!(db.pop(), Err(VocabError::EmptyQueue)));
    }

    #[test]
    fn peek_stays_minimal_under_random_operations() -> Result<()> {
        let mut rng = StdRng::seed_from_u64(7);
        let mut db = scheduler(&["en", "de"]);
        let mut dues: Vec<f64> = (0..200).map(|i| NOW + (i % 37) as f64 * 11.0).collect();
        dues.shuffle(&mut rng);

        for (i, due) in dues.iter().enumerate() {
            let (en, de) = (format!("en{i}"), format!("de{i}"));
            db.add(card(&[(en.as_str(), *due), (de.as_str(), due + 5.0)]))?;
            assert_peek_is_global_min(&db);
            if i % 3 == 0 {
                db.pop()?;
                assert_peek_is_global_min(&db);
            }
            if i % 7 == 0 {
                let victim = format!("de{}", i / 2);
                db.remove_by_text(&victim);
                assert_peek_is_global_min(&db);
            }
        }

        let mut last = f64::NEG_INFINITY;
        while let Ok(card) = db.pop() {
            let due = db.due_at(&card);
            assert!(due >= last);
            last = due;
        }
        Ok(())
    }

    #[test]
    fn add_rejects_wrong_number_of_entries() {
        let mut db = scheduler(&["en", "de"]);
        let result = db.add(card(&[("cat", NOW)]));
        assert!(matches!(
            result,
            Err(VocabError::SideCountMismatch {
                expected: 2,
                found: 1
            })
        ));
        assert!(!db.is_dirty());
    }

    #[test]
    fn new_cards_are_jittered_and_dirty() -> Result<()> {
        let mut db = scheduler(&["en", "de"]);
        assert!(!db.is_dirty());
        db.add_new_at(["cat", "Katze"], "animal", NOW)?;
        assert!(db.is_dirty());

        let cat = db.peek()?;
        assert_eq!(cat.added(), NOW);
        assert_eq!(cat.comment, "animal");
        for entry in cat.entries() {
            assert_eq!(entry.proficiency, INITIAL_PROFICIENCY);
            assert!(entry.due >= NOW && entry.due < NOW + 300.0);
        }
        Ok(())
    }

    #[test]
    fn correct_answer_without_delay_grows_geometrically() -> Result<()> {
        let mut db = scheduler(&["en", "de"]);
        let mut cat = card(&[("cat", NOW), ("Katze", NOW + 50.0)]);
        cat.entries_mut()[0].proficiency = 1000.0;

        let outcome = db.record_review_at(cat, 0, Answer::Correct, NOW)?;
        assert_eq!(outcome.previous_proficiency, 1000.0);
        assert_eq!(outcome.proficiency, 1750.0);
        assert_eq!(outcome.due, NOW + 1750.0);
        assert_eq!(db.retention(), Retention {
            correct: 1000.0,
            total: 1000.0
        });
        Ok(())
    }

    #[test]
    fn correct_answer_after_delay_earns_a_bounded_bonus() -> Result<()> {
        let mut db = scheduler(&["en"]);
        for i in 0..50 {
            let word = format!("w{i}");
            let entry_card = card(&[(word.as_str(), NOW - 86_400.0)]);
            let outcome = db.record_review_at(entry_card, 0, Answer::Correct, NOW)?;
            let bonus = outcome.proficiency - 1.75 * 60.0;
            assert!(bonus >= 0.0);
            assert!(bonus < 24.0 * 3600.0 + 1e-6);
        }
        Ok(())
    }

    #[test]
    fn overdue_scale_reaches_24_after_a_day() {
        assert_eq!(overdue_scale(0.0), 0.0);
        assert!((overdue_scale(86_400.0) - 24.0).abs() < 1e-9);
    }

    #[test]
    fn incorrect_answers_never_drop_below_the_floor() -> Result<()> {
        let mut db = scheduler(&["en"]);
        for proficiency in [0.0, 1.0, 60.0, 100.0, 959.0, 960.0, 961.0, 1e6] {
            let mut word = card(&[("word", NOW)]);
            word.entries_mut()[0].proficiency = proficiency;
            let outcome = db.record_review_at(word, 0, Answer::Incorrect, NOW)?;
            assert!(outcome.proficiency >= MIN_PROFICIENCY);
            assert_eq!(outcome.proficiency, (proficiency / 16.0).max(60.0));
            db.pop()?;
        }
        Ok(())
    }

    #[test]
    fn retention_counts_post_update_proficiency_on_failure() -> Result<()> {
        let mut db = scheduler(&["en"]);
        assert_eq!(db.retention_ratio(), None);

        let mut word = card(&[("word", NOW)]);
        word.entries_mut()[0].proficiency = 3200.0;
        db.record_review_at(word, 0, Answer::Incorrect, NOW)?;
        assert_eq!(db.retention(), Retention {
            correct: 0.0,
            total: 200.0
        });

        let word = db.pop()?;
        db.record_review_at(word, 0, Answer::Correct, NOW + 200.0)?;
        assert_eq!(db.retention(), Retention {
            correct: 200.0,
            total: 400.0
        });
        assert_eq!(db.retention_ratio(), Some(0.5));
        Ok(())
    }

    #[test]
    fn failed_review_keeps_the_card() -> Result<()> {
        let mut db = scheduler(&["en", "de"]);
        db.add(card(&[("cat", NOW), ("Katze", NOW)]))?;
        let cat = db.pop()?;

        let result = db.record_review_at(cat, 5, Answer::Correct, NOW);
        assert!(matches!(result, Err(VocabError::InvalidSide { side: 5, .. })));
        assert_eq!(db.len(), 1);
        assert_eq!(db.peek()?.entries()[0].due, NOW);
        Ok(())
    }

    #[test]
    fn answer_reviews_the_due_side() -> Result<()> {
        let mut db = scheduler(&["en", "de"]);
        db.add(card(&[("cat", NOW - 5.0), ("Katze", NOW - 50.0)]))?;

        for answer in Answer::iter() {
            let cat = db.pop()?;
            let side = db.due_side(&cat).unwrap();
            let outcome = db.answer_at(cat, answer, NOW)?;
            assert_eq!(outcome.side, side);
            assert_eq!(outcome.answer, answer);
        }
        assert_eq!(db.len(), 1);
        Ok(())
    }

    #[test]
    fn answer_on_disabled_card_puts_it_back() -> Result<()> {
        let mut db = scheduler(&["en", "de"]);
        db.add(card(&[("cat", NOW), ("Katze", NOW)]))?;
        db.set_enabled(0, false)?;
        db.set_enabled(1, false)?;

        let cat = db.pop()?;
        assert!(!db.is_due_at(&cat, f64::MAX));
        assert!(matches!(
            db.answer_at(cat, Answer::Correct, NOW),
            Err(VocabError::NoEnabledSide)
        ));
        assert_eq!(db.len(), 1);
        Ok(())
    }

    #[test]
    fn disabling_a_side_reranks_the_queue() -> Result<()> {
        let mut db = scheduler(&["en", "de"]);
        db.add(card(&[("cat", NOW + 10.0), ("Katze", NOW + 100.0)]))?;
        db.add(card(&[("dog", NOW + 50.0), ("Hund", NOW + 20.0)]))?;
        assert_eq!(db.peek()?.entries()[0].text, "cat");

        db.set_enabled(0, false)?;
        assert_eq!(db.peek()?.entries()[0].text, "dog");
        assert_eq!(db.due_entry(db.peek()?).unwrap().text, "Hund");

        assert!(matches!(
            db.set_enabled(2, true),
            Err(VocabError::InvalidSide { side: 2, sides: 2 })
        ));
        Ok(())
    }

    #[test]
    fn remove_takes_the_soonest_match() -> Result<()> {
        let mut db = scheduler(&["en", "de"]);
        db.add(card(&[("bank", NOW + 10.0), ("Bank", NOW + 10.0)]))?;
        db.add(card(&[("bank", NOW + 5.0), ("Ufer", NOW + 5.0)]))?;
        db.add(card(&[("cat", NOW), ("Katze", NOW)]))?;

        let removed = db.remove_by_text("bank").unwrap();
        assert_eq!(removed.entries()[1].text, "Ufer");
        assert_eq!(db.len(), 2);
        assert!(db.remove_by_text("Hund").is_none());
        assert_eq!(db.peek()?.entries()[0].text, "cat");
        Ok(())
    }

    #[test]
    fn edit_updates_and_reranks() -> Result<()> {
        let mut db = scheduler(&["en", "de"]);
        db.add(card(&[("cat", NOW), ("Katze", NOW)]))?;
        db.add(card(&[("dog", NOW + 10.0), ("Hund", NOW + 10.0)]))?;

        let edited = db.edit(
            |card| card.texts().any(|t| t == "cat"),
            |card| {
                card.comment = "pet".into();
                for entry in card.entries_mut() {
                    entry.due = NOW + 100.0;
                }
            },
        );
        assert!(edited);
        assert_eq!(db.peek()?.entries()[0].text, "dog");
        assert!(!db.edit(|_| false, |_| unreachable!()));
        Ok(())
    }

    #[test]
    fn rebase_keeps_only_the_active_window_due() -> Result<()> {
        let config = SchedulerConfig {
            max_active_cards: 3,
            ..Default::default()
        };
        let mut db = Scheduler::with_config(["en"], config)?.with_seed(1);
        let dues = [-5000.0, -4000.0, -3000.0, -2000.0];
        for (i, due) in dues.iter().enumerate() {
            let word = format!("w{i}");
            db.add(card(&[(word.as_str(), NOW + due)]))?;
        }

        let offset = db.rebase_at(NOW).unwrap();
        assert_eq!(offset, 3000.0);
        assert_eq!(db.due_count_at(NOW), 3);

        let due_times: Vec<_> = db.cards_by_due().iter().map(|c| db.due_at(c)).collect();
        assert_eq!(due_times, [NOW - 5000.0, NOW - 4000.0, NOW - 3000.0, NOW + 1000.0]);
        Ok(())
    }

    #[test]
    fn rebase_is_a_no_op_within_the_window() -> Result<()> {
        let config = SchedulerConfig {
            max_active_cards: 2,
            ..Default::default()
        };
        let mut db = Scheduler::with_config(["en"], config)?.with_seed(1);
        db.add(card(&[("a", NOW - 100.0)]))?;
        db.add(card(&[("b", NOW - 50.0)]))?;
        assert_eq!(db.rebase_at(NOW), None);

        db.add(card(&[("c", NOW + 50.0)]))?;
        db.add(card(&[("d", NOW + 60.0)]))?;
        // boundary card is not due yet
        db.add(card(&[("e", NOW - 10.0)]))?;
        assert_eq!(db.rebase_at(NOW - 60.0), None);
        Ok(())
    }

    #[test]
    fn rebase_shifts_every_later_entry() -> Result<()> {
        let config = SchedulerConfig {
            max_active_cards: 1,
            ..Default::default()
        };
        let mut db = Scheduler::with_config(["en", "de"], config)?.with_seed(1);
        db.add(card(&[("cat", NOW - 100.0), ("Katze", NOW + 500.0)]))?;
        db.add(card(&[("dog", NOW - 50.0), ("Hund", NOW - 40.0)]))?;
        db.set_enabled(1, false)?;

        assert_eq!(db.rebase_at(NOW), Some(100.0));
        let cards = db.cards_by_due();
        let dues: Vec<Vec<f64>> = cards
            .iter()
            .map(|c| c.entries().iter().map(|e| e.due).collect())
            .collect();
        assert_eq!(dues, [
            vec![NOW - 100.0, NOW + 600.0],
            vec![NOW + 50.0, NOW + 60.0]
        ]);
        Ok(())
    }

    #[test]
    fn rebase_window_never_drops_below_one_card() -> Result<()> {
        let mut db = scheduler(&["en"]);
        db.add(card(&[("cat", NOW - 100.0)]))?;
        db.add(card(&[("dog", NOW - 50.0)]))?;

        let empty_window = SchedulerConfig {
            max_active_cards: 0,
            ..Default::default()
        };
        assert!(matches!(
            db.set_config(empty_window),
            Err(VocabError::InvalidConfig { .. })
        ));
        assert_eq!(db.config().max_active_cards, DEFAULT_MAX_ACTIVE_CARDS);
        assert_eq!(db.rebase_at(NOW), None);

        db.set_config(SchedulerConfig {
            max_active_cards: 1,
            ..Default::default()
        })?;
        assert_eq!(db.rebase_at(NOW), Some(100.0));
        Ok(())
    }

    #[test]
    fn retention_is_sampled_at_most_hourly() -> Result<()> {
        let mut db = scheduler(&["en"]);
        assert!(!db.sample_retention_at(NOW));

        db.record_review_at(card(&[("word", NOW)]), 0, Answer::Correct, NOW)?;
        assert!(db.sample_retention_at(NOW));
        assert!(!db.sample_retention_at(NOW + 3599.0));
        assert!(db.sample_retention_at(NOW + 3600.0));
        assert_eq!(db.retention_history(), [
            RetentionSample { at: NOW, ratio: 1.0 },
            RetentionSample {
                at: NOW + 3600.0,
                ratio: 1.0
            }
        ]);
        Ok(())
    }

    #[test]
    fn no_sides_is_an_error() {
        let sides: [&str; 0] = [];
        assert!(matches!(Scheduler::new(sides), Err(VocabError::NoSides)));
    }
}
