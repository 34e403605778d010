// Copyright (c) The storyline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The shared collection of finished scenario outcomes.

use std::{
    collections::BTreeMap,
    sync::{Arc, Mutex, MutexGuard},
};
use storyline_report::{LifecycleState, ModelError, ModelSubject, ResultKind, TestOutcome};
use tracing::debug;

/// An append-only collection of finalized outcomes, shared between runner threads.
///
/// Appends are serialized through a lock. Reads take a snapshot: later appends never show up in
/// a snapshot that was already taken, and taking one never blocks on readers.
#[derive(Debug, Default)]
pub struct OutcomeStore {
    outcomes: Mutex<Arc<Vec<Arc<TestOutcome>>>>,
}

impl OutcomeStore {
    /// Creates a new, empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a finalized outcome and returns the shared handle to it.
    ///
    /// Outcomes that are still running are rejected.
    pub fn append(&self, outcome: TestOutcome) -> Result<Arc<TestOutcome>, ModelError> {
        if !outcome.is_finalized() {
            return Err(ModelError::InvalidState {
                subject: ModelSubject::Outcome,
                operation: "append to the store",
                state: LifecycleState::Running,
            });
        }

        let outcome = Arc::new(outcome);
        let mut outcomes = self.lock();
        // Snapshots taken earlier keep their own copy of the list.
        Arc::make_mut(&mut outcomes).push(outcome.clone());
        debug!(
            scenario = %outcome.id(),
            result = %outcome.result(),
            count = outcomes.len(),
            "appended outcome to store",
        );
        Ok(outcome)
    }

    /// The number of outcomes appended so far.
    pub fn count(&self) -> usize {
        self.lock().len()
    }

    /// Returns a snapshot of every outcome, in append order.
    pub fn all(&self) -> OutcomeSnapshot {
        OutcomeSnapshot {
            outcomes: self.lock().clone(),
        }
    }

    /// Returns the outcome at `index` in append order.
    pub fn get(&self, index: usize) -> Option<Arc<TestOutcome>> {
        self.lock().get(index).cloned()
    }

    /// Lazily yields the outcomes matching `predicate`, in append order.
    ///
    /// The iterator walks a snapshot taken when this is called.
    pub fn filter<F>(&self, mut predicate: F) -> impl Iterator<Item = Arc<TestOutcome>> + use<F>
    where
        F: FnMut(&TestOutcome) -> bool,
    {
        self.all()
            .into_iter()
            .filter(move |outcome| predicate(outcome))
    }

    /// The number of outcomes whose result is `result`.
    pub fn count_where(&self, result: ResultKind) -> usize {
        self.all()
            .iter()
            .filter(|outcome| outcome.result() == result)
            .count()
    }

    /// Returns the first outcome, in append order, for a scenario called `name`.
    pub fn find_by_name(&self, name: &str) -> Option<Arc<TestOutcome>> {
        self.all()
            .iter()
            .find(|outcome| outcome.name() == name)
            .cloned()
    }

    /// Returns the number of outcomes for each result that occurs at least once.
    pub fn result_counts(&self) -> BTreeMap<ResultKind, usize> {
        self.all().result_counts()
    }

    fn lock(&self) -> MutexGuard<'_, Arc<Vec<Arc<TestOutcome>>>> {
        // Appends are a single push, so a panic while holding the lock cannot leave the list in a
        // partial state.
        self.outcomes
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// A point-in-time view of an [`OutcomeStore`].
///
/// Iterating does not consume the snapshot; [`iter`](Self::iter) can be called any number of
/// times.
#[derive(Clone, Debug, Default)]
pub struct OutcomeSnapshot {
    outcomes: Arc<Vec<Arc<TestOutcome>>>,
}

impl OutcomeSnapshot {
    /// Creates a snapshot holding the given outcomes, for example ones loaded from disk.
    pub fn from_outcomes(outcomes: impl IntoIterator<Item = Arc<TestOutcome>>) -> Self {
        Self {
            outcomes: Arc::new(outcomes.into_iter().collect()),
        }
    }

    /// The number of outcomes in the snapshot.
    pub fn len(&self) -> usize {
        self.outcomes.len()
    }

    /// Returns true if the snapshot is empty.
    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }

    /// Iterates over the outcomes in append order.
    pub fn iter(&self) -> impl ExactSizeIterator<Item = &Arc<TestOutcome>> + '_ {
        self.outcomes.iter()
    }

    /// Returns the number of outcomes for each result that occurs at least once.
    pub fn result_counts(&self) -> BTreeMap<ResultKind, usize> {
        let mut counts = BTreeMap::new();
        for outcome in self.iter() {
            *counts.entry(outcome.result()).or_default() += 1;
        }
        counts
    }
}

impl IntoIterator for OutcomeSnapshot {
    type Item = Arc<TestOutcome>;
    type IntoIter = SnapshotIntoIter;

    fn into_iter(self) -> Self::IntoIter {
        SnapshotIntoIter {
            outcomes: self.outcomes,
            next: 0,
        }
    }
}

/// An owning iterator over an [`OutcomeSnapshot`].
#[derive(Clone, Debug)]
pub struct SnapshotIntoIter {
    outcomes: Arc<Vec<Arc<TestOutcome>>>,
    next: usize,
}

impl Iterator for SnapshotIntoIter {
    type Item = Arc<TestOutcome>;

    fn next(&mut self) -> Option<Self::Item> {
        let outcome = self.outcomes.get(self.next)?.clone();
        self.next += 1;
        Some(outcome)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.outcomes.len().saturating_sub(self.next);
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for SnapshotIntoIter {}

impl<'a> IntoIterator for &'a OutcomeSnapshot {
    type Item = &'a Arc<TestOutcome>;
    type IntoIter = std::slice::Iter<'a, Arc<TestOutcome>>;

    fn into_iter(self) -> Self::IntoIter {
        self.outcomes.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::thread;
    use storyline_report::{ScenarioId, TestStep};

    fn finished(name: &str, results: &[ResultKind]) -> TestOutcome {
        let mut outcome = TestOutcome::new(ScenarioId::new("stories/store.story", name).unwrap());
        for (index, &result) in results.iter().enumerate() {
            outcome
                .add_step(TestStep::leaf(format!("step {index}"), result).unwrap())
                .unwrap();
        }
        outcome.finalize().unwrap();
        outcome
    }

    #[test]
    fn append_and_read_back() {
        let store = OutcomeStore::new();
        assert_eq!(store.count(), 0);
        assert!(store.all().is_empty());

        store
            .append(finished("passes", &[ResultKind::Success]))
            .unwrap();
        store
            .append(finished(
                "fails",
                &[ResultKind::Success, ResultKind::Failure],
            ))
            .unwrap();
        store
            .append(finished("pending", &[ResultKind::Pending]))
            .unwrap();

        assert_eq!(store.count(), 3);
        assert_eq!(store.get(1).unwrap().name(), "fails");
        assert!(store.get(3).is_none());
        assert_eq!(store.count_where(ResultKind::Failure), 1);
        assert_eq!(store.count_where(ResultKind::Error), 0);
        assert_eq!(
            store.find_by_name("pending").unwrap().result(),
            ResultKind::Pending
        );
        assert!(store.find_by_name("missing").is_none());

        let failing: Vec<_> = store
            .filter(|outcome| outcome.result().is_failing())
            .map(|outcome| outcome.name().to_owned())
            .collect();
        assert_eq!(failing, ["fails"]);

        assert_eq!(
            store.result_counts(),
            BTreeMap::from([
                (ResultKind::Success, 1),
                (ResultKind::Pending, 1),
                (ResultKind::Failure, 1),
            ])
        );
    }

    #[test]
    fn append_rejects_running_outcome() {
        let store = OutcomeStore::new();
        let outcome = TestOutcome::new(ScenarioId::new("stories/store.story", "running").unwrap());
        let error = store.append(outcome).unwrap_err();
        assert!(error.is_invalid_state());
        assert_eq!(store.count(), 0);
    }

    #[test]
    fn snapshot_is_isolated_from_later_appends() {
        let store = OutcomeStore::new();
        store.append(finished("first", &[])).unwrap();

        let snapshot = store.all();
        store.append(finished("second", &[])).unwrap();

        assert_eq!(snapshot.len(), 1);
        assert_eq!(store.all().len(), 2);

        // A snapshot can be walked more than once.
        let names: Vec<_> = snapshot.iter().map(|outcome| outcome.name()).collect();
        let names_again: Vec<_> = (&snapshot).into_iter().map(|outcome| outcome.name()).collect();
        assert_eq!(names, ["first"]);
        assert_eq!(names, names_again);
    }

    #[test]
    fn filter_walks_the_snapshot_taken_when_called() {
        let store = OutcomeStore::new();
        store
            .append(finished("early", &[ResultKind::Failure]))
            .unwrap();

        let failing = store.filter(|outcome| outcome.result().is_failing());
        store
            .append(finished("late", &[ResultKind::Failure]))
            .unwrap();

        let names: Vec<_> = failing.map(|outcome| outcome.name().to_owned()).collect();
        assert_eq!(names, ["early"]);
        assert_eq!(store.filter(|_| true).count(), 2);
    }

    #[test]
    fn concurrent_appends_are_all_visible() {
        const THREADS: usize = 8;
        const PER_THREAD: usize = 25;

        let store = Arc::new(OutcomeStore::new());
        thread::scope(|scope| {
            for thread_index in 0..THREADS {
                let store = store.clone();
                scope.spawn(move || {
                    for index in 0..PER_THREAD {
                        let name = format!("thread {thread_index} scenario {index}");
                        store
                            .append(finished(&name, &[ResultKind::Success]))
                            .unwrap();
                        // Reads interleave with appends from other threads.
                        assert!(store.count() > index);
                    }
                });
            }
        });

        assert_eq!(store.count(), THREADS * PER_THREAD);
        assert_eq!(
            store.count_where(ResultKind::Success),
            THREADS * PER_THREAD
        );
        for thread_index in 0..THREADS {
            let last = format!("thread {thread_index} scenario {}", PER_THREAD - 1);
            assert!(store.find_by_name(&last).is_some(), "{last} is recorded");
        }
    }
}
