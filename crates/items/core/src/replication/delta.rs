//! Fast-array style incremental replication.
//!
//! A replicated array assigns every element a stable [`ReplicationId`] and a
//! replication key that is bumped whenever the element changes. The authority
//! diffs the current array against the baseline it last sent and ships only
//! `{added, removed, changed}`; replicas apply the delta in that order and
//! notify an observer so listeners can react.

use std::collections::HashMap;

use super::ReplicationId;

/// Incremental update for one replicated array.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FastArrayDelta<T> {
    pub added: Vec<T>,
    pub removed: Vec<ReplicationId>,
    pub changed: Vec<T>,
}

impl<T> FastArrayDelta<T> {
    pub fn new() -> Self {
        Self {
            added: Vec::new(),
            removed: Vec::new(),
            changed: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty() && self.changed.is_empty()
    }
}

impl<T> Default for FastArrayDelta<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Element of a replicated array.
pub trait FastArrayItem: Clone {
    fn replication_id(&self) -> ReplicationId;

    /// Bumped by the owner on every change that must be replicated.
    fn replication_key(&self) -> u32;
}

/// Callbacks fired while a replica applies a [`FastArrayDelta`].
///
/// Removal fires before the entries are dropped so listeners can still read
/// them. Add and change fire after the entries are live. Indices refer to the
/// array as it is when the callback runs.
pub trait FastArrayObserver<T> {
    fn pre_replicated_remove(&mut self, _indices: &[usize], _items: &[T]) {}
    fn post_replicated_add(&mut self, _indices: &[usize], _items: &[T]) {}
    fn post_replicated_change(&mut self, _indices: &[usize], _items: &[T]) {}
}

/// Observer that ignores every callback.
pub struct NoopObserver;

impl<T> FastArrayObserver<T> for NoopObserver {}

/// Diffs `after` against the `before` baseline.
///
/// Removed ids are reported in baseline order so deltas are deterministic.
pub fn diff_fast_array<T: FastArrayItem>(before: &[T], after: &[T]) -> FastArrayDelta<T> {
    let mut before_map: HashMap<ReplicationId, &T> = before
        .iter()
        .map(|item| (item.replication_id(), item))
        .collect();
    let mut delta = FastArrayDelta::new();

    for entry in after {
        match before_map.remove(&entry.replication_id()) {
            Some(prev) => {
                if prev.replication_key() != entry.replication_key() {
                    delta.changed.push(entry.clone());
                }
            }
            None => delta.added.push(entry.clone()),
        }
    }

    delta.removed = before
        .iter()
        .map(FastArrayItem::replication_id)
        .filter(|id| before_map.contains_key(id))
        .collect();
    delta
}

/// Applies `delta` to a replica array, notifying `observer`.
///
/// Changed entries whose id is unknown are treated as additions; removals of
/// unknown ids are ignored.
pub fn apply_fast_array<T, O>(items: &mut Vec<T>, delta: FastArrayDelta<T>, observer: &mut O)
where
    T: FastArrayItem,
    O: FastArrayObserver<T> + ?Sized,
{
    let mut removed: Vec<usize> = delta
        .removed
        .iter()
        .filter_map(|id| items.iter().position(|item| item.replication_id() == *id))
        .collect();
    if !removed.is_empty() {
        observer.pre_replicated_remove(&removed, items);
        removed.sort_unstable();
        for index in removed.into_iter().rev() {
            items.remove(index);
        }
    }

    let mut added = Vec::with_capacity(delta.added.len());
    let mut changed = Vec::with_capacity(delta.changed.len());

    for entry in delta.changed {
        match items
            .iter()
            .position(|item| item.replication_id() == entry.replication_id())
        {
            Some(index) => {
                items[index] = entry;
                changed.push(index);
            }
            None => {
                items.push(entry);
                added.push(items.len() - 1);
            }
        }
    }

    for entry in delta.added {
        match items
            .iter()
            .position(|item| item.replication_id() == entry.replication_id())
        {
            Some(index) => {
                items[index] = entry;
                changed.push(index);
            }
            None => {
                items.push(entry);
                added.push(items.len() - 1);
            }
        }
    }

    if !added.is_empty() {
        observer.post_replicated_add(&added, items);
    }
    if !changed.is_empty() {
        observer.post_replicated_change(&changed, items);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Clone, Debug, PartialEq, Eq)]
    struct Entry {
        id: u32,
        key: u32,
        value: &'static str,
    }

    impl FastArrayItem for Entry {
        fn replication_id(&self) -> ReplicationId {
            ReplicationId(self.id)
        }

        fn replication_key(&self) -> u32 {
            self.key
        }
    }

    fn entry(id: u32, key: u32, value: &'static str) -> Entry {
        Entry { id, key, value }
    }

    #[derive(Default)]
    struct Recorder {
        calls: Vec<String>,
    }

    impl FastArrayObserver<Entry> for Recorder {
        fn pre_replicated_remove(&mut self, indices: &[usize], items: &[Entry]) {
            for &i in indices {
                self.calls.push(format!("remove {}", items[i].value));
            }
        }

        fn post_replicated_add(&mut self, indices: &[usize], items: &[Entry]) {
            for &i in indices {
                self.calls.push(format!("add {}", items[i].value));
            }
        }

        fn post_replicated_change(&mut self, indices: &[usize], items: &[Entry]) {
            for &i in indices {
                self.calls.push(format!("change {}", items[i].value));
            }
        }
    }

    #[test]
    fn diff_reports_disjoint_sets() {
        let before = vec![entry(1, 0, "a"), entry(2, 0, "b"), entry(3, 0, "c")];
        let after = vec![entry(1, 0, "a"), entry(3, 1, "c2"), entry(4, 0, "d")];

        let delta = diff_fast_array(&before, &after);

        assert_eq!(delta.added, vec![entry(4, 0, "d")]);
        assert_eq!(delta.removed, vec![ReplicationId(2)]);
        assert_eq!(delta.changed, vec![entry(3, 1, "c2")]);
    }

    #[test]
    fn unchanged_arrays_produce_empty_delta() {
        let items = vec![entry(1, 3, "a")];
        assert!(diff_fast_array(&items, &items).is_empty());
    }

    #[test]
    fn removal_is_observed_before_drop_and_add_after_insert() {
        let before = vec![entry(1, 0, "a"), entry(2, 0, "b")];
        let after = vec![entry(2, 1, "b2"), entry(5, 0, "e")];
        let delta = diff_fast_array(&before, &after);

        let mut replica = before.clone();
        let mut recorder = Recorder::default();
        apply_fast_array(&mut replica, delta, &mut recorder);

        assert_eq!(recorder.calls, vec!["remove a", "add e", "change b2"]);
        assert_eq!(replica, after);
    }
}
