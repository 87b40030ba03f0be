//! Replicated tag -> count stacks backing an item's tag stats.

use std::collections::HashMap;

use tracing::warn;

use crate::replication::{
    FastArrayDelta, FastArrayItem, NoopObserver, ReplicationId, ReplicationIdAllocator,
    apply_fast_array, diff_fast_array,
};
use crate::tag::Tag;

#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TagStack {
    pub tag: Tag,
    pub count: i32,
    pub replication_id: ReplicationId,
    pub replication_key: u32,
}

impl FastArrayItem for TagStack {
    fn replication_id(&self) -> ReplicationId {
        self.replication_id
    }

    fn replication_key(&self) -> u32 {
        self.replication_key
    }
}

/// Ordered tag stacks with a lookup cache kept in sync on every mutation and
/// after replication.
#[derive(Clone, Debug, Default)]
pub struct TagStackContainer {
    stacks: Vec<TagStack>,
    cache: HashMap<Tag, i32>,
    ids: ReplicationIdAllocator,
}

impl PartialEq for TagStackContainer {
    fn eq(&self, other: &Self) -> bool {
        self.cache == other.cache
    }
}

impl TagStackContainer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `delta` to the stack for `tag`, creating it when missing.
    ///
    /// Returns `(new, old)` when the value changed.
    pub fn add_stack(&mut self, tag: &Tag, delta: i32) -> Option<(i32, i32)> {
        if !tag.is_valid() {
            warn!(target: "items::tag_stats", "ignoring stat change for invalid tag {tag:?}");
            return None;
        }
        if delta <= 0 {
            return None;
        }

        let old = self.count(tag);
        match self.stacks.iter_mut().find(|s| &s.tag == tag) {
            Some(stack) => {
                stack.count = stack.count.saturating_add(delta);
                stack.replication_key = stack.replication_key.wrapping_add(1);
                self.cache.insert(tag.clone(), stack.count);
            }
            None => {
                let replication_id = self.ids.allocate();
                self.stacks.push(TagStack {
                    tag: tag.clone(),
                    count: delta,
                    replication_id,
                    replication_key: 0,
                });
                self.cache.insert(tag.clone(), delta);
            }
        }
        let new = self.count(tag);
        (new != old).then_some((new, old))
    }

    /// Removes `delta` from the stack for `tag`; the stack is dropped when it
    /// would reach zero or below.
    pub fn remove_stack(&mut self, tag: &Tag, delta: i32) -> Option<(i32, i32)> {
        if !tag.is_valid() {
            warn!(target: "items::tag_stats", "ignoring stat change for invalid tag {tag:?}");
            return None;
        }
        if delta <= 0 {
            return None;
        }

        let index = self.stacks.iter().position(|s| &s.tag == tag)?;
        let old = self.stacks[index].count;
        if old <= delta {
            self.stacks.remove(index);
            self.cache.remove(tag);
            Some((0, old))
        } else {
            let stack = &mut self.stacks[index];
            stack.count -= delta;
            stack.replication_key = stack.replication_key.wrapping_add(1);
            self.cache.insert(tag.clone(), stack.count);
            Some((stack.count, old))
        }
    }

    /// Current value, zero when absent.
    pub fn count(&self, tag: &Tag) -> i32 {
        self.cache.get(tag).copied().unwrap_or(0)
    }

    pub fn contains(&self, tag: &Tag) -> bool {
        self.cache.contains_key(tag)
    }

    pub fn stacks(&self) -> &[TagStack] {
        &self.stacks
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Tag, i32)> {
        self.stacks.iter().map(|s| (&s.tag, s.count))
    }

    pub fn is_empty(&self) -> bool {
        self.stacks.is_empty()
    }

    pub fn clear(&mut self) {
        self.stacks.clear();
        self.cache.clear();
    }

    pub fn diff(&self, baseline: &[TagStack]) -> FastArrayDelta<TagStack> {
        diff_fast_array(baseline, &self.stacks)
    }

    /// Applies an authority delta and rebuilds the lookup cache.
    ///
    /// Returns `(tag, new, old)` for every value that changed.
    pub fn apply_delta(&mut self, delta: FastArrayDelta<TagStack>) -> Vec<(Tag, i32, i32)> {
        let before = self.cache.clone();
        for stack in delta.added.iter().chain(delta.changed.iter()) {
            self.ids.observe(stack.replication_id);
        }
        apply_fast_array(&mut self.stacks, delta, &mut NoopObserver);
        self.rebuild_cache();

        let mut changes = Vec::new();
        for stack in &self.stacks {
            let old = before.get(&stack.tag).copied().unwrap_or(0);
            if old != stack.count {
                changes.push((stack.tag.clone(), stack.count, old));
            }
        }
        for (tag, old) in before {
            if !self.cache.contains_key(&tag) {
                changes.push((tag, 0, old));
            }
        }
        changes
    }

    fn rebuild_cache(&mut self) {
        self.cache = self
            .stacks
            .iter()
            .map(|s| (s.tag.clone(), s.count))
            .collect();
    }
}
