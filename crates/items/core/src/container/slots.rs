use std::collections::BTreeSet;

use crate::events::ContainerEvent;
use crate::tag::Tag;

/// Batches slot change notifications across nested operations.
///
/// Slots touched while at least one scope is open are broadcast when the
/// outermost scope closes, as contiguous ranges.
#[derive(Clone, Debug, Default)]
pub struct SlotChangeTracker {
    depth: u32,
    pending: BTreeSet<usize>,
    num_slots_before: usize,
}

impl SlotChangeTracker {
    pub fn begin(&mut self, num_slots: usize) {
        if self.depth == 0 {
            self.num_slots_before = num_slots;
        }
        self.depth += 1;
    }

    pub fn is_active(&self) -> bool {
        self.depth > 0
    }

    pub fn mark(&mut self, slot: usize) {
        self.pending.insert(slot);
    }

    pub fn mark_range(&mut self, start: usize, end: usize) {
        self.pending.extend(start..=end);
    }

    /// Closes a scope. At the outermost scope the pending slots are turned
    /// into events followed by `NumSlotsChanged` when the count moved.
    pub fn end(&mut self, container: &Tag, num_slots: usize) -> Vec<ContainerEvent> {
        debug_assert!(self.depth > 0, "unbalanced slot change scope");
        self.depth = self.depth.saturating_sub(1);
        if self.depth > 0 {
            return Vec::new();
        }

        let mut events = Vec::new();
        let pending = std::mem::take(&mut self.pending);
        let mut range: Option<(usize, usize)> = None;
        for slot in pending {
            range = match range {
                Some((start, end)) if slot == end + 1 => Some((start, slot)),
                Some(done) => {
                    events.push(range_event(container, done));
                    Some((slot, slot))
                }
                None => Some((slot, slot)),
            };
        }
        if let Some(done) = range {
            events.push(range_event(container, done));
        }

        if num_slots != self.num_slots_before {
            events.push(ContainerEvent::NumSlotsChanged {
                container: container.clone(),
                new: num_slots,
                old: self.num_slots_before,
            });
        }
        events
    }
}

fn range_event(container: &Tag, (start, end): (usize, usize)) -> ContainerEvent {
    if start == end {
        ContainerEvent::SlotChanged {
            container: container.clone(),
            slot: start,
        }
    } else {
        ContainerEvent::SlotsChanged {
            container: container.clone(),
            start,
            end,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nested_scopes_flush_once_as_ranges() {
        let bag = Tag::from("Container.Bag");
        let mut tracker = SlotChangeTracker::default();

        tracker.begin(2);
        tracker.mark(0);
        tracker.begin(2);
        tracker.mark(1);
        tracker.mark(2);
        tracker.mark(5);
        assert!(tracker.end(&bag, 3).is_empty());

        let events = tracker.end(&bag, 3);
        assert_eq!(
            events,
            vec![
                ContainerEvent::SlotsChanged {
                    container: bag.clone(),
                    start: 0,
                    end: 2
                },
                ContainerEvent::SlotChanged {
                    container: bag.clone(),
                    slot: 5
                },
                ContainerEvent::NumSlotsChanged {
                    container: bag,
                    new: 3,
                    old: 2
                },
            ]
        );
        assert!(!tracker.is_active());
    }
}
