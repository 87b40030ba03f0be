/// Outcome of planning an add, computed without mutating anything.
///
/// `target_slots[i]` receives `slot_delta_counts[i]` units. Callers use the
/// plan to decide whether to split an item before moving it.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AddPlan {
    pub target_slots: Vec<usize>,
    pub slot_delta_counts: Vec<u32>,
    /// Units that will be added in total.
    pub delta_count: u32,
    /// Units of the item that will not fit.
    pub remainder_count: u32,
    pub will_add_full_amount: bool,
    /// More than one slot receives units.
    pub will_split: bool,
}

impl AddPlan {
    pub(crate) fn add_count_to_slot(&mut self, slot: usize, delta: u32) {
        match self.target_slots.iter().position(|&s| s == slot) {
            Some(index) => self.slot_delta_counts[index] += delta,
            None => {
                self.target_slots.push(slot);
                self.slot_delta_counts.push(delta);
            }
        }
    }

    pub(crate) fn update_derived_values(&mut self, item_count: u32) {
        self.delta_count = self.slot_delta_counts.iter().sum();
        self.remainder_count = item_count.saturating_sub(self.delta_count);
        self.will_add_full_amount = self.delta_count > 0 && self.remainder_count == 0;
        self.will_split = self.target_slots.len() > 1;
    }

    /// Plan that adds nothing.
    pub(crate) fn rejected(item_count: u32) -> Self {
        let mut plan = Self::default();
        plan.update_derived_values(item_count);
        plan
    }

    pub fn is_empty(&self) -> bool {
        self.target_slots.is_empty()
    }

    pub fn slots(&self) -> impl Iterator<Item = (usize, u32)> + '_ {
        self.target_slots
            .iter()
            .copied()
            .zip(self.slot_delta_counts.iter().copied())
    }
}
