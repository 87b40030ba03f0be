//! Per-owner equipment component.
//!
//! Applying and removing equipment is authority-only. Callers on any role use
//! [`EquipmentComponent::apply_equipment_spec`] and
//! [`EquipmentComponent::remove_equipment_by_def`], which compute a
//! [`NetExecutionPlan`] per call: the authority applies immediately, an
//! autonomous proxy queues an [`EquipmentCommand`] for the server, and a
//! simulated proxy does nothing.

use tracing::{debug, error, trace};

use crate::error::{ErrorSeverity, ItemsError};
use crate::item::ItemId;
use crate::replication::{FastArrayDelta, FastArrayObserver, NetExecutionPlan, NetRole};

use super::EquipmentDefId;
use super::list::{Equipment, EquipmentId, EquipmentList, EquipmentSpec};

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum EquipmentError {
    /// A forwarded command reached a component without authority.
    #[error("equipment of {owner} is not authoritative (role: {role})")]
    NotAuthority { owner: String, role: NetRole },

    /// Deltas flow from the authority, never into it.
    #[error("equipment of {owner} is authoritative and cannot apply deltas")]
    AuthorityTarget { owner: String },
}

impl ItemsError for EquipmentError {
    fn severity(&self) -> ErrorSeverity {
        ErrorSeverity::Internal
    }

    fn error_code(&self) -> &'static str {
        match self {
            EquipmentError::NotAuthority { .. } => "EQUIPMENT_NOT_AUTHORITY",
            EquipmentError::AuthorityTarget { .. } => "EQUIPMENT_AUTHORITY_TARGET",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum EquipmentCommand {
    ApplySpec {
        spec: EquipmentSpec,
        instigator: Option<ItemId>,
    },
    RemoveByDef {
        def: EquipmentDefId,
    },
}

#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum EquipmentEvent {
    Equipped { id: EquipmentId, def: EquipmentDefId },
    Unequipped { id: EquipmentId, def: EquipmentDefId },
}

/// Replicated equipment state since a baseline.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EquipmentDelta {
    pub list: FastArrayDelta<Equipment>,
    pub active: bool,
}

#[derive(Clone, Debug)]
pub struct EquipmentComponent {
    owner: String,
    role: NetRole,
    active: bool,
    list: EquipmentList,
    events: Vec<EquipmentEvent>,
    outbox: Vec<EquipmentCommand>,
}

impl EquipmentComponent {
    /// Creates an active component.
    pub fn new(owner: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            role: NetRole::Authority,
            active: true,
            list: EquipmentList::new(),
            events: Vec::new(),
            outbox: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_role(mut self, role: NetRole) -> Self {
        self.role = role;
        self
    }

    pub fn owner(&self) -> &str {
        &self.owner
    }

    pub fn role(&self) -> NetRole {
        self.role
    }

    pub fn set_role(&mut self, role: NetRole) {
        self.role = role;
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn list(&self) -> &EquipmentList {
        &self.list
    }

    pub fn take_events(&mut self) -> Vec<EquipmentEvent> {
        std::mem::take(&mut self.events)
    }

    pub fn take_outbox(&mut self) -> Vec<EquipmentCommand> {
        std::mem::take(&mut self.outbox)
    }

    // ------------------------------------------------------------------
    // Authority-only
    // ------------------------------------------------------------------

    /// Grants equipment, equipping it immediately when the component is active.
    pub fn apply_equipment(
        &mut self,
        spec: EquipmentSpec,
        instigator: Option<ItemId>,
    ) -> Option<EquipmentId> {
        if !self.role.has_authority() {
            self.authority_violation("apply_equipment");
            return None;
        }
        let def = spec.def.clone();
        let id = self.list.add_entry(spec, instigator);
        if self.active {
            self.equip(id);
        }
        trace!(owner = %self.owner, %id, %def, instigator = ?instigator, "applied equipment");
        Some(id)
    }

    pub fn remove_equipment(&mut self, id: EquipmentId) -> bool {
        if !self.role.has_authority() {
            self.authority_violation("remove_equipment");
            return false;
        }
        self.unequip(id);
        match self.list.remove_entry(id) {
            Some(equipment) => {
                trace!(owner = %self.owner, %id, def = %equipment.def, "removed equipment");
                true
            }
            None => false,
        }
    }

    pub fn remove_all_equipment(&mut self) {
        if !self.role.has_authority() {
            self.authority_violation("remove_all_equipment");
            return;
        }
        let ids: Vec<EquipmentId> = self.list.entries().iter().map(|e| e.id).collect();
        for id in ids {
            self.remove_equipment(id);
        }
    }

    // ------------------------------------------------------------------
    // Any role
    // ------------------------------------------------------------------

    pub fn apply_equipment_spec(&mut self, spec: EquipmentSpec, instigator: Option<ItemId>) {
        let plan = NetExecutionPlan::for_role(self.role);
        if plan.execute_on_server {
            debug!(owner = %self.owner, def = %spec.def, "forwarding equipment spec to server");
            self.outbox.push(EquipmentCommand::ApplySpec {
                spec: spec.clone(),
                instigator,
            });
        }
        if plan.execute_locally {
            self.apply_equipment(spec, instigator);
        }
    }

    /// Removes the first equipment of `def`.
    pub fn remove_equipment_by_def(&mut self, def: &EquipmentDefId) {
        let plan = NetExecutionPlan::for_role(self.role);
        if plan.execute_on_server {
            debug!(owner = %self.owner, %def, "forwarding equipment removal to server");
            self.outbox
                .push(EquipmentCommand::RemoveByDef { def: def.clone() });
        }
        if plan.execute_locally {
            if let Some(id) = self.find_equipment_by_def(def).map(|e| e.id) {
                self.remove_equipment(id);
            }
        }
    }

    /// Executes a command forwarded by an autonomous proxy.
    pub fn apply_command(&mut self, command: EquipmentCommand) -> Result<(), EquipmentError> {
        if !self.role.has_authority() {
            return Err(EquipmentError::NotAuthority {
                owner: self.owner.clone(),
                role: self.role,
            });
        }
        match command {
            EquipmentCommand::ApplySpec { spec, instigator } => {
                self.apply_equipment(spec, instigator);
            }
            EquipmentCommand::RemoveByDef { def } => self.remove_equipment_by_def(&def),
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------

    pub fn find_equipment_by_def(&self, def: &EquipmentDefId) -> Option<&Equipment> {
        self.list.entries().iter().find(|e| &e.def == def)
    }

    pub fn find_all_equipment_by_instigator(&self, instigator: ItemId) -> Vec<&Equipment> {
        self.list
            .entries()
            .iter()
            .filter(|e| e.instigator == Some(instigator))
            .collect()
    }

    pub fn all_equipment(&self) -> &[Equipment] {
        self.list.entries()
    }

    // ------------------------------------------------------------------
    // Activation
    // ------------------------------------------------------------------

    /// Equips everything. Equipment is kept while inactive, just unequipped.
    pub fn activate(&mut self) {
        self.active = true;
        let ids: Vec<EquipmentId> = self.list.entries().iter().map(|e| e.id).collect();
        for id in ids {
            self.equip(id);
        }
    }

    pub fn deactivate(&mut self) {
        self.active = false;
        let ids: Vec<EquipmentId> = self.list.entries().iter().map(|e| e.id).collect();
        for id in ids {
            self.unequip(id);
        }
    }

    // ------------------------------------------------------------------
    // Replication
    // ------------------------------------------------------------------

    pub fn snapshot(&self) -> Vec<Equipment> {
        self.list.entries().to_vec()
    }

    pub fn delta_since(&self, baseline: &[Equipment]) -> EquipmentDelta {
        EquipmentDelta {
            list: self.list.diff(baseline),
            active: self.active,
        }
    }

    /// Applies authority state; entries are equipped on arrival and
    /// unequipped before they are dropped.
    pub fn apply_delta(&mut self, delta: EquipmentDelta) -> Result<(), EquipmentError> {
        if self.role.has_authority() {
            return Err(EquipmentError::AuthorityTarget {
                owner: self.owner.clone(),
            });
        }

        let mut replicated = ReplicatedEquipment::default();
        self.list.apply_delta(delta.list, &mut replicated);

        for (id, def) in replicated.removed {
            self.events.push(EquipmentEvent::Unequipped { id, def });
        }
        for id in replicated.arrived {
            if let Some(equipment) = self.list.get_mut(id) {
                equipment.equipped = false;
            }
        }
        if delta.active {
            self.activate();
        } else if self.active {
            self.deactivate();
        }
        Ok(())
    }

    fn equip(&mut self, id: EquipmentId) {
        if let Some(equipment) = self.list.get_mut(id) {
            if !equipment.equipped {
                equipment.equipped = true;
                self.events.push(EquipmentEvent::Equipped {
                    id,
                    def: equipment.def.clone(),
                });
            }
        }
    }

    fn unequip(&mut self, id: EquipmentId) {
        if let Some(equipment) = self.list.get_mut(id) {
            if equipment.equipped {
                equipment.equipped = false;
                self.events.push(EquipmentEvent::Unequipped {
                    id,
                    def: equipment.def.clone(),
                });
            }
        }
    }

    fn authority_violation(&self, operation: &str) {
        error!(owner = %self.owner, role = %self.role, operation, "equipment change requires authority");
    }
}

#[derive(Default)]
struct ReplicatedEquipment {
    removed: Vec<(EquipmentId, EquipmentDefId)>,
    arrived: Vec<EquipmentId>,
}

impl FastArrayObserver<Equipment> for ReplicatedEquipment {
    fn pre_replicated_remove(&mut self, indices: &[usize], items: &[Equipment]) {
        self.removed.extend(
            indices
                .iter()
                .filter(|&&i| items[i].equipped)
                .map(|&i| (items[i].id, items[i].def.clone())),
        );
    }

    fn post_replicated_add(&mut self, indices: &[usize], items: &[Equipment]) {
        self.arrived.extend(indices.iter().map(|&i| items[i].id));
    }

    fn post_replicated_change(&mut self, indices: &[usize], items: &[Equipment]) {
        self.arrived.extend(indices.iter().map(|&i| items[i].id));
    }
}
