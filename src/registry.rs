//! # Graph Registry
//!
//! The shared key-value store editing units publish through. Keys are
//! (producing-unit id, output-slot id); wiring between units is external.
//! Each owner writes only keys prefixed with its own unit id — that is a
//! convention of the callers, not enforced here.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::model::{DerivedGeometry, GeometricModel};

/// A payload published to an output slot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum SlotPayload {
    Model(GeometricModel),
    Derived(DerivedGeometry),
}

/// Shared registry of published payloads, keyed by (unit id, slot id).
#[derive(Debug, Clone, Default)]
pub struct GraphRegistry {
    slots: HashMap<(String, String), SlotPayload>,
}

impl GraphRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Publish a payload, replacing any previous value in the slot.
    pub fn publish(&mut self, unit_id: &str, slot_id: &str, payload: SlotPayload) {
        self.slots
            .insert((unit_id.to_string(), slot_id.to_string()), payload);
    }

    /// Read a slot published by another unit.
    pub fn read(&self, unit_id: &str, slot_id: &str) -> Option<&SlotPayload> {
        self.slots.get(&(unit_id.to_string(), slot_id.to_string()))
    }

    /// Remove one slot. Returns the removed payload, if any.
    pub fn remove(&mut self, unit_id: &str, slot_id: &str) -> Option<SlotPayload> {
        self.slots.remove(&(unit_id.to_string(), slot_id.to_string()))
    }

    /// Remove every slot a unit has published.
    pub fn remove_unit(&mut self, unit_id: &str) {
        self.slots.retain(|(unit, _), _| unit != unit_id);
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Rect;

    fn model() -> GeometricModel {
        GeometricModel::new(vec![], Rect::new(0.0, 0.0, 10.0, 10.0))
    }

    #[test]
    fn publish_read_remove() {
        let mut reg = GraphRegistry::new();
        reg.publish("unit-1", "out-0", SlotPayload::Model(model()));
        assert!(reg.read("unit-1", "out-0").is_some());
        assert!(reg.read("unit-1", "out-1").is_none());
        assert!(reg.read("unit-2", "out-0").is_none());

        assert!(reg.remove("unit-1", "out-0").is_some());
        assert!(reg.is_empty());
        assert!(reg.remove("unit-1", "out-0").is_none());
    }

    #[test]
    fn publish_replaces_in_place() {
        let mut reg = GraphRegistry::new();
        reg.publish("u", "s", SlotPayload::Model(model()));
        reg.publish("u", "s", SlotPayload::Model(model()));
        assert_eq!(reg.len(), 1);
    }

    #[test]
    fn remove_unit_leaves_other_units() {
        let mut reg = GraphRegistry::new();
        reg.publish("u1", "a", SlotPayload::Model(model()));
        reg.publish("u1", "b", SlotPayload::Model(model()));
        reg.publish("u2", "a", SlotPayload::Model(model()));
        reg.remove_unit("u1");
        assert_eq!(reg.len(), 1);
        assert!(reg.read("u2", "a").is_some());
    }
}
