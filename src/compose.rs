//! # Geometry Override Compositor
//!
//! Applies a set of per-layer overrides to a layer tree, producing a new
//! tree. This is a copy-on-write rebuild: every node in the output is a
//! fresh copy, matched or not, and the input is never touched. That makes
//! referential transparency a directly testable property — same
//! (tree, overrides) in, structurally identical tree out, every time.
//!
//! Overrides address layers by id. A group may carry its own override, but
//! it does not propagate to the group's children; each affected layer needs
//! its own explicit entry. Ids with no matching layer are no-ops, layers
//! with no matching override pass through unchanged (but still copied).

use std::collections::HashMap;

use crate::model::{LayerNode, Override};

/// Apply `overrides` to `layers`, returning the rebuilt tree.
///
/// At most one override per layer id is honored; when duplicates appear the
/// first occurrence wins, keeping application idempotent per strategy.
pub fn apply(layers: &[LayerNode], overrides: &[Override]) -> Vec<LayerNode> {
    let mut by_id: HashMap<&str, &Override> = HashMap::new();
    for ovr in overrides {
        by_id.entry(ovr.layer_id.as_str()).or_insert(ovr);
    }
    layers.iter().map(|l| apply_node(l, &by_id)).collect()
}

/// Rebuild one node bottom-up, applying its override when one matches.
fn apply_node(layer: &LayerNode, by_id: &HashMap<&str, &Override>) -> LayerNode {
    let mut node = layer.clone();
    node.children = layer
        .children
        .iter()
        .map(|c| apply_node(c, by_id))
        .collect();

    if let Some(ovr) = by_id.get(layer.id.as_str()) {
        let current = layer.current_bounds();
        let new_x = current.x + ovr.x_offset;
        let new_y = current.y + ovr.y_offset;

        let mut t = layer.transform.unwrap_or_default();
        t.scale_x *= ovr.individual_scale;
        t.scale_y *= ovr.individual_scale;
        t.offset_x = new_x;
        t.offset_y = new_y;
        t.rotation_deg += ovr.rotation_delta;
        node.transform = Some(t);
    }
    node
}
