//! # Geometric Model
//!
//! The data model for the reconciliation pipeline. A layered image document
//! is a tree of [`LayerNode`]s; alignment decisions happen against a
//! [`GeometricModel`], which is the same tree annotated with
//! container-relative coordinates. Externally produced [`Strategy`] values
//! carry per-layer [`Override`] deltas that derive new geometry without ever
//! touching the source tree.
//!
//! Two invariants run through everything here:
//!
//! 1. **Child order is front-to-back** and is preserved through every
//!    derived tree.
//! 2. **Raw coordinates stay recoverable.** `bounds` is the document-global
//!    truth from the source file; derivations write new trees, never this
//!    field in place. Re-applying a strategy to the same source yields the
//!    same result.

use serde::{Deserialize, Serialize};

use crate::compose;
use crate::coords;

/// An axis-aligned rectangle. Used for raw document-global coordinates,
/// container bounds, trimmed optical bounds, and container-relative
/// coordinates alike — the coordinate space is contextual.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub w: f64,
    pub h: f64,
}

impl Rect {
    pub fn new(x: f64, y: f64, w: f64, h: f64) -> Self {
        Self { x, y, w, h }
    }

    /// Midpoint of the rectangle.
    pub fn center(&self) -> Point {
        Point {
            x: self.x + self.w / 2.0,
            y: self.y + self.h / 2.0,
        }
    }

    /// Does `other` lie entirely within this rectangle?
    pub fn contains_rect(&self, other: &Rect) -> bool {
        other.x >= self.x
            && other.y >= self.y
            && other.x + other.w <= self.x + self.w
            && other.y + other.h <= self.y + self.h
    }

    /// Does the point lie within this rectangle (inclusive edges)?
    pub fn contains_point(&self, p: Point) -> bool {
        p.x >= self.x && p.x <= self.x + self.w && p.y >= self.y && p.y <= self.y + self.h
    }
}

/// A 2D point.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// The different kinds of layers in a layered image document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum LayerKind {
    /// Pixel content addressable through the document store.
    Raster,
    /// A container of child layers. Not drawn itself.
    Group,
    /// A slot to be filled by generated content later. Rendered as an
    /// outlined rectangle, never with pixel content.
    GenerativePlaceholder,
}

/// Accumulated positional/scale/rotation state on a layer.
///
/// Scale is multiplicative, offsets are the layer's current absolute
/// position, rotation is additive degrees. All identity by default.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LayerTransform {
    #[serde(default = "default_scale")]
    pub scale_x: f64,
    #[serde(default = "default_scale")]
    pub scale_y: f64,
    #[serde(default)]
    pub offset_x: f64,
    #[serde(default)]
    pub offset_y: f64,
    #[serde(default)]
    pub rotation_deg: f64,
}

fn default_scale() -> f64 {
    1.0
}

impl Default for LayerTransform {
    fn default() -> Self {
        Self {
            scale_x: 1.0,
            scale_y: 1.0,
            offset_x: 0.0,
            offset_y: 0.0,
            rotation_deg: 0.0,
        }
    }
}

/// Measured visual footprint of a raster, produced by the optics scanner.
///
/// `bounds` and `visual_center` are in raster-local space (pixel coordinates
/// of the raster itself, not the document). Absent entirely — never
/// zero-sized — when the raster has no opaque pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpticalMetrics {
    /// Trimmed bounding box of pixels with alpha > 0.
    pub bounds: Rect,
    /// Midpoint of `bounds`.
    pub visual_center: Point,
    /// Fraction of the full raster area with alpha > 0, in [0, 1].
    pub pixel_density: f64,
}

/// One addressable element of a layered image document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LayerNode {
    /// Stable path-based id, the same id the document store is addressed by.
    pub id: String,
    pub name: String,
    pub kind: LayerKind,
    #[serde(default = "default_true")]
    pub visible: bool,
    /// Layer opacity in [0, 1].
    #[serde(default = "default_opacity")]
    pub opacity: f64,
    /// Raw coordinates in document-global space. Source truth; derivations
    /// never overwrite this in place.
    pub bounds: Rect,
    /// Accumulated transform, if any derivation has produced one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transform: Option<LayerTransform>,
    /// Child layers, front-to-back. Non-empty only for groups.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<LayerNode>,
    /// Optics annotation from the scanner, when the raster had any opaque
    /// pixels. Raster-local space.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub optics: Option<OpticalMetrics>,
    /// Container-relative coordinates. Annotation owned by
    /// [`GeometricModel`]; recomputed per container.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relative: Option<Rect>,
    /// Container-relative visual center, present when `optics` is.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relative_visual_center: Option<Point>,
}

fn default_true() -> bool {
    true
}

fn default_opacity() -> f64 {
    1.0
}

impl LayerNode {
    /// Create a raster layer.
    pub fn raster(id: &str, name: &str, bounds: Rect) -> Self {
        Self::with_kind(id, name, LayerKind::Raster, bounds, vec![])
    }

    /// Create a group layer with children (front-to-back).
    pub fn group(id: &str, name: &str, bounds: Rect, children: Vec<LayerNode>) -> Self {
        Self::with_kind(id, name, LayerKind::Group, bounds, children)
    }

    /// Create a generative placeholder layer.
    pub fn placeholder(id: &str, name: &str, bounds: Rect) -> Self {
        Self::with_kind(id, name, LayerKind::GenerativePlaceholder, bounds, vec![])
    }

    fn with_kind(
        id: &str,
        name: &str,
        kind: LayerKind,
        bounds: Rect,
        children: Vec<LayerNode>,
    ) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            kind,
            visible: true,
            opacity: 1.0,
            bounds,
            transform: None,
            children,
            optics: None,
            relative: None,
            relative_visual_center: None,
        }
    }

    /// The layer's current document-global position and size: the
    /// accumulated transform when present, the raw bounds otherwise.
    pub fn current_bounds(&self) -> Rect {
        match &self.transform {
            Some(t) => Rect {
                x: t.offset_x,
                y: t.offset_y,
                w: self.bounds.w * t.scale_x,
                h: self.bounds.h * t.scale_y,
            },
            None => self.bounds,
        }
    }

    /// Depth-first search for a layer by id.
    pub fn find(&self, id: &str) -> Option<&LayerNode> {
        if self.id == id {
            return Some(self);
        }
        self.children.iter().find_map(|c| c.find(id))
    }
}

/// A layer tree with the container it is being placed against, every layer
/// annotated with container-relative coordinates (and a relative visual
/// center where optics exist).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeometricModel {
    /// Target placement region, document-global space.
    pub container: Rect,
    /// Root layers, front-to-back.
    pub layers: Vec<LayerNode>,
}

impl GeometricModel {
    /// Build a model for `container`, annotating every layer (recursively)
    /// with container-relative coordinates. The input tree is consumed; the
    /// raw bounds on each node are left untouched.
    pub fn new(layers: Vec<LayerNode>, container: Rect) -> Self {
        let layers = layers
            .into_iter()
            .map(|l| coords::annotate_relative(l, container))
            .collect();
        Self { container, layers }
    }

    /// Apply a strategy's overrides, producing derived geometry. The model
    /// itself is never mutated; calling this twice with the same strategy
    /// yields structurally identical results.
    pub fn derive(&self, strategy: &Strategy) -> DerivedGeometry {
        let layers = compose::apply(&self.layers, &strategy.overrides);
        let layers = layers
            .into_iter()
            .map(|l| coords::annotate_relative(l, self.container))
            .collect();
        DerivedGeometry {
            container: self.container,
            layers,
        }
    }

    /// Depth-first search across the root layers.
    pub fn find(&self, id: &str) -> Option<&LayerNode> {
        self.layers.iter().find_map(|l| l.find(id))
    }
}

/// A declarative positional/scale/rotation delta for one layer.
///
/// Offsets are additive, scale is multiplicative, rotation is additive.
/// At most one override per layer id is honored per application; a group's
/// override does not propagate to its children.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Override {
    pub layer_id: String,
    #[serde(default)]
    pub x_offset: f64,
    #[serde(default)]
    pub y_offset: f64,
    #[serde(default = "default_scale")]
    pub individual_scale: f64,
    #[serde(default)]
    pub rotation_delta: f64,
    /// The rule (if any) the generator cites as motivating this delta.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cited_rule: Option<String>,
}

impl Override {
    /// A pure positional nudge.
    pub fn offset(layer_id: &str, x_offset: f64, y_offset: f64) -> Self {
        Self {
            layer_id: layer_id.to_string(),
            x_offset,
            y_offset,
            individual_scale: 1.0,
            rotation_delta: 0.0,
            cited_rule: None,
        }
    }
}

/// An externally produced layout adjustment: ordered overrides plus the
/// generator's own account of how it arrived at them. Immutable once
/// committed to an instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Strategy {
    pub overrides: Vec<Override>,
    pub method: String,
    pub reasoning: String,
}

/// The result of applying a [`Strategy`] to a [`GeometricModel`]:
/// structurally isomorphic to the source tree, differing only at the layers
/// the overrides referenced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DerivedGeometry {
    pub container: Rect,
    pub layers: Vec<LayerNode>,
}

/// Opaque version token signaling upstream change. Compared only for
/// equality; the contents carry no meaning.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationMarker(String);

impl GenerationMarker {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }
}

/// Who authored an audit-log entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ChatRole {
    User,
    Model,
}

/// One entry of an instance's exposed history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatEntry {
    pub role: ChatRole,
    pub content: String,
}

impl ChatEntry {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
        }
    }

    pub fn model(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Model,
            content: content.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn current_bounds_prefers_transform() {
        let mut layer = LayerNode::raster("l1", "hero", Rect::new(10.0, 20.0, 30.0, 40.0));
        assert_eq!(layer.current_bounds(), Rect::new(10.0, 20.0, 30.0, 40.0));

        layer.transform = Some(LayerTransform {
            scale_x: 2.0,
            scale_y: 2.0,
            offset_x: 5.0,
            offset_y: 6.0,
            rotation_deg: 0.0,
        });
        assert_eq!(layer.current_bounds(), Rect::new(5.0, 6.0, 60.0, 80.0));
    }

    #[test]
    fn find_walks_groups() {
        let tree = LayerNode::group(
            "g",
            "group",
            Rect::default(),
            vec![LayerNode::raster("a", "a", Rect::default())],
        );
        assert!(tree.find("a").is_some());
        assert!(tree.find("missing").is_none());
    }

    #[test]
    fn marker_is_equality_only() {
        assert_eq!(GenerationMarker::new("v1"), GenerationMarker::new("v1"));
        assert_ne!(GenerationMarker::new("v1"), GenerationMarker::new("v2"));
    }

    #[test]
    fn layer_json_round_trip() {
        let layer = LayerNode::raster("photos/hero", "Hero", Rect::new(1.0, 2.0, 3.0, 4.0));
        let json = serde_json::to_string(&layer).unwrap();
        let back: LayerNode = serde_json::from_str(&json).unwrap();
        assert_eq!(layer, back);
    }

    #[test]
    fn override_defaults_from_json() {
        let ovr: Override = serde_json::from_str(r#"{ "layerId": "a" }"#).unwrap();
        assert_eq!(ovr.individual_scale, 1.0);
        assert_eq!(ovr.x_offset, 0.0);
        assert_eq!(ovr.rotation_delta, 0.0);
    }
}
