//! # Coordinate Transforms
//!
//! Four coordinate spaces matter to alignment decisions:
//!
//! - **raster-local** — pixel coordinates inside one layer's raster. Optics
//!   are measured here.
//! - **document-global** — the source document's canvas. Raw layer bounds
//!   live here.
//! - **container-relative** — offset from a placement container's origin.
//!   Alignment decisions happen here, against whichever container (source,
//!   target, canvas) is currently relevant.
//! - **canvas-normalized** — divided by canvas dimensions, resolution
//!   independent. A separate, optional stage; never fused with the
//!   container-relative stage.
//!
//! Everything in this module is a pure function. The relative/global pair
//! round-trips exactly up to floating-point.

use crate::model::{LayerNode, OpticalMetrics, Point, Rect};

/// Container-relative position of a document-global rectangle. Size is
/// unaffected; only the origin shifts.
pub fn to_relative(raw: Rect, container: Rect) -> Rect {
    Rect {
        x: raw.x - container.x,
        y: raw.y - container.y,
        w: raw.w,
        h: raw.h,
    }
}

/// Inverse of [`to_relative`].
pub fn to_global(relative: Rect, container: Rect) -> Rect {
    Rect {
        x: relative.x + container.x,
        y: relative.y + container.y,
        w: relative.w,
        h: relative.h,
    }
}

/// Container-relative visual center of a layer: the raster-local visual
/// center lifted into document-global space by the layer's global origin,
/// then shifted into container space. Two hops, because optics are measured
/// in raster-local space but alignment happens per container.
pub fn relative_visual_center(
    layer_global: Rect,
    optics: &OpticalMetrics,
    container: Rect,
) -> Point {
    Point {
        x: layer_global.x + optics.visual_center.x - container.x,
        y: layer_global.y + optics.visual_center.y - container.y,
    }
}

/// Resolution-independent descriptor of a rectangle: coordinates divided by
/// the canvas dimensions. Degenerate canvases map to zero rather than
/// infinity.
pub fn normalize_rect(rect: Rect, canvas_w: f64, canvas_h: f64) -> Rect {
    if canvas_w <= 0.0 || canvas_h <= 0.0 {
        return Rect::default();
    }
    Rect {
        x: rect.x / canvas_w,
        y: rect.y / canvas_h,
        w: rect.w / canvas_w,
        h: rect.h / canvas_h,
    }
}

/// Resolution-independent descriptor of a point.
pub fn normalize_point(p: Point, canvas_w: f64, canvas_h: f64) -> Point {
    if canvas_w <= 0.0 || canvas_h <= 0.0 {
        return Point::default();
    }
    Point {
        x: p.x / canvas_w,
        y: p.y / canvas_h,
    }
}

/// Annotate a layer (recursively) with container-relative coordinates and,
/// where optics exist, the container-relative visual center. The relative
/// fields are derived from the layer's *current* bounds so that derived
/// trees report post-override placement.
pub fn annotate_relative(mut layer: LayerNode, container: Rect) -> LayerNode {
    let current = layer.current_bounds();
    layer.relative = Some(to_relative(current, container));
    layer.relative_visual_center = layer
        .optics
        .as_ref()
        .map(|o| relative_visual_center(current, o, container));
    layer.children = layer
        .children
        .into_iter()
        .map(|c| annotate_relative(c, container))
        .collect();
    layer
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relative_subtracts_container_origin() {
        let raw = Rect::new(100.0, 100.0, 50.0, 50.0);
        let container = Rect::new(50.0, 50.0, 400.0, 400.0);
        assert_eq!(to_relative(raw, container), Rect::new(50.0, 50.0, 50.0, 50.0));
    }

    #[test]
    fn global_round_trip() {
        let containers = [
            Rect::new(0.0, 0.0, 100.0, 100.0),
            Rect::new(-12.5, 7.25, 640.0, 480.0),
            Rect::new(1e6, -1e6, 3.0, 3.0),
        ];
        let raw = Rect::new(123.456, -78.9, 10.0, 20.0);
        for c in containers {
            let back = to_global(to_relative(raw, c), c);
            assert!((back.x - raw.x).abs() < 1e-9);
            assert!((back.y - raw.y).abs() < 1e-9);
            assert_eq!(back.w, raw.w);
            assert_eq!(back.h, raw.h);
        }
    }

    #[test]
    fn visual_center_composes_both_hops() {
        let optics = OpticalMetrics {
            bounds: Rect::new(3.0, 3.0, 4.0, 4.0),
            visual_center: Point::new(5.0, 5.0),
            pixel_density: 0.16,
        };
        let layer_global = Rect::new(100.0, 200.0, 10.0, 10.0);
        let container = Rect::new(50.0, 50.0, 400.0, 400.0);
        let c = relative_visual_center(layer_global, &optics, container);
        assert_eq!(c, Point::new(55.0, 155.0));
    }

    #[test]
    fn normalization_is_a_separate_stage() {
        let rect = Rect::new(50.0, 25.0, 100.0, 50.0);
        let n = normalize_rect(rect, 200.0, 100.0);
        assert_eq!(n, Rect::new(0.25, 0.25, 0.5, 0.5));

        // Degenerate canvas: zero, not NaN/inf.
        let z = normalize_rect(rect, 0.0, 100.0);
        assert_eq!(z, Rect::default());
    }

    #[test]
    fn annotate_recurses_into_groups() {
        let container = Rect::new(10.0, 10.0, 100.0, 100.0);
        let tree = LayerNode::group(
            "g",
            "g",
            Rect::new(10.0, 10.0, 80.0, 80.0),
            vec![LayerNode::raster("a", "a", Rect::new(30.0, 40.0, 5.0, 5.0))],
        );
        let annotated = annotate_relative(tree, container);
        assert_eq!(annotated.relative, Some(Rect::new(0.0, 0.0, 80.0, 80.0)));
        assert_eq!(
            annotated.children[0].relative,
            Some(Rect::new(20.0, 30.0, 5.0, 5.0))
        );
    }
}
