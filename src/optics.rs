//! # Optical Bounds Scanner
//!
//! Measures the true visual footprint of a raster: the trimmed bounding box
//! of non-transparent pixels, its midpoint, and the fraction of opaque
//! pixels. Nominal layer bounds lie — a 500×500 raster with a 40×40 logo in
//! one corner should be aligned by the logo, not by the empty air around it.
//!
//! One O(w·h) pass, O(1) extra memory: running min/max of x,y over pixels
//! with alpha > 0 plus a counter. The visual center is the plain box
//! midpoint, not alpha-weighted — deterministic and cheap.

use image::RgbaImage;

use crate::model::{LayerKind, LayerNode, OpticalMetrics, Rect};
use crate::raster::RasterStore;

/// Scan a raster for its optical metrics.
///
/// Returns `None` for fully transparent (or zero-dimension) rasters. Callers
/// must fall back to raw geometric bounds for alignment — `None` means "no
/// visible content", never a zero-sized box at the origin.
pub fn scan(raster: &RgbaImage) -> Option<OpticalMetrics> {
    let (w, h) = raster.dimensions();
    if w == 0 || h == 0 {
        return None;
    }

    let mut min_x = u32::MAX;
    let mut min_y = u32::MAX;
    let mut max_x = 0u32;
    let mut max_y = 0u32;
    let mut opaque: u64 = 0;

    for (x, y, px) in raster.enumerate_pixels() {
        if px[3] > 0 {
            opaque += 1;
            min_x = min_x.min(x);
            min_y = min_y.min(y);
            max_x = max_x.max(x);
            max_y = max_y.max(y);
        }
    }

    if opaque == 0 {
        return None;
    }

    let bounds = Rect {
        x: min_x as f64,
        y: min_y as f64,
        w: (max_x - min_x + 1) as f64,
        h: (max_y - min_y + 1) as f64,
    };
    Some(OpticalMetrics {
        bounds,
        visual_center: bounds.center(),
        pixel_density: opaque as f64 / (w as f64 * h as f64),
    })
}

/// Annotate every raster layer in a tree with optics from the store.
///
/// Layers whose pixels the store cannot produce, and fully transparent
/// rasters, are left without optics — a scan failure degrades to "no
/// optics", it never blocks geometry. Groups are recursed into; placeholder
/// layers are never scanned.
pub fn annotate_tree(layers: Vec<LayerNode>, store: &dyn RasterStore) -> Vec<LayerNode> {
    layers
        .into_iter()
        .map(|mut layer| {
            if layer.kind == LayerKind::Raster {
                layer.optics = store.raster_for_layer(&layer.id).and_then(scan);
            }
            layer.children = annotate_tree(layer.children, store);
            layer
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Point;
    use image::Rgba;

    fn blank(w: u32, h: u32) -> RgbaImage {
        RgbaImage::new(w, h)
    }

    #[test]
    fn fully_transparent_returns_none() {
        assert!(scan(&blank(8, 8)).is_none());
    }

    #[test]
    fn zero_dimension_returns_none() {
        assert!(scan(&blank(0, 0)).is_none());
    }

    #[test]
    fn single_opaque_pixel() {
        let mut img = blank(10, 10);
        img.put_pixel(7, 2, Rgba([255, 0, 0, 255]));
        let m = scan(&img).unwrap();
        assert_eq!(m.bounds, Rect::new(7.0, 2.0, 1.0, 1.0));
        assert_eq!(m.visual_center, Point::new(7.5, 2.5));
        assert!((m.pixel_density - 0.01).abs() < 1e-12);
    }

    #[test]
    fn opaque_block_bounds_and_density() {
        // 10x10 raster, opaque only in the (3,3)-(6,6) block.
        let mut img = blank(10, 10);
        for y in 3..=6 {
            for x in 3..=6 {
                img.put_pixel(x, y, Rgba([0, 0, 0, 255]));
            }
        }
        let m = scan(&img).unwrap();
        assert_eq!(m.bounds, Rect::new(3.0, 3.0, 4.0, 4.0));
        assert_eq!(m.visual_center, Point::new(5.0, 5.0));
        assert!((m.pixel_density - 0.16).abs() < 1e-12);
    }

    #[test]
    fn faint_alpha_counts_as_visible() {
        let mut img = blank(4, 4);
        img.put_pixel(0, 0, Rgba([0, 0, 0, 1]));
        let m = scan(&img).unwrap();
        assert_eq!(m.bounds, Rect::new(0.0, 0.0, 1.0, 1.0));
    }

    #[test]
    fn bounds_stay_inside_raster_and_center_inside_bounds() {
        let mut img = blank(17, 9);
        img.put_pixel(0, 0, Rgba([1, 2, 3, 200]));
        img.put_pixel(16, 8, Rgba([1, 2, 3, 200]));
        let m = scan(&img).unwrap();
        assert!(Rect::new(0.0, 0.0, 17.0, 9.0).contains_rect(&m.bounds));
        assert!(m.bounds.contains_point(m.visual_center));
    }
}
