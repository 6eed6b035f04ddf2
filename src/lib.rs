//! # Reframe
//!
//! An optical-geometric reconciliation engine for layered image documents.
//!
//! Layer bounds in a layered document describe the raster's extent, not its
//! content: a logo sitting in the corner of a mostly transparent 500×500
//! layer is a 500×500 rectangle as far as the file is concerned. Placing
//! that document into a new container by nominal bounds centers the air,
//! not the logo.
//!
//! Reframe places by what the pixels show. It measures each raster's true
//! visual footprint, lifts everything into the coordinate space the
//! placement decision happens in, applies externally generated per-layer
//! overrides without ever mutating the source tree, tracks when a committed
//! layout has gone stale against upstream change, and renders an
//! audit-grade preview of the result.
//!
//! ## Architecture
//!
//! ```text
//! layer tree + container
//!       ↓
//!   [optics]     — trimmed alpha bounds, visual center, pixel density
//!       ↓
//!   [coords]     — raster-local / document-global / container-relative /
//!                  normalized conversions
//!       ↓
//!   [pipeline]   — external strategy generator returns overrides
//!       ↓
//!   [compose]    — copy-on-write override application → derived geometry
//!       ↓
//!   [render]     — audit raster        [registry] — downstream consumers
//! ```
//!
//! The [`staleness`] tracker gates whether a committed derived layout
//! survives a new upstream generation marker.

pub mod compose;
pub mod coords;
pub mod error;
pub mod model;
pub mod optics;
pub mod pipeline;
pub mod raster;
pub mod registry;
pub mod render;
pub mod rules;
pub mod staleness;

use std::collections::HashMap;

use image::RgbaImage;
use serde::{Deserialize, Serialize};

use error::ReframeError;
use model::{GeometricModel, LayerNode, Override, Rect, Strategy};
use raster::MemoryStore;

/// A self-contained composition: a layer tree, the target container, inline
/// raster sources, and the overrides to apply. This is the CLI's input and
/// a convenient fixture format for tests.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Composition {
    /// Target placement region, document-global space.
    pub container: Rect,
    /// Root layers, front-to-back.
    pub layers: Vec<LayerNode>,
    /// Raster sources by layer id: data URIs, file paths, or raw base64.
    #[serde(default)]
    pub rasters: HashMap<String, String>,
    /// Overrides to apply before rendering.
    #[serde(default)]
    pub overrides: Vec<Override>,
}

/// Render a composition to an audit raster.
///
/// This is the primary one-shot entry point: loads the rasters, scans
/// optics, builds the geometric model, applies the overrides, and renders.
pub fn compose_audit(composition: &Composition) -> Result<RgbaImage, ReframeError> {
    let mut store = MemoryStore::new();
    for (layer_id, src) in &composition.rasters {
        store
            .insert_src(layer_id.clone(), src)
            .map_err(ReframeError::RasterError)?;
    }

    let layers = optics::annotate_tree(composition.layers.clone(), &store);
    let model = GeometricModel::new(layers, composition.container);
    let strategy = Strategy {
        overrides: composition.overrides.clone(),
        method: "composition-file".to_string(),
        reasoning: String::new(),
    };
    let derived = model.derive(&strategy);
    Ok(render::compose(&derived, &store))
}

/// Render a composition described as JSON to an audit raster.
pub fn compose_audit_json(json: &str) -> Result<RgbaImage, ReframeError> {
    let composition: Composition = serde_json::from_str(json)?;
    compose_audit(&composition)
}
