use foundation::{FeatureId, LayerId};

use crate::surface::{Pixel, RenderSurface};

/// One hit: a feature and the layer it was found in.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct PickedFeatureRef {
    pub feature: FeatureId,
    pub layer: LayerId,
}

/// Collect every feature under `pixel`.
///
/// Ordering contract:
/// - Hits come back in the surface's traversal order (topmost layer first).
/// - No deduplication: a feature present in two layers yields two entries.
/// - No hits is an empty vector, never an error.
pub fn pick_at_pixel<S>(surface: &S, pixel: Pixel) -> Vec<PickedFeatureRef>
where
    S: RenderSurface + ?Sized,
{
    let mut hits = Vec::new();
    surface.for_each_feature_at_pixel(pixel, &mut |feature, layer| {
        hits.push(PickedFeatureRef { feature, layer });
    });
    hits
}
