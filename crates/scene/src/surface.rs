use foundation::{Coordinate, FeatureId, LayerId, ProjectionUnits, ViewportState};
use layers::LayerHandle;

/// Pixel position relative to the surface's top-left corner.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Pixel {
    pub x: f64,
    pub y: f64,
}

impl Pixel {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Raw pointer event as delivered by the render surface.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct PointerEvent {
    pub pixel: Pixel,
    /// Map coordinate under the pointer, when the surface resolved one.
    pub coordinate: Option<Coordinate>,
}

impl PointerEvent {
    pub fn at(x: f64, y: f64) -> Self {
        Self {
            pixel: Pixel::new(x, y),
            coordinate: None,
        }
    }
}

/// Raw lifecycle and pointer events a render surface emits.
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum SurfaceEvent {
    SingleClick(PointerEvent),
    /// The pointer stayed still for the surface's rest interval.
    PointerRest(PointerEvent),
    /// The pointer moved again after a rest.
    PointerRestOut,
    PointerMove(PointerEvent),
    /// Center, zoom or rotation changed (end of a move, not per frame).
    ViewChanged,
}

/// The render surface contract: viewport access, hit-testing and layer
/// attachment. Projection math, tiling and drawing stay behind it.
pub trait RenderSurface {
    fn center(&self) -> Coordinate;
    fn zoom(&self) -> f64;
    fn rotation(&self) -> f64;

    fn set_center(&mut self, center: Coordinate);
    fn set_zoom(&mut self, zoom: f64);
    fn set_rotation(&mut self, rotation: f64);
    /// Bounds later `set_zoom` calls; an out-of-range current zoom is clamped.
    fn set_zoom_range(&mut self, min_zoom: f64, max_zoom: f64);

    fn projection_units(&self) -> ProjectionUnits;

    /// Call `f` for every feature intersecting `pixel`, topmost layer first.
    fn for_each_feature_at_pixel(&self, pixel: Pixel, f: &mut dyn FnMut(FeatureId, LayerId));

    fn add_layer(&mut self, layer: LayerHandle) -> LayerId;

    fn viewport(&self) -> ViewportState {
        ViewportState::new(self.center(), self.zoom(), self.rotation())
    }

    /// Write center, zoom and rotation, in that order.
    fn apply_viewport(&mut self, state: &ViewportState) {
        self.set_center(state.center);
        self.set_zoom(state.zoom);
        self.set_rotation(state.rotation);
    }
}
