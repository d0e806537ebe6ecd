//! In-memory render surface.
//!
//! Stands in for a real map canvas in native builds and tests: features are
//! axis-aligned pixel rectangles, layers stack in attach order (last on top),
//! and viewport writes coalesce into one `ViewChanged` per drain, the way a
//! canvas reports a single move-end after a render.

use std::cell::Cell;
use std::collections::VecDeque;

use foundation::{Coordinate, FeatureId, LayerId, ProjectionUnits, ViewportState};
use layers::LayerHandle;

use crate::surface::{Pixel, RenderSurface, SurfaceEvent};

pub const DEFAULT_MIN_ZOOM: f64 = 0.0;
pub const DEFAULT_MAX_ZOOM: f64 = 28.0;

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct PixelRect {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl PixelRect {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            min_x: x,
            min_y: y,
            max_x: x + width,
            max_y: y + height,
        }
    }

    pub fn contains(&self, p: Pixel) -> bool {
        p.x >= self.min_x && p.x <= self.max_x && p.y >= self.min_y && p.y <= self.max_y
    }
}

#[derive(Debug, Clone)]
struct HeadlessLayer {
    id: LayerId,
    handle: LayerHandle,
    features: Vec<(FeatureId, PixelRect)>,
}

#[derive(Debug)]
pub struct HeadlessSurface {
    units: ProjectionUnits,
    size: (f64, f64),
    center: Coordinate,
    zoom: f64,
    rotation: f64,
    min_zoom: f64,
    max_zoom: f64,
    layers: Vec<HeadlessLayer>,
    next_layer: u64,
    hit_tests: Cell<usize>,
    mutations: usize,
    view_dirty: bool,
    pending: VecDeque<SurfaceEvent>,
}

impl HeadlessSurface {
    pub fn new(units: ProjectionUnits) -> Self {
        Self {
            units,
            size: (1024.0, 768.0),
            center: Coordinate::new(0.0, 0.0),
            zoom: 0.0,
            rotation: 0.0,
            min_zoom: DEFAULT_MIN_ZOOM,
            max_zoom: DEFAULT_MAX_ZOOM,
            layers: Vec::new(),
            next_layer: 0,
            hit_tests: Cell::new(0),
            mutations: 0,
            view_dirty: false,
            pending: VecDeque::new(),
        }
    }

    pub fn with_view(mut self, state: ViewportState) -> Self {
        self.center = state.center;
        self.zoom = state.zoom.clamp(self.min_zoom, self.max_zoom);
        self.rotation = state.rotation;
        self
    }

    pub fn with_zoom_range(mut self, min_zoom: f64, max_zoom: f64) -> Self {
        self.min_zoom = min_zoom.min(max_zoom);
        self.max_zoom = max_zoom.max(min_zoom);
        self.zoom = self.zoom.clamp(self.min_zoom, self.max_zoom);
        self
    }

    pub fn with_size(mut self, width: f64, height: f64) -> Self {
        self.size = (width, height);
        self
    }

    pub fn add_feature(&mut self, layer: LayerId, feature: FeatureId, rect: PixelRect) -> bool {
        let Some(l) = self.layers.iter_mut().find(|l| l.id == layer) else {
            return false;
        };
        l.features.push((feature, rect));
        true
    }

    /// Attached layers, bottom first.
    pub fn layers(&self) -> Vec<(LayerId, &LayerHandle)> {
        self.layers.iter().map(|l| (l.id, &l.handle)).collect()
    }

    pub fn hit_test_count(&self) -> usize {
        self.hit_tests.get()
    }

    /// Number of center/zoom/rotation writes, changed or not.
    pub fn mutation_count(&self) -> usize {
        self.mutations
    }

    /// Queue a raw pointer or lifecycle event.
    pub fn push_event(&mut self, event: SurfaceEvent) {
        self.pending.push_back(event);
    }

    /// Take queued events, followed by one `ViewChanged` if the viewport moved
    /// since the last drain.
    pub fn drain_events(&mut self) -> Vec<SurfaceEvent> {
        let mut out: Vec<SurfaceEvent> = self.pending.drain(..).collect();
        if std::mem::take(&mut self.view_dirty) {
            out.push(SurfaceEvent::ViewChanged);
        }
        out
    }

    fn contains(&self, p: Pixel) -> bool {
        p.x >= 0.0 && p.y >= 0.0 && p.x <= self.size.0 && p.y <= self.size.1
    }
}

impl RenderSurface for HeadlessSurface {
    fn center(&self) -> Coordinate {
        self.center
    }

    fn zoom(&self) -> f64 {
        self.zoom
    }

    fn rotation(&self) -> f64 {
        self.rotation
    }

    fn set_center(&mut self, center: Coordinate) {
        self.mutations += 1;
        if center != self.center {
            self.center = center;
            self.view_dirty = true;
        }
    }

    fn set_zoom(&mut self, zoom: f64) {
        self.mutations += 1;
        let zoom = zoom.clamp(self.min_zoom, self.max_zoom);
        if zoom != self.zoom {
            self.zoom = zoom;
            self.view_dirty = true;
        }
    }

    fn set_rotation(&mut self, rotation: f64) {
        self.mutations += 1;
        if rotation != self.rotation {
            self.rotation = rotation;
            self.view_dirty = true;
        }
    }

    fn set_zoom_range(&mut self, min_zoom: f64, max_zoom: f64) {
        self.min_zoom = min_zoom.min(max_zoom);
        self.max_zoom = max_zoom.max(min_zoom);
        let zoom = self.zoom.clamp(self.min_zoom, self.max_zoom);
        if zoom != self.zoom {
            self.zoom = zoom;
            self.view_dirty = true;
        }
    }

    fn projection_units(&self) -> ProjectionUnits {
        self.units
    }

    fn for_each_feature_at_pixel(&self, pixel: Pixel, f: &mut dyn FnMut(FeatureId, LayerId)) {
        self.hit_tests.set(self.hit_tests.get() + 1);
        if !self.contains(pixel) {
            return;
        }
        for layer in self.layers.iter().rev() {
            if !layer.handle.visible || !layer.handle.kind.is_vector() {
                continue;
            }
            for (feature, rect) in &layer.features {
                if rect.contains(pixel) {
                    f(*feature, layer.id);
                }
            }
        }
    }

    fn add_layer(&mut self, layer: LayerHandle) -> LayerId {
        let id = LayerId(self.next_layer);
        self.next_layer += 1;
        self.layers.push(HeadlessLayer {
            id,
            handle: layer,
            features: Vec::new(),
        });
        id
    }
}

#[cfg(test)]
mod tests {
    use foundation::{Coordinate, FeatureId, ProjectionUnits, ViewportState};
    use layers::{LayerHandle, LayerKind};

    use super::{HeadlessSurface, PixelRect};
    use crate::picking::pick_at_pixel;
    use crate::surface::{Pixel, PointerEvent, RenderSurface, SurfaceEvent};

    #[test]
    fn viewport_writes_coalesce_into_one_change() {
        let mut s = HeadlessSurface::new(ProjectionUnits::Meters);
        s.apply_viewport(&ViewportState::new(Coordinate::new(1.0, 2.0), 4.0, 0.1));
        assert_eq!(s.mutation_count(), 3);
        assert_eq!(s.drain_events(), vec![SurfaceEvent::ViewChanged]);
        assert!(s.drain_events().is_empty());
    }

    #[test]
    fn rewriting_the_same_view_is_silent() {
        let start = ViewportState::new(Coordinate::new(1.0, 2.0), 4.0, 0.0);
        let mut s = HeadlessSurface::new(ProjectionUnits::Meters).with_view(start);
        s.apply_viewport(&start);
        assert!(s.drain_events().is_empty());
    }

    #[test]
    fn zoom_is_clamped_to_range() {
        let mut s = HeadlessSurface::new(ProjectionUnits::Meters).with_zoom_range(2.0, 10.0);
        s.set_zoom(42.0);
        assert_eq!(s.zoom(), 10.0);
        s.set_zoom(-1.0);
        assert_eq!(s.zoom(), 2.0);
    }

    #[test]
    fn narrowing_the_zoom_range_clamps_and_reports() {
        let start = ViewportState::new(Coordinate::new(0.0, 0.0), 12.0, 0.0);
        let mut s = HeadlessSurface::new(ProjectionUnits::Meters).with_view(start);
        s.set_zoom_range(0.0, 8.0);
        assert_eq!(s.zoom(), 8.0);
        assert_eq!(s.drain_events(), vec![SurfaceEvent::ViewChanged]);
    }

    #[test]
    fn pointer_events_drain_before_view_change() {
        let mut s = HeadlessSurface::new(ProjectionUnits::Meters);
        s.set_center(Coordinate::new(3.0, 3.0));
        s.push_event(SurfaceEvent::SingleClick(PointerEvent::at(1.0, 1.0)));
        assert_eq!(
            s.drain_events(),
            vec![
                SurfaceEvent::SingleClick(PointerEvent::at(1.0, 1.0)),
                SurfaceEvent::ViewChanged
            ]
        );
    }

    #[test]
    fn hidden_and_raster_layers_are_not_hit() {
        let mut s = HeadlessSurface::new(ProjectionUnits::Meters);
        let mut hidden = LayerHandle::new(LayerKind::Vector, "hidden");
        hidden.visible = false;
        let hidden = s.add_layer(hidden);
        let raster = s.add_layer(LayerHandle::new(LayerKind::Wms, "wms"));
        let rect = PixelRect::new(0.0, 0.0, 10.0, 10.0);
        s.add_feature(hidden, FeatureId(1), rect);
        s.add_feature(raster, FeatureId(2), rect);
        assert!(pick_at_pixel(&s, Pixel::new(5.0, 5.0)).is_empty());
    }

    #[test]
    fn pixels_outside_the_canvas_hit_nothing() {
        let mut s = HeadlessSurface::new(ProjectionUnits::Meters).with_size(100.0, 100.0);
        let l = s.add_layer(LayerHandle::new(LayerKind::Vector, "v"));
        s.add_feature(l, FeatureId(1), PixelRect::new(-50.0, -50.0, 500.0, 500.0));
        assert!(pick_at_pixel(&s, Pixel::new(-1.0, 5.0)).is_empty());
        assert_eq!(pick_at_pixel(&s, Pixel::new(1.0, 5.0)).len(), 1);
    }
}
