use scene::{RenderSurface, SurfaceEvent, pick_at_pixel};

use crate::config::MapViewConfig;
use crate::events::MapEvent;

/// Turns raw surface pointer events into map notifications.
///
/// Stateless apart from the two flags. A disabled channel never hit-tests.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct InteractionBroadcaster {
    click: bool,
    hover: bool,
}

impl InteractionBroadcaster {
    pub fn new(click: bool, hover: bool) -> Self {
        Self { click, hover }
    }

    /// `None` when neither channel is enabled, i.e. nothing to wire.
    pub fn from_config(config: &MapViewConfig) -> Option<Self> {
        (config.enable_map_click || config.enable_map_hover)
            .then(|| Self::new(config.enable_map_click, config.enable_map_hover))
    }

    /// The notification for `event`, if its channel is enabled.
    ///
    /// View changes are not interactions and always yield `None`.
    pub fn handle<S>(&self, surface: &S, event: &SurfaceEvent) -> Option<MapEvent>
    where
        S: RenderSurface + ?Sized,
    {
        match *event {
            SurfaceEvent::SingleClick(ev) if self.click => Some(MapEvent::Click {
                features: pick_at_pixel(surface, ev.pixel),
                event: ev,
            }),
            SurfaceEvent::PointerRest(ev) if self.hover => Some(MapEvent::HoverRest {
                features: pick_at_pixel(surface, ev.pixel),
                event: ev,
            }),
            SurfaceEvent::PointerRestOut if self.hover => Some(MapEvent::HoverRestEnd),
            SurfaceEvent::PointerMove(_) if self.hover => Some(MapEvent::PointerMove),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use foundation::{FeatureId, ProjectionUnits};
    use layers::{LayerHandle, LayerKind};
    use scene::{HeadlessSurface, PickedFeatureRef, PixelRect, PointerEvent, RenderSurface, SurfaceEvent};

    use super::InteractionBroadcaster;
    use crate::config::MapViewConfig;
    use crate::events::MapEvent;

    fn surface_with_feature() -> HeadlessSurface {
        let mut s = HeadlessSurface::new(ProjectionUnits::Meters);
        let l = s.add_layer(LayerHandle::new(LayerKind::Vector, "v"));
        s.add_feature(l, FeatureId(7), PixelRect::new(0.0, 0.0, 10.0, 10.0));
        s
    }

    #[test]
    fn click_carries_features_and_raw_event() {
        let s = surface_with_feature();
        let b = InteractionBroadcaster::new(true, true);
        let ev = PointerEvent::at(2.0, 2.0);
        let out = b.handle(&s, &SurfaceEvent::SingleClick(ev)).expect("click");
        let MapEvent::Click { features, event } = out else {
            panic!("expected click");
        };
        assert_eq!(event, ev);
        assert_eq!(features.len(), 1);
        assert_eq!(
            features[0],
            PickedFeatureRef {
                feature: FeatureId(7),
                layer: s.layers()[0].0
            }
        );
    }

    #[test]
    fn click_on_empty_pixel_still_notifies() {
        let s = surface_with_feature();
        let b = InteractionBroadcaster::new(true, false);
        let out = b.handle(&s, &SurfaceEvent::SingleClick(PointerEvent::at(500.0, 500.0)));
        assert!(matches!(out, Some(MapEvent::Click { ref features, .. }) if features.is_empty()));
    }

    #[test]
    fn hover_family_is_gated_without_hit_testing() {
        let s = surface_with_feature();
        let b = InteractionBroadcaster::new(true, false);
        for ev in [
            SurfaceEvent::PointerRest(PointerEvent::at(1.0, 1.0)),
            SurfaceEvent::PointerRestOut,
            SurfaceEvent::PointerMove(PointerEvent::at(1.0, 1.0)),
        ] {
            assert_eq!(b.handle(&s, &ev), None);
        }
        assert_eq!(s.hit_test_count(), 0);
    }

    #[test]
    fn pointer_move_and_rest_out_never_hit_test() {
        let s = surface_with_feature();
        let b = InteractionBroadcaster::new(false, true);
        assert_eq!(
            b.handle(&s, &SurfaceEvent::PointerMove(PointerEvent::at(1.0, 1.0))),
            Some(MapEvent::PointerMove)
        );
        assert_eq!(
            b.handle(&s, &SurfaceEvent::PointerRestOut),
            Some(MapEvent::HoverRestEnd)
        );
        assert_eq!(s.hit_test_count(), 0);

        let rest = b.handle(&s, &SurfaceEvent::PointerRest(PointerEvent::at(1.0, 1.0)));
        assert!(matches!(rest, Some(MapEvent::HoverRest { ref features, .. }) if features.len() == 1));
        assert_eq!(s.hit_test_count(), 1);
    }

    #[test]
    fn click_disabled_means_no_click() {
        let s = surface_with_feature();
        let b = InteractionBroadcaster::new(false, true);
        assert_eq!(
            b.handle(&s, &SurfaceEvent::SingleClick(PointerEvent::at(1.0, 1.0))),
            None
        );
        assert_eq!(s.hit_test_count(), 0);
    }

    #[test]
    fn view_changes_are_not_interactions() {
        let s = surface_with_feature();
        let b = InteractionBroadcaster::new(true, true);
        assert_eq!(b.handle(&s, &SurfaceEvent::ViewChanged), None);
    }

    #[test]
    fn nothing_to_wire_when_both_flags_off() {
        let config = MapViewConfig {
            enable_map_click: false,
            enable_map_hover: false,
            ..MapViewConfig::default()
        };
        assert!(InteractionBroadcaster::from_config(&config).is_none());
        assert!(InteractionBroadcaster::from_config(&MapViewConfig::default()).is_some());
    }
}
