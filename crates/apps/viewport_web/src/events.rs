use runtime::{EventBus, Notification};
use scene::{PickedFeatureRef, PointerEvent};

use crate::loader::LayerLoadError;

pub const MAP_CLICK: &str = "map-click";
pub const MAP_HOVER_REST: &str = "map-hover-rest";
pub const MAP_HOVER_REST_END: &str = "map-hover-rest-end";
pub const MAP_POINTER_MOVE: &str = "map-pointer-move";
pub const MAP_LAYERS_ADDED: &str = "map-layers-added";
pub const MAP_LAYERS_FAILED: &str = "map-layers-failed";
pub const MAP_READY: &str = "map-ready";

pub const ALL_EVENT_NAMES: [&str; 7] = [
    MAP_CLICK,
    MAP_HOVER_REST,
    MAP_HOVER_REST_END,
    MAP_POINTER_MOVE,
    MAP_LAYERS_ADDED,
    MAP_LAYERS_FAILED,
    MAP_READY,
];

/// Notifications other components subscribe to.
#[derive(Debug, Clone, PartialEq)]
pub enum MapEvent {
    Click {
        features: Vec<PickedFeatureRef>,
        event: PointerEvent,
    },
    HoverRest {
        features: Vec<PickedFeatureRef>,
        event: PointerEvent,
    },
    HoverRestEnd,
    PointerMove,
    /// All configured layers were processed; `count` were attached.
    LayersAdded { count: usize },
    /// The layer configuration could not be loaded. Always followed by
    /// `LayersAdded { count: 0 }`.
    LayersFailed { error: LayerLoadError },
    Ready,
}

impl Notification for MapEvent {
    fn name(&self) -> &'static str {
        match self {
            MapEvent::Click { .. } => MAP_CLICK,
            MapEvent::HoverRest { .. } => MAP_HOVER_REST,
            MapEvent::HoverRestEnd => MAP_HOVER_REST_END,
            MapEvent::PointerMove => MAP_POINTER_MOVE,
            MapEvent::LayersAdded { .. } => MAP_LAYERS_ADDED,
            MapEvent::LayersFailed { .. } => MAP_LAYERS_FAILED,
            MapEvent::Ready => MAP_READY,
        }
    }
}

/// Map a caller-supplied name onto the static name the bus filters by.
pub fn event_name(name: &str) -> Option<&'static str> {
    ALL_EVENT_NAMES.iter().copied().find(|n| *n == name)
}

pub type MapEventBus = EventBus<MapEvent>;

#[cfg(test)]
mod tests {
    use runtime::Notification;

    use super::{ALL_EVENT_NAMES, MapEvent, event_name};

    #[test]
    fn names_are_the_public_contract() {
        assert_eq!(MapEvent::HoverRestEnd.name(), "map-hover-rest-end");
        assert_eq!(MapEvent::LayersAdded { count: 2 }.name(), "map-layers-added");
        assert_eq!(MapEvent::Ready.name(), "map-ready");
    }

    #[test]
    fn lookup_accepts_known_names_only() {
        for n in ALL_EVENT_NAMES {
            assert_eq!(event_name(n), Some(n));
        }
        assert_eq!(event_name("cmv-mapclick"), None);
    }
}
