use formats::LayerConfigEntry;

use crate::layer::{LayerFactory, LayerHandle, LayerKind};

/// Default factory keyed on `layerType`.
///
/// Raster service types need a `url`; `osm` falls back to the public tile
/// template when none is given. Entries the factory cannot serve resolve to
/// `None`.
#[derive(Debug, Default, Clone, Copy)]
pub struct ConfigLayerFactory;

pub const OSM_TILE_URL: &str = "https://tile.openstreetmap.org/{z}/{x}/{y}.png";

impl ConfigLayerFactory {
    pub fn new() -> Self {
        Self
    }
}

impl LayerFactory for ConfigLayerFactory {
    fn create_layer(&self, entry: &LayerConfigEntry) -> Option<LayerHandle> {
        if entry.disabled {
            return None;
        }
        let kind = LayerKind::from_layer_type(&entry.layer_type)?;

        let source_url = match kind {
            LayerKind::Osm => Some(entry.url.clone().unwrap_or_else(|| OSM_TILE_URL.to_string())),
            LayerKind::Xyz | LayerKind::Wms | LayerKind::TileWms | LayerKind::Wfs => {
                Some(entry.url.clone()?)
            }
            // Inline vector layers may be filled by other components later.
            LayerKind::Vector => entry.url.clone(),
        };

        Some(LayerHandle {
            kind,
            name: entry.label().to_string(),
            source_url,
            visible: entry.visibility,
        })
    }
}

#[cfg(test)]
mod tests {
    use formats::LayerConfigEntry;

    use super::{ConfigLayerFactory, OSM_TILE_URL};
    use crate::layer::{LayerFactory, LayerKind};

    fn entry(layer_type: &str, url: Option<&str>) -> LayerConfigEntry {
        let mut e = LayerConfigEntry::new(layer_type);
        e.url = url.map(str::to_string);
        e
    }

    #[test]
    fn known_types_materialize() {
        let f = ConfigLayerFactory::new();
        let wms = f
            .create_layer(&entry("wms", Some("https://example.org/wms")).with_key("roads"))
            .expect("wms layer");
        assert_eq!(wms.kind, LayerKind::Wms);
        assert_eq!(wms.name, "roads");
        assert_eq!(wms.source_url.as_deref(), Some("https://example.org/wms"));

        let osm = f.create_layer(&entry("OSM", None)).expect("osm layer");
        assert_eq!(osm.source_url.as_deref(), Some(OSM_TILE_URL));

        let vector = f.create_layer(&entry("vector", None)).expect("vector layer");
        assert!(vector.kind.is_vector());
        assert_eq!(vector.source_url, None);
    }

    #[test]
    fn unsupported_disabled_or_incomplete_entries_skip() {
        let f = ConfigLayerFactory::new();
        assert!(f.create_layer(&entry("heatmap", Some("x"))).is_none());
        assert!(f.create_layer(&entry("xyz", None)).is_none());

        let mut disabled = entry("osm", None);
        disabled.disabled = true;
        assert!(f.create_layer(&disabled).is_none());
    }

    #[test]
    fn hidden_entries_stay_hidden() {
        let mut e = entry("wfs", Some("https://example.org/wfs"));
        e.visibility = false;
        let layer = ConfigLayerFactory::new().create_layer(&e).expect("wfs");
        assert!(!layer.visible);
    }

    #[test]
    fn closures_are_factories() {
        let only_osm = |e: &LayerConfigEntry| {
            (e.layer_type == "osm").then(|| crate::LayerHandle::new(LayerKind::Osm, "base"))
        };
        assert!(only_osm.create_layer(&entry("osm", None)).is_some());
        assert!(only_osm.create_layer(&entry("wms", None)).is_none());
    }
}
