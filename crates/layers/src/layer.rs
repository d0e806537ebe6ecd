use formats::LayerConfigEntry;

/// Renderer-facing layer family.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum LayerKind {
    Vector,
    Wfs,
    Xyz,
    Osm,
    Wms,
    TileWms,
}

impl LayerKind {
    pub fn from_layer_type(layer_type: &str) -> Option<Self> {
        match layer_type.trim().to_ascii_lowercase().as_str() {
            "vector" => Some(Self::Vector),
            "wfs" => Some(Self::Wfs),
            "xyz" => Some(Self::Xyz),
            "osm" => Some(Self::Osm),
            "wms" => Some(Self::Wms),
            "tilewms" => Some(Self::TileWms),
            _ => None,
        }
    }

    /// Vector layers carry features that hit-testing can return.
    pub fn is_vector(self) -> bool {
        matches!(self, Self::Vector | Self::Wfs)
    }
}

/// A materialized layer, ready to attach to a render surface.
#[derive(Debug, Clone, PartialEq)]
pub struct LayerHandle {
    pub kind: LayerKind,
    pub name: String,
    pub source_url: Option<String>,
    pub visible: bool,
}

impl LayerHandle {
    pub fn new(kind: LayerKind, name: impl Into<String>) -> Self {
        Self {
            kind,
            name: name.into(),
            source_url: None,
            visible: true,
        }
    }
}

/// Turns declarative entries into layers.
///
/// `None` means the entry is intentionally not rendered (disabled or an
/// unsupported type); it is not an error.
pub trait LayerFactory {
    fn create_layer(&self, entry: &LayerConfigEntry) -> Option<LayerHandle>;
}

impl<F> LayerFactory for F
where
    F: Fn(&LayerConfigEntry) -> Option<LayerHandle>,
{
    fn create_layer(&self, entry: &LayerConfigEntry) -> Option<LayerHandle> {
        self(entry)
    }
}
