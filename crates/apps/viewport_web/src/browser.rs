//! Browser bindings: `window.history`, `location.hash`, `popstate`, HTTP
//! fetch of the layer configuration, `setTimeout`, and the JS render surface.

use std::cell::RefCell;
use std::future::Future;
use std::rc::{Rc, Weak};

use foundation::{
    Coordinate, FeatureId, LayerId, Millis, ProjectionUnits, ViewportState, id_from_number,
};
use gloo_net::http::Request;
use js_sys::{Array, Function, JSON, Object, Promise, Reflect};
use layers::{ConfigLayerFactory, LayerHandle, LayerKind};
use runtime::{HistoryApi, HistoryEntry, HistoryError, SubscriptionId};
use scene::{Pixel, PointerEvent, RenderSurface, SurfaceEvent};
use tracing::warn;
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::{JsFuture, spawn_local};

use crate::config::MapViewConfig;
use crate::events::{MapEvent, MapEventBus, event_name};
use crate::loader::{LayerConfigSource, LayerLoadError, LayerLoader, Timer};
use crate::map_view::{MapView, apply_initial_view};

#[wasm_bindgen]
extern "C" {
    /// The page's render surface object (an OpenLayers map adapter or
    /// similar), implementing the methods below.
    pub type JsSurface;

    #[wasm_bindgen(method, js_name = getCenter)]
    fn js_get_center(this: &JsSurface) -> Vec<f64>;
    #[wasm_bindgen(method, js_name = setCenter)]
    fn js_set_center(this: &JsSurface, center: Vec<f64>);
    #[wasm_bindgen(method, js_name = getZoom)]
    fn js_get_zoom(this: &JsSurface) -> f64;
    #[wasm_bindgen(method, js_name = setZoom)]
    fn js_set_zoom(this: &JsSurface, zoom: f64);
    #[wasm_bindgen(method, js_name = getRotation)]
    fn js_get_rotation(this: &JsSurface) -> f64;
    #[wasm_bindgen(method, js_name = setRotation)]
    fn js_set_rotation(this: &JsSurface, rotation: f64);
    #[wasm_bindgen(method, js_name = setZoomRange)]
    fn js_set_zoom_range(this: &JsSurface, min_zoom: f64, max_zoom: f64);
    #[wasm_bindgen(method, js_name = getProjectionUnits)]
    fn js_get_projection_units(this: &JsSurface) -> String;
    /// Flat `[feature, layer, feature, layer, ...]` ids, topmost first.
    #[wasm_bindgen(method, js_name = featuresAtPixel)]
    fn js_features_at_pixel(this: &JsSurface, x: f64, y: f64) -> Vec<f64>;
    #[wasm_bindgen(method, js_name = addLayer)]
    fn js_add_layer(this: &JsSurface, layer: &JsValue) -> f64;
    #[wasm_bindgen(method, js_name = setPointerRestInterval)]
    fn js_set_pointer_rest_interval(this: &JsSurface, ms: f64);
}

impl RenderSurface for JsSurface {
    fn center(&self) -> Coordinate {
        let c = self.js_get_center();
        Coordinate::new(
            c.first().copied().unwrap_or(0.0),
            c.get(1).copied().unwrap_or(0.0),
        )
    }

    fn zoom(&self) -> f64 {
        self.js_get_zoom()
    }

    fn rotation(&self) -> f64 {
        self.js_get_rotation()
    }

    fn set_center(&mut self, center: Coordinate) {
        self.js_set_center(vec![center.x, center.y]);
    }

    fn set_zoom(&mut self, zoom: f64) {
        self.js_set_zoom(zoom);
    }

    fn set_rotation(&mut self, rotation: f64) {
        self.js_set_rotation(rotation);
    }

    fn set_zoom_range(&mut self, min_zoom: f64, max_zoom: f64) {
        self.js_set_zoom_range(min_zoom, max_zoom);
    }

    fn projection_units(&self) -> ProjectionUnits {
        let code = self.js_get_projection_units();
        ProjectionUnits::from_code(&code).unwrap_or_else(|| {
            warn!(code = %code, "unknown projection units, assuming meters");
            ProjectionUnits::Meters
        })
    }

    fn for_each_feature_at_pixel(&self, pixel: Pixel, f: &mut dyn FnMut(FeatureId, LayerId)) {
        for pair in self.js_features_at_pixel(pixel.x, pixel.y).chunks_exact(2) {
            match (id_from_number(pair[0]), id_from_number(pair[1])) {
                (Some(feature), Some(layer)) => f(FeatureId(feature), LayerId(layer)),
                _ => warn!(feature = pair[0], layer = pair[1], "skipping hit with non-integer ids"),
            }
        }
    }

    fn add_layer(&mut self, layer: LayerHandle) -> LayerId {
        LayerId(self.js_add_layer(&layer_to_js(&layer)) as u64)
    }
}

fn layer_kind_code(kind: LayerKind) -> &'static str {
    match kind {
        LayerKind::Vector => "vector",
        LayerKind::Wfs => "wfs",
        LayerKind::Xyz => "xyz",
        LayerKind::Osm => "osm",
        LayerKind::Wms => "wms",
        LayerKind::TileWms => "tilewms",
    }
}

fn layer_to_js(layer: &LayerHandle) -> JsValue {
    let obj = Object::new();
    set(&obj, "kind", &JsValue::from_str(layer_kind_code(layer.kind)));
    set(&obj, "name", &JsValue::from_str(&layer.name));
    set(&obj, "visible", &JsValue::from_bool(layer.visible));
    let url = layer
        .source_url
        .as_deref()
        .map_or(JsValue::NULL, JsValue::from_str);
    set(&obj, "url", &url);
    obj.into()
}

fn set(obj: &Object, key: &str, value: &JsValue) {
    let _ = Reflect::set(obj, &JsValue::from_str(key), value);
}

/// `window.history`, storing the viewport as a plain JSON object.
pub struct BrowserHistory {
    history: web_sys::History,
}

impl BrowserHistory {
    pub fn new(window: &web_sys::Window) -> Result<Self, JsValue> {
        Ok(Self {
            history: window.history()?,
        })
    }
}

impl HistoryApi for BrowserHistory {
    fn push_state(&mut self, entry: &HistoryEntry, title: &str) -> Result<(), HistoryError> {
        let json = serde_json::to_string(&entry.state)
            .map_err(|e| HistoryError::Rejected(e.to_string()))?;
        let data = JSON::parse(&json).map_err(|e| HistoryError::Rejected(format!("{e:?}")))?;
        self.history
            .push_state_with_url(&data, title, Some(entry.hash_label.as_str()))
            .map_err(|e| HistoryError::Rejected(format!("{e:?}")))
    }
}

/// Decode a popstate payload; `None` for null or foreign state objects.
fn popstate_viewport(state: &JsValue) -> Option<ViewportState> {
    if state.is_null() || state.is_undefined() {
        return None;
    }
    let json: String = JSON::stringify(state).ok()?.into();
    match serde_json::from_str::<ViewportState>(&json) {
        Ok(v) => Some(v),
        Err(err) => {
            warn!(error = %err, "popstate payload is not a viewport");
            None
        }
    }
}

/// Layer configuration over HTTP GET.
pub struct HttpSource {
    url: String,
}

impl LayerConfigSource for HttpSource {
    async fn fetch(&self) -> Result<String, LayerLoadError> {
        let resp = Request::get(&self.url)
            .send()
            .await
            .map_err(|e| LayerLoadError::Fetch(e.to_string()))?;
        if !resp.ok() {
            return Err(LayerLoadError::Fetch(format!(
                "GET {} returned {}",
                self.url,
                resp.status()
            )));
        }
        resp.text()
            .await
            .map_err(|e| LayerLoadError::Fetch(e.to_string()))
    }
}

/// `setTimeout`-backed timer.
pub struct BrowserTimer;

impl Timer for BrowserTimer {
    fn sleep(&self, duration: Millis) -> impl Future<Output = ()> {
        let ms = duration.as_u64().min(i32::MAX as u64) as i32;
        let promise = Promise::new(&mut |resolve, _reject| {
            // Without a window the promise never settles: no deadline.
            if let Some(window) = web_sys::window() {
                if let Err(err) =
                    window.set_timeout_with_callback_and_timeout_and_arguments_0(&resolve, ms)
                {
                    warn!(?err, "setTimeout failed, layer config fetch has no deadline");
                }
            }
        });
        async move {
            let _ = JsFuture::from(promise).await;
        }
    }
}

type BrowserMapView = MapView<JsSurface, BrowserHistory>;

/// The map view exported to JavaScript.
///
/// Lifecycle: `new`, then `on(...)` for each subscriber, then `start()`.
/// Subscribers registered after `start()` miss `map-ready`. Subscribers run
/// synchronously inside the dispatch; they may call `on` and `off`, while
/// pointer or view calls made from inside a subscriber are dropped with a
/// warning.
#[wasm_bindgen]
pub struct WebMap {
    config: MapViewConfig,
    bus: Rc<MapEventBus>,
    surface: Option<JsSurface>,
    view: Option<Rc<RefCell<BrowserMapView>>>,
    popstate: Option<Closure<dyn FnMut(web_sys::PopStateEvent)>>,
}

#[wasm_bindgen]
impl WebMap {
    #[wasm_bindgen(constructor)]
    pub fn new(surface: JsSurface, config_json: &str) -> Result<WebMap, JsValue> {
        let config = MapViewConfig::from_json_str(config_json)
            .map_err(|e| JsValue::from_str(&e.to_string()))?;
        Ok(WebMap {
            config,
            bus: Rc::new(MapEventBus::new()),
            surface: Some(surface),
            view: None,
            popstate: None,
        })
    }

    /// Subscribe `callback` to the named notification. Returns a handle for `off`.
    pub fn on(&self, name: &str, callback: Function) -> Result<f64, JsValue> {
        let name = event_name(name)
            .ok_or_else(|| JsValue::from_str(&format!("unknown map event: {name}")))?;
        let id = self.bus.subscribe_to(name, move |event: &MapEvent| {
            if let Err(err) = callback.call1(&JsValue::NULL, &event_to_js(event)) {
                warn!(?err, "map event subscriber threw");
            }
        });
        Ok(id.0 as f64)
    }

    pub fn off(&self, handle: f64) -> bool {
        self.bus.unsubscribe(SubscriptionId(handle as u64))
    }

    /// Run initialization once: start layer loading, wire history, fire
    /// `map-ready`.
    pub fn start(&mut self) -> Result<(), JsValue> {
        let Some(mut surface) = self.surface.take() else {
            return Err(JsValue::from_str("map already started"));
        };
        let window = web_sys::window().ok_or_else(|| JsValue::from_str("no window"))?;
        surface.js_set_pointer_rest_interval(self.config.pointer_rest_interval().as_u64() as f64);
        apply_initial_view(&mut surface, &self.config);

        let history = BrowserHistory::new(&window)?;
        let hash = window.location().hash().unwrap_or_default();
        let loader = LayerLoader::new(
            HttpSource {
                url: self.config.layer_config_url.clone(),
            },
            ConfigLayerFactory,
            BrowserTimer,
        )
        .with_timeout(self.config.layer_config_timeout())
        .with_attempts(self.config.layer_config_attempts());

        let (view, loading) = MapView::init(
            self.config.clone(),
            Rc::new(RefCell::new(surface)),
            Rc::clone(&self.bus),
            history,
            &hash,
            loader,
        );
        spawn_local(async move {
            loading.await;
        });

        let view = Rc::new(RefCell::new(view));
        if self.config.enable_permalink {
            self.popstate = Some(install_popstate(&window, Rc::downgrade(&view))?);
        }
        self.view = Some(view);
        Ok(())
    }

    #[wasm_bindgen(js_name = singleClick)]
    pub fn single_click(&self, x: f64, y: f64) {
        self.dispatch(SurfaceEvent::SingleClick(PointerEvent::at(x, y)));
    }

    #[wasm_bindgen(js_name = pointerRest)]
    pub fn pointer_rest(&self, x: f64, y: f64) {
        self.dispatch(SurfaceEvent::PointerRest(PointerEvent::at(x, y)));
    }

    #[wasm_bindgen(js_name = pointerRestOut)]
    pub fn pointer_rest_out(&self) {
        self.dispatch(SurfaceEvent::PointerRestOut);
    }

    #[wasm_bindgen(js_name = pointerMove)]
    pub fn pointer_move(&self, x: f64, y: f64) {
        self.dispatch(SurfaceEvent::PointerMove(PointerEvent::at(x, y)));
    }

    /// Call on the surface's move-end, not per animation frame.
    #[wasm_bindgen(js_name = viewChanged)]
    pub fn view_changed(&self) {
        self.dispatch(SurfaceEvent::ViewChanged);
    }
}

impl WebMap {
    fn dispatch(&self, event: SurfaceEvent) {
        let Some(view) = &self.view else {
            return;
        };
        match view.try_borrow_mut() {
            Ok(mut view) => view.handle_surface_event(event),
            Err(_) => warn!(?event, "map event raised from inside a subscriber, dropped"),
        }
    }
}

impl Drop for WebMap {
    fn drop(&mut self) {
        if let (Some(closure), Some(window)) = (self.popstate.take(), web_sys::window()) {
            let _ = window
                .remove_event_listener_with_callback("popstate", closure.as_ref().unchecked_ref());
        }
    }
}

fn install_popstate(
    window: &web_sys::Window,
    view: Weak<RefCell<BrowserMapView>>,
) -> Result<Closure<dyn FnMut(web_sys::PopStateEvent)>, JsValue> {
    let closure = Closure::<dyn FnMut(web_sys::PopStateEvent)>::new(
        move |event: web_sys::PopStateEvent| {
            let Some(view) = view.upgrade() else {
                return;
            };
            let stored = popstate_viewport(&event.state());
            match view.try_borrow_mut() {
                Ok(mut view) => {
                    view.on_popstate(stored);
                }
                Err(_) => warn!("popstate while the map is dispatching, dropped"),
            }
        },
    );
    window.add_event_listener_with_callback("popstate", closure.as_ref().unchecked_ref())?;
    Ok(closure)
}

fn features_to_js(features: &[scene::PickedFeatureRef]) -> Array {
    features
        .iter()
        .map(|f| {
            let obj = Object::new();
            set(&obj, "feature", &JsValue::from_f64(f.feature.0 as f64));
            set(&obj, "layer", &JsValue::from_f64(f.layer.0 as f64));
            JsValue::from(obj)
        })
        .collect()
}

fn pointer_to_js(event: &PointerEvent) -> JsValue {
    let obj = Object::new();
    let pixel: Array = [event.pixel.x, event.pixel.y]
        .iter()
        .map(|v| JsValue::from_f64(*v))
        .collect();
    set(&obj, "pixel", &pixel);
    let coordinate = event.coordinate.map_or(JsValue::NULL, |c| {
        [c.x, c.y]
            .iter()
            .map(|v| JsValue::from_f64(*v))
            .collect::<Array>()
            .into()
    });
    set(&obj, "coordinate", &coordinate);
    obj.into()
}

fn event_to_js(event: &MapEvent) -> JsValue {
    let obj = Object::new();
    match event {
        MapEvent::Click { features, event } | MapEvent::HoverRest { features, event } => {
            set(&obj, "features", &features_to_js(features));
            set(&obj, "event", &pointer_to_js(event));
        }
        MapEvent::LayersAdded { count } => {
            set(&obj, "count", &JsValue::from_f64(*count as f64));
        }
        MapEvent::LayersFailed { error } => {
            set(&obj, "error", &JsValue::from_str(&error.to_string()));
        }
        MapEvent::HoverRestEnd | MapEvent::PointerMove | MapEvent::Ready => {}
    }
    obj.into()
}

/// Install the panic hook and route `tracing` output to the browser console.
#[wasm_bindgen(start)]
pub fn init_logging() {
    console_error_panic_hook::set_once();
    tracing_wasm::set_as_global_default();
}
