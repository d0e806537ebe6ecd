//! Initial layer loading.
//!
//! Fetch the layer configuration once, materialize each entry in order, attach
//! the non-skipped ones, then announce `map-layers-added`. A failed or
//! timed-out fetch attaches nothing, reports `map-layers-failed`, and still
//! announces `map-layers-added` with a count of zero so nobody waits forever.

use std::cell::RefCell;
use std::future::Future;
use std::pin::pin;
use std::rc::Rc;

use formats::{LayerConfigDocument, LayerConfigError};
use foundation::{LayerId, Millis};
use futures_util::future::{self, Either};
use layers::LayerFactory;
use scene::RenderSurface;
use tracing::{debug, info, warn};

use crate::events::{MapEvent, MapEventBus};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LayerLoadError {
    /// Network or transport failure.
    Fetch(String),
    Parse(LayerConfigError),
    TimedOut(Millis),
}

impl LayerLoadError {
    fn is_retryable(&self) -> bool {
        !matches!(self, LayerLoadError::Parse(_))
    }
}

impl std::fmt::Display for LayerLoadError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LayerLoadError::Fetch(msg) => write!(f, "layer configuration fetch failed: {msg}"),
            LayerLoadError::Parse(e) => write!(f, "{e}"),
            LayerLoadError::TimedOut(after) => {
                write!(f, "layer configuration fetch timed out after {after}")
            }
        }
    }
}

impl std::error::Error for LayerLoadError {}

/// Where the layer configuration document comes from.
pub trait LayerConfigSource {
    /// Raw document text.
    fn fetch(&self) -> impl Future<Output = Result<String, LayerLoadError>>;
}

/// Platform timer used for the fetch deadline.
pub trait Timer {
    fn sleep(&self, duration: Millis) -> impl Future<Output = ()>;
}

/// A document already in memory.
#[derive(Debug, Clone)]
pub struct StaticSource(pub String);

impl LayerConfigSource for StaticSource {
    async fn fetch(&self) -> Result<String, LayerLoadError> {
        Ok(self.0.clone())
    }
}

/// A timer that never fires: no deadline.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoDeadline;

impl Timer for NoDeadline {
    fn sleep(&self, _duration: Millis) -> impl Future<Output = ()> {
        future::pending()
    }
}

/// Outcome of the one-time layer load.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LayerLoadReport {
    /// Surface ids of attached layers, in attach order.
    pub attached: Vec<LayerId>,
    /// Labels of entries the factory declined.
    pub skipped: Vec<String>,
    pub error: Option<LayerLoadError>,
}

pub struct LayerLoader<Src, F, T> {
    source: Src,
    factory: F,
    timer: T,
    timeout: Millis,
    attempts: u32,
}

impl<Src, F, T> LayerLoader<Src, F, T>
where
    Src: LayerConfigSource,
    F: LayerFactory,
    T: Timer,
{
    pub fn new(source: Src, factory: F, timer: T) -> Self {
        Self {
            source,
            factory,
            timer,
            timeout: Millis(10_000),
            attempts: 1,
        }
    }

    pub fn with_timeout(mut self, timeout: Millis) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_attempts(mut self, attempts: u32) -> Self {
        self.attempts = attempts.max(1);
        self
    }

    /// Load, attach and announce. Borrows of `surface` and `bus` are never
    /// held across an await point.
    pub async fn run<S>(self, surface: Rc<RefCell<S>>, bus: Rc<MapEventBus>) -> LayerLoadReport
    where
        S: RenderSurface + ?Sized,
    {
        let mut report = LayerLoadReport::default();

        match self.fetch_document().await {
            Ok(doc) => {
                let mut surface = surface.borrow_mut();
                for entry in &doc.layers {
                    match self.factory.create_layer(entry) {
                        Some(layer) => report.attached.push(surface.add_layer(layer)),
                        None => {
                            debug!(layer = entry.label(), "layer entry skipped");
                            report.skipped.push(entry.label().to_string());
                        }
                    }
                }
            }
            Err(err) => {
                warn!(error = %err, "layer configuration unavailable, continuing without layers");
                bus.emit(MapEvent::LayersFailed { error: err.clone() });
                report.error = Some(err);
            }
        }

        info!(
            attached = report.attached.len(),
            skipped = report.skipped.len(),
            "initial layers added"
        );
        bus.emit(MapEvent::LayersAdded {
            count: report.attached.len(),
        });
        report
    }

    async fn fetch_document(&self) -> Result<LayerConfigDocument, LayerLoadError> {
        let mut attempt = 1;
        loop {
            match self.fetch_once().await {
                Ok(doc) => return Ok(doc),
                Err(err) if attempt < self.attempts && err.is_retryable() => {
                    warn!(attempt, error = %err, "retrying layer configuration fetch");
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }

    async fn fetch_once(&self) -> Result<LayerConfigDocument, LayerLoadError> {
        let fetch = pin!(self.source.fetch());
        let deadline = pin!(self.timer.sleep(self.timeout));
        match future::select(fetch, deadline).await {
            Either::Left((text, _)) => {
                LayerConfigDocument::from_json_str(&text?).map_err(LayerLoadError::Parse)
            }
            Either::Right(((), _)) => Err(LayerLoadError::TimedOut(self.timeout)),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::cell::{Cell, RefCell};
    use std::future::Future;
    use std::rc::Rc;

    use formats::LayerConfigEntry;
    use foundation::{Millis, ProjectionUnits};
    use futures_util::future;
    use layers::{ConfigLayerFactory, LayerHandle, LayerKind};
    use pretty_assertions::assert_eq;
    use scene::HeadlessSurface;

    use super::{LayerConfigSource, LayerLoadError, LayerLoader, NoDeadline, StaticSource, Timer};
    use crate::events::{MapEvent, MapEventBus};

    struct Hanging;

    impl LayerConfigSource for Hanging {
        fn fetch(&self) -> impl Future<Output = Result<String, LayerLoadError>> {
            future::pending()
        }
    }

    struct Immediate;

    impl Timer for Immediate {
        fn sleep(&self, _: Millis) -> impl Future<Output = ()> {
            future::ready(())
        }
    }

    /// Fails until the given attempt, then serves `doc`.
    struct Flaky {
        calls: Cell<u32>,
        succeed_on: u32,
        doc: &'static str,
    }

    impl LayerConfigSource for Flaky {
        async fn fetch(&self) -> Result<String, LayerLoadError> {
            let n = self.calls.get() + 1;
            self.calls.set(n);
            if n >= self.succeed_on {
                Ok(self.doc.to_string())
            } else {
                Err(LayerLoadError::Fetch("connection reset".to_string()))
            }
        }
    }

    fn shared() -> (Rc<RefCell<HeadlessSurface>>, Rc<MapEventBus>) {
        (
            Rc::new(RefCell::new(HeadlessSurface::new(ProjectionUnits::Meters))),
            Rc::new(MapEventBus::new()),
        )
    }

    fn names(surface: &HeadlessSurface) -> Vec<String> {
        surface.layers().iter().map(|(_, l)| l.name.clone()).collect()
    }

    #[test]
    fn attaches_in_order_and_skips_nulls() {
        let (surface, bus) = shared();
        let factory = |e: &LayerConfigEntry| {
            (e.layer_key.as_deref() != Some("B"))
                .then(|| LayerHandle::new(LayerKind::Vector, e.label()))
        };
        let doc = r#"{"layers": [
            {"layerType": "vector", "layerKey": "A"},
            {"layerType": "vector", "layerKey": "B"},
            {"layerType": "vector", "layerKey": "C"}
        ]}"#;
        let loader = LayerLoader::new(StaticSource(doc.to_string()), factory, NoDeadline);
        let report = pollster::block_on(loader.run(Rc::clone(&surface), Rc::clone(&bus)));

        assert_eq!(names(&surface.borrow()), vec!["A", "C"]);
        assert_eq!(report.attached.len(), 2);
        assert_eq!(report.skipped, vec!["B".to_string()]);
        assert_eq!(bus.emitted(), &["map-layers-added"]);
    }

    #[test]
    fn layers_added_reports_attached_count() {
        let (surface, bus) = shared();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let s = Rc::clone(&seen);
        bus.subscribe(move |e: &MapEvent| s.borrow_mut().push(e.clone()));

        let doc = r#"{"layers": [{"layerType": "osm"}, {"layerType": "unknown"}]}"#;
        let loader = LayerLoader::new(StaticSource(doc.to_string()), ConfigLayerFactory, NoDeadline);
        pollster::block_on(loader.run(surface, Rc::clone(&bus)));

        assert_eq!(*seen.borrow(), vec![MapEvent::LayersAdded { count: 1 }]);
    }

    #[test]
    fn malformed_document_attaches_nothing_but_still_announces() {
        let (surface, bus) = shared();
        let doc = r#"{"layers": [{"layerType": "osm"}, {"layerType": "#;
        let loader = LayerLoader::new(StaticSource(doc.to_string()), ConfigLayerFactory, NoDeadline);
        let report = pollster::block_on(loader.run(Rc::clone(&surface), Rc::clone(&bus)));

        assert!(surface.borrow().layers().is_empty());
        assert!(matches!(report.error, Some(LayerLoadError::Parse(_))));
        assert_eq!(
            bus.emitted(),
            &["map-layers-failed", "map-layers-added"]
        );
    }

    #[test]
    fn hung_fetch_times_out() {
        let (surface, bus) = shared();
        let loader =
            LayerLoader::new(Hanging, ConfigLayerFactory, Immediate).with_timeout(Millis(250));
        let report = pollster::block_on(loader.run(surface, Rc::clone(&bus)));

        assert_eq!(report.error, Some(LayerLoadError::TimedOut(Millis(250))));
        assert_eq!(bus.count_emitted("map-layers-added"), 1);
    }

    #[test]
    fn ready_fetch_beats_ready_deadline() {
        let (surface, bus) = shared();
        let doc = r#"{"layers": [{"layerType": "osm"}]}"#;
        let loader = LayerLoader::new(StaticSource(doc.to_string()), ConfigLayerFactory, Immediate);
        let report = pollster::block_on(loader.run(surface, bus));
        assert_eq!(report.error, None);
        assert_eq!(report.attached.len(), 1);
    }

    #[test]
    fn retries_transient_failures() {
        let (surface, bus) = shared();
        let source = Flaky {
            calls: Cell::new(0),
            succeed_on: 3,
            doc: r#"{"layers": [{"layerType": "osm"}]}"#,
        };
        let loader = LayerLoader::new(source, ConfigLayerFactory, NoDeadline).with_attempts(3);
        let report = pollster::block_on(loader.run(surface, Rc::clone(&bus)));
        assert_eq!(report.error, None);
        assert_eq!(report.attached.len(), 1);
        assert_eq!(bus.emitted(), &["map-layers-added"]);
    }

    #[test]
    fn gives_up_after_last_attempt() {
        let (surface, bus) = shared();
        let source = Flaky {
            calls: Cell::new(0),
            succeed_on: 5,
            doc: "{}",
        };
        let loader = LayerLoader::new(source, ConfigLayerFactory, NoDeadline).with_attempts(2);
        let report = pollster::block_on(loader.run(surface, bus));
        assert_eq!(
            report.error,
            Some(LayerLoadError::Fetch("connection reset".to_string()))
        );
    }
}
