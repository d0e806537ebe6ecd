use std::cell::RefCell;
use std::rc::Rc;

use formats::decode_permalink;
use foundation::ViewportState;
use futures_util::future::{FutureExt, LocalBoxFuture};
use layers::LayerFactory;
use runtime::{HistoryApi, HistorySynchronizer, SyncOutcome};
use scene::{RenderSurface, SurfaceEvent};
use tracing::{debug, info, warn};

use crate::config::MapViewConfig;
use crate::events::{MapEvent, MapEventBus};
use crate::interaction::InteractionBroadcaster;
use crate::loader::{LayerConfigSource, LayerLoadReport, LayerLoader, Timer};

/// How the URL fragment present at startup was handled.
#[derive(Debug, Clone, PartialEq)]
pub enum InitialRestore {
    /// Permalinks disabled.
    Disabled,
    /// No fragment, or a fragment without map state.
    NothingToRestore,
    Restored(ViewportState),
    /// The fragment did not decode; the viewport was left alone.
    Rejected(String),
}

/// A map view wired to its surface, its notification bus and (optionally)
/// browser history.
///
/// Owns the one permalink/history synchronizer for its surface; a second
/// view over another surface gets its own.
pub struct MapView<S: ?Sized, H> {
    config: MapViewConfig,
    bus: Rc<MapEventBus>,
    interactions: Option<InteractionBroadcaster>,
    history: Option<HistorySynchronizer<H>>,
    initial_restore: InitialRestore,
    surface: Rc<RefCell<S>>,
}

impl<S, H> MapView<S, H>
where
    S: RenderSurface + ?Sized + 'static,
    H: HistoryApi,
{
    /// Bring the view to its ready state.
    ///
    /// Returns the view plus the one-shot layer loading future. The caller
    /// drives that future on its executor; `map-ready` is emitted before
    /// this returns and never waits for layers.
    pub fn init<Src, F, T>(
        config: MapViewConfig,
        surface: Rc<RefCell<S>>,
        bus: Rc<MapEventBus>,
        history: H,
        location_hash: &str,
        loader: LayerLoader<Src, F, T>,
    ) -> (Self, LocalBoxFuture<'static, LayerLoadReport>)
    where
        Src: LayerConfigSource + 'static,
        F: LayerFactory + 'static,
        T: Timer + 'static,
    {
        let layers_loaded = loader
            .run(Rc::clone(&surface), Rc::clone(&bus))
            .boxed_local();

        let interactions = InteractionBroadcaster::from_config(&config);

        let (history, initial_restore) = if config.enable_permalink {
            let restore = restore_from_hash(&mut *surface.borrow_mut(), location_hash);
            let sync = HistorySynchronizer::new(history, config.round_permalink_coords);
            (Some(sync), restore)
        } else {
            (None, InitialRestore::Disabled)
        };

        let view = Self {
            config,
            bus,
            interactions,
            history,
            initial_restore,
            surface,
        };

        info!(
            click = view.config.enable_map_click,
            hover = view.config.enable_map_hover,
            permalink = view.config.enable_permalink,
            "map ready"
        );
        view.bus.emit(MapEvent::Ready);

        (view, layers_loaded)
    }

    pub fn surface(&self) -> &Rc<RefCell<S>> {
        &self.surface
    }

    pub fn bus(&self) -> &Rc<MapEventBus> {
        &self.bus
    }

    pub fn initial_restore(&self) -> &InitialRestore {
        &self.initial_restore
    }

    pub fn history(&self) -> Option<&HistorySynchronizer<H>> {
        self.history.as_ref()
    }

    pub fn history_mut(&mut self) -> Option<&mut HistorySynchronizer<H>> {
        self.history.as_mut()
    }

    /// Route one raw surface event.
    pub fn handle_surface_event(&mut self, event: SurfaceEvent) {
        if event == SurfaceEvent::ViewChanged {
            self.on_view_changed();
            return;
        }
        let Some(broadcaster) = &self.interactions else {
            return;
        };
        let notification = broadcaster.handle(&*self.surface.borrow(), &event);
        if let Some(n) = notification {
            self.bus.emit(n);
        }
    }

    /// Outgoing viewport change. `None` when permalinks are disabled.
    pub fn on_view_changed(&mut self) -> Option<SyncOutcome> {
        let sync = self.history.as_mut()?;
        let (state, units) = {
            let surface = self.surface.borrow();
            (surface.viewport(), surface.projection_units())
        };
        Some(sync.on_state_change(&state, units))
    }

    /// Incoming history navigation carrying the stored viewport, if any.
    ///
    /// Returns `true` if the surface was moved.
    pub fn on_popstate(&mut self, stored: Option<ViewportState>) -> bool {
        let Some(sync) = self.history.as_mut() else {
            return false;
        };
        let current = self.surface.borrow().viewport();
        let surface = &self.surface;
        sync.on_popstate(stored, current, |state| {
            debug!(?state, "restoring viewport from history");
            let mut surface = surface.borrow_mut();
            surface.apply_viewport(&state);
            surface.viewport() != current
        })
    }
}

/// Put a freshly created surface at the configured zoom range and initial
/// view. Runs before `MapView::init`, so a permalink in the URL still wins.
pub fn apply_initial_view<S>(surface: &mut S, config: &MapViewConfig)
where
    S: RenderSurface + ?Sized,
{
    surface.set_zoom_range(config.min_zoom, config.max_zoom);
    surface.apply_viewport(&config.initial_view);
}

/// One-time startup restore from the URL fragment. Does not involve the
/// history synchronizer: nothing has been pushed yet, so there is no echo.
fn restore_from_hash<S>(surface: &mut S, hash: &str) -> InitialRestore
where
    S: RenderSurface + ?Sized,
{
    match decode_permalink(hash) {
        Ok(Some(state)) => {
            surface.apply_viewport(&state);
            debug!(?state, "viewport restored from permalink");
            InitialRestore::Restored(state)
        }
        Ok(None) => InitialRestore::NothingToRestore,
        Err(err) => {
            warn!(error = %err, hash, "ignoring unreadable permalink");
            InitialRestore::Rejected(err.to_string())
        }
    }
}
