//! Scripted sessions against a headless map.
//!
//! One command per line; `#` starts a comment.
//!
//! ```text
//! feature <layer-index> <feature-id> <x> <y> <w> <h>
//! click <x> <y>
//! rest <x> <y>
//! restout
//! move <x> <y>
//! view <x> <y> <zoom> <rotation>
//! back
//! forward
//! ```

use std::cell::RefCell;
use std::rc::Rc;

use foundation::{Coordinate, FeatureId, ProjectionUnits, ViewportState};
use layers::ConfigLayerFactory;
use runtime::{MemoryHistory, Notification, SyncOutcome};
use scene::{HeadlessSurface, PixelRect, PointerEvent, RenderSurface, SurfaceEvent};
use viewport_web::{
    LayerLoader, MapEvent, MapEventBus, MapView, MapViewConfig, NoDeadline, StaticSource,
};

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Feature {
        layer_index: usize,
        feature: u64,
        rect: PixelRect,
    },
    Surface(SurfaceEvent),
    View(ViewportState),
    Back,
    Forward,
}

pub fn parse_script(script: &str) -> Result<Vec<Command>, String> {
    let mut out = Vec::new();
    for (i, raw) in script.lines().enumerate() {
        let line = raw.split('#').next().unwrap_or("").trim();
        if line.is_empty() {
            continue;
        }
        let cmd = parse_line(line).map_err(|e| format!("line {}: {e}", i + 1))?;
        out.push(cmd);
    }
    Ok(out)
}

fn parse_line(line: &str) -> Result<Command, String> {
    let mut words = line.split_whitespace();
    let verb = words.next().unwrap_or("");
    let args: Vec<&str> = words.collect();
    let nums = |n: usize| -> Result<Vec<f64>, String> {
        if args.len() != n {
            return Err(format!("{verb} takes {n} arguments, got {}", args.len()));
        }
        args.iter()
            .map(|a| a.parse::<f64>().map_err(|_| format!("not a number: {a}")))
            .collect()
    };

    let cmd = match verb {
        "click" => {
            let v = nums(2)?;
            Command::Surface(SurfaceEvent::SingleClick(PointerEvent::at(v[0], v[1])))
        }
        "rest" => {
            let v = nums(2)?;
            Command::Surface(SurfaceEvent::PointerRest(PointerEvent::at(v[0], v[1])))
        }
        "move" => {
            let v = nums(2)?;
            Command::Surface(SurfaceEvent::PointerMove(PointerEvent::at(v[0], v[1])))
        }
        "restout" => {
            nums(0)?;
            Command::Surface(SurfaceEvent::PointerRestOut)
        }
        "view" => {
            let v = nums(4)?;
            Command::View(ViewportState::new(Coordinate::new(v[0], v[1]), v[2], v[3]))
        }
        "feature" => {
            let v = nums(6)?;
            Command::Feature {
                layer_index: v[0] as usize,
                feature: v[1] as u64,
                rect: PixelRect::new(v[2], v[3], v[4], v[5]),
            }
        }
        "back" => {
            nums(0)?;
            Command::Back
        }
        "forward" => {
            nums(0)?;
            Command::Forward
        }
        other => return Err(format!("unknown command: {other}")),
    };
    Ok(cmd)
}

pub struct ReplayOptions {
    pub config: MapViewConfig,
    pub units: ProjectionUnits,
    pub layers_json: Option<String>,
    pub startup_hash: String,
}

/// Run `commands` and return the transcript, one line per observation.
pub fn replay(commands: &[Command], opts: ReplayOptions) -> Vec<String> {
    let surface = Rc::new(RefCell::new(
        HeadlessSurface::new(opts.units)
            .with_zoom_range(opts.config.min_zoom, opts.config.max_zoom)
            .with_view(opts.config.initial_view),
    ));
    let bus = Rc::new(MapEventBus::new());
    let transcript = Rc::new(RefCell::new(Vec::new()));
    let t = Rc::clone(&transcript);
    bus.subscribe(move |e: &MapEvent| t.borrow_mut().push(describe(e)));

    let doc = opts
        .layers_json
        .unwrap_or_else(|| r#"{"layers": []}"#.to_string());
    let loader = LayerLoader::new(StaticSource(doc), ConfigLayerFactory, NoDeadline);
    let (mut view, loading) = MapView::init(
        opts.config,
        Rc::clone(&surface),
        bus,
        MemoryHistory::with_initial_hash(opts.startup_hash.clone()),
        &opts.startup_hash,
        loader,
    );
    let report = pollster::block_on(loading);
    pump(&mut view, &transcript);

    for cmd in commands {
        match cmd {
            Command::Feature {
                layer_index,
                feature,
                rect,
            } => {
                let Some(layer) = report.attached.get(*layer_index).copied() else {
                    transcript
                        .borrow_mut()
                        .push(format!("! no attached layer at index {layer_index}"));
                    continue;
                };
                surface
                    .borrow_mut()
                    .add_feature(layer, FeatureId(*feature), *rect);
            }
            Command::Surface(ev) => surface.borrow_mut().push_event(*ev),
            Command::View(state) => surface.borrow_mut().apply_viewport(state),
            Command::Back | Command::Forward => {
                let pop = view.history_mut().and_then(|h| {
                    let history = h.history_mut();
                    if *cmd == Command::Back {
                        history.back()
                    } else {
                        history.forward()
                    }
                });
                match pop {
                    Some(pop) => {
                        transcript.borrow_mut().push(format!("popstate {}", pop.hash));
                        view.on_popstate(pop.state);
                    }
                    None => transcript
                        .borrow_mut()
                        .push("! nothing to navigate to".to_string()),
                }
            }
        }
        pump(&mut view, &transcript);
    }

    let lines = transcript.borrow().clone();
    lines
}

fn pump(
    view: &mut MapView<HeadlessSurface, MemoryHistory>,
    transcript: &Rc<RefCell<Vec<String>>>,
) {
    let events = view.surface().borrow_mut().drain_events();
    for ev in events {
        if ev != SurfaceEvent::ViewChanged {
            view.handle_surface_event(ev);
            continue;
        }
        let line = match view.on_view_changed() {
            Some(SyncOutcome::Pushed(entry)) => format!("history push {}", entry.hash_label),
            Some(SyncOutcome::Suppressed) => "history suppressed".to_string(),
            Some(SyncOutcome::PushFailed(e)) => format!("history push failed: {e}"),
            None => continue,
        };
        transcript.borrow_mut().push(line);
    }
}

fn describe(event: &MapEvent) -> String {
    match event {
        MapEvent::Click { features, event: pointer }
        | MapEvent::HoverRest { features, event: pointer } => {
            let hits: Vec<String> = features
                .iter()
                .map(|f| format!("{}@{}", f.feature, f.layer))
                .collect();
            format!(
                "{} ({}, {}) [{}]",
                event.name(),
                pointer.pixel.x,
                pointer.pixel.y,
                hits.join(", ")
            )
        }
        MapEvent::LayersAdded { count } => format!("{} count={count}", event.name()),
        MapEvent::LayersFailed { error } => format!("{} {error}", event.name()),
        MapEvent::HoverRestEnd | MapEvent::PointerMove | MapEvent::Ready => event.name().to_string(),
    }
}
