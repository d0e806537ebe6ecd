use std::fs;
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use formats::{LayerConfigDocument, PermalinkCodec, decode_permalink};
use foundation::{Coordinate, ProjectionUnits, ViewportState};
use layers::{ConfigLayerFactory, LayerFactory};
use tools::replay::{ReplayOptions, parse_script, replay};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;
use viewport_web::MapViewConfig;

#[derive(Parser, Debug)]
#[command(author, version, about = "Map permalink and viewport tooling")]
struct Args {
    /// Projection units of the map (`degrees`, `m`, `ft`, `us-ft`, `pixels`, `tile-pixels`)
    #[arg(long, default_value = "m")]
    units: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the permalink fragment for a viewport
    Encode {
        #[arg(long, allow_hyphen_values = true)]
        x: f64,
        #[arg(long, allow_hyphen_values = true)]
        y: f64,
        #[arg(long)]
        zoom: f64,
        /// Rotation in radians
        #[arg(long, default_value_t = 0.0, allow_hyphen_values = true)]
        rotation: f64,
        /// Keep fractional center coordinates
        #[arg(long)]
        no_round: bool,
    },

    /// Decode a permalink fragment into viewport JSON
    Decode {
        #[arg(allow_hyphen_values = true)]
        hash: String,
    },

    /// Check a layer configuration document against the default factory
    ValidateLayers { path: PathBuf },

    /// Run a scripted session against a headless map and print the transcript
    Replay {
        script: PathBuf,

        /// Map config JSON; defaults apply when omitted
        #[arg(long)]
        config: Option<PathBuf>,

        /// Layer configuration document
        #[arg(long)]
        layers: Option<PathBuf>,

        /// URL fragment present at startup
        #[arg(long, default_value = "", allow_hyphen_values = true)]
        hash: String,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = real_main(Args::parse()) {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

fn real_main(args: Args) -> Result<(), String> {
    let units = ProjectionUnits::from_code(&args.units)
        .ok_or_else(|| format!("unknown projection units: {}", args.units))?;

    match args.command {
        Command::Encode {
            x,
            y,
            zoom,
            rotation,
            no_round,
        } => {
            let state = ViewportState::new(Coordinate::new(x, y), zoom, rotation);
            if !state.is_finite() {
                return Err("viewport values must be finite".to_string());
            }
            println!("{}", PermalinkCodec::new(units).encode(&state, !no_round));
            Ok(())
        }
        Command::Decode { hash } => {
            let state = decode_permalink(&hash)
                .map_err(|e| e.to_string())?
                .ok_or_else(|| "hash carries no viewport".to_string())?;
            let json = serde_json::to_string_pretty(&state).map_err(|e| e.to_string())?;
            println!("{json}");
            Ok(())
        }
        Command::ValidateLayers { path } => cmd_validate_layers(&path),
        Command::Replay {
            script,
            config,
            layers,
            hash,
        } => {
            let commands = parse_script(&read(&script)?)?;
            let config = match config {
                Some(p) => MapViewConfig::from_json_str(&read(&p)?).map_err(|e| e.to_string())?,
                None => MapViewConfig::default(),
            };
            let layers_json = layers.as_deref().map(read).transpose()?;
            info!(commands = commands.len(), %units, "replaying script");
            let lines = replay(
                &commands,
                ReplayOptions {
                    config,
                    units,
                    layers_json,
                    startup_hash: hash,
                },
            );
            for line in lines {
                println!("{line}");
            }
            Ok(())
        }
    }
}

fn cmd_validate_layers(path: &Path) -> Result<(), String> {
    let doc = LayerConfigDocument::from_json_str(&read(path)?).map_err(|e| e.to_string())?;
    let factory = ConfigLayerFactory::new();
    let mut attached = 0usize;
    for (i, entry) in doc.layers.iter().enumerate() {
        match factory.create_layer(entry) {
            Some(handle) => {
                attached += 1;
                println!("{i:>3} ok    {:?} {}", handle.kind, handle.name);
            }
            None => {
                debug!(index = i, layer_type = %entry.layer_type, "entry skipped");
                println!("{i:>3} skip  {}", entry.label());
            }
        }
    }
    println!("{attached}/{} layers would attach", doc.layers.len());
    Ok(())
}

fn read(path: &Path) -> Result<String, String> {
    fs::read_to_string(path).map_err(|e| format!("read {path:?}: {e}"))
}
