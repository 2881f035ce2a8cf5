mod replay;
mod timer;

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use hydrotag_core::export::{load_export, save_export};
use hydrotag_core::{CoordinateMapper, EngineConfig, PixelRect, Size};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "hydrotag", about = "Replay spectrogram annotation sessions and inspect exports")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a recorded interaction script through the annotation engine
    Replay {
        /// Script file (JSON: date, images, viewport, events)
        script: PathBuf,

        /// Engine config (.yaml, .yml or .json)
        #[arg(long)]
        config: Option<PathBuf>,

        /// Where to write the export (default: annotations-<date>.json)
        #[arg(long)]
        out: Option<PathBuf>,

        /// Drive playback from a real timer instead of scripted ticks
        #[arg(long)]
        realtime: bool,
    },
    /// Summarise an export file
    Summary {
        /// Export file written by `replay` or the browser
        export: PathBuf,
    },
    /// Print the time and frequency under a container pixel
    Map {
        #[arg(long)]
        x: f64,

        #[arg(long)]
        y: f64,

        /// Container width (default: original image width)
        #[arg(long)]
        width: Option<f64>,

        /// Container height (default: original image height)
        #[arg(long)]
        height: Option<f64>,

        /// Engine config (.yaml, .yml or .json)
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

/// Config file (or defaults) with environment overrides applied.
fn load_config(path: Option<&Path>) -> Result<EngineConfig, String> {
    let config = match path {
        Some(p) => EngineConfig::load(p)?,
        None => EngineConfig::default(),
    };
    let playback_ms = env_override::<u64>("HYDROTAG_PLAYBACK_MS")?;
    let min_draw = env_override::<f64>("HYDROTAG_MIN_DRAW_PX")?;
    config.with_overrides(playback_ms, min_draw)
}

fn env_override<T: std::str::FromStr>(name: &str) -> Result<Option<T>, String> {
    match std::env::var(name) {
        Ok(v) => v
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|_| format!("{name} has an invalid value '{v}'")),
        Err(_) => Ok(None),
    }
}

fn fail(e: String) -> ! {
    eprintln!("Error: {e}");
    std::process::exit(1);
}

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Replay { script, config, out, realtime } => {
            let config = load_config(config.as_deref()).unwrap_or_else(|e| fail(e));
            let script = replay::load_script(&script).unwrap_or_else(|e| fail(e));

            let mut session = replay::Replay::new(config, &script, realtime).unwrap_or_else(|e| fail(e));
            session.run(&script.events).await;

            let view = session.view();
            let state = view.playback_state();
            println!(
                "{} annotation(s) over {} image(s); image {}/{}{}",
                view.store().len(),
                state.image_count,
                state.current_image_index + 1,
                state.image_count,
                if state.is_playing { " (playing)" } else { "" }
            );

            match view.export() {
                Some(record) => {
                    let path = out.unwrap_or_else(|| PathBuf::from(view.export_file_name()));
                    let written = save_export(&path, &record).unwrap_or_else(|e| fail(e));
                    eprintln!("Wrote {}", written.display());
                }
                None => eprintln!("No annotations to export"),
            }
        }

        Commands::Summary { export } => {
            let record = load_export(&export).unwrap_or_else(|e| fail(e));
            println!(
                "{}: {} annotation(s) on {} of {} image(s)",
                record.date,
                record.annotation_count,
                record.images.len(),
                record.image_count
            );
            println!();
            for (index, image) in &record.images {
                println!("  image {:>3}  {}", index + 1, image.image_url);
                for a in &image.annotations {
                    println!(
                        "    {:16} {:10} {:>8.1}-{:<8.1} s {:>6.0}-{:<6.0} Hz  {} [{}]",
                        a.species,
                        a.call_type,
                        a.start_time_seconds,
                        a.end_time_seconds,
                        a.start_frequency_hz,
                        a.end_frequency_hz,
                        a.author,
                        a.status.as_str()
                    );
                }
            }
        }

        Commands::Map { x, y, width, height, config } => {
            let config = load_config(config.as_deref()).unwrap_or_else(|e| fail(e));
            let geometry = config.overlay_geometry().unwrap_or_else(|e| fail(e));
            let w = width.unwrap_or(config.original_image.width);
            let h = height.unwrap_or(config.original_image.height);
            let overlay = geometry
                .derive(&PixelRect::new(0.0, 0.0, w, h), Size::new(w, h))
                .unwrap_or_else(|e| fail(e));
            let mapper = CoordinateMapper::new(overlay, config.domain).unwrap_or_else(|e| fail(e));

            if !mapper.is_within_overlay(x, y) {
                eprintln!(
                    "Warning: ({x}, {y}) is outside the plot area {:.1},{:.1} {:.1}x{:.1}",
                    overlay.left, overlay.top, overlay.width, overlay.height
                );
            }
            let p = mapper.pixel_to_domain(x, y);
            println!("time: {:.3} s", p.time_seconds);
            println!("frequency: {:.1} Hz", p.frequency_hz);
        }
    }
}
