use anyhow::Result;
use clap::Parser;
use std::io::{self, Write};
use std::path::PathBuf;
use std::thread;
use std::time::Duration;
use tracing::debug;
use tracing_subscriber::EnvFilter;

use launcher_thumbs::clock::{Clock, MonotonicClock};
use launcher_thumbs::decode::{ImageDecoder, Thumbnail};
use launcher_thumbs::listing::list_entries;
use launcher_thumbs::res_cache::ResCache;
use launcher_thumbs::session::{FrameInput, ThumbnailSession, ThumbnailSurface};
use launcher_thumbs::settings::ThumbnailSettings;

const FRAME_INTERVAL: Duration = Duration::from_millis(16);

#[derive(Parser, Debug)]
#[command(name = "thumbwalk")]
#[command(about = "Walk a ROM directory and report the thumbnail shown for each entry")]
struct Args {
    #[arg(long, default_value = ".")]
    root: PathBuf,
    /// JSON settings file; flags below override it.
    #[arg(long)]
    config: Option<PathBuf>,
    #[arg(long)]
    max_width: Option<u32>,
    #[arg(long)]
    max_height: Option<u32>,
    #[arg(long)]
    fade_ms: Option<u64>,
    /// Frames to wait per entry before giving up on its thumbnail.
    #[arg(long, default_value_t = 120)]
    frame_limit: u32,
}

/// Stands in for the screen: remembers what the last frame showed.
#[derive(Debug, Default)]
struct FrameLog {
    frames: u64,
    last_alpha: Option<u8>,
}

impl ThumbnailSurface<Thumbnail> for FrameLog {
    fn supports_alpha_mod(&self) -> bool {
        true
    }

    fn draw(&mut self, image: &Thumbnail, alpha: u8) {
        self.frames += 1;
        if self.last_alpha != Some(alpha) {
            debug!(width = image.width(), height = image.height(), alpha, "draw");
        }
        self.last_alpha = Some(alpha);
    }
}

fn load_settings(args: &Args) -> Result<ThumbnailSettings> {
    let mut settings = match &args.config {
        Some(path) => ThumbnailSettings::load(path)?,
        None => ThumbnailSettings::default(),
    };
    if let Some(max_width) = args.max_width {
        settings.max_width = max_width;
    }
    if let Some(max_height) = args.max_height {
        settings.max_height = max_height;
    }
    if let Some(fade_ms) = args.fade_ms {
        settings.fade_duration_ms = fade_ms;
    }
    Ok(settings)
}

fn run(args: &Args) -> Result<()> {
    let settings = load_settings(args)?;
    let entries = list_entries(&args.root)?;

    let mut resolver = ResCache::new();
    let mut session = ThumbnailSession::start(ImageDecoder::default(), &settings);
    session.directory_changed();
    let clock = MonotonicClock::new();
    let mut surface = FrameLog::default();

    let stdout = io::stdout();
    let mut out = stdout.lock();
    for (index, entry) in entries.iter().enumerate() {
        for _ in 0..args.frame_limit {
            let frame = FrameInput {
                entries: &entries,
                selected: Some(index),
                nav_held: false,
                supports_alpha: true,
                now_ms: clock.now_ms(),
            };
            session.update(&frame, &mut resolver);
            session.present(&mut surface);
            if session.is_settled(Some(index)) {
                break;
            }
            thread::sleep(FRAME_INTERVAL);
        }

        let size = session
            .displayed()
            .map(|shown| format!("{}x{}", shown.image.width(), shown.image.height()))
            .unwrap_or_else(|| "none".to_string());
        let name = entry
            .file_name()
            .map(|name| name.to_string_lossy().to_string())
            .unwrap_or_default();
        writeln!(out, "{index}\t{name}\t{size}")?;
    }

    debug!(frames = surface.frames, "walk finished");
    session.shutdown();
    Ok(())
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .init();

    let args = Args::parse();
    run(&args)
}
