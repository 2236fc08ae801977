use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use serde::Serialize;
use tracing_subscriber::EnvFilter;

use pvr::config::Config;
use pvr::controller::Controller;
use pvr::document::{Document, OpenOptions};
use pvr::error::{AppError, AppResult};
use pvr::event::DocumentEvent;
use pvr::transport::WindowRect;
use pvr::transport::sim::{SimDeck, SimulatedViewer};

const DEFAULT_VIEWER: &str = "PPTVIEW.EXE";
const EVENT_TIMEOUT: Duration = Duration::from_secs(30);

/// Drive a slideshow viewer session against the simulated viewer.
#[derive(Parser, Debug)]
#[command(name = "pvr", version, about)]
struct Cli {
    /// Presentation to open
    file: PathBuf,

    /// Physical slide ids the simulated viewer reports
    #[arg(long, value_delimiter = ',', default_values_t = [256, 257, 258])]
    slides: Vec<i32>,

    /// Animation steps per slide (missing entries default to 1)
    #[arg(long, value_delimiter = ',')]
    steps: Vec<u32>,

    /// Loop the show instead of ending after the last slide
    #[arg(long = "loop")]
    looping: bool,

    /// Thumbnail width in pixels, 0 for full size
    #[arg(long, value_name = "PX")]
    thumbnail_width: Option<u32>,

    /// Keep the viewer window off screen
    #[arg(long)]
    hidden: bool,

    /// 0-based slide to jump to once loaded
    #[arg(long, value_name = "SLIDE")]
    goto: Option<i32>,

    /// Config file (defaults to the per-user config location)
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Viewer executable used in the command line
    #[arg(long, value_name = "PATH")]
    viewer: Option<PathBuf>,

    /// Write thumbnails as PNG files into this directory
    #[arg(long, value_name = "DIR")]
    save_thumbnails: Option<PathBuf>,

    /// Print the summary as JSON
    #[arg(long)]
    json: bool,
}

#[derive(Debug, Serialize)]
struct Summary {
    session: Option<i32>,
    slide_count: i32,
    step_counts: Vec<u32>,
    thumbnails: Vec<(u32, u32)>,
    current_slide: i32,
}

impl Summary {
    fn from_document(document: &Document) -> Self {
        Self {
            session: document.session_id().map(|id| id.0),
            slide_count: document.slide_count(),
            step_counts: document.step_counts().unwrap_or_default(),
            thumbnails: document
                .thumbnails()
                .map(|frames| frames.iter().map(|frame| (frame.width, frame.height)).collect())
                .unwrap_or_default(),
            current_slide: document.current_slide(),
        }
    }

    fn print(&self, json: bool) -> AppResult<()> {
        if json {
            let text = serde_json::to_string_pretty(self)
                .map_err(|source| AppError::export("summary", source))?;
            println!("{text}");
            return Ok(());
        }
        println!("slides: {}", self.slide_count);
        for (slide, steps) in self.step_counts.iter().enumerate() {
            println!("  slide {slide}: {steps} step(s)");
        }
        for (slide, (width, height)) in self.thumbnails.iter().enumerate() {
            println!("  thumbnail {slide}: {width}x{height}");
        }
        println!("current slide: {}", self.current_slide);
        Ok(())
    }
}

#[tokio::main(flavor = "multi_thread")]
async fn main() {
    if let Err(err) = run(Cli::parse()).await {
        eprintln!("{err}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> AppResult<()> {
    let config = match &cli.config {
        Some(path) => Config::load_from_path(path)?,
        None => Config::load()?,
    };
    init_tracing(&config.logging.filter);
    let config = apply_cli(config, &cli);

    let deck = SimDeck::from_ids_and_steps(&cli.slides, &cli.steps)?.looping(cli.looping);
    let viewer = Arc::new(SimulatedViewer::new(deck));
    let controller = Controller::new(viewer.clone(), viewer, config);

    let mut options = OpenOptions::from_config(controller.config(), WindowRect::new(0, 0, 800, 600));
    if let Some(width) = cli.thumbnail_width {
        options = options.thumbnail_width(width);
    }
    if cli.hidden {
        options = options.hidden(true);
    }

    let document = controller.open_with(&cli.file, options)?;
    let events = document.subscribe();
    wait_for(&events, "loaded", |event| matches!(event, DocumentEvent::Loaded)).await?;
    wait_for(&events, "first slide", |event| {
        matches!(event, DocumentEvent::SlideChanged { .. })
    })
    .await?;

    if let Some(slide) = cli.goto {
        let count = document.slide_count();
        if slide < 0 || slide >= count {
            return Err(AppError::out_of_range(slide, count));
        }
        tokio::task::block_in_place(|| document.goto_slide(slide))?;
        let target = wait_for(&events, "slide change", |event| {
            matches!(event, DocumentEvent::SlideChanged { .. })
        })
        .await?;
        tracing::info!(?target, "jumped");
    }

    if let Some(dir) = &cli.save_thumbnails {
        save_thumbnails(&document, dir)?;
    }
    Summary::from_document(&document).print(cli.json)?;

    document.close();
    wait_for(&events, "closed", |event| matches!(event, DocumentEvent::Closed)).await?;
    controller.shutdown();
    Ok(())
}

fn apply_cli(mut config: Config, cli: &Cli) -> Config {
    if let Some(viewer) = &cli.viewer {
        config.viewer.path = Some(viewer.clone());
    } else if config.viewer.path.is_none() {
        config.viewer.path = Some(PathBuf::from(DEFAULT_VIEWER));
    }
    config
}

fn init_tracing(filter: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

/// Waits for the first event matching `wanted`; an `Error` event ends the
/// wait with its cause.
async fn wait_for(
    events: &flume::Receiver<DocumentEvent>,
    what: &str,
    wanted: impl Fn(&DocumentEvent) -> bool,
) -> AppResult<DocumentEvent> {
    loop {
        let event = tokio::time::timeout(EVENT_TIMEOUT, events.recv_async())
            .await
            .map_err(|_| AppError::invalid_state(format!("timed out waiting for {what}")))?
            .map_err(|_| AppError::DocumentClosed)?;
        if let DocumentEvent::Error(err) = &event {
            return Err(AppError::invalid_state(format!("document failed: {err}")));
        }
        if wanted(&event) {
            return Ok(event);
        }
        tracing::debug!(?event, what, "skipping event");
    }
}

fn save_thumbnails(document: &Document, dir: &Path) -> AppResult<()> {
    let Some(frames) = document.thumbnails() else {
        return Err(AppError::invalid_state("thumbnails were not generated"));
    };
    fs::create_dir_all(dir).map_err(|source| {
        AppError::io_with_context(source, format!("failed to create {}", dir.display()))
    })?;
    for (slide, frame) in frames.iter().enumerate() {
        let path = dir.join(format!("slide-{:03}.png", slide + 1));
        frame
            .to_rgba_image()?
            .save(&path)
            .map_err(|source| AppError::export(path.display().to_string(), source))?;
    }
    tracing::info!(count = frames.len(), dir = %dir.display(), "thumbnails saved");
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use clap::Parser;

    use super::{Cli, apply_cli};
    use pvr::config::Config;

    #[test]
    fn cli_parses_deck_shape() {
        let cli = Cli::try_parse_from([
            "pvr", "deck.pptx", "--slides", "5,7,9", "--steps", "3,1", "--loop", "--goto", "2",
        ])
        .expect("arguments should parse");
        assert_eq!(cli.file, PathBuf::from("deck.pptx"));
        assert_eq!(cli.slides, vec![5, 7, 9]);
        assert_eq!(cli.steps, vec![3, 1]);
        assert!(cli.looping);
        assert_eq!(cli.goto, Some(2));
    }

    #[test]
    fn cli_requires_a_file() {
        assert!(Cli::try_parse_from(["pvr"]).is_err());
    }

    #[test]
    fn default_viewer_fills_missing_config_path() {
        let cli = Cli::try_parse_from(["pvr", "deck.pptx"]).expect("arguments should parse");
        assert_eq!(cli.slides, vec![256, 257, 258]);
        let config = apply_cli(Config::default(), &cli);
        assert_eq!(config.viewer.path, Some(PathBuf::from("PPTVIEW.EXE")));

        let cli = Cli::try_parse_from(["pvr", "deck.pptx", "--viewer", "/opt/viewer"])
            .expect("arguments should parse");
        let config = apply_cli(Config::default(), &cli);
        assert_eq!(config.viewer.path, Some(PathBuf::from("/opt/viewer")));
    }
}
