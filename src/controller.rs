use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::capture::WindowCapture;
use crate::config::Config;
use crate::document::{Document, OpenOptions};
use crate::error::{AppError, AppResult};
use crate::transport::{Transport, WindowRect};

/// Entry point for opening presentations in the viewer.
pub struct Controller {
    transport: Arc<dyn Transport>,
    capture: Arc<dyn WindowCapture>,
    config: Config,
    debug: AtomicBool,
}

impl Controller {
    pub fn new(
        transport: Arc<dyn Transport>,
        capture: Arc<dyn WindowCapture>,
        config: Config,
    ) -> Self {
        let debug = config.viewer.debug;
        transport.set_debug(debug);
        Self {
            transport,
            capture,
            config,
            debug: AtomicBool::new(debug),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// True when a viewer executable is configured.
    pub fn is_available(&self) -> bool {
        self.viewer_path().is_some()
    }

    pub fn viewer_path(&self) -> Option<&Path> {
        self.config.viewer.path.as_deref()
    }

    pub fn debug_mode(&self) -> bool {
        self.debug.load(Ordering::Relaxed)
    }

    pub fn set_debug(&self, enabled: bool) {
        self.debug.store(enabled, Ordering::Relaxed);
        self.transport.set_debug(enabled);
        tracing::debug!(enabled, "viewer debug mode");
    }

    pub fn open(&self, path: impl AsRef<Path>, rect: WindowRect) -> AppResult<Document> {
        self.open_with(path, OpenOptions::from_config(&self.config, rect))
    }

    pub fn open_with(&self, path: impl AsRef<Path>, options: OpenOptions) -> AppResult<Document> {
        let Some(viewer) = self.viewer_path() else {
            return Err(AppError::open_failure("viewer executable is not available"));
        };
        let path = resolve_presentation(path.as_ref())?;
        let command = build_command(viewer, &self.config.viewer.args, &path);
        tracing::debug!(%command, "opening presentation");
        Document::open(
            Arc::clone(&self.transport),
            Arc::clone(&self.capture),
            command,
            options,
        )
    }

    /// Closes every session the transport still owns.
    pub fn shutdown(&self) {
        tracing::info!("shutting down viewer sessions");
        self.transport.shutdown();
    }
}

fn resolve_presentation(path: &Path) -> AppResult<PathBuf> {
    let absolute = std::path::absolute(path).map_err(|source| {
        AppError::io_with_context(
            source,
            format!("failed to resolve presentation path: {}", path.display()),
        )
    })?;
    if !absolute.is_file() {
        return Err(AppError::file_not_found(absolute));
    }
    Ok(absolute)
}

/// `<viewer> <args...> "<presentation>"`
pub fn build_command(viewer: &Path, args: &[String], presentation: &Path) -> String {
    let mut command = viewer.display().to_string();
    for arg in args {
        command.push(' ');
        command.push_str(arg);
    }
    command.push_str(" \"");
    command.push_str(&presentation.display().to_string());
    command.push('"');
    command
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::path::{Path, PathBuf};
    use std::sync::Arc;
    use std::time::{Duration, SystemTime, UNIX_EPOCH};

    use super::{Controller, build_command};
    use crate::config::Config;
    use crate::error::AppError;
    use crate::event::DocumentEvent;
    use crate::transport::WindowRect;
    use crate::transport::sim::{SimDeck, SimulatedViewer};

    fn unique_temp_path(name: &str) -> PathBuf {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("clock should be after unix epoch")
            .as_nanos();
        std::env::temp_dir().join(format!("pvr-{}-{nanos}-{name}", std::process::id()))
    }

    fn controller(viewer_path: Option<&str>) -> (Arc<SimulatedViewer>, Controller) {
        let deck = SimDeck::from_ids_and_steps(&[5, 7], &[]).expect("deck");
        let viewer = Arc::new(SimulatedViewer::new(deck));
        let mut config = Config::default();
        config.viewer.path = viewer_path.map(PathBuf::from);
        config.input.key_pause_ms = 0;
        config.document.thumbnail_width = 0;
        let controller = Controller::new(viewer.clone(), viewer.clone(), config);
        (viewer, controller)
    }

    #[test]
    fn command_line_quotes_presentation() {
        let command = build_command(
            Path::new("C:/viewer/PPTVIEW.EXE"),
            &["/F".to_string(), "/S".to_string()],
            Path::new("/decks/quarterly review.pptx"),
        );
        assert_eq!(
            command,
            "C:/viewer/PPTVIEW.EXE /F /S \"/decks/quarterly review.pptx\""
        );
    }

    #[test]
    fn missing_viewer_is_an_open_failure() {
        let (_, controller) = controller(None);
        assert!(!controller.is_available());
        let result = controller.open("deck.pptx", WindowRect::new(0, 0, 32, 24));
        assert!(matches!(result, Err(AppError::OpenFailure(_))));
    }

    #[test]
    fn missing_file_reports_absolute_path() {
        let (_, controller) = controller(Some("PPTVIEW.EXE"));
        let missing = unique_temp_path("missing.pptx");
        let result = controller.open(&missing, WindowRect::new(0, 0, 32, 24));
        match result {
            Err(AppError::FileNotFound { path }) => {
                assert!(path.is_absolute());
                assert_eq!(path, missing);
            }
            Err(other) => panic!("expected file not found, got {other}"),
            Ok(_) => panic!("expected file not found"),
        }
    }

    #[test]
    fn debug_mode_reaches_transport() {
        let (viewer, controller) = controller(Some("PPTVIEW.EXE"));
        assert!(!controller.debug_mode());
        controller.set_debug(true);
        assert!(controller.debug_mode());
        assert!(viewer.debug_enabled());
    }

    #[test]
    fn opens_existing_presentation() {
        let (viewer, controller) = controller(Some("PPTVIEW.EXE"));
        let deck = unique_temp_path("deck.pptx");
        fs::write(&deck, b"slides").expect("test deck should be written");

        let document = controller
            .open(&deck, WindowRect::new(0, 0, 32, 24))
            .expect("presentation should open");
        let events = document.subscribe();
        let first = events
            .recv_timeout(Duration::from_secs(5))
            .expect("loaded event");
        assert!(matches!(first, DocumentEvent::Loaded));
        assert_eq!(document.slide_count(), 2);

        controller.shutdown();
        let _ = fs::remove_file(&deck);
        let closed = (0..4)
            .filter_map(|_| events.recv_timeout(Duration::from_secs(5)).ok())
            .any(|event| matches!(event, DocumentEvent::Closed));
        assert!(closed);
        assert!(viewer.snapshot().session.is_some());
    }
}
