use std::sync::atomic::{AtomicBool, AtomicI32, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, OnceLock, PoisonError};

use crate::capture::{RgbaFrame, WindowCapture, capture_window};
use crate::config::InputConfig;
use crate::error::{AppError, AppResult};
use crate::event::DocumentEvent;
use crate::transport::{SessionId, Transport, WindowHandle, WindowRect};

use super::OpenOptions;
use super::dispatch::DocumentWork;
use super::listeners::Listeners;
use super::state::{DeckState, SlideChange};
use super::thumbnails::ThumbnailCollector;

#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct WindowPair {
    pub(crate) primary: Option<WindowHandle>,
    pub(crate) secondary: Option<WindowHandle>,
}

/// State shared between a [`super::Document`] and its dispatcher tasks.
pub(crate) struct DocumentCore {
    pub(crate) transport: Arc<dyn Transport>,
    pub(crate) capture: Arc<dyn WindowCapture>,
    pub(crate) input: InputConfig,
    pub(crate) listeners: Listeners,
    session: OnceLock<SessionId>,
    windows: Mutex<WindowPair>,
    deck: Mutex<DeckState>,
    current_slide: AtomicI32,
    geometry: Mutex<WindowRect>,
    thumbnails: Mutex<Option<ThumbnailCollector>>,
    gallery: OnceLock<Vec<RgbaFrame>>,
    open_hidden: bool,
    closed: AtomicBool,
    close_sent: AtomicBool,
    closed_signalled: AtomicBool,
    error_raised: AtomicBool,
}

impl DocumentCore {
    pub(crate) fn new(
        transport: Arc<dyn Transport>,
        capture: Arc<dyn WindowCapture>,
        options: &OpenOptions,
    ) -> Self {
        let thumbnails = options
            .generate_thumbnails
            .then(|| ThumbnailCollector::new(options.thumbnail_width));
        Self {
            transport,
            capture,
            input: options.input.clone(),
            listeners: Listeners::default(),
            session: OnceLock::new(),
            windows: Mutex::new(WindowPair::default()),
            deck: Mutex::new(DeckState::default()),
            current_slide: AtomicI32::new(-1),
            geometry: Mutex::new(options.rect),
            thumbnails: Mutex::new(thumbnails),
            gallery: OnceLock::new(),
            open_hidden: options.open_hidden,
            closed: AtomicBool::new(false),
            close_sent: AtomicBool::new(false),
            closed_signalled: AtomicBool::new(false),
            error_raised: AtomicBool::new(false),
        }
    }

    /// Session id for log fields, -1 until the transport answered `open`.
    pub(crate) fn tag(&self) -> i32 {
        self.session.get().map_or(-1, |id| id.0)
    }

    pub(crate) fn session(&self) -> Option<SessionId> {
        self.session.get().copied()
    }

    pub(crate) fn attach_session(&self, session: SessionId) {
        if self.session.set(session).is_err() {
            return;
        }
        // close() may have run before the transport answered
        if self.is_closed() {
            self.send_close(session);
        }
    }

    pub(crate) fn lock_deck(&self) -> MutexGuard<'_, DeckState> {
        self.deck.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn windows(&self) -> WindowPair {
        *self.windows.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn geometry(&self) -> WindowRect {
        *self.geometry.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn set_geometry(&self, rect: WindowRect) {
        *self.geometry.lock().unwrap_or_else(PoisonError::into_inner) = rect;
    }

    pub(crate) fn current_slide(&self) -> i32 {
        self.current_slide.load(Ordering::Acquire)
    }

    pub(crate) fn gallery(&self) -> Option<&[RgbaFrame]> {
        self.gallery.get().map(Vec::as_slice)
    }

    pub(crate) fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    pub(crate) fn assign_primary(&self, window: WindowHandle) {
        self.windows
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .primary = Some(window);
        tracing::debug!(doc = self.tag(), window = window.0, "primary window assigned");
    }

    pub(crate) fn assign_secondary(&self, window: WindowHandle) {
        self.windows
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .secondary = Some(window);
        if self.lock_deck().begin_loading() {
            tracing::info!(doc = self.tag(), "viewer started, loading");
        } else {
            tracing::warn!(doc = self.tag(), "repeated setup notification ignored");
        }
    }

    pub(crate) fn handle_work(&self, work: DocumentWork) {
        match work {
            DocumentWork::StepProgress => {
                if let Some((slide, steps)) = self.lock_deck().on_step_progress() {
                    tracing::debug!(doc = self.tag(), slide, steps, "step counted");
                }
            }
            DocumentWork::SlideChanged { physical_id } => {
                if self.is_closed() {
                    tracing::debug!(doc = self.tag(), physical_id, "slide change after close");
                    return;
                }
                if let Err(err) = self.handle_slide_changed(physical_id) {
                    self.fail(err);
                }
            }
            DocumentWork::CloseRequested => {
                tracing::info!(doc = self.tag(), "viewer window closed");
                self.close();
            }
            DocumentWork::ShuttingDown => self.signal_closed(),
        }
    }

    fn handle_slide_changed(&self, physical_id: i32) -> AppResult<()> {
        let change = {
            let mut deck = self.lock_deck();
            let change = deck.on_slide_changed(physical_id)?;
            self.current_slide
                .store(deck.current_slide(), Ordering::Release);
            change
        };
        tracing::debug!(doc = self.tag(), physical_id, ?change, "slide changed");

        match change {
            SlideChange::Ignored | SlideChange::Registered { .. } => {}
            SlideChange::RewindStarted => {
                tracing::info!(doc = self.tag(), "forward pass complete, rewinding");
                self.post_step_back()?;
            }
            SlideChange::StepBackClamp => self.post_step_back()?,
            SlideChange::RewindLanded {
                slide,
                back_steps,
                finished,
            } => {
                self.capture_thumbnail(slide)?;
                for _ in 0..back_steps {
                    tracing::debug!(doc = self.tag(), slide, "going back");
                    self.post_step_back()?;
                }
                if finished {
                    self.finish_priming()?;
                }
            }
            SlideChange::Current { slide } => {
                self.listeners.emit(DocumentEvent::SlideChanged { slide });
            }
        }
        Ok(())
    }

    fn capture_thumbnail(&self, slide: usize) -> AppResult<()> {
        let width = match self
            .thumbnails
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
        {
            Some(collector) => collector.width(),
            None => return Ok(()),
        };
        let window = self.primary_window()?;
        let frame = capture_window(self.capture.as_ref(), window, width)?;
        if let Some(collector) = self
            .thumbnails
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_mut()
        {
            collector.record(slide, frame);
            tracing::debug!(doc = self.tag(), slide, captured = collector.len(), "thumbnail captured");
        }
        Ok(())
    }

    fn finish_priming(&self) -> AppResult<()> {
        let collector = self
            .thumbnails
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(collector) = collector {
            let _ = self.gallery.set(collector.finish());
        }

        let (slides, current) = {
            let mut deck = self.lock_deck();
            deck.finish_priming();
            let current = deck.current_slide();
            self.current_slide.store(current, Ordering::Release);
            (deck.slide_count(), current)
        };

        self.post_unblank()?;
        if !self.open_hidden {
            self.apply_show()?;
        }
        tracing::info!(doc = self.tag(), slides, "priming finished, running");
        self.listeners.emit(DocumentEvent::Loaded);
        self.listeners.emit(DocumentEvent::SlideChanged {
            slide: current.max(0) as usize,
        });
        Ok(())
    }

    /// Tears the session down once; later calls do nothing.
    pub(crate) fn close(&self) {
        if self.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        match self.session() {
            Some(session) => self.send_close(session),
            None => tracing::debug!("close requested before the session was established"),
        }
    }

    fn send_close(&self, session: SessionId) {
        if !self.close_sent.swap(true, Ordering::AcqRel) {
            tracing::info!(doc = session.0, "closing viewer session");
            self.transport.close(session);
        }
    }

    fn signal_closed(&self) {
        self.closed.store(true, Ordering::Release);
        if !self.closed_signalled.swap(true, Ordering::AcqRel) {
            tracing::info!(doc = self.tag(), "viewer shut down");
            self.listeners.emit(DocumentEvent::Closed);
        }
    }

    fn fail(&self, err: AppError) {
        tracing::error!(doc = self.tag(), error = %err, "document fault, closing");
        self.close();
        if !self.error_raised.swap(true, Ordering::AcqRel) {
            self.listeners.emit(DocumentEvent::Error(Arc::new(err)));
        }
    }
}
