//! A managed viewer session.
//!
//! Opening a document starts the viewer, which plays the whole deck forward
//! once. The document mirrors that walk backward step by step, learning
//! slide and step counts and capturing thumbnails, and reports `Loaded`
//! once it is back on the first step of the first slide.

mod core;
mod dispatch;
mod listeners;
mod nav;
mod state;
mod thumbnails;

#[cfg(test)]
mod tests;

use std::sync::Arc;

pub use state::Phase;

use crate::capture::{RgbaFrame, WindowCapture};
use crate::config::{Config, InputConfig};
use crate::error::{AppError, AppResult};
use crate::event::DocumentEvent;
use crate::transport::{
    NotificationSink, OpenRequest, SessionId, Transport, WindowHandle, WindowRect,
};

use self::core::DocumentCore;
use self::dispatch::DispatchRuntime;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenOptions {
    pub rect: WindowRect,
    pub parent: Option<WindowHandle>,
    pub generate_thumbnails: bool,
    /// 0 keeps captures at full window size.
    pub thumbnail_width: u32,
    /// Keep the window off screen after priming instead of showing it.
    /// Thumbnails are then captured off screen, so the capture backend must
    /// support grabbing a window outside the visible desktop.
    pub open_hidden: bool,
    pub input: InputConfig,
}

impl OpenOptions {
    pub fn new(rect: WindowRect) -> Self {
        Self::from_config(&Config::default(), rect)
    }

    pub fn from_config(config: &Config, rect: WindowRect) -> Self {
        Self {
            rect,
            parent: None,
            generate_thumbnails: config.document.generate_thumbnails,
            thumbnail_width: config.document.thumbnail_width,
            open_hidden: config.document.open_hidden,
            input: config.input.clone(),
        }
    }

    pub fn hidden(mut self, hidden: bool) -> Self {
        self.open_hidden = hidden;
        self
    }

    pub fn thumbnails(mut self, enabled: bool) -> Self {
        self.generate_thumbnails = enabled;
        self
    }

    pub fn thumbnail_width(mut self, width: u32) -> Self {
        self.thumbnail_width = width;
        self
    }

    pub fn parent(mut self, parent: WindowHandle) -> Self {
        self.parent = Some(parent);
        self
    }
}

/// Handle to one viewer session. Dropping it closes the session.
pub struct Document {
    core: Arc<DocumentCore>,
    dispatch: DispatchRuntime,
}

impl Document {
    /// Starts the viewer with `command` and begins priming. Returns before
    /// priming finishes; wait for [`DocumentEvent::Loaded`] on
    /// [`Document::subscribe`].
    pub fn open(
        transport: Arc<dyn Transport>,
        capture: Arc<dyn WindowCapture>,
        command: impl Into<String>,
        options: OpenOptions,
    ) -> AppResult<Self> {
        let core = Arc::new(DocumentCore::new(Arc::clone(&transport), capture, &options));
        let (tx, rx) = flume::unbounded();
        let dispatch = DispatchRuntime::start(Arc::clone(&core), rx)?;

        let rect = if options.open_hidden {
            options
                .rect
                .moved_to(options.input.offscreen_x, options.input.offscreen_y)
        } else {
            options.rect
        };
        let request = OpenRequest {
            command: command.into(),
            parent: options.parent,
            rect,
        };
        let session = transport
            .open(&request, NotificationSink::new(tx))
            .map_err(|err| match err {
                AppError::OpenFailure(_) => err,
                other => AppError::open_failure(other.to_string()),
            })?;
        core.attach_session(session);
        tracing::info!(doc = session.0, command = %request.command, "viewer session opened");

        Ok(Self { core, dispatch })
    }

    /// Receiver of this document's lifecycle events. Events raised before
    /// the first subscription are replayed to it.
    pub fn subscribe(&self) -> flume::Receiver<DocumentEvent> {
        self.core.listeners.subscribe()
    }

    pub fn session_id(&self) -> Option<SessionId> {
        self.core.session()
    }

    /// Primary viewer window, once the viewer reported it.
    pub fn window_handle(&self) -> Option<WindowHandle> {
        self.core.windows().primary
    }

    pub fn phase(&self) -> Phase {
        self.core.lock_deck().phase()
    }

    pub fn has_loaded(&self) -> bool {
        self.core.lock_deck().has_loaded()
    }

    pub fn is_closed(&self) -> bool {
        self.core.is_closed()
    }

    /// -1 until the forward pass has finished.
    pub fn slide_count(&self) -> i32 {
        self.core.lock_deck().slide_count()
    }

    /// -1 until loaded.
    pub fn current_slide(&self) -> i32 {
        self.core.current_slide()
    }

    pub fn step_count(&self, slide: i32) -> AppResult<u32> {
        self.core.lock_deck().step_count(slide)
    }

    pub fn step_counts(&self) -> Option<Vec<u32>> {
        self.core.lock_deck().step_counts().map(<[u32]>::to_vec)
    }

    /// Thumbnails in slide order; `None` until loaded or when disabled.
    pub fn thumbnails(&self) -> Option<&[RgbaFrame]> {
        self.core.gallery()
    }

    /// Geometry the window is shown at.
    pub fn geometry(&self) -> WindowRect {
        self.core.geometry()
    }
}

impl Drop for Document {
    fn drop(&mut self) {
        self.core.close();
        self.dispatch.shutdown();
    }
}
