//! In-process stand-in for the slideshow viewer.
//!
//! Plays a scripted deck and speaks the same notification protocol as the
//! real viewer host: window handles, an automatic forward pass on open, a
//! step tick for every wheel message, and slide changes whenever the
//! visible slide changes.

use std::sync::atomic::{AtomicBool, AtomicI32, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::{self, JoinHandle};

use crate::capture::{RgbaFrame, WindowCapture};
use crate::error::{AppError, AppResult};
use crate::event::Notification;

use super::input::{InputMessage, KEY_BLANK, VK_RETURN, WireMessage};
use super::traits::{NotificationSink, OpenRequest, SessionId, Transport, WindowHandle, WindowRect};

const WINDOW_HANDLE_BASE: isize = 0x1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SimSlide {
    pub physical_id: i32,
    /// Number of wheel steps the slide consumes, 1 without animations.
    pub steps: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SimDeck {
    pub slides: Vec<SimSlide>,
    /// Wrap to the first slide instead of showing the end screen.
    pub looping: bool,
}

impl SimDeck {
    pub fn new(slides: impl IntoIterator<Item = SimSlide>) -> Self {
        Self {
            slides: slides.into_iter().collect(),
            looping: false,
        }
    }

    /// Builds a deck from physical ids; missing step counts default to 1.
    pub fn from_ids_and_steps(ids: &[i32], steps: &[u32]) -> AppResult<Self> {
        if steps.len() > ids.len() {
            return Err(AppError::invalid_argument(
                "more step counts than slides in simulated deck",
            ));
        }
        let mut slides = Vec::with_capacity(ids.len());
        for (index, &physical_id) in ids.iter().enumerate() {
            if physical_id == 0 {
                return Err(AppError::invalid_argument(
                    "physical slide id 0 is reserved for the end screen",
                ));
            }
            if ids[..index].contains(&physical_id) {
                return Err(AppError::invalid_argument(format!(
                    "duplicate physical slide id {physical_id}"
                )));
            }
            let steps = steps.get(index).copied().unwrap_or(1);
            if steps == 0 {
                return Err(AppError::invalid_argument(
                    "every simulated slide needs at least one step",
                ));
            }
            slides.push(SimSlide { physical_id, steps });
        }
        Ok(Self::new(slides))
    }

    pub fn looping(mut self, looping: bool) -> Self {
        self.looping = looping;
        self
    }
}

/// Observable state of the simulated viewer.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SimSnapshot {
    pub session: Option<SessionId>,
    pub slide: usize,
    pub step: u32,
    pub past_end: bool,
    pub blanked: bool,
    pub rect: WindowRect,
    pub focus_requests: usize,
    pub foreground_requests: usize,
    pub wheel_messages: usize,
    pub closed: bool,
}

enum SimRequest {
    Input(WireMessage),
    UserClose,
    Close,
}

struct SimSession {
    id: SessionId,
    primary: WindowHandle,
    secondary: WindowHandle,
    requests: flume::Sender<SimRequest>,
    _viewer: JoinHandle<()>,
}

pub struct SimulatedViewer {
    deck: Arc<SimDeck>,
    state: Arc<Mutex<SimSnapshot>>,
    session: Mutex<Option<SimSession>>,
    next_session: AtomicI32,
    debug: AtomicBool,
}

impl SimulatedViewer {
    pub fn new(deck: SimDeck) -> Self {
        Self {
            deck: Arc::new(deck),
            state: Arc::new(Mutex::new(SimSnapshot::default())),
            session: Mutex::new(None),
            next_session: AtomicI32::new(0),
            debug: AtomicBool::new(false),
        }
    }

    pub fn deck(&self) -> &SimDeck {
        &self.deck
    }

    pub fn snapshot(&self) -> SimSnapshot {
        self.lock_state().clone()
    }

    pub fn debug_enabled(&self) -> bool {
        self.debug.load(Ordering::Relaxed)
    }

    /// Simulates the presenter closing the show window (e.g. with ESC).
    pub fn user_close(&self) {
        self.send_request(None, SimRequest::UserClose);
    }

    fn lock_state(&self) -> std::sync::MutexGuard<'_, SimSnapshot> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_session(&self) -> std::sync::MutexGuard<'_, Option<SimSession>> {
        self.session.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn send_request(&self, session: Option<SessionId>, request: SimRequest) -> bool {
        let guard = self.lock_session();
        let Some(active) = guard.as_ref() else {
            return false;
        };
        if session.is_some_and(|id| id != active.id) {
            return false;
        }
        active.requests.send(request).is_ok()
    }

    fn owns_window(&self, window: WindowHandle, primary: bool) -> bool {
        self.lock_session().as_ref().is_some_and(|active| {
            if primary {
                active.primary == window
            } else {
                active.secondary == window
            }
        })
    }
}

impl Transport for SimulatedViewer {
    fn open(&self, request: &OpenRequest, sink: NotificationSink) -> AppResult<SessionId> {
        if request.command.trim().is_empty() {
            return Err(AppError::open_failure("empty viewer command line"));
        }
        if self.deck.slides.is_empty() {
            return Err(AppError::open_failure("presentation has no slides"));
        }

        let mut session = self.lock_session();
        if session.is_some() && !self.lock_state().closed {
            return Err(AppError::open_failure("simulated viewer is already running"));
        }

        let index = self.next_session.fetch_add(1, Ordering::Relaxed);
        let id = SessionId(index);
        let primary = WindowHandle(WINDOW_HANDLE_BASE + (index as isize) * 2);
        let secondary = WindowHandle(primary.0 + 1);
        *self.lock_state() = SimSnapshot {
            session: Some(id),
            rect: request.rect,
            ..SimSnapshot::default()
        };

        let (requests, request_rx) = flume::unbounded();
        let deck = Arc::clone(&self.deck);
        let state = Arc::clone(&self.state);
        let viewer = thread::Builder::new()
            .name(format!("pvr-sim-viewer-{index}"))
            .spawn(move || viewer_main(deck, state, sink, primary, secondary, request_rx))
            .map_err(|source| {
                AppError::io_with_context(source, "failed to start simulated viewer")
            })?;

        tracing::debug!(session = %id, command = %request.command, "simulated viewer started");
        *session = Some(SimSession {
            id,
            primary,
            secondary,
            requests,
            _viewer: viewer,
        });
        Ok(id)
    }

    fn close(&self, session: SessionId) {
        if !self.send_request(Some(session), SimRequest::Close) {
            tracing::debug!(session = %session, "close for inactive simulated session");
        }
    }

    fn post_command(&self, window: WindowHandle, message: WireMessage) {
        if !self.owns_window(window, false) {
            tracing::warn!(window = window.0, "input posted to unknown window dropped");
            return;
        }
        self.send_request(None, SimRequest::Input(message));
    }

    fn send_command(&self, window: WindowHandle, message: WireMessage) -> isize {
        if self.owns_window(window, true)
            && InputMessage::decode(message) == Some(InputMessage::SetFocus)
        {
            self.lock_state().focus_requests += 1;
        }
        0
    }

    fn move_window(&self, window: WindowHandle, rect: WindowRect) {
        if self.owns_window(window, true) {
            self.lock_state().rect = rect;
        }
    }

    fn set_foreground(&self, window: WindowHandle) {
        if self.owns_window(window, true) {
            self.lock_state().foreground_requests += 1;
        }
    }

    fn set_debug(&self, enabled: bool) {
        self.debug.store(enabled, Ordering::Relaxed);
    }

    fn shutdown(&self) {
        let active = self.lock_session().as_ref().map(|session| session.id);
        if let Some(id) = active {
            self.close(id);
        }
    }
}

impl WindowCapture for SimulatedViewer {
    fn grab(&self, window: WindowHandle) -> AppResult<RgbaFrame> {
        if !self.owns_window(window, true) {
            return Err(AppError::capture(format!("unknown window {}", window.0)));
        }
        let state = self.snapshot();
        let physical_id = if state.past_end {
            0
        } else {
            self.deck
                .slides
                .get(state.slide)
                .map_or(0, |slide| slide.physical_id)
        };
        let width = state.rect.width.max(1) as u32;
        let height = state.rect.height.max(1) as u32;
        Ok(RgbaFrame::solid(width, height, slide_tint(physical_id)))
    }
}

/// Solid color a capture of the given physical slide is filled with.
pub fn slide_tint(physical_id: i32) -> [u8; 4] {
    let bytes = physical_id.to_le_bytes();
    [bytes[0], bytes[1], 0x40, 0xff]
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CursorMove {
    Stayed,
    Stepped,
    Entered(i32),
    Wrapped(i32),
    PastEnd,
}

struct SlideCursor<'a> {
    deck: &'a SimDeck,
    slide: usize,
    step: u32,
    past_end: bool,
}

impl<'a> SlideCursor<'a> {
    fn new(deck: &'a SimDeck) -> Self {
        Self {
            deck,
            slide: 0,
            step: 0,
            past_end: false,
        }
    }

    fn steps_of(&self, slide: usize) -> u32 {
        self.deck.slides.get(slide).map_or(1, |slide| slide.steps.max(1))
    }

    fn id_of(&self, slide: usize) -> i32 {
        self.deck.slides.get(slide).map_or(0, |slide| slide.physical_id)
    }

    fn last(&self) -> usize {
        self.deck.slides.len().saturating_sub(1)
    }

    fn forward(&mut self) -> CursorMove {
        if self.past_end {
            return CursorMove::Stayed;
        }
        if self.step + 1 < self.steps_of(self.slide) {
            self.step += 1;
            return CursorMove::Stepped;
        }
        self.step = 0;
        if self.slide < self.last() {
            self.slide += 1;
            return CursorMove::Entered(self.id_of(self.slide));
        }
        if self.deck.looping {
            self.slide = 0;
            return CursorMove::Wrapped(self.id_of(0));
        }
        self.past_end = true;
        CursorMove::PastEnd
    }

    fn backward(&mut self) -> CursorMove {
        if self.past_end {
            self.past_end = false;
            self.slide = self.last();
            self.step = self.steps_of(self.slide) - 1;
            return CursorMove::Entered(self.id_of(self.slide));
        }
        if self.step > 0 {
            self.step -= 1;
            return CursorMove::Stepped;
        }
        if self.slide > 0 {
            self.slide -= 1;
        } else if self.deck.looping {
            self.slide = self.last();
        } else {
            return CursorMove::Stayed;
        }
        self.step = self.steps_of(self.slide) - 1;
        CursorMove::Entered(self.id_of(self.slide))
    }

    fn jump(&mut self, slide: usize) -> CursorMove {
        if slide > self.last() {
            return CursorMove::Stayed;
        }
        let changed = self.past_end || self.slide != slide;
        self.past_end = false;
        self.slide = slide;
        self.step = 0;
        if changed {
            CursorMove::Entered(self.id_of(slide))
        } else {
            CursorMove::Stepped
        }
    }
}

fn publish(
    state: &Mutex<SimSnapshot>,
    cursor: &SlideCursor<'_>,
    update: impl FnOnce(&mut SimSnapshot),
) {
    let mut snapshot = state.lock().unwrap_or_else(PoisonError::into_inner);
    snapshot.slide = cursor.slide;
    snapshot.step = cursor.step;
    snapshot.past_end = cursor.past_end;
    update(&mut snapshot);
}

fn viewer_main(
    deck: Arc<SimDeck>,
    state: Arc<Mutex<SimSnapshot>>,
    sink: NotificationSink,
    primary: WindowHandle,
    secondary: WindowHandle,
    requests: flume::Receiver<SimRequest>,
) {
    let announce = |movement: CursorMove| match movement {
        CursorMove::Entered(id) | CursorMove::Wrapped(id) => {
            sink.deliver(Notification::SLIDE_CHANGED, id);
        }
        CursorMove::PastEnd => {
            sink.deliver(Notification::SLIDE_CHANGED, 0);
        }
        CursorMove::Stayed | CursorMove::Stepped => {}
    };

    let mut cursor = SlideCursor::new(&deck);
    sink.deliver(Notification::PRIMARY_WINDOW, primary.0 as i32);
    sink.deliver(Notification::SECONDARY_WINDOW, secondary.0 as i32);
    publish(&state, &cursor, |_| {});
    sink.deliver(Notification::SLIDE_CHANGED, cursor.id_of(0));

    // Forward pass: play every step once until the show ends or wraps.
    loop {
        sink.deliver(Notification::STEP_PROGRESS, 0);
        let movement = cursor.forward();
        publish(&state, &cursor, |snapshot| snapshot.wheel_messages += 1);
        announce(movement);
        if matches!(
            movement,
            CursorMove::PastEnd | CursorMove::Wrapped(_) | CursorMove::Stayed
        ) {
            break;
        }
    }

    let mut digits = String::new();
    while let Ok(request) = requests.recv() {
        match request {
            SimRequest::Input(wire) => match InputMessage::decode(wire) {
                Some(InputMessage::Wheel(delta)) => {
                    sink.deliver(Notification::STEP_PROGRESS, 0);
                    let movement = if delta < 0 {
                        cursor.forward()
                    } else {
                        cursor.backward()
                    };
                    publish(&state, &cursor, |snapshot| snapshot.wheel_messages += 1);
                    announce(movement);
                }
                Some(InputMessage::KeyDown(key)) if (0x30..=0x39).contains(&key) => {
                    if let Some(digit) = char::from_u32(key) {
                        digits.push(digit);
                    }
                }
                Some(InputMessage::KeyDown(VK_RETURN)) => {
                    let target = digits.parse::<usize>().ok().filter(|number| *number > 0);
                    digits.clear();
                    if let Some(number) = target {
                        let movement = cursor.jump(number - 1);
                        publish(&state, &cursor, |_| {});
                        announce(movement);
                    }
                }
                Some(InputMessage::KeyDown(key)) => {
                    digits.clear();
                    let blanked = key == KEY_BLANK;
                    publish(&state, &cursor, |snapshot| snapshot.blanked = blanked);
                }
                Some(InputMessage::KeyUp(_)) | Some(InputMessage::SetFocus) => {}
                None => {
                    tracing::debug!(code = wire.code, "simulated viewer ignored message");
                }
            },
            SimRequest::UserClose => {
                sink.deliver(Notification::WINDOW_CLOSED_BY_USER, 0);
            }
            SimRequest::Close => {
                sink.deliver(Notification::SHUTTING_DOWN, 0);
                publish(&state, &cursor, |snapshot| snapshot.closed = true);
                break;
            }
        }
    }
}
