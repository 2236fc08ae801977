use std::fmt;

use crate::error::AppResult;

use super::input::WireMessage;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WindowHandle(pub isize);

impl WindowHandle {
    pub fn from_param(param: i32) -> Self {
        Self(param as isize)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionId(pub i32);

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct WindowRect {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl WindowRect {
    pub fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn moved_to(self, x: i32, y: i32) -> Self {
        Self { x, y, ..self }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenRequest {
    pub command: String,
    pub parent: Option<WindowHandle>,
    pub rect: WindowRect,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawNotification {
    pub code: i32,
    pub param: i32,
}

/// Producer half of a session's notification channel.
///
/// Transports call [`NotificationSink::deliver`] from their own delivery
/// context. Notifications are queued in delivery order and never block.
#[derive(Debug, Clone)]
pub struct NotificationSink {
    tx: flume::Sender<RawNotification>,
}

impl NotificationSink {
    pub(crate) fn new(tx: flume::Sender<RawNotification>) -> Self {
        Self { tx }
    }

    /// Callback-shaped entry point. The return value is always 0.
    pub fn deliver(&self, code: i32, param: i32) -> i32 {
        if self.tx.send(RawNotification { code, param }).is_err() {
            tracing::debug!(code, param, "notification dropped, document gone");
        }
        0
    }

    pub fn is_disconnected(&self) -> bool {
        self.tx.is_disconnected()
    }
}

/// Command side of the channel to the controlled viewer process.
///
/// Every method except `open` is fire-and-forget: outcomes are observed
/// through the notifications delivered to the session's sink.
pub trait Transport: Send + Sync {
    fn open(&self, request: &OpenRequest, sink: NotificationSink) -> AppResult<SessionId>;

    fn close(&self, session: SessionId);

    fn post_command(&self, window: WindowHandle, message: WireMessage);

    fn send_command(&self, window: WindowHandle, message: WireMessage) -> isize;

    fn move_window(&self, window: WindowHandle, rect: WindowRect);

    fn set_foreground(&self, window: WindowHandle);

    fn set_debug(&self, enabled: bool) {
        let _ = enabled;
    }

    /// Closes every session the transport still owns.
    fn shutdown(&self) {}
}
