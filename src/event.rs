use std::sync::Arc;

use crate::error::AppError;
use crate::transport::WindowHandle;

/// A notification from the viewer, classified by its protocol code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Notification {
    PrimaryWindow(WindowHandle),
    /// The second window exists; the viewer is set up and starts playing.
    SecondaryWindow(WindowHandle),
    StepProgress,
    /// `physical_id` is 0 when the show moved past its last slide.
    SlideChanged {
        physical_id: i32,
    },
    WindowClosedByUser,
    ShuttingDown,
    Unrecognized {
        code: i32,
        param: i32,
    },
}

impl Notification {
    pub const PRIMARY_WINDOW: i32 = 1;
    pub const SECONDARY_WINDOW: i32 = 2;
    pub const STEP_PROGRESS: i32 = 3;
    pub const SLIDE_CHANGED: i32 = 4;
    pub const WINDOW_CLOSED_BY_USER: i32 = 5;
    pub const SHUTTING_DOWN: i32 = 6;

    pub fn classify(code: i32, param: i32) -> Self {
        match code {
            Self::PRIMARY_WINDOW => Self::PrimaryWindow(WindowHandle::from_param(param)),
            Self::SECONDARY_WINDOW => Self::SecondaryWindow(WindowHandle::from_param(param)),
            Self::STEP_PROGRESS => Self::StepProgress,
            Self::SLIDE_CHANGED => Self::SlideChanged { physical_id: param },
            Self::WINDOW_CLOSED_BY_USER => Self::WindowClosedByUser,
            Self::SHUTTING_DOWN => Self::ShuttingDown,
            _ => Self::Unrecognized { code, param },
        }
    }
}

/// Lifecycle signal delivered to document listeners.
///
/// Events arrive on a worker context owned by the document, never on the
/// thread that opened it. Consumers with thread affinity must redispatch.
#[derive(Debug, Clone)]
pub enum DocumentEvent {
    Loaded,
    SlideChanged { slide: usize },
    Closed,
    Error(Arc<AppError>),
}
