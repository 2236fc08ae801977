mod input;
pub mod sim;
mod traits;

pub use input::{
    InputMessage, VK_RETURN, WM_KEYDOWN, WM_KEYUP, WM_MOUSEWHEEL, WM_SETFOCUS, WireMessage,
    slide_number_keys,
};
pub use traits::{
    NotificationSink, OpenRequest, RawNotification, SessionId, Transport, WindowHandle,
    WindowRect,
};
pub(crate) use input::{KEY_BLANK, KEY_UNBLANK};
