pub mod capture;
pub mod config;
pub mod controller;
pub mod document;
pub mod error;
pub mod event;
pub mod transport;

pub use controller::Controller;
pub use document::{Document, OpenOptions, Phase};
pub use error::{AppError, AppResult};
pub use event::DocumentEvent;
