use std::thread;
use std::time::Duration;

use crate::capture::{RgbaFrame, capture_window};
use crate::error::{AppError, AppResult};
use crate::transport::{
    InputMessage, KEY_BLANK, KEY_UNBLANK, VK_RETURN, WindowHandle, slide_number_keys,
};

use super::Document;
use super::core::DocumentCore;

impl DocumentCore {
    pub(crate) fn primary_window(&self) -> AppResult<WindowHandle> {
        self.windows()
            .primary
            .ok_or_else(|| AppError::invalid_state("viewer window not assigned yet"))
    }

    fn input_window(&self) -> AppResult<WindowHandle> {
        self.windows()
            .secondary
            .ok_or_else(|| AppError::invalid_state("viewer input window not assigned yet"))
    }

    fn post(&self, message: InputMessage) -> AppResult<()> {
        let window = self.input_window()?;
        self.transport.post_command(window, message.encode());
        Ok(())
    }

    fn press(&self, key: u32) -> AppResult<()> {
        for message in InputMessage::key_press(key) {
            self.post(message)?;
        }
        Ok(())
    }

    fn key_pause(&self) {
        if self.input.key_pause_ms > 0 {
            thread::sleep(Duration::from_millis(self.input.key_pause_ms));
        }
    }

    fn focus_input(&self) -> AppResult<()> {
        let window = self.primary_window()?;
        self.transport
            .send_command(window, InputMessage::SetFocus.encode());
        Ok(())
    }

    fn post_step(&self, message: InputMessage) -> AppResult<()> {
        self.focus_input()?;
        self.post(message)
    }

    pub(crate) fn post_step_back(&self) -> AppResult<()> {
        self.post_step(InputMessage::step_back())
    }

    pub(crate) fn post_unblank(&self) -> AppResult<()> {
        self.focus_input()?;
        self.press(KEY_UNBLANK)
    }

    pub(crate) fn apply_show(&self) -> AppResult<()> {
        let window = self.primary_window()?;
        self.transport.move_window(window, self.geometry());
        Ok(())
    }
}

/// Navigation. Every call except [`Document::close`] requires a loaded,
/// open document; commands are fire-and-forget and completion is observed
/// through [`crate::event::DocumentEvent::SlideChanged`].
impl Document {
    fn ensure_usable(&self) -> AppResult<()> {
        if self.core.is_closed() {
            return Err(AppError::DocumentClosed);
        }
        if !self.core.lock_deck().has_loaded() {
            return Err(AppError::invalid_state("slideshow not loaded yet"));
        }
        Ok(())
    }

    pub fn step_back(&self) -> AppResult<()> {
        self.ensure_usable()?;
        self.core.post_step_back()
    }

    /// Does nothing once the current slide is at or past the deck end.
    pub fn step_forward(&self) -> AppResult<()> {
        self.ensure_usable()?;
        if !self.core.lock_deck().can_step_forward() {
            tracing::debug!(doc = self.core.tag(), "step forward at deck end ignored");
            return Ok(());
        }
        self.core.post_step(InputMessage::step_forward())
    }

    /// Types the 1-based slide number followed by Return. Targets past the
    /// deck end are left to the viewer.
    pub fn goto_slide(&self, slide: i32) -> AppResult<()> {
        if slide < 0 {
            return Err(AppError::invalid_argument(format!(
                "slide index must not be negative, got {slide}"
            )));
        }
        self.ensure_usable()?;
        tracing::debug!(doc = self.core.tag(), slide, "goto slide");

        self.core.focus_input()?;
        for key in slide_number_keys(slide as usize) {
            self.core.press(key)?;
        }
        self.core.key_pause();
        self.core.press(VK_RETURN)
    }

    /// Forces a black screen whatever the current blank state is.
    pub fn blank(&self) -> AppResult<()> {
        self.ensure_usable()?;
        self.core.focus_input()?;
        self.core.press(KEY_UNBLANK)?;
        self.core.key_pause();
        self.core.press(KEY_BLANK)
    }

    pub fn unblank(&self) -> AppResult<()> {
        self.ensure_usable()?;
        self.core.post_unblank()
    }

    /// Moves the window off screen, keeping its size.
    pub fn hide(&self) -> AppResult<()> {
        self.ensure_usable()?;
        let window = self.core.primary_window()?;
        let offscreen = self
            .core
            .geometry()
            .moved_to(self.core.input.offscreen_x, self.core.input.offscreen_y);
        self.core.transport.move_window(window, offscreen);
        Ok(())
    }

    pub fn show(&self) -> AppResult<()> {
        self.ensure_usable()?;
        self.core.apply_show()
    }

    pub fn move_to(&self, x: i32, y: i32) -> AppResult<()> {
        self.ensure_usable()?;
        let moved = self.core.geometry().moved_to(x, y);
        self.core.set_geometry(moved);
        self.core.apply_show()
    }

    pub fn focus(&self) -> AppResult<()> {
        self.ensure_usable()?;
        let window = self.core.primary_window()?;
        self.core.transport.set_foreground(window);
        Ok(())
    }

    /// Ends the session. Safe to call any number of times.
    pub fn close(&self) {
        self.core.close();
    }

    /// Still image of the window scaled to `width`, full size when `width`
    /// is 0 or less. Undefined while the window is hidden.
    pub fn capture_window(&self, width: i32) -> AppResult<RgbaFrame> {
        self.ensure_usable()?;
        let window = self.core.primary_window()?;
        capture_window(self.core.capture.as_ref(), window, width)
    }
}
