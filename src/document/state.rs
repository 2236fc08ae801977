use std::collections::HashMap;

use crate::error::{AppError, AppResult};

/// Lifecycle phase of a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Session requested, viewer windows not established yet.
    Starting,
    /// The viewer plays the deck forward once; slides and steps are counted.
    Loading,
    /// Walking back to the first step of slide 0, capturing thumbnails.
    Resetting,
    /// Priming finished; navigation is available.
    Running,
}

/// What a slide-changed notification asks the document to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SlideChange {
    Ignored,
    Registered {
        slide: usize,
    },
    /// The forward pass reached its boundary; step back once to start
    /// rewinding.
    RewindStarted,
    /// The show moved before its first slide; step back once more.
    StepBackClamp,
    /// The rewind landed on the last step of `slide`. Capture it, then send
    /// `back_steps` backward steps. `finished` marks slide 0.
    RewindLanded {
        slide: usize,
        back_steps: u32,
        finished: bool,
    },
    Current {
        slide: usize,
    },
}

/// Slide bookkeeping learned from the viewer's notifications.
///
/// Physical ids map to logical indices assigned once, in first-seen order.
/// Step counts only grow while loading and are frozen afterwards.
#[derive(Debug, Clone)]
pub(crate) struct DeckState {
    phase: Phase,
    current: i32,
    slide_ids: HashMap<i32, usize>,
    slide_steps: Vec<u32>,
}

impl Default for DeckState {
    fn default() -> Self {
        Self {
            phase: Phase::Starting,
            current: -1,
            slide_ids: HashMap::new(),
            slide_steps: Vec::new(),
        }
    }
}

impl DeckState {
    pub(crate) fn phase(&self) -> Phase {
        self.phase
    }

    pub(crate) fn has_loaded(&self) -> bool {
        self.phase == Phase::Running
    }

    /// -1 while the deck size is still unknown.
    pub(crate) fn slide_count(&self) -> i32 {
        match self.phase {
            Phase::Starting | Phase::Loading => -1,
            Phase::Resetting | Phase::Running => self.slide_ids.len() as i32,
        }
    }

    /// -1 unless running.
    pub(crate) fn current_slide(&self) -> i32 {
        if self.phase == Phase::Running {
            self.current
        } else {
            -1
        }
    }

    pub(crate) fn step_count(&self, slide: i32) -> AppResult<u32> {
        if self.phase != Phase::Running {
            return Err(AppError::invalid_state("slideshow not loaded yet"));
        }
        let count = self.slide_count();
        if slide < 0 || slide >= count {
            return Err(AppError::out_of_range(slide, count));
        }
        Ok(self.slide_steps[slide as usize])
    }

    pub(crate) fn step_counts(&self) -> Option<&[u32]> {
        self.has_loaded().then_some(self.slide_steps.as_slice())
    }

    pub(crate) fn can_step_forward(&self) -> bool {
        self.current < self.slide_count()
    }

    #[cfg(test)]
    pub(crate) fn set_current(&mut self, slide: i32) {
        self.current = slide;
    }

    /// Setup finished: the viewer starts its forward pass.
    pub(crate) fn begin_loading(&mut self) -> bool {
        if self.phase != Phase::Starting {
            return false;
        }
        self.phase = Phase::Loading;
        true
    }

    /// Counts one step for the current slide while loading. Returns the
    /// slide and its new count when counted.
    pub(crate) fn on_step_progress(&mut self) -> Option<(usize, u32)> {
        if self.phase != Phase::Loading || self.current < 0 {
            return None;
        }
        let slide = self.current as usize;
        let steps = self.slide_steps.get_mut(slide)?;
        *steps += 1;
        Some((slide, *steps))
    }

    pub(crate) fn on_slide_changed(&mut self, physical_id: i32) -> AppResult<SlideChange> {
        match self.phase {
            Phase::Starting | Phase::Loading => Ok(self.learn_slide(physical_id)),
            Phase::Resetting => {
                if physical_id == 0 {
                    return Ok(SlideChange::StepBackClamp);
                }
                let slide = self.resolve(physical_id)?;
                let recorded = self.slide_steps[slide];
                // slide 0 stops on its first step instead of crossing over
                let back_steps = if slide == 0 {
                    recorded.saturating_sub(1)
                } else {
                    recorded
                };
                Ok(SlideChange::RewindLanded {
                    slide,
                    back_steps,
                    finished: slide == 0,
                })
            }
            Phase::Running => {
                if physical_id == 0 {
                    return Ok(SlideChange::StepBackClamp);
                }
                let slide = self.resolve(physical_id)?;
                Ok(SlideChange::Current { slide })
            }
        }
    }

    pub(crate) fn finish_priming(&mut self) {
        self.phase = Phase::Running;
    }

    fn learn_slide(&mut self, physical_id: i32) -> SlideChange {
        let boundary = physical_id == 0 || self.slide_ids.contains_key(&physical_id);
        if boundary {
            if self.phase == Phase::Loading && self.current >= 0 {
                self.phase = Phase::Resetting;
                return SlideChange::RewindStarted;
            }
            return SlideChange::Ignored;
        }

        let slide = self.slide_steps.len();
        self.slide_ids.insert(physical_id, slide);
        self.slide_steps.push(0);
        self.current = slide as i32;
        SlideChange::Registered { slide }
    }

    fn resolve(&mut self, physical_id: i32) -> AppResult<usize> {
        let slide = *self
            .slide_ids
            .get(&physical_id)
            .ok_or_else(|| AppError::protocol_violation(physical_id))?;
        self.current = slide as i32;
        Ok(slide)
    }
}
