use crate::capture::RgbaFrame;

/// Thumbnails captured during the rewind, tagged with their slide.
///
/// The rewind visits slides last to first, so captures arrive in reverse;
/// `finish` orders them by logical slide index.
#[derive(Debug, Clone)]
pub(crate) struct ThumbnailCollector {
    width: i32,
    captured: Vec<(usize, RgbaFrame)>,
}

impl ThumbnailCollector {
    pub(crate) fn new(width: u32) -> Self {
        Self {
            width: i32::try_from(width).unwrap_or(i32::MAX),
            captured: Vec::new(),
        }
    }

    pub(crate) fn width(&self) -> i32 {
        self.width
    }

    pub(crate) fn record(&mut self, slide: usize, frame: RgbaFrame) {
        self.captured.push((slide, frame));
    }

    pub(crate) fn len(&self) -> usize {
        self.captured.len()
    }

    pub(crate) fn finish(mut self) -> Vec<RgbaFrame> {
        self.captured.sort_by_key(|(slide, _)| *slide);
        self.captured.into_iter().map(|(_, frame)| frame).collect()
    }
}
