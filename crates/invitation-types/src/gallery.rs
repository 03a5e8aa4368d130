use serde::{Deserialize, Serialize};

/// Horizontal travel, in pixels, before a touch counts as a swipe.
pub const SWIPE_THRESHOLD_PX: f32 = 50.0;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GalleryLayout {
    #[default]
    Scroll,
    Grid,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GalleryPosition {
    #[default]
    Middle,
    Bottom,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Next,
    Prev,
}

/// Input that can move an open lightbox.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LightboxInput {
    ArrowLeft,
    ArrowRight,
    Escape,
    /// Mouse wheel; positive delta scrolls forward.
    Wheel { delta_y: f32 },
    /// Finished touch gesture, end minus start.
    Swipe { dx: f32, dy: f32 },
    /// Browser back button.
    Back,
}

/// Index tracking for the expanded image viewer.
///
/// Navigation clamps at both ends rather than wrapping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Lightbox {
    len: usize,
    index: Option<usize>,
    direction: Option<Direction>,
}

impl Lightbox {
    pub fn new(len: usize) -> Self {
        Self {
            len,
            index: None,
            direction: None,
        }
    }

    pub fn index(&self) -> Option<usize> {
        self.index
    }

    pub fn is_open(&self) -> bool {
        self.index.is_some()
    }

    /// Direction of the last transition, for animation.
    pub fn direction(&self) -> Option<Direction> {
        self.direction
    }

    /// Expand image `index`. Out-of-range indices leave the viewer closed.
    pub fn open(&mut self, index: usize) -> bool {
        if index >= self.len {
            return false;
        }
        self.index = Some(index);
        self.direction = None;
        true
    }

    pub fn close(&mut self) {
        self.index = None;
        self.direction = None;
    }

    pub fn next(&mut self) -> bool {
        match self.index {
            Some(i) if i + 1 < self.len => {
                self.index = Some(i + 1);
                self.direction = Some(Direction::Next);
                true
            }
            _ => false,
        }
    }

    pub fn prev(&mut self) -> bool {
        match self.index {
            Some(i) if i > 0 => {
                self.index = Some(i - 1);
                self.direction = Some(Direction::Prev);
                true
            }
            _ => false,
        }
    }

    /// Apply an input while open. Returns whether the state changed.
    pub fn apply(&mut self, input: LightboxInput) -> bool {
        if !self.is_open() {
            return false;
        }
        match input {
            LightboxInput::ArrowLeft => self.prev(),
            LightboxInput::ArrowRight => self.next(),
            LightboxInput::Escape | LightboxInput::Back => {
                self.close();
                true
            }
            LightboxInput::Wheel { delta_y } => {
                if delta_y > 0.0 {
                    self.next()
                } else {
                    self.prev()
                }
            }
            LightboxInput::Swipe { dx, dy } => {
                if dx.abs() > dy.abs() && dx.abs() > SWIPE_THRESHOLD_PX {
                    if dx > 0.0 { self.prev() } else { self.next() }
                } else {
                    false
                }
            }
        }
    }

    /// Neighbouring indices worth preloading.
    pub fn preload(&self) -> Vec<usize> {
        let Some(i) = self.index else {
            return vec![];
        };
        let mut out = Vec::with_capacity(2);
        if i + 1 < self.len {
            out.push(i + 1);
        }
        if i > 0 {
            out.push(i - 1);
        }
        out
    }
}
