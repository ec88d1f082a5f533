//! Framing guidance for a face reported by an external detector.
//!
//! Nothing here detects faces. Given the detector's bounding box and the
//! frame size, [`guide`] tells the user which way to move the camera and
//! [`padded_crop`] picks the region handed to the embedding provider.

use std::fmt;
use std::time::Duration;

/// Horizontal tolerance, in pixels, around the frame center.
pub const THRESHOLD_X: i64 = 150;
/// Vertical tolerance, in pixels, around the frame center.
pub const THRESHOLD_Y: i64 = 200;
/// Fraction of the box size added on every side of a crop.
pub const CROP_PADDING: f64 = 0.3;
/// Minimum interval before the same guidance is repeated.
pub const REPEAT_INTERVAL: Duration = Duration::from_millis(2000);

/// Axis-aligned pixel rectangle, `left`/`top` inclusive,
/// `right`/`bottom` exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rect {
    pub left: i64,
    pub top: i64,
    pub right: i64,
    pub bottom: i64,
}

impl Rect {
    pub fn new(left: i64, top: i64, right: i64, bottom: i64) -> Self {
        Self {
            left,
            top,
            right,
            bottom,
        }
    }

    pub fn width(&self) -> i64 {
        self.right - self.left
    }

    pub fn height(&self) -> i64 {
        self.bottom - self.top
    }

    /// Rounds toward negative infinity.
    pub fn center_x(&self) -> i64 {
        (self.left + self.right) >> 1
    }

    pub fn center_y(&self) -> i64 {
        (self.top + self.bottom) >> 1
    }
}

/// Camera adjustment needed to center a face.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Guidance {
    Centered,
    MoveLeft,
    MoveRight,
    MoveUp,
    MoveDown,
}

impl fmt::Display for Guidance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Centered => write!(f, "Face Centered"),
            Self::MoveLeft => write!(f, "Move Left"),
            Self::MoveRight => write!(f, "Move Right"),
            Self::MoveUp => write!(f, "Move Up"),
            Self::MoveDown => write!(f, "Move Down"),
        }
    }
}

/// Computes guidance for a face box inside a `frame_width x frame_height`
/// frame. The horizontal axis takes priority over the vertical one.
pub fn guide(frame_width: i64, frame_height: i64, bounds: Rect) -> Guidance {
    let dx = bounds.center_x() - frame_width / 2;
    let dy = bounds.center_y() - frame_height / 2;

    if dx.abs() < THRESHOLD_X && dy.abs() < THRESHOLD_Y {
        return Guidance::Centered;
    }
    if dx < -THRESHOLD_X {
        Guidance::MoveRight
    } else if dx > THRESHOLD_X {
        Guidance::MoveLeft
    } else if dy < -THRESHOLD_Y {
        Guidance::MoveDown
    } else if dy > THRESHOLD_Y {
        Guidance::MoveUp
    } else {
        // Exactly on a threshold: close enough.
        Guidance::Centered
    }
}

/// Expands `bounds` by [`CROP_PADDING`] of its size on every side and
/// clamps it to the frame. Returns `None` if nothing is left.
pub fn padded_crop(frame_width: i64, frame_height: i64, bounds: Rect) -> Option<Rect> {
    let pad_x = (bounds.width() as f64 * CROP_PADDING) as i64;
    let pad_y = (bounds.height() as f64 * CROP_PADDING) as i64;
    let crop = Rect {
        left: (bounds.left - pad_x).max(0),
        top: (bounds.top - pad_y).max(0),
        right: (bounds.right + pad_x).min(frame_width),
        bottom: (bounds.bottom + pad_y).min(frame_height),
    };
    (crop.width() > 0 && crop.height() > 0).then_some(crop)
}

/// Rate-limits spoken guidance.
///
/// A new instruction is announced immediately; the same instruction is
/// repeated at most once per [`REPEAT_INTERVAL`]. `Centered` is announced
/// only when entering it.
#[derive(Debug, Default)]
pub struct GuidanceThrottle {
    last: Option<(Guidance, Duration)>,
}

impl GuidanceThrottle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feeds the guidance for a frame observed at `now` (any monotonic
    /// clock). Returns the guidance to announce, if any.
    pub fn observe(&mut self, guidance: Guidance, now: Duration) -> Option<Guidance> {
        let (changed, stale) = match self.last {
            None => (true, true),
            Some((prev, at)) => (prev != guidance, now.saturating_sub(at) > REPEAT_INTERVAL),
        };
        if !changed && !stale {
            return None;
        }

        let was_centered = matches!(self.last, Some((Guidance::Centered, _)));
        self.last = Some((guidance, now));
        if guidance == Guidance::Centered && was_centered {
            return None;
        }
        Some(guidance)
    }

    /// Forgets the last announcement, e.g. when the face leaves the frame.
    pub fn reset(&mut self) {
        self.last = None;
    }
}
