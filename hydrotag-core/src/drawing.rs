use serde::{Deserialize, Serialize};

use crate::geometry::{OverlayRect, PixelRect};

/// A rectangle being dragged. Width and height are signed: dragging up or to
/// the left of the origin produces negative extents.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct DragRect {
    pub x: f64,
    pub y: f64,
    pub w: f64,
    pub h: f64,
}

impl DragRect {
    /// Min-corner-first rectangle with non-negative extents.
    pub fn normalized(&self) -> PixelRect {
        PixelRect {
            left: self.x.min(self.x + self.w),
            top: self.y.min(self.y + self.h),
            width: self.w.abs(),
            height: self.h.abs(),
        }
    }

    /// Both extents strictly larger than `threshold`.
    pub fn exceeds(&self, threshold: f64) -> bool {
        self.w.abs() > threshold && self.h.abs() > threshold
    }
}

/// Why a drag could not start.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DrawBlock {
    NoLayout,
    NoImage,
    ImageLoading,
    ImageUnavailable,
    Playing,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum DownOutcome {
    Started,
    Blocked(DrawBlock),
    OutsideOverlay,
    /// A session is already active or awaiting its form.
    Busy,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum UpOutcome {
    /// No drag was active.
    Ignored,
    /// The rectangle passed the size gate and now waits for metadata.
    Committing(PixelRect),
    /// Too small; discarded without side effects.
    Cancelled,
}

#[derive(Clone, Copy, Debug, PartialEq)]
enum DrawState {
    Idle,
    Active { origin: (f64, f64), current: DragRect, bounds: OverlayRect },
    Committing { rect: PixelRect },
}

/// Pointer-drag state machine: `Idle -> Active -> Committing | Cancelled -> Idle`.
#[derive(Clone, Debug)]
pub struct DrawingSession {
    state: DrawState,
    min_size: f64,
}

impl DrawingSession {
    pub fn new(min_size: f64) -> Self {
        Self { state: DrawState::Idle, min_size }
    }

    pub fn is_idle(&self) -> bool {
        matches!(self.state, DrawState::Idle)
    }

    pub fn is_active(&self) -> bool {
        matches!(self.state, DrawState::Active { .. })
    }

    pub fn is_committing(&self) -> bool {
        matches!(self.state, DrawState::Committing { .. })
    }

    /// Start a drag. `block` is the caller's interaction gate (loading image,
    /// running playback, ...); a blocked or out-of-overlay press leaves the
    /// session idle.
    pub fn pointer_down(
        &mut self,
        x: f64,
        y: f64,
        overlay: &OverlayRect,
        block: Option<DrawBlock>,
    ) -> DownOutcome {
        if !self.is_idle() {
            return DownOutcome::Busy;
        }
        if let Some(reason) = block {
            log::debug!("Drawing blocked: {reason:?}");
            return DownOutcome::Blocked(reason);
        }
        if !overlay.contains_point(x, y) {
            return DownOutcome::OutsideOverlay;
        }
        self.state = DrawState::Active {
            origin: (x, y),
            current: DragRect { x, y, w: 0.0, h: 0.0 },
            bounds: *overlay,
        };
        DownOutcome::Started
    }

    /// Update the live rectangle with the cursor clipped to the overlay.
    pub fn pointer_move(&mut self, x: f64, y: f64) -> Option<DragRect> {
        let DrawState::Active { origin, current, bounds } = &mut self.state else {
            return None;
        };
        let (cx, cy) = bounds.clamp_point(x, y);
        *current = DragRect {
            x: origin.0,
            y: origin.1,
            w: cx - origin.0,
            h: cy - origin.1,
        };
        Some(*current)
    }

    /// Finish the drag at `(x, y)`.
    pub fn pointer_up(&mut self, x: f64, y: f64) -> UpOutcome {
        if self.pointer_move(x, y).is_none() {
            return UpOutcome::Ignored;
        }
        self.finish()
    }

    /// Leaving the container ends the drag exactly like a release would.
    pub fn pointer_leave(&mut self, x: f64, y: f64) -> UpOutcome {
        self.pointer_up(x, y)
    }

    fn finish(&mut self) -> UpOutcome {
        let DrawState::Active { current, .. } = self.state else {
            return UpOutcome::Ignored;
        };
        if current.exceeds(self.min_size) {
            let rect = current.normalized();
            self.state = DrawState::Committing { rect };
            UpOutcome::Committing(rect)
        } else {
            self.state = DrawState::Idle;
            UpOutcome::Cancelled
        }
    }

    /// The rectangle to draw while dragging, normalized.
    pub fn live_rect(&self) -> Option<PixelRect> {
        match self.state {
            DrawState::Active { current, .. } => Some(current.normalized()),
            _ => None,
        }
    }

    /// The rectangle awaiting metadata, if any.
    pub fn pending(&self) -> Option<PixelRect> {
        match self.state {
            DrawState::Committing { rect } => Some(rect),
            _ => None,
        }
    }

    /// Hand the pending rectangle to the submit step and return to idle.
    pub fn take_pending(&mut self) -> Option<PixelRect> {
        let rect = self.pending()?;
        self.state = DrawState::Idle;
        Some(rect)
    }

    /// Drop whatever is in progress (drag or pending form). Returns true if
    /// anything was discarded.
    pub fn cancel(&mut self) -> bool {
        let had_something = !self.is_idle();
        self.state = DrawState::Idle;
        had_something
    }
}
