//! Drag Gesture Tracking
//!
//! Framework-free drag-and-drop state machine driven by pointer events.
//! Uses a movement threshold to distinguish a click from a drag, and only
//! yields a drop when a drop zone was resolved at release time.

/// Movement threshold in pixels to start dragging
pub const DRAG_THRESHOLD_PX: i32 = 5;

/// Primary (left) pointer button
pub const PRIMARY_BUTTON: i16 = 0;

/// A slot between items of a lane: dropping here inserts at `index`
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DropZone<L> {
    pub lane: L,
    pub index: usize,
}

impl<L> DropZone<L> {
    pub fn new(lane: L, index: usize) -> Self {
        Self { lane, index }
    }
}

/// Result of finishing a gesture
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DragOutcome<K, L> {
    /// Item was dragged and released over a drop zone
    Dropped {
        item: K,
        source: L,
        target: DropZone<L>,
    },
    /// Drag started but ended without a resolved drop zone
    Cancelled { item: K },
    /// Pointer went down and up without crossing the threshold
    Click { item: K },
    /// Release with nothing pressed
    Idle,
}

#[derive(Clone, Debug)]
enum Phase<K, L> {
    Idle,
    /// Pressed but not yet moved past the threshold
    Pending {
        item: K,
        source: L,
        start_x: i32,
        start_y: i32,
    },
    Dragging {
        item: K,
        source: L,
        target: Option<DropZone<L>>,
    },
}

/// Drag state for one pointer
#[derive(Clone, Debug)]
pub struct DragTracker<K, L> {
    phase: Phase<K, L>,
    threshold: i32,
}

impl<K, L> Default for DragTracker<K, L> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K, L> DragTracker<K, L> {
    pub fn new() -> Self {
        Self::with_threshold(DRAG_THRESHOLD_PX)
    }

    pub fn with_threshold(threshold: i32) -> Self {
        Self {
            phase: Phase::Idle,
            threshold: threshold.max(0),
        }
    }

    /// Record a pending drag with its start position.
    ///
    /// Non-primary buttons are ignored. Returns whether the press was taken.
    pub fn press(&mut self, item: K, source: L, button: i16, x: i32, y: i32) -> bool {
        if button != PRIMARY_BUTTON {
            return false;
        }
        self.phase = Phase::Pending {
            item,
            source,
            start_x: x,
            start_y: y,
        };
        true
    }

    /// Feed a pointer move; starts dragging once moved beyond the threshold.
    ///
    /// Returns true on the move that started the drag.
    pub fn pointer_move(&mut self, x: i32, y: i32) -> bool {
        let started = match &self.phase {
            Phase::Pending { start_x, start_y, .. } => {
                let dx = (x - start_x).abs();
                let dy = (y - start_y).abs();
                dx > self.threshold || dy > self.threshold
            }
            _ => false,
        };
        if started {
            let phase = std::mem::replace(&mut self.phase, Phase::Idle);
            if let Phase::Pending { item, source, .. } = phase {
                log::debug!("drag started");
                self.phase = Phase::Dragging {
                    item,
                    source,
                    target: None,
                };
            }
        }
        started
    }

    /// Pointer entered a drop zone while dragging
    pub fn hover(&mut self, zone: DropZone<L>) {
        if let Phase::Dragging { target, .. } = &mut self.phase {
            *target = Some(zone);
        }
    }

    /// Pointer left the current drop zone
    pub fn leave(&mut self) {
        if let Phase::Dragging { target, .. } = &mut self.phase {
            *target = None;
        }
    }

    /// End the gesture at pointer-up
    pub fn release(&mut self) -> DragOutcome<K, L> {
        match std::mem::replace(&mut self.phase, Phase::Idle) {
            Phase::Idle => DragOutcome::Idle,
            Phase::Pending { item, .. } => DragOutcome::Click { item },
            Phase::Dragging {
                item,
                source,
                target: Some(target),
            } => DragOutcome::Dropped {
                item,
                source,
                target,
            },
            Phase::Dragging { item, target: None, .. } => DragOutcome::Cancelled { item },
        }
    }

    /// Abort the gesture (escape key, pointer lost); never yields a drop
    pub fn cancel(&mut self) -> DragOutcome<K, L> {
        match std::mem::replace(&mut self.phase, Phase::Idle) {
            Phase::Idle => DragOutcome::Idle,
            Phase::Pending { item, .. } | Phase::Dragging { item, .. } => {
                DragOutcome::Cancelled { item }
            }
        }
    }

    pub fn is_dragging(&self) -> bool {
        matches!(self.phase, Phase::Dragging { .. })
    }

    /// Item being dragged, if past the threshold
    pub fn dragging(&self) -> Option<&K> {
        match &self.phase {
            Phase::Dragging { item, .. } => Some(item),
            _ => None,
        }
    }

    /// Drop zone currently under the pointer
    pub fn target(&self) -> Option<&DropZone<L>> {
        match &self.phase {
            Phase::Dragging { target, .. } => target.as_ref(),
            _ => None,
        }
    }
}
