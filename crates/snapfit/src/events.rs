//! Notifications emitted on snap state changes.

use crate::registry::Slot;
use crate::scene::ObjectId;

/// A snap state change of one piece.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnapEvent {
    /// The piece was pinned to a goal slot.
    Snapped {
        /// The piece that moved.
        piece: ObjectId,
        /// The slot it now occupies: one of its own goals or an alternate's
        /// primary slot.
        slot: Slot,
    },
    /// The piece left its slot and follows the manipulator again.
    Freed {
        /// The piece that moved.
        piece: ObjectId,
    },
}

impl SnapEvent {
    /// The piece the event is about.
    pub fn piece(&self) -> ObjectId {
        match *self {
            SnapEvent::Snapped { piece, .. } | SnapEvent::Freed { piece } => piece,
        }
    }

    /// Event name as seen by UI/audio listeners.
    pub fn name(&self) -> &'static str {
        match self {
            SnapEvent::Snapped { .. } => "piece-snapped",
            SnapEvent::Freed { .. } => "piece-freed",
        }
    }
}

/// Receiver of [`SnapEvent`]s.
pub trait EventSink {
    /// Deliver one event.
    fn emit(&mut self, event: SnapEvent);
}

impl EventSink for Vec<SnapEvent> {
    fn emit(&mut self, event: SnapEvent) {
        self.push(event);
    }
}

/// Sink that drops every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl EventSink for NullSink {
    fn emit(&mut self, _event: SnapEvent) {}
}
