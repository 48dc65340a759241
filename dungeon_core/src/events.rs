use crossbeam_channel::{unbounded, Receiver, Sender};
use tracing::debug;

use dungeon_proto::{Coordinate, RoomId};

use crate::map::Direction;

/// Scroll transition descriptor handed to the presentation layer when the
/// expedition crosses a room boundary. Offsets are world units; the wait is
/// on the unscaled clock.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScrollTransition {
    pub offset: (f32, f32),
    pub duration_secs: f64,
}

/// Notifications pushed outward to whoever is presenting the dungeon.
#[derive(Debug, Clone, PartialEq)]
pub enum DungeonEvent {
    /// Catalog fetched and every room in it cached.
    Loaded { rooms: usize },
    RoomLockChanged { id: RoomId, locked: bool },
    ExitLockChanged { direction: Direction, locked: bool },
    Scroll(ScrollTransition),
    UnitDied { coordinate: Coordinate },
    UploadBatchComplete { id: RoomId, units: usize },
}

/// Outward event channel. Emitting with no listener is fine; the event is
/// dropped with a debug note.
#[derive(Clone)]
pub struct EventSender {
    sender: Sender<DungeonEvent>,
}

impl EventSender {
    pub fn emit(&self, event: DungeonEvent) {
        if self.sender.send(event).is_err() {
            debug!(target: "hollowgrid::events", "event dropped, no listener");
        }
    }
}

pub fn event_channel() -> (EventSender, Receiver<DungeonEvent>) {
    let (sender, receiver) = unbounded();
    (EventSender { sender }, receiver)
}
