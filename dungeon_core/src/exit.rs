use std::collections::HashMap;

use tracing::debug;

use dungeon_proto::Coordinate;
use dungeon_store::{RemoteStore, RoomProbe, StoreError};

use crate::events::{DungeonEvent, EventSender};
use crate::map::Direction;
use crate::player::Role;

#[derive(Debug, Default, Clone, Copy)]
struct ExitState {
    locked: Option<bool>,
    continuous: bool,
}

/// Per-exit lock probes for the current room.
///
/// Each exit independently asks the store whether the adjacent coordinate
/// is locked and fires a notification only on an actual transition. The
/// probe depends on the participant's role: architects ask the lock
/// endpoint, raiders ask whether the store will hand the room out at all.
pub struct ExitMonitor {
    store: RemoteStore,
    role: Role,
    events: EventSender,
    states: HashMap<Direction, ExitState>,
}

impl ExitMonitor {
    pub fn new(store: RemoteStore, role: Role, events: EventSender) -> Self {
        Self {
            store,
            role,
            events,
            states: HashMap::new(),
        }
    }

    /// Continuous re-checking is expensive and opt-in per exit.
    pub fn set_continuous(&mut self, direction: Direction, continuous: bool) {
        self.states.entry(direction).or_default().continuous = continuous;
    }

    pub fn is_locked(&self, direction: Direction) -> Option<bool> {
        self.states.get(&direction).and_then(|state| state.locked)
    }

    /// Forget per-exit state when entering a new room.
    pub fn reset(&mut self) {
        for state in self.states.values_mut() {
            state.locked = None;
        }
    }

    /// Probe one exit of the room at `room`. Emits `ExitLockChanged` only
    /// when the answer differs from the last one seen.
    pub async fn check(
        &mut self,
        room: Coordinate,
        direction: Direction,
    ) -> Result<bool, StoreError> {
        let (dx, dy) = direction.delta();
        let adjacent = room.offset(dx, dy);

        let locked = match self.role {
            Role::Architect => self.store.check_room_locked(adjacent).await?,
            Role::Raider => {
                self.store.probe_room_presence(adjacent).await? == RoomProbe::Withheld
            }
        };

        let state = self.states.entry(direction).or_default();
        if state.locked != Some(locked) {
            state.locked = Some(locked);
            debug!(target: "hollowgrid::map", ?direction, locked, "exit lock changed");
            self.events
                .emit(DungeonEvent::ExitLockChanged { direction, locked });
        }
        Ok(locked)
    }

    /// One continuous-mode pass: re-check every exit that opted in.
    pub async fn poll_continuous(&mut self, room: Coordinate) -> Result<(), StoreError> {
        for direction in Direction::ALL {
            let continuous = self
                .states
                .get(&direction)
                .map(|state| state.continuous)
                .unwrap_or(false);
            if continuous {
                self.check(room, direction).await?;
            }
        }
        Ok(())
    }

    /// Exit gating: exits stay shut while the room is freshly created or
    /// still populated; they may open only once the map is loaded.
    pub fn exits_open(map_loaded: bool, room_is_new: bool, live_units: usize) -> bool {
        map_loaded && !room_is_new && live_units == 0
    }
}
