use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use futures::future::join_all;
use thiserror::Error;
use tracing::{info, warn};

use dungeon_proto::{Coordinate, CreateRoomRequest, RoomId, RoomRecord, UnitRecord};
use dungeon_store::{RemoteStore, StoreError};

use crate::clock::Clock;
use crate::config::MapConfig;
use crate::events::{DungeonEvent, EventSender, ScrollTransition};
use crate::liveness::Liveness;

/// Cardinal movement through the grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    North,
    South,
    East,
    West,
}

impl Direction {
    pub const ALL: [Direction; 4] = [
        Direction::North,
        Direction::South,
        Direction::East,
        Direction::West,
    ];

    /// Classify a raw movement vector. Diagonals and zero vectors are a
    /// caller error, rejected before any state is touched.
    pub fn from_vector(dx: i32, dy: i32) -> Result<Self, MapError> {
        match (dx, dy) {
            (0, 1) => Ok(Direction::North),
            (0, -1) => Ok(Direction::South),
            (1, 0) => Ok(Direction::East),
            (-1, 0) => Ok(Direction::West),
            _ => Err(MapError::NonCardinal { dx, dy }),
        }
    }

    pub fn delta(self) -> (i32, i32) {
        match self {
            Direction::North => (0, 1),
            Direction::South => (0, -1),
            Direction::East => (1, 0),
            Direction::West => (-1, 0),
        }
    }
}

#[derive(Debug, Error)]
pub enum MapError {
    #[error("movement vector ({dx}, {dy}) is not cardinal")]
    NonCardinal { dx: i32, dy: i32 },
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Live-unit count of the current room. Shared between the economy (which
/// increments it on finish) and the map (which zeroes it and reacts to unit
/// deaths), so it is a clonable handle.
#[derive(Clone, Default)]
pub struct UnitCounter {
    live: Arc<AtomicUsize>,
}

impl UnitCounter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn live(&self) -> usize {
        self.live.load(Ordering::Acquire)
    }

    pub fn increment(&self) {
        self.live.fetch_add(1, Ordering::AcqRel);
    }

    pub fn reset(&self) {
        self.live.store(0, Ordering::Release);
    }

    /// Set the live count to a room's population on entry.
    pub fn seed(&self, count: usize) {
        self.live.store(count, Ordering::Release);
    }

    /// Saturating decrement; returns the remaining live count.
    pub fn notify_death(&self) -> usize {
        let mut current = self.live.load(Ordering::Acquire);
        while current > 0 {
            match self.live.compare_exchange(
                current,
                current - 1,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => return current - 1,
                Err(actual) => current = actual,
            }
        }
        0
    }
}

/// Lock state of the room created this visit. `unlocking` latches the
/// background unlock so repeated quit attempts issue one request.
struct RoomLock {
    id: RoomId,
    locked: Arc<AtomicBool>,
    unlocking: Arc<AtomicBool>,
}

impl RoomLock {
    fn new(id: RoomId) -> Self {
        Self {
            id,
            locked: Arc::new(AtomicBool::new(true)),
            unlocking: Arc::new(AtomicBool::new(false)),
        }
    }
}

/// What a move found at the destination.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveReport {
    /// Destination was cached; normal entry.
    Entered,
    /// Cache miss: a room was created remotely and is locked until its
    /// build session uploads.
    CreatedLocked(RoomId),
    /// The owner died mid-transition; nothing was committed.
    Aborted,
}

/// Coordinate-keyed room cache plus navigation and the lock protocol.
///
/// The cache is populated only by successful fetches and never evicted;
/// writes are additive and idempotent.
pub struct MapGraph {
    store: RemoteStore,
    config: MapConfig,
    events: EventSender,
    clock: Arc<dyn Clock>,
    liveness: Liveness,
    cache: HashMap<Coordinate, RoomRecord>,
    catalog_len: usize,
    loaded_announced: bool,
    current: Coordinate,
    origin: Coordinate,
    counter: UnitCounter,
    lock: Option<RoomLock>,
    owner_id: i64,
}

impl MapGraph {
    pub fn new(
        store: RemoteStore,
        config: MapConfig,
        events: EventSender,
        clock: Arc<dyn Clock>,
        owner_id: i64,
    ) -> Self {
        Self {
            store,
            config,
            events,
            clock,
            liveness: Liveness::new(),
            cache: HashMap::new(),
            catalog_len: 0,
            loaded_announced: false,
            current: Coordinate::ORIGIN,
            origin: Coordinate::ORIGIN,
            counter: UnitCounter::new(),
            lock: None,
            owner_id,
        }
    }

    pub fn liveness(&self) -> Liveness {
        self.liveness.clone()
    }

    pub fn counter(&self) -> &UnitCounter {
        &self.counter
    }

    pub fn current(&self) -> Coordinate {
        self.current
    }

    pub fn cached(&self, coordinate: Coordinate) -> Option<&RoomRecord> {
        self.cache.get(&coordinate)
    }

    pub fn cache_len(&self) -> usize {
        self.cache.len()
    }

    /// Loaded means: catalog fetched non-empty AND every catalogued room is
    /// cached. Polled, not event-summed, so duplicate or out-of-order
    /// fetches are tolerated.
    pub fn is_loaded(&self) -> bool {
        self.catalog_len > 0 && self.cache.len() >= self.catalog_len
    }

    /// Fetch the catalog, then every room in it in parallel, keying the
    /// cache by each payload's own coordinate.
    ///
    /// A catalog failure aborts the whole load with the cache untouched.
    /// Individual fetch failures are logged and skipped; calling again
    /// retries only what is missing. Returns whether the map is now loaded.
    pub async fn load_all(&mut self) -> Result<bool, StoreError> {
        let ids = self.store.catalog().await?;
        self.catalog_len = ids.len();

        let results = {
            let store = &self.store;
            let fetches = ids
                .into_iter()
                .map(|id| async move { (id, store.fetch_room(id).await) });
            join_all(fetches).await
        };
        for (id, result) in results {
            match result {
                Ok(room) => {
                    // Additive and idempotent: re-fetching an already cached
                    // coordinate writes equal data.
                    self.cache.insert(room.coordinate(), room);
                }
                Err(err) => {
                    warn!(target: "hollowgrid::map", %id, error = %err, "room fetch failed");
                }
            }
        }

        let loaded = self.is_loaded();
        if loaded && !self.loaded_announced {
            self.loaded_announced = true;
            info!(target: "hollowgrid::map", rooms = self.cache.len(), "map loaded");
            self.events.emit(DungeonEvent::Loaded {
                rooms: self.cache.len(),
            });
        }
        Ok(loaded)
    }

    /// Jump to a coordinate; reports whether a cached record exists there.
    /// A miss marks the coordinate new and the caller drives room creation.
    pub fn go_to(&mut self, coordinate: Coordinate) -> bool {
        self.current = coordinate;
        self.cache.contains_key(&coordinate)
    }

    pub fn return_to_start(&mut self) {
        self.current = self.origin;
    }

    /// Move one room in a cardinal direction.
    ///
    /// Emits the scroll-transition descriptor and waits it out on the
    /// unscaled clock, then clears the room being left and commits the new
    /// coordinate. A cache miss at the destination creates the room
    /// remotely and enters the lock flow.
    pub async fn move_in(&mut self, direction: Direction) -> Result<MoveReport, MapError> {
        let (dx, dy) = direction.delta();
        let destination = self.current.offset(dx, dy);

        let extent = self.config.viewport_extent();
        self.events.emit(DungeonEvent::Scroll(ScrollTransition {
            offset: (dx as f32 * extent.0, dy as f32 * extent.1),
            duration_secs: self.config.scroll_secs(),
        }));
        self.clock.wait(self.config.scroll_secs()).await;
        if !self.liveness.is_alive() {
            return Ok(MoveReport::Aborted);
        }

        // Leaving always clears the room just left.
        if let Some(room) = self.cache.get_mut(&self.current) {
            room.cleared = true;
        }
        self.current = destination;

        if let Some(room) = self.cache.get(&destination) {
            // The live count starts at the room's surviving population;
            // cleared rooms spawn nothing.
            self.counter.seed(room.live_units().len());
            return Ok(MoveReport::Entered);
        }
        self.counter.reset();

        let id = self
            .store
            .create_room(CreateRoomRequest {
                coordinate: destination,
                width: self.config.room_width(),
                height: self.config.room_height(),
                owner_id: self.owner_id,
            })
            .await?;
        let room = self.store.fetch_room(id).await?;
        self.cache.insert(room.coordinate(), room);
        self.catalog_len += 1;

        self.lock = Some(RoomLock::new(id));
        info!(target: "hollowgrid::map", %id, %destination, "room created, locked");
        self.events.emit(DungeonEvent::RoomLockChanged { id, locked: true });
        Ok(MoveReport::CreatedLocked(id))
    }

    /// Whether the current room was created this visit and is still locked.
    pub fn room_locked(&self) -> bool {
        self.lock
            .as_ref()
            .map(|lock| lock.locked.load(Ordering::Acquire))
            .unwrap_or(false)
    }

    /// Attempt to quit the current room.
    ///
    /// Returns false while the room is locked. The first refused quit
    /// starts one background unlock; further quits re-evaluate the flag and
    /// succeed once the remote confirms. An unlock failure releases the
    /// latch so a later quit retries.
    pub fn try_quit(&mut self) -> bool {
        let Some(lock) = self.lock.as_ref() else {
            return true;
        };
        if !lock.locked.load(Ordering::Acquire) {
            return true;
        }
        if lock.unlocking.swap(true, Ordering::AcqRel) {
            return false;
        }

        let store = self.store.clone();
        let events = self.events.clone();
        let liveness = self.liveness.clone();
        let id = lock.id;
        let locked = Arc::clone(&lock.locked);
        let unlocking = Arc::clone(&lock.unlocking);
        tokio::spawn(async move {
            let result = store.unlock_room(id).await;
            if !liveness.is_alive() {
                return;
            }
            match result {
                Ok(()) => {
                    locked.store(false, Ordering::Release);
                    info!(target: "hollowgrid::map", %id, "room unlocked");
                    events.emit(DungeonEvent::RoomLockChanged { id, locked: false });
                }
                Err(err) => {
                    warn!(target: "hollowgrid::map", %id, error = %err, "unlock failed");
                    unlocking.store(false, Ordering::Release);
                }
            }
        });
        false
    }

    /// Fan out one independent persist per record, marking each uploaded on
    /// confirmation. The batch is complete only when every record has been
    /// uploaded; completion unlocks the room and fires the batch event.
    /// Already uploaded records are not re-sent, so a partial batch can be
    /// handed back in.
    pub async fn upload_units(
        &mut self,
        id: RoomId,
        records: &mut [UnitRecord],
    ) -> Result<bool, MapError> {
        let pending: Vec<usize> = records
            .iter()
            .enumerate()
            .filter(|(_, record)| !record.uploaded)
            .map(|(index, _)| index)
            .collect();

        let results = {
            let uploads = pending
                .iter()
                .map(|&index| self.store.create_unit(&records[index]));
            join_all(uploads).await
        };
        for (&index, result) in pending.iter().zip(results) {
            match result {
                Ok(()) => records[index].mark_uploaded(),
                Err(err) => {
                    warn!(target: "hollowgrid::map", %id, error = %err, "unit upload failed");
                }
            }
        }

        let complete = records.iter().all(|record| record.uploaded);
        if !complete {
            return Ok(false);
        }

        self.events.emit(DungeonEvent::UploadBatchComplete {
            id,
            units: records.len(),
        });
        if let Some(lock) = self.lock.as_ref() {
            if lock.id == id && lock.locked.load(Ordering::Acquire) {
                self.store.unlock_room(id).await?;
                lock.locked.store(false, Ordering::Release);
                info!(target: "hollowgrid::map", %id, "uploads confirmed, room unlocked");
                self.events.emit(DungeonEvent::RoomLockChanged { id, locked: false });
            }
        }
        Ok(true)
    }

    /// A unit in the current room died; decrements the live count.
    pub fn notify_unit_death(&mut self) -> usize {
        let remaining = self.counter.notify_death();
        self.events.emit(DungeonEvent::UnitDied {
            coordinate: self.current,
        });
        remaining
    }
}
