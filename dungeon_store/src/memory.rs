use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use futures::future::BoxFuture;
use futures::FutureExt;
use serde_json::json;

use dungeon_proto::{RoomId, RoomRecord, TileRow, UnitRecord};

use crate::error::TransportError;
use crate::transport::StoreTransport;

/// In-memory stand-in for the remote store, speaking the same wire bodies
/// as the production backend. Used by unit and integration tests; failures
/// are scriptable per page.
///
/// Cloning yields a handle onto the same state, so tests can keep inspecting
/// the store after handing a clone to the client.
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<Inner>>,
}

#[derive(Default)]
struct Inner {
    rooms: HashMap<i64, RoomRecord>,
    locked: HashMap<i64, bool>,
    next_room_id: i64,
    next_player_id: i64,
    request_counts: HashMap<&'static str, u32>,
    transport_failures: HashMap<&'static str, u32>,
    body_failures: HashMap<&'static str, (String, u32)>,
}

impl MemoryStore {
    pub fn new() -> Self {
        let store = Self::default();
        {
            let mut inner = store.inner.lock().expect("memory store mutex poisoned");
            inner.next_room_id = 1;
            inner.next_player_id = 1;
        }
        store
    }

    /// Another handle onto the same store state.
    pub fn handle(&self) -> Self {
        self.clone()
    }

    pub fn insert_room(&self, room: RoomRecord) {
        let mut inner = self.inner.lock().expect("memory store mutex poisoned");
        inner.next_room_id = inner.next_room_id.max(room.id.0 + 1);
        inner.rooms.insert(room.id.0, room);
    }

    pub fn lock_room(&self, id: RoomId) {
        let mut inner = self.inner.lock().expect("memory store mutex poisoned");
        inner.locked.insert(id.0, true);
    }

    pub fn unlock_room(&self, id: RoomId) {
        let mut inner = self.inner.lock().expect("memory store mutex poisoned");
        inner.locked.insert(id.0, false);
    }

    pub fn is_locked(&self, id: RoomId) -> bool {
        let inner = self.inner.lock().expect("memory store mutex poisoned");
        inner.locked.get(&id.0).copied().unwrap_or(false)
    }

    pub fn room(&self, id: RoomId) -> Option<RoomRecord> {
        let inner = self.inner.lock().expect("memory store mutex poisoned");
        inner.rooms.get(&id.0).cloned()
    }

    /// Units persisted into a room via the create-unit endpoint.
    pub fn units_in(&self, id: RoomId) -> Vec<UnitRecord> {
        self.room(id).map(|room| room.units).unwrap_or_default()
    }

    pub fn request_count(&self, page: &'static str) -> u32 {
        let inner = self.inner.lock().expect("memory store mutex poisoned");
        inner.request_counts.get(page).copied().unwrap_or(0)
    }

    /// Fail the next `times` requests to `page` at the transport level.
    pub fn fail_transport(&self, page: &'static str, times: u32) {
        let mut inner = self.inner.lock().expect("memory store mutex poisoned");
        inner.transport_failures.insert(page, times);
    }

    /// Answer the next `times` requests to `page` with a fixed body.
    pub fn fail_with_body(&self, page: &'static str, body: &str, times: u32) {
        let mut inner = self.inner.lock().expect("memory store mutex poisoned");
        inner.body_failures.insert(page, (body.to_string(), times));
    }

    fn respond(
        &self,
        page: &'static str,
        params: Vec<(&'static str, String)>,
    ) -> Result<String, TransportError> {
        let mut inner = self.inner.lock().expect("memory store mutex poisoned");
        *inner.request_counts.entry(page).or_insert(0) += 1;

        if let Some(remaining) = inner.transport_failures.get_mut(page) {
            if *remaining > 0 {
                *remaining -= 1;
                return Err(TransportError::Request("scripted failure".to_string()));
            }
        }
        if let Some((body, remaining)) = inner.body_failures.get_mut(page) {
            if *remaining > 0 {
                *remaining -= 1;
                return Ok(body.clone());
            }
        }

        Ok(inner.dispatch(page, &params))
    }
}

impl Inner {
    fn dispatch(&mut self, page: &str, params: &[(&'static str, String)]) -> String {
        match page {
            "get_map_id_list.php" => {
                let mut ids: Vec<i64> = self.rooms.keys().copied().collect();
                ids.sort_unstable();
                ids.iter()
                    .map(|id| id.to_string())
                    .collect::<Vec<_>>()
                    .join(",")
            }
            "get_map.php" => match param(params, "id") {
                Some(id) => match id.parse::<i64>().ok().and_then(|id| self.rooms.get(&id)) {
                    Some(room) => serde_json::to_string(room)
                        .unwrap_or_else(|_| "ERR encode failed".to_string()),
                    None => "ERR no such map".to_string(),
                },
                // Coordinate probe: a locked or missing room is withheld as "0".
                None => match self.room_at(params) {
                    Some(room) if !self.locked.get(&room.id.0).copied().unwrap_or(false) => {
                        room.id.to_string()
                    }
                    _ => "0".to_string(),
                },
            },
            "create_map.php" => {
                let x = int_param(params, "x");
                let y = int_param(params, "y");
                let width = int_param(params, "width").max(1) as usize;
                let height = int_param(params, "height").max(1) as usize;
                let id = self.next_room_id;
                self.next_room_id += 1;
                let room = RoomRecord {
                    id: RoomId(id),
                    x: x as i32,
                    y: y as i32,
                    rows: vec![
                        TileRow {
                            tile: vec![0; width],
                        };
                        height
                    ],
                    units: Vec::new(),
                    cleared: false,
                };
                self.rooms.insert(id, room);
                self.locked.insert(id, true);
                id.to_string()
            }
            "create_enemy.php" => {
                let room_id = int_param(params, "map_id");
                match self.rooms.get_mut(&room_id) {
                    Some(room) => {
                        room.units.push(UnitRecord {
                            room_id,
                            power_level: int_param(params, "power_level") as u32,
                            crystal_value: int_param(params, "crystals") as u32,
                            pos_x: int_param(params, "x") as i32,
                            pos_y: int_param(params, "y") as i32,
                            owner_id: int_param(params, "owner_id"),
                            owner_name: String::new(),
                            uploaded: true,
                        });
                        "OK".to_string()
                    }
                    None => "ERR no such map".to_string(),
                }
            }
            "is_map_locked.php" => match self.room_at(params) {
                Some(room) if self.locked.get(&room.id.0).copied().unwrap_or(false) => {
                    "1".to_string()
                }
                _ => "0".to_string(),
            },
            "unlock_map.php" => {
                let id = int_param(params, "id");
                if self.rooms.contains_key(&id) {
                    self.locked.insert(id, false);
                    "OK".to_string()
                } else {
                    "ERR no such map".to_string()
                }
            }
            "create_player.php" => {
                let id = self.next_player_id;
                self.next_player_id += 1;
                json!({ "id": id, "name": format!("Wanderer {id}") }).to_string()
            }
            _ => "ERR unknown page".to_string(),
        }
    }

    fn room_at(&self, params: &[(&'static str, String)]) -> Option<&RoomRecord> {
        let x = int_param(params, "x") as i32;
        let y = int_param(params, "y") as i32;
        self.rooms
            .values()
            .find(|room| room.x == x && room.y == y)
    }
}

fn param<'a>(params: &'a [(&'static str, String)], key: &str) -> Option<&'a str> {
    params
        .iter()
        .find(|(name, _)| *name == key)
        .map(|(_, value)| value.as_str())
}

fn int_param(params: &[(&'static str, String)], key: &str) -> i64 {
    param(params, key)
        .and_then(|value| value.parse().ok())
        .unwrap_or(-1)
}

impl StoreTransport for MemoryStore {
    fn fetch(
        &self,
        page: &'static str,
        params: Vec<(&'static str, String)>,
    ) -> BoxFuture<'_, Result<String, TransportError>> {
        let result = self.respond(page, params);
        async move { result }.boxed()
    }
}
