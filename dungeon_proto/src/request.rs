use crate::payload::{Coordinate, RoomId, UnitRecord};

/// A typed request against one store endpoint.
///
/// Each endpoint has a fixed page name and a fixed parameter set; the
/// transport serializes the pairs as query parameters and appends the shared
/// database selector and auth token.
pub trait StoreRequest {
    const PAGE: &'static str;

    fn params(&self) -> Vec<(&'static str, String)>;
}

/// Fetch the catalog of known room ids.
#[derive(Debug, Clone, Copy, Default)]
pub struct CatalogRequest;

impl StoreRequest for CatalogRequest {
    const PAGE: &'static str = "get_map_id_list.php";

    fn params(&self) -> Vec<(&'static str, String)> {
        Vec::new()
    }
}

/// Fetch a room payload by id.
#[derive(Debug, Clone, Copy)]
pub struct FetchRoomRequest {
    pub id: RoomId,
}

impl StoreRequest for FetchRoomRequest {
    const PAGE: &'static str = "get_map.php";

    fn params(&self) -> Vec<(&'static str, String)> {
        vec![("id", self.id.to_string())]
    }
}

/// Probe whether a room exists at a coordinate.
///
/// Same page as [`FetchRoomRequest`] but keyed by coordinate; the raider-side
/// exit probe reads the body `"0"` as "nothing raidable there yet".
#[derive(Debug, Clone, Copy)]
pub struct ProbeRoomRequest {
    pub coordinate: Coordinate,
}

impl StoreRequest for ProbeRoomRequest {
    const PAGE: &'static str = "get_map.php";

    fn params(&self) -> Vec<(&'static str, String)> {
        vec![
            ("x", self.coordinate.x.to_string()),
            ("y", self.coordinate.y.to_string()),
        ]
    }
}

/// Create a room at a coordinate. The store answers with the new room id.
#[derive(Debug, Clone, Copy)]
pub struct CreateRoomRequest {
    pub coordinate: Coordinate,
    pub width: u32,
    pub height: u32,
    pub owner_id: i64,
}

impl StoreRequest for CreateRoomRequest {
    const PAGE: &'static str = "create_map.php";

    fn params(&self) -> Vec<(&'static str, String)> {
        vec![
            ("x", self.coordinate.x.to_string()),
            ("y", self.coordinate.y.to_string()),
            ("width", self.width.to_string()),
            ("height", self.height.to_string()),
            ("owner_id", self.owner_id.to_string()),
        ]
    }
}

/// Persist one unit record.
#[derive(Debug, Clone)]
pub struct CreateUnitRequest {
    pub room_id: i64,
    pub power_level: u32,
    pub crystals: u32,
    pub x: i32,
    pub y: i32,
    pub owner_id: i64,
}

impl CreateUnitRequest {
    pub fn from_record(record: &UnitRecord) -> Self {
        Self {
            room_id: record.room_id,
            power_level: record.power_level,
            crystals: record.crystal_value,
            x: record.pos_x,
            y: record.pos_y,
            owner_id: record.owner_id,
        }
    }
}

impl StoreRequest for CreateUnitRequest {
    const PAGE: &'static str = "create_enemy.php";

    fn params(&self) -> Vec<(&'static str, String)> {
        vec![
            ("map_id", self.room_id.to_string()),
            ("power_level", self.power_level.to_string()),
            ("crystals", self.crystals.to_string()),
            ("x", self.x.to_string()),
            ("y", self.y.to_string()),
            ("owner_id", self.owner_id.to_string()),
        ]
    }
}

/// Ask whether the room at a coordinate is locked (`"1"` = locked).
#[derive(Debug, Clone, Copy)]
pub struct LockCheckRequest {
    pub coordinate: Coordinate,
}

impl StoreRequest for LockCheckRequest {
    const PAGE: &'static str = "is_map_locked.php";

    fn params(&self) -> Vec<(&'static str, String)> {
        vec![
            ("x", self.coordinate.x.to_string()),
            ("y", self.coordinate.y.to_string()),
        ]
    }
}

/// Release the remote lock on a room.
#[derive(Debug, Clone, Copy)]
pub struct UnlockRoomRequest {
    pub id: RoomId,
}

impl StoreRequest for UnlockRoomRequest {
    const PAGE: &'static str = "unlock_map.php";

    fn params(&self) -> Vec<(&'static str, String)> {
        vec![("id", self.id.to_string())]
    }
}

/// Create (or fetch) the local player identity.
#[derive(Debug, Clone, Copy, Default)]
pub struct CreatePlayerRequest;

impl StoreRequest for CreatePlayerRequest {
    const PAGE: &'static str = "create_player.php";

    fn params(&self) -> Vec<(&'static str, String)> {
        Vec::new()
    }
}
