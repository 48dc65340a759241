use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Identifier the store assigns to a persisted room.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RoomId(pub i64);

impl fmt::Display for RoomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Integer grid coordinate of a room. The sole key into the room cache;
/// equality and hashing are exact-integer.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Coordinate {
    pub x: i32,
    pub y: i32,
}

impl Coordinate {
    pub const ORIGIN: Coordinate = Coordinate { x: 0, y: 0 };

    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    pub fn offset(self, dx: i32, dy: i32) -> Self {
        Self {
            x: self.x + dx,
            y: self.y + dy,
        }
    }
}

impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// One row of tile indices in a room's grid.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TileRow {
    #[serde(default)]
    pub tile: Vec<i32>,
}

/// A unit persisted in (or bound for) the remote store.
///
/// Wire positions are fixed-point: world position multiplied by
/// [`UnitRecord::POS_MULTIPLIER`] and floored.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct UnitRecord {
    #[serde(rename = "mapId", default)]
    pub room_id: i64,
    #[serde(rename = "powerLevel")]
    pub power_level: u32,
    #[serde(rename = "crystals")]
    pub crystal_value: u32,
    #[serde(rename = "x")]
    pub pos_x: i32,
    #[serde(rename = "y")]
    pub pos_y: i32,
    #[serde(rename = "ownerId", default = "default_owner_id")]
    pub owner_id: i64,
    #[serde(rename = "ownerName", default)]
    pub owner_name: String,
    #[serde(rename = "isUploaded", default)]
    pub uploaded: bool,
}

fn default_owner_id() -> i64 {
    -1
}

impl UnitRecord {
    pub const POS_MULTIPLIER: f32 = 1000.0;

    pub fn world_pos(&self) -> (f32, f32) {
        (
            self.pos_x as f32 / Self::POS_MULTIPLIER,
            self.pos_y as f32 / Self::POS_MULTIPLIER,
        )
    }

    /// Marks the record persisted. The flag is monotone: it never reverts.
    pub fn mark_uploaded(&mut self) {
        self.uploaded = true;
    }
}

impl fmt::Display for UnitRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "M{} L{} C{} ({}, {}) {} (#{})",
            self.room_id,
            self.power_level,
            self.crystal_value,
            self.pos_x,
            self.pos_y,
            self.owner_name,
            self.owner_id
        )
    }
}

/// Remote-sourced snapshot of a room.
///
/// Immutable once fetched except for `cleared`, which is set locally when
/// the room is exited in the direction that triggers departure.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RoomRecord {
    pub id: RoomId,
    pub x: i32,
    pub y: i32,
    #[serde(rename = "row", default)]
    pub rows: Vec<TileRow>,
    #[serde(rename = "enemyList", default)]
    pub units: Vec<UnitRecord>,
    #[serde(default)]
    pub cleared: bool,
}

impl RoomRecord {
    pub fn coordinate(&self) -> Coordinate {
        Coordinate::new(self.x, self.y)
    }

    pub fn height(&self) -> usize {
        self.rows.len()
    }

    pub fn width(&self) -> usize {
        self.rows.first().map(|row| row.tile.len()).unwrap_or(0)
    }

    /// Units that still populate the room. Cleared rooms spawn nothing.
    pub fn live_units(&self) -> &[UnitRecord] {
        if self.cleared {
            &[]
        } else {
            &self.units
        }
    }
}

/// Identity payload returned by the player endpoint.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PlayerPayload {
    #[serde(default = "default_owner_id")]
    pub id: i64,
    #[serde(default = "default_player_name")]
    pub name: String,
}

fn default_player_name() -> String {
    "No One".to_string()
}

/// Error raised when a response body does not match the endpoint's shape.
#[derive(Debug, Error)]
pub enum PayloadError {
    #[error("catalog body is empty")]
    EmptyCatalog,
    #[error("expected integer, got '{value}'")]
    InvalidInt { value: String },
    #[error("expected lock flag '0' or '1', got '{value}'")]
    InvalidFlag { value: String },
    #[error("json decode failed: {0}")]
    Json(#[from] serde_json::Error),
}

/// Parse the room-id catalog: a comma-separated integer list.
///
/// Any unparsable entry aborts the whole catalog; callers must not
/// partially populate from a malformed response.
pub fn parse_catalog(body: &str) -> Result<Vec<RoomId>, PayloadError> {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return Err(PayloadError::EmptyCatalog);
    }
    let mut ids = Vec::new();
    for entry in trimmed.split(',') {
        let value = entry.trim();
        let id = value.parse::<i64>().map_err(|_| PayloadError::InvalidInt {
            value: value.to_string(),
        })?;
        ids.push(RoomId(id));
    }
    Ok(ids)
}

/// Parse a single integer body (room creation returns the new id).
pub fn parse_room_id(body: &str) -> Result<RoomId, PayloadError> {
    let value = body.trim();
    value
        .parse::<i64>()
        .map(RoomId)
        .map_err(|_| PayloadError::InvalidInt {
            value: value.to_string(),
        })
}

/// Parse a `"1"`/`"0"` lock-check body into the raw flag bit.
pub fn parse_lock_flag(body: &str) -> Result<bool, PayloadError> {
    match body.trim() {
        "1" => Ok(true),
        "0" => Ok(false),
        other => Err(PayloadError::InvalidFlag {
            value: other.to_string(),
        }),
    }
}

/// Parse a JSON room payload.
pub fn parse_room(body: &str) -> Result<RoomRecord, PayloadError> {
    Ok(serde_json::from_str(body)?)
}

/// Parse a JSON player payload.
pub fn parse_player(body: &str) -> Result<PlayerPayload, PayloadError> {
    Ok(serde_json::from_str(body)?)
}
