//! Wire-level types for the Hollowgrid dungeon store.
//!
//! The remote store speaks a small GET-style protocol: every endpoint is a
//! page name plus a fixed set of key/value parameters, and every response is
//! a plain-text or JSON body. This crate owns the payload structures and one
//! typed request builder per endpoint; it performs no I/O.

mod payload;
mod request;

pub use payload::{
    parse_catalog, parse_lock_flag, parse_player, parse_room, parse_room_id, Coordinate,
    PayloadError, PlayerPayload, RoomId, RoomRecord, TileRow, UnitRecord,
};
pub use request::{
    CatalogRequest, CreatePlayerRequest, CreateRoomRequest, CreateUnitRequest, FetchRoomRequest,
    LockCheckRequest, ProbeRoomRequest, StoreRequest, UnlockRoomRequest,
};
