//! Client-side coordinator for the Hollowgrid shared dungeon.
//!
//! Three pieces carry the real invariants: the denomination engine that
//! decomposes crystal amounts exactly, the room economy that drains the
//! shared pool into draft units, and the map graph that synchronizes the
//! coordinate-keyed room cache and the per-room lock protocol with the
//! remote store.

pub mod clock;
pub mod config;
pub mod crystal;
pub mod denomination;
pub mod economy;
pub mod events;
pub mod exit;
pub mod liveness;
pub mod map;
pub mod player;

pub use clock::{Clock, NullClock, WallClock};
pub use config::{ClientConfig, ClientConfigError};
pub use crystal::{Crystal, CrystalField, CrystalId};
pub use denomination::{DenominationError, DenominationSet, DenominationValue};
pub use economy::{
    CrystalPool, DraftUnit, EscortCrystal, PowerCurve, RoomSession, SpawnOutcome, TickOutcome,
};
pub use events::{event_channel, DungeonEvent, EventSender, ScrollTransition};
pub use exit::ExitMonitor;
pub use liveness::Liveness;
pub use map::{Direction, MapError, MapGraph, MoveReport, UnitCounter};
pub use player::{PlayerProfile, Role};
