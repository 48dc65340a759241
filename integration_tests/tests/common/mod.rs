#![allow(dead_code)]

use std::sync::{Arc, Once};

use crossbeam_channel::Receiver;
use dungeon_core::{event_channel, DungeonEvent, MapGraph, NullClock};
use dungeon_proto::{RoomId, RoomRecord};
use dungeon_store::{MemoryStore, RemoteStore};

static INIT: Once = Once::new();

pub fn init_tracing() {
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

/// Memory store seeded with `count` rooms in a west-to-east strip from the
/// origin.
pub fn seeded_store(count: i64) -> MemoryStore {
    let store = MemoryStore::new();
    for i in 0..count {
        store.insert_room(RoomRecord {
            id: RoomId(i + 1),
            x: i as i32,
            y: 0,
            ..Default::default()
        });
    }
    store
}

pub fn graph_over(memory: &MemoryStore, owner_id: i64) -> (MapGraph, Receiver<DungeonEvent>) {
    let (events, receiver) = event_channel();
    let config = dungeon_core::ClientConfig::default();
    let graph = MapGraph::new(
        RemoteStore::new(Arc::new(memory.handle())),
        config.map().clone(),
        events,
        Arc::new(NullClock),
        owner_id,
    );
    (graph, receiver)
}
