mod common;

use std::sync::Arc;

use dungeon_core::{Direction, DungeonEvent, ExitMonitor, MoveReport, Role};
use dungeon_proto::Coordinate;
use dungeon_store::RemoteStore;

#[tokio::test]
async fn quitting_a_locked_room_waits_for_the_background_unlock() {
    common::init_tracing();
    let memory = common::seeded_store(1);
    let (mut graph, events) = common::graph_over(&memory, 1);
    graph.load_all().await.unwrap();

    let room_id = match graph.move_in(Direction::South).await.unwrap() {
        MoveReport::CreatedLocked(id) => id,
        other => panic!("expected a freshly created room, got {other:?}"),
    };

    // Repeated quits while locked start exactly one unlock request.
    assert!(!graph.try_quit());
    assert!(!graph.try_quit());
    let mut quit = false;
    for _ in 0..100 {
        tokio::task::yield_now().await;
        if graph.try_quit() {
            quit = true;
            break;
        }
    }
    assert!(quit);
    assert_eq!(memory.request_count("unlock_map.php"), 1);
    assert!(!memory.is_locked(room_id));

    let unlock = events
        .try_iter()
        .find(|event| matches!(event, DungeonEvent::RoomLockChanged { locked: false, .. }));
    assert_eq!(
        unlock,
        Some(DungeonEvent::RoomLockChanged {
            id: room_id,
            locked: false
        })
    );
}

#[tokio::test]
async fn architects_and_raiders_read_the_same_lock_differently() {
    common::init_tracing();
    let memory = common::seeded_store(2);
    memory.lock_room(dungeon_proto::RoomId(2));

    let (architect_events, _arch_rx) = dungeon_core::event_channel();
    let mut architect = ExitMonitor::new(
        RemoteStore::new(Arc::new(memory.handle())),
        Role::Architect,
        architect_events,
    );
    let (raider_events, _raid_rx) = dungeon_core::event_channel();
    let mut raider = ExitMonitor::new(
        RemoteStore::new(Arc::new(memory.handle())),
        Role::Raider,
        raider_events,
    );

    // Room 2 sits east of the origin and is locked: both roles agree.
    assert!(architect
        .check(Coordinate::ORIGIN, Direction::East)
        .await
        .unwrap());
    assert!(raider
        .check(Coordinate::ORIGIN, Direction::East)
        .await
        .unwrap());

    // An empty cell differs: the architect's lock endpoint says "not
    // locked", while the raider's presence probe withholds it.
    assert!(!architect
        .check(Coordinate::ORIGIN, Direction::West)
        .await
        .unwrap());
    assert!(raider
        .check(Coordinate::ORIGIN, Direction::West)
        .await
        .unwrap());
}

#[tokio::test]
async fn exit_notifications_fire_on_transitions_only() {
    common::init_tracing();
    let memory = common::seeded_store(2);
    memory.lock_room(dungeon_proto::RoomId(2));

    let (events, receiver) = dungeon_core::event_channel();
    let mut monitor = ExitMonitor::new(
        RemoteStore::new(Arc::new(memory.handle())),
        Role::Architect,
        events,
    );
    monitor.set_continuous(Direction::East, true);

    for _ in 0..3 {
        monitor.poll_continuous(Coordinate::ORIGIN).await.unwrap();
    }
    assert_eq!(receiver.try_iter().count(), 1);

    memory.unlock_room(dungeon_proto::RoomId(2));
    monitor.poll_continuous(Coordinate::ORIGIN).await.unwrap();
    assert_eq!(
        receiver.try_recv().unwrap(),
        DungeonEvent::ExitLockChanged {
            direction: Direction::East,
            locked: false
        }
    );
}
