//! Scripted expedition against a dungeon store: load the map, step into an
//! uncharted cell, build a unit, upload it, and quit once the lock clears.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::{Parser, ValueEnum};
use tracing::info;

use dungeon_core::{
    ClientConfig, CrystalPool, Direction, DungeonEvent, MapGraph, MoveReport, PlayerProfile, Role,
    RoomSession, SpawnOutcome, TickOutcome, WallClock,
};
use dungeon_proto::{Coordinate, RoomId, RoomRecord};
use dungeon_store::{FixedBackoff, HttpTransport, MemoryStore, RemoteStore, StoreConfig};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum CliRole {
    Architect,
    Raider,
}

impl From<CliRole> for Role {
    fn from(role: CliRole) -> Self {
        match role {
            CliRole::Architect => Role::Architect,
            CliRole::Raider => Role::Raider,
        }
    }
}

#[derive(Parser, Debug)]
#[command(author, version, about = "Hollowgrid dungeon expedition", long_about = None)]
struct Cli {
    /// Root URL of the remote dungeon store.
    #[arg(long, default_value = "http://localhost/hollowgrid")]
    base_url: String,
    /// Database selector sent with every request.
    #[arg(long, default_value = "hollowgrid")]
    db: String,
    /// Auth token sent with every request.
    #[arg(long, default_value = "dev")]
    token: String,
    /// Optional JSON config overriding the built-in defaults.
    #[arg(long)]
    config: Option<PathBuf>,
    /// Participant role; selects which lock probe the exits use.
    #[arg(long, value_enum, default_value_t = CliRole::Architect)]
    role: CliRole,
    /// Run against an in-memory store instead of the remote one.
    #[arg(long)]
    memory: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .compact()
        .init();

    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => ClientConfig::from_file(path)
            .with_context(|| format!("loading config from {}", path.display()))?,
        None => ClientConfig::default(),
    };
    // Fail fast on a denomination set that cannot decompose exactly.
    let denominations = config.crystal().denominations()?;

    let store = if cli.memory {
        let memory = MemoryStore::new();
        memory.insert_room(RoomRecord {
            id: RoomId(1),
            ..Default::default()
        });
        RemoteStore::new(Arc::new(memory))
    } else {
        let transport = HttpTransport::new(StoreConfig::new(cli.base_url, cli.db, cli.token));
        RemoteStore::new(Arc::new(transport)).with_retry(Arc::new(FixedBackoff {
            delay: Duration::from_millis(500),
            max_retries: 3,
        }))
    };

    let player = PlayerProfile::fetch(&store, cli.role.into()).await?;

    let (events, receiver) = dungeon_core::event_channel();
    std::thread::spawn(move || {
        for event in receiver {
            match event {
                DungeonEvent::Scroll(scroll) => {
                    info!(target: "hollowgrid::events", offset = ?scroll.offset, "scrolling")
                }
                other => info!(target: "hollowgrid::events", event = ?other, "event"),
            }
        }
    });

    let mut graph = MapGraph::new(
        store,
        config.map().clone(),
        events,
        Arc::new(WallClock),
        player.id,
    );

    if !graph.load_all().await? {
        bail!("map did not finish loading; aborting the expedition");
    }
    graph.go_to(Coordinate::ORIGIN);

    let report = graph.move_in(Direction::East).await?;
    let room_id = match report {
        MoveReport::CreatedLocked(id) => id,
        MoveReport::Entered => {
            info!(target: "hollowgrid::map", "room already charted, nothing to build");
            return Ok(());
        }
        MoveReport::Aborted => bail!("move aborted"),
    };

    let mut pool = CrystalPool::new(config.economy().starting_crystals());
    let mut session = RoomSession::new(config.economy().clone(), denominations);
    let outcome = session.start((0.0, 0.0), true, false, &mut pool, graph.counter());
    if outcome != SpawnOutcome::Started {
        bail!("build session refused to start: {outcome:?}");
    }

    let tick = Duration::from_millis(100);
    loop {
        tokio::time::sleep(tick).await;
        match session.tick(tick.as_secs_f64(), &mut pool, graph.counter()) {
            TickOutcome::Exhausted | TickOutcome::Idle => break,
            TickOutcome::Draining => {}
        }
        // Stop while the pool can still seed the next expedition.
        if pool.balance() < config.economy().starting_crystals() as f64 / 2.0 {
            session.finish(&mut pool, graph.counter());
            break;
        }
    }

    let mut records = session.finalize_units(room_id, player.id, &player.name);
    info!(target: "hollowgrid::economy", units = records.len(), pool = pool.balance(), "session finalized");
    if !graph.upload_units(room_id, &mut records).await? {
        bail!("upload batch did not complete");
    }

    while !graph.try_quit() {
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    info!(target: "hollowgrid::map", %room_id, "expedition complete");
    Ok(())
}
