use tracing::info;

use dungeon_store::{RemoteStore, StoreError};

/// What the participant does in the dungeon. The role decides which lock
/// probe the exit monitor uses: architects ask the lock endpoint directly,
/// raiders probe whether the store is willing to hand the room out at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Architect,
    Raider,
}

/// Local player identity, minted by the remote store at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayerProfile {
    pub id: i64,
    pub name: String,
    pub role: Role,
}

impl PlayerProfile {
    pub async fn fetch(store: &RemoteStore, role: Role) -> Result<Self, StoreError> {
        let payload = store.create_player().await?;
        info!(
            target: "hollowgrid::player",
            id = payload.id,
            name = %payload.name,
            ?role,
            "player identity ready"
        );
        Ok(Self {
            id: payload.id,
            name: payload.name,
            role,
        })
    }
}
