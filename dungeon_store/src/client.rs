use std::sync::Arc;

use tracing::{debug, warn};

use dungeon_proto::{
    parse_catalog, parse_lock_flag, parse_player, parse_room, parse_room_id, CatalogRequest,
    Coordinate, CreatePlayerRequest, CreateRoomRequest, CreateUnitRequest, FetchRoomRequest,
    LockCheckRequest, PlayerPayload, ProbeRoomRequest, RoomId, RoomRecord, StoreRequest,
    UnitRecord, UnlockRoomRequest,
};

use crate::error::StoreError;
use crate::retry::{NoRetry, RetryPolicy};
use crate::transport::StoreTransport;

/// What the coordinate probe found at an adjacent cell.
///
/// The raider-side exit check treats [`RoomProbe::Withheld`] as a locked
/// exit: the store answers `"0"` when there is nothing raidable there.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoomProbe {
    Withheld,
    Available,
}

/// Typed client over the store transport. One method per endpoint.
#[derive(Clone)]
pub struct RemoteStore {
    transport: Arc<dyn StoreTransport>,
    retry: Arc<dyn RetryPolicy>,
}

impl RemoteStore {
    pub fn new(transport: Arc<dyn StoreTransport>) -> Self {
        Self {
            transport,
            retry: Arc::new(NoRetry),
        }
    }

    pub fn with_retry(mut self, retry: Arc<dyn RetryPolicy>) -> Self {
        self.retry = retry;
        self
    }

    /// Fetch the comma-separated room-id catalog.
    pub async fn catalog(&self) -> Result<Vec<RoomId>, StoreError> {
        let body = self.request(&CatalogRequest).await?;
        parse_catalog(&body).map_err(|err| StoreError::malformed(CatalogRequest::PAGE, err))
    }

    /// Fetch one room payload by id.
    pub async fn fetch_room(&self, id: RoomId) -> Result<RoomRecord, StoreError> {
        let body = self.request(&FetchRoomRequest { id }).await?;
        parse_room(&body).map_err(|err| StoreError::malformed(FetchRoomRequest::PAGE, err))
    }

    /// Create a room; the store answers with the new room id.
    pub async fn create_room(&self, request: CreateRoomRequest) -> Result<RoomId, StoreError> {
        let body = self.request(&request).await?;
        let id = parse_room_id(&body)
            .map_err(|err| StoreError::malformed(CreateRoomRequest::PAGE, err))?;
        debug!(target: "hollowgrid::store", %id, "room created");
        Ok(id)
    }

    /// Persist one unit record. The success body is opaque.
    pub async fn create_unit(&self, record: &UnitRecord) -> Result<(), StoreError> {
        self.request(&CreateUnitRequest::from_record(record))
            .await?;
        Ok(())
    }

    /// Architect-side lock check: the body is `"1"` when the room at the
    /// coordinate is locked.
    pub async fn check_room_locked(&self, coordinate: Coordinate) -> Result<bool, StoreError> {
        let body = self.request(&LockCheckRequest { coordinate }).await?;
        parse_lock_flag(&body).map_err(|err| StoreError::malformed(LockCheckRequest::PAGE, err))
    }

    /// Raider-side presence probe: the body is `"0"` when the store withholds
    /// the room at the coordinate.
    pub async fn probe_room_presence(
        &self,
        coordinate: Coordinate,
    ) -> Result<RoomProbe, StoreError> {
        let body = self.request(&ProbeRoomRequest { coordinate }).await?;
        if body.trim() == "0" {
            Ok(RoomProbe::Withheld)
        } else {
            Ok(RoomProbe::Available)
        }
    }

    /// Release the remote lock on a room.
    pub async fn unlock_room(&self, id: RoomId) -> Result<(), StoreError> {
        self.request(&UnlockRoomRequest { id }).await?;
        Ok(())
    }

    /// Create (or fetch) the local player identity.
    pub async fn create_player(&self) -> Result<PlayerPayload, StoreError> {
        let body = self.request(&CreatePlayerRequest).await?;
        parse_player(&body).map_err(|err| StoreError::malformed(CreatePlayerRequest::PAGE, err))
    }

    /// Issue one request, applying the retry policy to transport failures
    /// only. An empty or `ERR`-prefixed body is the store's answer and is
    /// surfaced as [`StoreError::Api`] without retrying.
    async fn request<R: StoreRequest>(&self, request: &R) -> Result<String, StoreError> {
        let mut attempt = 0u32;
        loop {
            match self.transport.fetch(R::PAGE, request.params()).await {
                Ok(body) => {
                    let trimmed = body.trim();
                    if trimmed.is_empty() || trimmed.starts_with("ERR") {
                        let error = StoreError::Api {
                            page: R::PAGE,
                            body: trimmed.to_string(),
                        };
                        warn!(target: "hollowgrid::store", page = R::PAGE, %error, "store rejected request");
                        return Err(error);
                    }
                    return Ok(trimmed.to_string());
                }
                Err(err) => {
                    attempt += 1;
                    match self.retry.backoff(attempt) {
                        Some(delay) => {
                            warn!(
                                target: "hollowgrid::store",
                                page = R::PAGE,
                                attempt,
                                error = %err,
                                "transport failed; retrying"
                            );
                            tokio::time::sleep(delay).await;
                        }
                        None => {
                            warn!(target: "hollowgrid::store", page = R::PAGE, error = %err, "transport failed");
                            return Err(StoreError::Transport(err));
                        }
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use super::*;
    use crate::memory::MemoryStore;
    use crate::retry::FixedBackoff;

    fn store_with(memory: MemoryStore) -> RemoteStore {
        RemoteStore::new(Arc::new(memory))
    }

    #[tokio::test]
    async fn err_bodies_become_api_errors_without_retry() {
        let memory = MemoryStore::new();
        memory.fail_with_body(CatalogRequest::PAGE, "ERR bad token", 10);
        let store = store_with(memory);
        let result = store.catalog().await;
        assert!(matches!(result, Err(StoreError::Api { page, .. }) if page == CatalogRequest::PAGE));
    }

    #[tokio::test(start_paused = true)]
    async fn transport_failures_respect_the_retry_budget() {
        let memory = MemoryStore::new();
        memory.insert_room(RoomRecord {
            id: RoomId(1),
            x: 0,
            y: 0,
            ..Default::default()
        });
        memory.fail_transport(CatalogRequest::PAGE, 2);
        let handle = memory.handle();

        let store = store_with(memory).with_retry(Arc::new(FixedBackoff {
            delay: Duration::from_millis(5),
            max_retries: 3,
        }));

        let ids = store.catalog().await.expect("third attempt should succeed");
        assert_eq!(ids, vec![RoomId(1)]);
        assert_eq!(handle.request_count(CatalogRequest::PAGE), 3);
    }

    #[tokio::test]
    async fn probe_reads_zero_bodies_as_withheld() {
        let memory = MemoryStore::new();
        memory.insert_room(RoomRecord {
            id: RoomId(7),
            x: 2,
            y: 3,
            ..Default::default()
        });
        let store = store_with(memory);

        let present = store
            .probe_room_presence(Coordinate::new(2, 3))
            .await
            .unwrap();
        assert_eq!(present, RoomProbe::Available);

        let absent = store
            .probe_room_presence(Coordinate::new(9, 9))
            .await
            .unwrap();
        assert_eq!(absent, RoomProbe::Withheld);
    }
}
