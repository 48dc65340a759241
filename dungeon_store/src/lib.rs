//! Remote store boundary for the Hollowgrid dungeon client.
//!
//! All remote state lives behind [`RemoteStore`], which issues the typed
//! requests defined in `dungeon_proto` through a [`StoreTransport`]. The
//! production transport is HTTP ([`HttpTransport`]); tests and offline runs
//! use the scriptable [`MemoryStore`]. Failure policy is uniform: one log
//! line with endpoint context and the single operation aborted. Retrying
//! transient transport failures is the caller's choice via [`RetryPolicy`].

mod client;
mod error;
mod memory;
mod retry;
mod transport;

pub use client::{RemoteStore, RoomProbe};
pub use error::{StoreError, TransportError};
pub use memory::MemoryStore;
pub use retry::{FixedBackoff, NoRetry, RetryPolicy};
pub use transport::{HttpTransport, StoreConfig, StoreTransport};
