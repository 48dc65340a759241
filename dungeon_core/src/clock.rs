use std::time::Duration;

use futures::future::BoxFuture;
use futures::FutureExt;

/// Unscaled-time wait seam. Scroll transitions and other fixed-duration
/// waits go through this so tests can skip them and a paused presentation
/// never stretches them.
pub trait Clock: Send + Sync {
    fn wait(&self, secs: f64) -> BoxFuture<'_, ()>;
}

/// Real wall-clock waits via the tokio timer.
pub struct WallClock;

impl Clock for WallClock {
    fn wait(&self, secs: f64) -> BoxFuture<'_, ()> {
        tokio::time::sleep(Duration::from_secs_f64(secs.max(0.0))).boxed()
    }
}

/// Clock whose waits complete immediately. For tests.
pub struct NullClock;

impl Clock for NullClock {
    fn wait(&self, _secs: f64) -> BoxFuture<'_, ()> {
        async {}.boxed()
    }
}
