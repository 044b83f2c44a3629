use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use tokio_util::sync::CancellationToken;

/// Source of wall-clock time in epoch milliseconds.
///
/// The kernel never reads the system clock directly; everything goes through
/// a shared `Clock` so tests can drive time by hand.
pub trait Clock: Send + Sync {
    fn now_ms(&self) -> u64;
}

/// Production clock backed by the system time.
#[derive(Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_ms(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis() as u64
    }
}

/// Clock advanced explicitly by the caller, for tests.
#[derive(Debug)]
pub struct ManualClock {
    now_ms: AtomicU64,
}

impl ManualClock {
    pub fn new(start_ms: u64) -> Self {
        Self {
            now_ms: AtomicU64::new(start_ms),
        }
    }

    pub fn advance_ms(&self, delta: u64) {
        self.now_ms.fetch_add(delta, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> u64 {
        self.now_ms.load(Ordering::SeqCst)
    }
}

/// Run `tick` every `interval` on a spawned task until the returned token is
/// cancelled. Ticks never overlap: the next one waits for the previous to
/// return.
pub fn schedule<F>(name: &'static str, interval: Duration, mut tick: F) -> CancellationToken
where
    F: FnMut() + Send + 'static,
{
    let token = CancellationToken::new();
    let task_token = token.clone();

    tokio::spawn(async move {
        let mut interval = tokio::time::interval(interval);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                _ = interval.tick() => tick(),
                _ = task_token.cancelled() => {
                    tracing::debug!(name, "Periodic task stopped");
                    break;
                }
            }
        }
    });

    token
}

/// Shorthand for sharing a clock across components.
pub type SharedClock = Arc<dyn Clock>;
