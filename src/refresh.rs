//! Background fund refresh.
//!
//! A refresh always hits the network (the cache read path is bypassed) and
//! writes through to the cache store on success. Results travel back to the
//! main application over a tokio mpsc channel; an in-flight guard ensures
//! at most one refresh per fund key at a time, so cache writes for one key
//! are serialized and a duplicate trigger costs no extra network call.

use std::collections::HashSet;
use std::time::Duration;

use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::api::FundClient;
use crate::cache::CacheStore;
use crate::models::{FundKey, FundSnapshot, FundSpec};

/// Messages sent from background refresh tasks to the main app
#[derive(Debug)]
pub enum RefreshMessage {
    /// A fund was fetched and written through to the cache
    Updated {
        fund: FundKey,
        snapshot: FundSnapshot,
    },
    /// The fetch failed; the cache entry (if any) was left untouched
    Failed { fund: FundKey, error: String },
}

/// Tracks which fund keys have a refresh in flight. A second trigger for
/// the same key while one is pending is dropped, which both avoids the
/// duplicate network call and rules out out-of-order cache writes for that
/// key within this process.
#[derive(Debug, Default)]
pub struct InFlightGuard {
    in_flight: HashSet<FundKey>,
}

impl InFlightGuard {
    /// Claim a fund key for refresh. Returns false when a refresh for this
    /// key is already pending, in which case the caller must not fetch.
    pub fn try_begin(&mut self, fund: &FundKey) -> bool {
        if self.in_flight.contains(fund) {
            debug!(fund = %fund, "Refresh already in flight, dropping trigger");
            return false;
        }
        self.in_flight.insert(fund.clone());
        true
    }

    /// Release a fund key once its refresh completed (or failed).
    pub fn finish(&mut self, fund: &FundKey) {
        self.in_flight.remove(fund);
    }

    pub fn is_idle(&self) -> bool {
        self.in_flight.is_empty()
    }
}

/// Fetch one fund and write through to the cache on success. Runs inside a
/// spawned task; the returned message is sent back over the app channel by
/// the caller.
pub async fn refresh_fund(
    client: FundClient,
    cache: CacheStore,
    fund: FundSpec,
) -> RefreshMessage {
    match client.fetch_fund(&fund).await {
        Ok(snapshot) => {
            cache.put(&fund.key, &snapshot);
            RefreshMessage::Updated {
                fund: fund.key,
                snapshot,
            }
        }
        Err(e) => {
            warn!(fund = %fund.key, error = %e, "Background refresh failed");
            RefreshMessage::Failed {
                fund: fund.key,
                error: e.to_string(),
            }
        }
    }
}

/// The change detector behind render suppression: a cheap record-count
/// comparison, not a content diff. An edit that keeps the count constant
/// slips past it, which is accepted - the provider offers no version
/// counter to do better with. A fund with no applied snapshot yet always
/// counts as changed so the first fetch renders.
pub fn snapshot_changed(loaded: bool, previous_count: usize, snapshot: &FundSnapshot) -> bool {
    !loaded || snapshot.contributions.len() != previous_count
}

/// Configuration for the periodic refresh timer
#[derive(Debug, Clone)]
pub struct TickerConfig {
    /// Interval between refresh checks
    pub interval: Duration,
    /// Whether periodic refresh is enabled
    pub enabled: bool,
}

impl Default for TickerConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(300), // 5 minutes
            enabled: true,
        }
    }
}

/// Periodic timer driving stale-entry refreshes. The timer only signals;
/// the app decides per tick whether the staleness policy actually demands a
/// network call.
pub struct RefreshTicker {
    receiver: mpsc::Receiver<()>,
    shutdown_tx: mpsc::Sender<()>,
}

impl RefreshTicker {
    /// Spawn the timer task. With `enabled = false` no task is spawned and
    /// the ticker never fires.
    pub fn spawn(config: TickerConfig) -> Self {
        let (tick_tx, tick_rx) = mpsc::channel(4);
        let (shutdown_tx, mut shutdown_rx) = mpsc::channel::<()>(1);

        if config.enabled {
            let interval = config.interval;
            tokio::spawn(async move {
                let mut timer = tokio::time::interval(interval);
                // Skip the first tick (immediate)
                timer.tick().await;

                loop {
                    tokio::select! {
                        _ = timer.tick() => {
                            if tick_tx.send(()).await.is_err() {
                                break;
                            }
                        }
                        _ = shutdown_rx.recv() => {
                            break;
                        }
                    }
                }
            });
        }

        Self {
            receiver: tick_rx,
            shutdown_tx,
        }
    }

    /// Check for a pending tick without blocking.
    pub fn try_tick(&mut self) -> bool {
        self.receiver.try_recv().is_ok()
    }

    /// Stop the timer task.
    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(()).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_guard_allows_first_trigger_only() {
        let mut guard = InFlightGuard::default();
        let fund = FundKey::new("tech");

        assert!(guard.try_begin(&fund));
        assert!(!guard.try_begin(&fund), "second trigger must be dropped");

        guard.finish(&fund);
        assert!(guard.try_begin(&fund), "key is claimable again after finish");
    }

    #[test]
    fn test_guard_keys_are_independent() {
        let mut guard = InFlightGuard::default();
        assert!(guard.try_begin(&FundKey::new("tech")));
        assert!(guard.try_begin(&FundKey::new("christmasfund")));
        assert!(!guard.is_idle());
    }

    #[test]
    fn test_two_triggers_one_fetch() {
        // The property behind the guard: of N triggers for the same key
        // before completion, exactly one performs a network call.
        let mut guard = InFlightGuard::default();
        let fund = FundKey::new("tech");
        let mut network_calls = 0;

        for _ in 0..2 {
            if guard.try_begin(&fund) {
                network_calls += 1;
            }
        }

        assert_eq!(network_calls, 1);
    }

    #[test]
    fn test_snapshot_changed_compares_counts() {
        let empty = FundSnapshot::default();
        assert!(
            snapshot_changed(false, 0, &empty),
            "first snapshot always renders"
        );
        assert!(!snapshot_changed(true, 0, &empty));
        assert!(snapshot_changed(true, 3, &empty));
    }

    #[tokio::test]
    async fn test_failed_refresh_leaves_cache_untouched() {
        use crate::cache::StalenessPolicy;

        let dir = tempfile::TempDir::new().unwrap();
        let cache = CacheStore::new(dir.path().to_path_buf(), StalenessPolicy::sticky());
        let spec = FundSpec::new("tech", "Tech Fund", "tech-contributions");
        let old = FundSnapshot {
            contributions: vec![],
            goal_amount: 9000.0,
        };
        cache.put(&spec.key, &old);

        // Nothing listens on the discard port, so the fetch fails fast
        let client = FundClient::new("http://127.0.0.1:9/exec").unwrap();
        let message = refresh_fund(client, cache.clone(), spec.clone()).await;

        assert!(matches!(message, RefreshMessage::Failed { .. }));
        let entry = cache.get(&spec.key).expect("entry still present after failure");
        assert_eq!(entry.data, old);
    }

    #[tokio::test]
    async fn test_disabled_ticker_never_fires() {
        let mut ticker = RefreshTicker::spawn(TickerConfig {
            interval: Duration::from_millis(1),
            enabled: false,
        });
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!ticker.try_tick());
    }

    #[tokio::test]
    async fn test_ticker_fires_after_interval() {
        let mut ticker = RefreshTicker::spawn(TickerConfig {
            interval: Duration::from_millis(5),
            enabled: true,
        });
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(ticker.try_tick());
        ticker.shutdown().await;
    }
}
