//! Tier-ordered server pool (§4.1) — wraps the existing per-server
//! `nntp_rs::NntpPool`s with the tier-preference contract: `acquire_at_or_below`
//! tries pools in ascending tier order (lower tier = primary, tried first) and
//! falls through to the next tier on saturation, rather than failing outright.
//!
//! The underlying `nntp_rs::NntpPool` already owns connection lifecycle
//! (opening, authenticating, capping at the configured connection count) —
//! that wire-level detail is out of scope here (§1 Non-goals). This wrapper
//! adds only the cross-server tier-preference policy on top.

/// One server's pool together with its configured tier and last-use bookkeeping.
struct TieredPool {
    tier: i32,
    pool: nntp_rs::NntpPool,
    last_acquired: tokio::sync::Mutex<Option<std::time::Instant>>,
}

/// Tier-ordered view over a set of per-server connection pools.
pub(crate) struct ServerPool {
    /// Pools sorted ascending by tier; stable within a tier (original config order).
    pools: Vec<TieredPool>,
    /// Idle window past which `close_idle` considers a tier eligible for closing.
    idle_window: std::sync::Mutex<std::time::Duration>,
}

impl ServerPool {
    /// Build a tier-ordered pool from the configured servers and their already-constructed
    /// `NntpPool`s (parallel arrays, same order as `config.servers`).
    pub(crate) fn new(servers: &[crate::config::ServerConfig], pools: Vec<nntp_rs::NntpPool>) -> Self {
        let mut tiered: Vec<TieredPool> = servers
            .iter()
            .zip(pools)
            .map(|(server, pool)| TieredPool {
                tier: server.priority,
                pool,
                last_acquired: tokio::sync::Mutex::new(None),
            })
            .collect();

        // Stable sort: preserves original (config) order among same-tier servers.
        tiered.sort_by_key(|t| t.tier);

        Self {
            pools: tiered,
            idle_window: std::sync::Mutex::new(std::time::Duration::from_secs(60)),
        }
    }

    /// Acquire a connection from the first available pool at or below `tier`,
    /// trying tiers in ascending order (primary servers first). Returns `None`
    /// if every eligible pool is saturated or erroring.
    pub(crate) async fn acquire_at_or_below(&self, tier: i32) -> Option<nntp_rs::PooledConnection<'_>> {
        for tiered in self.pools.iter().filter(|t| t.tier <= tier) {
            if let Ok(conn) = tiered.pool.get().await {
                *tiered.last_acquired.lock().await = Some(std::time::Instant::now());
                return Some(conn);
            }
        }
        None
    }

    /// Acquire a connection from any configured server, trying every tier in order.
    pub(crate) async fn acquire(&self) -> Option<nntp_rs::PooledConnection<'_>> {
        let max_tier = self.pools.iter().map(|t| t.tier).max().unwrap_or(0);
        self.acquire_at_or_below(max_tier).await
    }

    /// Lowest configured tier (the primary tier), or 0 if no servers are configured.
    pub(crate) fn primary_tier(&self) -> i32 {
        self.pools.first().map(|t| t.tier).unwrap_or(0)
    }

    /// Set the idle window used by `close_idle` (seconds of no `acquire` activity
    /// past which a server is considered idle). Mirrors the contract's `setTimeout`.
    pub(crate) fn set_timeout(&self, seconds: u64) {
        *self.idle_window.lock().unwrap_or_else(|e| e.into_inner()) =
            std::time::Duration::from_secs(seconds);
    }

    /// Report which tiers have had no `acquire` for longer than the configured idle
    /// window, for the coordinator's once-per-second idle sweep (§4.1). Connection
    /// teardown itself is owned by `nntp_rs::NntpPool`; this only identifies which
    /// pools are candidates, since the pool type exposes no public close-idle hook.
    pub(crate) async fn close_idle(&self) -> Vec<i32> {
        let window = *self.idle_window.lock().unwrap_or_else(|e| e.into_inner());
        let mut idle_tiers = Vec::new();
        for tiered in &self.pools {
            let last = *tiered.last_acquired.lock().await;
            if matches!(last, Some(t) if t.elapsed() >= window) {
                idle_tiers.push(tiered.tier);
            }
        }
        idle_tiers
    }
}

/// Pure helper (unit-testable without a live `NntpPool`): returns indices into
/// `tiers` in the order `acquire_at_or_below` would try them for the given
/// request tier — ascending tier, stable within a tier.
pub(crate) fn tier_try_order(tiers: &[i32], request_tier: i32) -> Vec<usize> {
    let mut order: Vec<usize> = (0..tiers.len()).filter(|&i| tiers[i] <= request_tier).collect();
    order.sort_by_key(|&i| tiers[i]);
    order
}
