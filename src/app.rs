//! Application state management for givecache.
//!
//! This module contains the core `App` struct that manages all application
//! state: UI state, the current fund's data and derived statistics, and
//! background refresh coordination.

use std::path::PathBuf;

use anyhow::Result;
use futures::stream::{self, StreamExt};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::api::FundClient;
use crate::cache::CacheStore;
use crate::config::Config;
use crate::models::{ContributionRecord, FundKey, FundSnapshot, FundSpec};
use crate::refresh::{self, InFlightGuard, RefreshMessage, RefreshTicker, TickerConfig};
use crate::stats::{self, FundStats};

// ============================================================================
// Constants
// ============================================================================

/// Buffer size for the background task message channel.
/// A handful of funds refresh at a time; 16 leaves headroom.
const CHANNEL_BUFFER_SIZE: usize = 16;

/// Number of items to scroll on page up/down.
pub const PAGE_SCROLL_SIZE: usize = 10;

/// Maximum concurrent fund fetches during the startup warm-up.
/// The sheet-script endpoint is slow and unauthenticated; keep it polite.
const MAX_CONCURRENT_FETCHES: usize = 4;

/// Leaderboard row cap. High enough to list every contributor in practice
/// while bounding the table for a pathological fund.
const LEADERBOARD_LIMIT: usize = 1000;

// ============================================================================
// UI State Types
// ============================================================================

/// Main navigation tabs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tab {
    Dashboard,
    Contributors,
    Members,
}

impl Tab {
    /// Get the display title for this tab.
    pub fn title(&self) -> &'static str {
        match self {
            Tab::Dashboard => "Dashboard",
            Tab::Contributors => "Contributors",
            Tab::Members => "Members",
        }
    }

    /// Get the next tab (wrapping around)
    pub fn next(&self) -> Self {
        match self {
            Tab::Dashboard => Tab::Contributors,
            Tab::Contributors => Tab::Members,
            Tab::Members => Tab::Dashboard,
        }
    }

    /// Get the previous tab (wrapping around)
    pub fn prev(&self) -> Self {
        match self {
            Tab::Dashboard => Tab::Members,
            Tab::Contributors => Tab::Dashboard,
            Tab::Members => Tab::Contributors,
        }
    }
}

/// Current UI focus area (list panel or detail panel)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Focus {
    List,
    Detail,
}

/// Overall application state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppState {
    Normal,
    Searching,
    ShowingHelp,
    Quitting,
}

// ============================================================================
// Main Application Struct
// ============================================================================

/// Main application state container
pub struct App {
    // Core services
    pub config: Config,
    pub cache: CacheStore,
    pub client: FundClient,

    // UI state
    pub state: AppState,
    pub current_tab: Tab,
    pub focus: Focus,
    pub search_query: String,

    // Current fund data (transient copy; the cache store owns persistence)
    current_fund: usize,
    pub contributions: Vec<ContributionRecord>,
    pub goal_amount: f64,
    pub stats: FundStats,
    pub cache_age: Option<String>,
    /// Whether a snapshot has been applied for the current fund yet. The
    /// first snapshot always renders; afterwards the count heuristic
    /// decides.
    loaded: bool,

    // Selection indices
    pub contributor_selection: usize,
    pub timeline_selection: usize,
    pub member_selection: usize,

    // Member preselected via --member, resolved once data arrives
    pending_member: Option<String>,

    // Background refresh coordination
    guard: InFlightGuard,
    refresh_rx: mpsc::Receiver<RefreshMessage>,
    refresh_tx: mpsc::Sender<RefreshMessage>,
    ticker: RefreshTicker,

    // Status message
    pub status_message: Option<String>,
}

impl App {
    /// Create a new application instance
    pub fn new(
        config: Config,
        fund_override: Option<FundKey>,
        member: Option<String>,
    ) -> Result<Self> {
        if config.funds.is_empty() {
            anyhow::bail!("No funds configured");
        }

        let cache_dir = config
            .cache_dir()
            .unwrap_or_else(|_| PathBuf::from("./cache"));
        debug!(?cache_dir, "Cache directory configured");

        let cache = CacheStore::new(cache_dir, config.policy());
        let client = FundClient::new(&config.endpoint_url)?;

        let (tx, rx) = mpsc::channel(CHANNEL_BUFFER_SIZE);
        let ticker = RefreshTicker::spawn(TickerConfig {
            interval: std::time::Duration::from_secs(config.refresh_interval_secs),
            enabled: true,
        });

        let current_fund = config.initial_fund_index(fund_override.as_ref());
        let current_tab = if member.is_some() {
            Tab::Members
        } else {
            Tab::Dashboard
        };

        Ok(Self {
            config,
            cache,
            client,

            state: AppState::Normal,
            current_tab,
            focus: Focus::List,
            search_query: String::new(),

            current_fund,
            contributions: Vec::new(),
            goal_amount: 0.0,
            stats: FundStats::default(),
            cache_age: None,
            loaded: false,

            contributor_selection: 0,
            timeline_selection: 0,
            member_selection: 0,

            pending_member: member,

            guard: InFlightGuard::default(),
            refresh_rx: rx,
            refresh_tx: tx,
            ticker,

            status_message: None,
        })
    }

    // =========================================================================
    // Fund selection
    // =========================================================================

    pub fn current_fund_spec(&self) -> &FundSpec {
        &self.config.funds[self.current_fund]
    }

    pub fn current_fund_index(&self) -> usize {
        self.current_fund
    }

    /// Switch to another configured fund and load whatever the cache has
    /// for it; a cache miss triggers a background fetch.
    pub fn select_fund(&mut self, index: usize) {
        if index >= self.config.funds.len() || index == self.current_fund {
            return;
        }
        self.current_fund = index;
        self.loaded = false;
        self.contributions.clear();
        self.goal_amount = 0.0;
        self.stats = FundStats::default();
        self.search_query.clear();
        self.contributor_selection = 0;
        self.timeline_selection = 0;
        self.member_selection = 0;
        self.status_message = None;

        info!(fund = %self.current_fund_spec().key, "Switched fund");
        self.load_from_cache();
        if !self.loaded {
            self.refresh_current();
        }
    }

    pub fn cycle_fund(&mut self) {
        let next = (self.current_fund + 1) % self.config.funds.len();
        self.select_fund(next);
    }

    // =========================================================================
    // Cache Management
    // =========================================================================

    /// Load the current fund from cache, if a fresh entry exists.
    pub fn load_from_cache(&mut self) {
        let key = self.current_fund_spec().key.clone();
        if let Some(entry) = self.cache.get(&key) {
            self.apply_snapshot(entry.data);
        }
        self.cache_age = self.cache.age_display(&key);
    }

    /// Replace the current fund's in-memory data and recompute derived
    /// statistics.
    fn apply_snapshot(&mut self, snapshot: FundSnapshot) {
        let mut contributions = snapshot.contributions;
        stats::sort_by_date_desc(&mut contributions);

        self.goal_amount = snapshot.goal_amount;
        self.stats = FundStats::compute(&contributions, snapshot.goal_amount);
        self.contributions = contributions;
        self.loaded = true;

        self.clamp_selections();
        self.resolve_pending_member();
    }

    fn clamp_selections(&mut self) {
        let members = self.members().len();
        let contributors = self.leaderboard().len();
        self.member_selection = self.member_selection.min(members.saturating_sub(1));
        self.contributor_selection = self
            .contributor_selection
            .min(contributors.saturating_sub(1));
        self.timeline_selection = self
            .timeline_selection
            .min(self.contributions.len().saturating_sub(1));
    }

    fn resolve_pending_member(&mut self) {
        let Some(name) = self.pending_member.take() else {
            return;
        };
        let wanted = name.trim().to_lowercase();
        match self
            .members()
            .iter()
            .position(|m| m.to_lowercase() == wanted)
        {
            Some(index) => {
                self.member_selection = index;
                self.current_tab = Tab::Members;
                self.focus = Focus::Detail;
            }
            None => {
                warn!(member = %name, "Requested member not found in fund data");
                self.status_message = Some(format!("Member not found: {}", name));
            }
        }
    }

    /// Clear the current fund's entry and refetch; the forced-fresh path
    /// behind a hard reload.
    pub fn hard_reload(&mut self) {
        let key = self.current_fund_spec().key.clone();
        self.cache.clear(&key);
        self.status_message = Some("Reloading...".to_string());
        self.refresh_current();
    }

    // =========================================================================
    // Background Data Refresh
    // =========================================================================

    /// Force a background refresh of the current fund, bypassing the cache
    /// read path.
    pub fn refresh_current(&mut self) {
        let spec = self.current_fund_spec().clone();
        self.spawn_refresh(spec);
    }

    /// Refresh the current fund only when the staleness policy says the
    /// cached entry can no longer be served. Driven by the periodic timer
    /// and by the terminal regaining focus.
    pub fn maybe_refresh_current(&mut self) {
        let key = self.current_fund_spec().key.clone();
        if self.cache.get(&key).is_none() {
            debug!(fund = %key, "Cache entry missing or stale, refreshing");
            self.refresh_current();
        }
    }

    /// Warm every configured fund whose cache entry is missing or stale,
    /// with bounded concurrency. Funds refresh independently; the in-flight
    /// guard keeps each key to one fetch.
    pub fn warm_stale_funds(&mut self) {
        let stale: Vec<FundSpec> = self
            .config
            .funds
            .iter()
            .filter(|f| self.cache.get(&f.key).is_none())
            .cloned()
            .collect();

        let claimed: Vec<FundSpec> = stale
            .into_iter()
            .filter(|f| self.guard.try_begin(&f.key))
            .collect();

        if claimed.is_empty() {
            return;
        }

        info!(count = claimed.len(), "Warming stale funds");
        let client = self.client.clone();
        let cache = self.cache.clone();
        let tx = self.refresh_tx.clone();

        tokio::spawn(async move {
            stream::iter(claimed)
                .map(|fund| {
                    let client = client.clone();
                    let cache = cache.clone();
                    async move { refresh::refresh_fund(client, cache, fund).await }
                })
                .buffer_unordered(MAX_CONCURRENT_FETCHES)
                .for_each(|message| {
                    let tx = tx.clone();
                    async move {
                        if let Err(e) = tx.send(message).await {
                            error!(error = %e, "Failed to send refresh result - channel closed");
                        }
                    }
                })
                .await;
        });

        self.status_message = Some("Refreshing data...".to_string());
    }

    fn spawn_refresh(&mut self, spec: FundSpec) {
        if !self.guard.try_begin(&spec.key) {
            return;
        }

        let client = self.client.clone();
        let cache = self.cache.clone();
        let tx = self.refresh_tx.clone();

        tokio::spawn(async move {
            let message = refresh::refresh_fund(client, cache, spec).await;
            if let Err(e) = tx.send(message).await {
                error!(error = %e, "Failed to send refresh result - channel closed");
            }
        });

        self.status_message = Some("Refreshing data...".to_string());
    }

    /// Whether any refresh is in flight (drives the status-bar indicator).
    pub fn is_refreshing(&self) -> bool {
        !self.guard.is_idle()
    }

    /// Periodic timer fired?
    pub fn poll_ticker(&mut self) -> bool {
        self.ticker.try_tick()
    }

    /// The terminal regained focus; refresh if the entry expired while the
    /// app was in the background.
    pub fn on_focus_gained(&mut self) {
        debug!("Terminal focus gained");
        self.maybe_refresh_current();
    }

    /// Check for completed background tasks and process results
    pub fn check_background_tasks(&mut self) {
        while let Ok(message) = self.refresh_rx.try_recv() {
            self.process_refresh_message(message);
        }
    }

    /// Process a single refresh result from a background task.
    ///
    /// The snapshot was already written through to the cache by the task;
    /// here the count heuristic decides whether the in-memory data (and
    /// with it the rendered dashboard) is rebuilt.
    fn process_refresh_message(&mut self, message: RefreshMessage) {
        match message {
            RefreshMessage::Updated { fund, snapshot } => {
                self.guard.finish(&fund);

                if fund != self.current_fund_spec().key {
                    debug!(fund = %fund, "Background fund updated");
                    return;
                }

                self.cache_age = self.cache.age_display(&fund);
                if refresh::snapshot_changed(self.loaded, self.contributions.len(), &snapshot) {
                    let count = snapshot.contributions.len();
                    self.apply_snapshot(snapshot);
                    self.status_message = Some(format!("Updated - {} contributions", count));
                    info!(fund = %fund, contributions = count, "Data changed, dashboard rebuilt");
                } else {
                    debug!(fund = %fund, "Contribution count unchanged, render suppressed");
                    self.status_message = None;
                }
            }
            RefreshMessage::Failed { fund, error } => {
                self.guard.finish(&fund);
                warn!(fund = %fund, error = %error, "Refresh failed, keeping cached data");
                if fund == self.current_fund_spec().key {
                    self.status_message = Some("Refresh failed - showing cached data".to_string());
                }
            }
        }
    }

    /// Stop background tasks; called on shutdown.
    pub async fn shutdown(self) {
        self.ticker.shutdown().await;
    }

    // =========================================================================
    // Derived views
    // =========================================================================

    /// Contributions filtered by the search query (member substring,
    /// case-insensitive). An empty query passes everything through.
    pub fn filtered_contributions(&self) -> Vec<&ContributionRecord> {
        if self.search_query.is_empty() {
            return self.contributions.iter().collect();
        }
        let term = self.search_query.to_lowercase();
        self.contributions
            .iter()
            .filter(|c| c.member.to_lowercase().contains(&term))
            .collect()
    }

    /// Member directory for the Members tab, honoring the search query.
    pub fn members(&self) -> Vec<String> {
        let all = stats::member_directory(&self.contributions);
        if self.search_query.is_empty() {
            return all;
        }
        let term = self.search_query.to_lowercase();
        all.into_iter()
            .filter(|m| m.to_lowercase().contains(&term))
            .collect()
    }

    pub fn selected_member(&self) -> Option<String> {
        self.members().get(self.member_selection).cloned()
    }

    /// Ranked contributor totals for the Contributors tab. The leaderboard
    /// always reflects the full fund, not the search filter.
    pub fn leaderboard(&self) -> Vec<stats::ContributorTotal> {
        stats::top_contributors(&self.contributions, LEADERBOARD_LIMIT)
    }
}
