//! Hero search dashboard.
//!
//! Models the search page without a browser: the selected hero and tier,
//! the recent-search list, URL fragment slugs, and a keyed cache over the
//! four read queries the page issues.

pub mod cache;
pub mod client;
pub mod controller;
pub mod recent;
pub mod slug;

pub use cache::{QueryCache, QueryKey, QueryState};
pub use client::{ApiClientError, HttpStatsApi, StatsApi, GRAPH_PERIOD_DAYS};
pub use controller::{DashboardController, DashboardError, DashboardStatus, DashboardView, SelectedHero};
pub use recent::{RecentSearch, RecentSearches, RECENT_SEARCHES_CAPACITY, RECENT_SEARCHES_KEY};
