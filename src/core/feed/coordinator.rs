//! Page coordinator implementation.

use crate::core::clock::{Clock, SystemClock};
use crate::core::network::{NetworkGate, StaticGate};
use crate::core::photo::{feed_order, Cursor, FeedItem, Page};
use crate::core::remote::RemotePhotoSource;
use crate::core::store::{InMemoryPhotoStore, LocalPhotoStore};
use crate::error::{PageError, RemoteError};
use crate::events::{null_sender, Event, EventSender, FeedEvent, PageSource};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

/// Configuration for a feed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedConfig {
    /// How long a cached entry stays fresh after it was first inserted
    pub freshness_ttl: Duration,
    /// Page size used by `first_page`
    pub page_size: usize,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            freshness_ttl: Duration::from_secs(60 * 60),
            page_size: 30,
        }
    }
}

impl FeedConfig {
    /// Earliest insertion time that still counts as fresh at `now_ms`
    ///
    /// An entry is fresh while `now_ms - inserted_on_ms < freshness_ttl`.
    pub fn fresh_since(&self, now_ms: i64) -> i64 {
        let ttl_ms = i64::try_from(self.freshness_ttl.as_millis()).unwrap_or(i64::MAX);
        now_ms.saturating_sub(ttl_ms).saturating_add(1)
    }
}

/// Builder for a page coordinator
pub struct PageCoordinatorBuilder<T: FeedItem> {
    config: FeedConfig,
    source: Arc<dyn RemotePhotoSource<T>>,
    store: Option<Arc<dyn LocalPhotoStore<T>>>,
    gate: Option<Arc<dyn NetworkGate>>,
    clock: Option<Arc<dyn Clock>>,
    events: Option<EventSender>,
}

impl<T: FeedItem> PageCoordinatorBuilder<T> {
    /// Start a builder around the remote source of truth
    pub fn new(source: Arc<dyn RemotePhotoSource<T>>) -> Self {
        Self {
            config: FeedConfig::default(),
            source,
            store: None,
            gate: None,
            clock: None,
            events: None,
        }
    }

    /// Set the local store
    pub fn store(mut self, store: Arc<dyn LocalPhotoStore<T>>) -> Self {
        self.store = Some(store);
        self
    }

    /// Set the network gate
    pub fn gate(mut self, gate: Arc<dyn NetworkGate>) -> Self {
        self.gate = Some(gate);
        self
    }

    /// Set the clock used by `next_page`
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Set the freshness window
    pub fn freshness_ttl(mut self, ttl: Duration) -> Self {
        self.config.freshness_ttl = ttl;
        self
    }

    /// Set the default page size
    pub fn page_size(mut self, page_size: usize) -> Self {
        self.config.page_size = page_size;
        self
    }

    /// Replace the whole feed configuration
    pub fn config(mut self, config: FeedConfig) -> Self {
        self.config = config;
        self
    }

    /// Report served pages to this sender
    pub fn events(mut self, events: EventSender) -> Self {
        self.events = Some(events);
        self
    }

    /// Build the coordinator
    ///
    /// Without an explicit store the coordinator caches in memory; without a
    /// gate it assumes the network is always allowed.
    pub fn build(self) -> PageCoordinator<T> {
        PageCoordinator {
            config: self.config,
            source: self.source,
            store: self
                .store
                .unwrap_or_else(|| Arc::new(InMemoryPhotoStore::new())),
            gate: self.gate.unwrap_or_else(|| Arc::new(StaticGate::new(true))),
            clock: self.clock.unwrap_or_else(|| Arc::new(SystemClock)),
            events: self.events.unwrap_or_else(null_sender),
        }
    }
}

/// Serves pages of one feed, from the local store or the remote
///
/// Every call takes exactly one path: local-only (offline, or enough fresh
/// entries cached for this cursor) or a remote refresh that prunes stale
/// entries and persists the fetched page. Failures are returned to the
/// caller untouched; there is no internal retry and no fallback to stale
/// data after a failed refresh.
pub struct PageCoordinator<T: FeedItem> {
    config: FeedConfig,
    source: Arc<dyn RemotePhotoSource<T>>,
    store: Arc<dyn LocalPhotoStore<T>>,
    gate: Arc<dyn NetworkGate>,
    clock: Arc<dyn Clock>,
    events: EventSender,
}

impl<T: FeedItem> PageCoordinator<T> {
    /// Create a new coordinator builder
    pub fn builder(source: Arc<dyn RemotePhotoSource<T>>) -> PageCoordinatorBuilder<T> {
        PageCoordinatorBuilder::new(source)
    }

    pub fn config(&self) -> &FeedConfig {
        &self.config
    }

    /// The local store backing this feed
    pub fn store(&self) -> &Arc<dyn LocalPhotoStore<T>> {
        &self.store
    }

    /// First page of the feed at the configured page size
    pub fn first_page(&self) -> Result<Page<T>, PageError> {
        self.next_page(&Cursor::Latest, self.config.page_size)
    }

    /// Get the page after `cursor`, reading the time from the clock
    pub fn next_page(&self, cursor: &Cursor, requested_count: usize) -> Result<Page<T>, PageError> {
        self.get_page(cursor, requested_count, self.clock.now_ms())
    }

    /// Get the page after `cursor` as of `now_ms`
    ///
    /// A cursor whose item has since been pruned still marks a valid
    /// position, so pagination resumes with whatever follows it.
    pub fn get_page(
        &self,
        cursor: &Cursor,
        requested_count: usize,
        now_ms: i64,
    ) -> Result<Page<T>, PageError> {
        if requested_count == 0 {
            return Err(PageError::InvalidPageSize {
                requested: requested_count,
            });
        }

        let fresh_since = self.config.fresh_since(now_ms);
        let fresh_count = self.store.count_fresh(cursor, fresh_since)?;

        if !self.gate.can_access_network() {
            tracing::debug!(kind = %T::KIND, fresh_count, "network not permitted, serving from cache");
            return self.serve_local(cursor, requested_count, fresh_since, PageSource::Offline);
        }

        if fresh_count >= requested_count {
            tracing::debug!(kind = %T::KIND, fresh_count, requested_count, "cache satisfies page");
            return self.serve_local(cursor, requested_count, fresh_since, PageSource::Cache);
        }

        self.refresh(cursor, requested_count, now_ms, fresh_since)
    }

    fn serve_local(
        &self,
        cursor: &Cursor,
        requested_count: usize,
        fresh_since: i64,
        source: PageSource,
    ) -> Result<Page<T>, PageError> {
        let items = self.store.read_page(cursor, requested_count, fresh_since)?;
        let is_end = items.len() < requested_count;

        self.report_served(source, items.len(), is_end);
        Ok(Page::new(items, is_end))
    }

    fn refresh(
        &self,
        cursor: &Cursor,
        requested_count: usize,
        now_ms: i64,
        fresh_since: i64,
    ) -> Result<Page<T>, PageError> {
        let response = self
            .source
            .as_ref()
            .fetch_page(cursor, requested_count)
            .map_err(|e| self.refresh_failed(e))?;

        // End of list is decided by the raw response, before dedup
        let is_end = response.is_end(requested_count);

        let fetched = response
            .items
            .into_iter()
            .map(T::from_remote)
            .collect::<Result<Vec<T>, String>>()
            .map_err(|reason| self.refresh_failed(RemoteError::Malformed(reason)))?;

        let mut fetched = dedupe_by_key(fetched);
        fetched.sort_by(feed_order);

        // Prune first so re-fetched stale keys come back as new entries
        let pruned = self.store.prune_older_than(fresh_since)?;
        self.store.save(&fetched, now_ms)?;

        if pruned > 0 {
            self.events.send(Event::Feed(FeedEvent::Pruned {
                kind: T::KIND,
                removed: pruned,
            }));
        }

        let items: Vec<T> = fetched
            .into_iter()
            .filter(|item| cursor.admits(item.recency_key(), item.stable_key()))
            .collect();

        tracing::debug!(kind = %T::KIND, fetched = items.len(), pruned, is_end, "refreshed page from remote");
        self.report_served(PageSource::Remote, items.len(), is_end);
        Ok(Page::new(items, is_end))
    }

    fn refresh_failed(&self, error: RemoteError) -> PageError {
        tracing::warn!(kind = %T::KIND, error = %error, "remote refresh failed");
        self.events.send(Event::Feed(FeedEvent::RefreshFailed {
            kind: T::KIND,
            message: error.to_string(),
        }));
        PageError::RemoteFetchFailed(error)
    }

    fn report_served(&self, source: PageSource, items: usize, is_end: bool) {
        self.events.send(Event::Feed(FeedEvent::PageServed {
            kind: T::KIND,
            source,
            items,
            is_end,
        }));
    }
}

/// Keep one item per stable key, the last one seen winning
fn dedupe_by_key<T: FeedItem>(items: Vec<T>) -> Vec<T> {
    let mut latest: HashMap<String, T> = HashMap::with_capacity(items.len());
    for item in items {
        latest.insert(item.stable_key().to_string(), item);
    }
    latest.into_values().collect()
}
