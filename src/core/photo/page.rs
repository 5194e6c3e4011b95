//! Pagination and cache entry types shared by stores and the coordinator.

use super::FeedItem;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Position in a feed, expressed as the last item already seen
///
/// Items are ordered by `(recency, key)` descending. A cursor admits only
/// items strictly below it in that order, so two items sharing a recency
/// key are never skipped or repeated across page boundaries.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Cursor {
    /// Start from the most recent item
    #[default]
    Latest,
    /// Continue after this item
    After { recency: i64, key: String },
}

impl Cursor {
    /// Cursor pointing just past `item`
    pub fn after<T: FeedItem>(item: &T) -> Self {
        Cursor::After {
            recency: item.recency_key(),
            key: item.stable_key().to_string(),
        }
    }

    /// Whether an item with this recency and key comes after the cursor
    pub fn admits(&self, recency: i64, key: &str) -> bool {
        match self {
            Cursor::Latest => true,
            Cursor::After {
                recency: last_recency,
                key: last_key,
            } => match recency.cmp(last_recency) {
                Ordering::Less => true,
                Ordering::Equal => key < last_key.as_str(),
                Ordering::Greater => false,
            },
        }
    }

    /// Recency key of the last seen item, as sent to the remote
    pub fn last_seen_recency(&self) -> Option<i64> {
        match self {
            Cursor::Latest => None,
            Cursor::After { recency, .. } => Some(*recency),
        }
    }
}

/// Compare two items in feed order (most recent first)
pub fn feed_order<T: FeedItem>(a: &T, b: &T) -> Ordering {
    b.recency_key()
        .cmp(&a.recency_key())
        .then_with(|| b.stable_key().cmp(a.stable_key()))
}

/// One page of a feed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page<T> {
    /// Items, most recent first
    pub items: Vec<T>,
    /// No further pages exist upstream
    pub is_end: bool,
}

impl<T: FeedItem> Page<T> {
    pub fn new(items: Vec<T>, is_end: bool) -> Self {
        Self { items, is_end }
    }

    /// Cursor for the page after this one, `None` once the feed has ended
    /// or the page came back empty
    pub fn next_cursor(&self) -> Option<Cursor> {
        if self.is_end {
            return None;
        }
        self.items.last().map(Cursor::after)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// A cached value and the moment it first entered the cache
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry<T> {
    pub value: T,
    /// Set once on first insert, never touched by later upserts
    pub inserted_on_ms: i64,
}

impl<T> CacheEntry<T> {
    pub fn new(value: T, inserted_on_ms: i64) -> Self {
        Self {
            value,
            inserted_on_ms,
        }
    }

    /// Whether this entry is still inside the freshness window
    pub fn is_fresh(&self, fresh_since_ms: i64) -> bool {
        self.inserted_on_ms >= fresh_since_ms
    }
}
