//! # Remote Module
//!
//! Contract for fetching one page of a photo feed from the server.
//!
//! The remote paginates by "last seen recency key" plus a requested count.
//! A response shorter than the requested count is the only end-of-list
//! signal. Transport mapping lives outside this crate; implementations of
//! `RemotePhotoSource` adapt whatever client the application uses.
//!
//! ## Sources
//! - `TimeoutSource` - Bounds any source with a caller-supplied deadline
//! - `ScriptedRemoteSource` - Replays canned responses, for tests

mod scripted;
mod timeout;

pub use scripted::ScriptedRemoteSource;
pub use timeout::TimeoutSource;

use crate::core::photo::{Cursor, FeedItem};
use crate::error::RemoteError;
use std::sync::Arc;

/// Raw items returned by one remote call
#[derive(Debug, Clone)]
pub struct RemotePage<R> {
    pub items: Vec<R>,
}

impl<R> RemotePage<R> {
    pub fn new(items: Vec<R>) -> Self {
        Self { items }
    }

    /// Whether this response ends the feed for a request of `requested` items
    pub fn is_end(&self, requested: usize) -> bool {
        self.items.len() < requested
    }
}

/// Fetches pages of `T` from the server
///
/// Failures are returned as-is; callers own retry and backoff.
pub trait RemotePhotoSource<T: FeedItem>: Send + Sync {
    fn fetch_page(&self, cursor: &Cursor, count: usize)
        -> Result<RemotePage<T::Remote>, RemoteError>;
}

impl<T, S> RemotePhotoSource<T> for Arc<S>
where
    T: FeedItem,
    S: RemotePhotoSource<T> + ?Sized,
{
    fn fetch_page(
        &self,
        cursor: &Cursor,
        count: usize,
    ) -> Result<RemotePage<T::Remote>, RemoteError> {
        <S as RemotePhotoSource<T>>::fetch_page(self, cursor, count)
    }
}
