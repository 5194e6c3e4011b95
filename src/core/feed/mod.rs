//! # Feed Module
//!
//! Serves photo feeds page by page.
//!
//! ## Page Strategy
//! 1. **Offline** - network not permitted, serve fresh cached entries
//! 2. **Cache** - enough fresh entries cached after the cursor, serve them
//! 3. **Remote** - fetch, dedupe, prune stale entries, persist, serve
//!
//! The end of a feed is signalled by a page shorter than requested: the
//! raw remote response on the remote path, the local read otherwise.

mod coordinator;
mod retry;

pub use coordinator::{FeedConfig, PageCoordinator, PageCoordinatorBuilder};
pub use retry::{Backoff, RetryPolicy};
