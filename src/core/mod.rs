//! # Core Module
//!
//! The UI-agnostic feed cache and scratch file engine.
//!
//! ## Modules
//! - `photo` - Feed kinds, photo types, cursors and pages
//! - `store` - Persists feed entries for offline and cached reads
//! - `remote` - Contract for fetching pages from the server
//! - `network` - Decides whether the network may be used
//! - `clock` - Time source, injectable for tests
//! - `feed` - Chooses where each page comes from
//! - `tempfiles` - Scratch file lifecycle

pub mod clock;
pub mod feed;
pub mod network;
pub mod photo;
pub mod remote;
pub mod store;
pub mod tempfiles;

// Re-export commonly used types
pub use clock::{Clock, ScriptedClock, SystemClock};
pub use feed::{FeedConfig, PageCoordinator, PageCoordinatorBuilder, RetryPolicy};
pub use network::{NetworkGate, NetworkPolicy, PolicyGate, StaticGate};
pub use photo::{Cursor, FeedItem, FeedKind, GalleryPhoto, Page, ReceivedPhoto, UploadedPhoto};
pub use remote::{RemotePage, RemotePhotoSource};
pub use store::{InMemoryPhotoStore, LocalPhotoStore, SqlitePhotoStore, StoreStats};
pub use tempfiles::{TempFile, TempFileConfig, TempFileLifecycle, TempFileStore};
