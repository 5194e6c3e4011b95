//! # Photo Module
//!
//! The feed data model: photo kinds, cursors, pages and cache entries.

mod page;
mod types;

pub use page::{feed_order, CacheEntry, Cursor, Page};
pub use types::{
    FeedItem, FeedKind, GalleryPhoto, GalleryPhotoResponse, GeoPoint, ReceivedPhoto,
    ReceivedPhotoResponse, UploadedPhoto, UploadedPhotoResponse,
};
