//! # Events Module
//!
//! Event-driven reporting of what the engine did.
//!
//! ## Design
//! The coordinator and the temp file lifecycle emit events through
//! channels, so any UI (CLI, GUI, web) can subscribe without the engine
//! depending on it.
//!
//! ## Example
//! ```rust,ignore
//! let (sender, receiver) = EventChannel::new();
//! let coordinator = PageCoordinator::<GalleryPhoto>::builder(source)
//!     .store(store)
//!     .gate(gate)
//!     .events(sender)
//!     .build();
//!
//! coordinator.next_page(&Cursor::Latest, 30)?;
//! for event in receiver.drain() {
//!     if let Event::Feed(FeedEvent::PageServed { source, items, .. }) = event {
//!         println!("{items} photos from {source}");
//!     }
//! }
//! ```

mod channel;
mod types;

pub use channel::{null_sender, EventChannel, EventReceiver, EventSender};
pub use types::*;
