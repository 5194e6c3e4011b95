//! # photo-cache CLI
//!
//! Command-line interface for the photo feed cache.
//!
//! ## Usage
//! ```bash
//! photo-cache temp list
//! photo-cache --output json feed stats --kind gallery
//! ```

mod cli;

use photo_feed_cache::Result;

fn main() -> Result<()> {
    photo_feed_cache::init_tracing();
    cli::run()
}
