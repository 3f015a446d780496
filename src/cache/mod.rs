//! Cache module - runtime objects derived from stored tokens.
//!
//! ## Architecture
//!
//! - `DerivedCache` - ordered sequence of resolved objects, rebuilt wholesale
//! - `Resolver` - maps one stored token to a live object (or nothing)
//! - `RecacheSignal` - subscribe/fire hub telling listeners to rebuild
//!
//! ## Usage
//!
//! ```rust
//! let emojis = DerivedCache::new("emojis");
//!
//! // After every change to the backing store
//! emojis.rebuild(&emoji_store, &|token: &str| directory.find(token));
//!
//! // Hot path
//! let current = emojis.current();
//! ```

mod derived;
mod signal;

pub use derived::DerivedCache;
pub use signal::{RecacheReason, RecacheSignal};
