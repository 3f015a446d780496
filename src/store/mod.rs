//! Durable value store.
//!
//! Each logical value (commander list, emoji list, trigger list, blacklist)
//! lives in its own JSON file and is wrapped in a typed [`JsonStore`].
//!
//! ## Usage
//!
//! ```rust
//! let commanders: JsonStore<Vec<u64>> = JsonStore::open("data/authorized_commanders.json", vec![])?;
//!
//! // Synchronous, cached read
//! let ids = commanders.get();
//!
//! // Cache updated immediately, file written in the background
//! commanders.set(vec![1, 2, 3]).await?;
//! ```

mod error;
mod json;

pub use error::{StoreError, StoreResult};
pub use json::JsonStore;
