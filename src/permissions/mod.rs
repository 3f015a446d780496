//! Permission system for checking who may command the bot.
//!
//! Commanders are stored in `authorized_commanders.json`; owners configured
//! through the environment are always commanders.
//!
//! ## Usage
//!
//! ```rust
//! if !state.permissions.require_commander(&bot, &msg).await? {
//!     return Ok(());
//! }
//! ```

mod checker;

pub use checker::Permissions;
