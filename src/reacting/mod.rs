//! Trigger engine: reacts to messages that match a stored pattern.
//!
//! Per message: `received -> filtered | matched -> suppressed | scheduled -> reacted`.
//! A single global cool-down [`Bucket`] throttles the bot across every chat.

mod bucket;
mod engine;

pub use bucket::Bucket;
pub use engine::{InboundMessage, ReactingConfig, TriggerEngine};
