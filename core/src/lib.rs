//! Fair rotation engine for recognition awards.
//!
//! No participant receives a second award within a cycle until every
//! active participant has received one. See `engine` for the entry point.

pub mod clock;
pub mod config;
pub mod cycle_tracker;
pub mod engine;
pub mod error;
pub mod event;
pub mod history;
pub mod ranker;
pub mod roster;
pub mod store;
pub mod tier;
pub mod types;
