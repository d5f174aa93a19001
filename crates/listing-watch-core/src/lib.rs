//! # Listing Watch Core
//!
//! Shared, runtime-agnostic logic for listing-watch: the record model,
//! listing extraction, store traits, the identity diff, and notification
//! fan-out.
//!
//! This crate contains no tokio, sqlx, or network I/O. Everything that
//! touches the outside world is reached through the traits in [`store`]
//! and [`notify`], so the pipeline can be exercised against in-memory
//! doubles.

pub mod diff;
pub mod extract;
pub mod models;
pub mod notify;
pub mod store;
