//! # Listing Watch
//!
//! Watches a car dealer's used-car listing page and alerts Telegram
//! subscribers about new matching cars, exactly once per car per chat.
//!
//! ## Architecture
//!
//! ```text
//! ┌───────────┐   ┌───────────┐   ┌────────────┐   ┌────────────┐
//! │ Scheduler │──▶│  Fetch +  │──▶│   Diff +   │──▶│  Fan-out   │
//! │ (interval)│   │  Extract  │   │  SQLite    │   │ (Telegram) │
//! └───────────┘   └───────────┘   └─────┬──────┘   └────────────┘
//!                                       │
//!                 ┌─────────────────────┤
//!                 ▼                     ▼
//!          ┌─────────────┐       ┌────────────┐
//!          │ /start      │       │  /health   │
//!          │ registration│       │  (HTTP)    │
//!          └─────────────┘       └────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! lwatch init                 # create database
//! lwatch check --dry-run      # see what the page yields right now
//! LWATCH_BOT_TOKEN=... lwatch run
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`db`] | Database connection |
//! | [`migrate`] | Schema migrations |
//! | [`sqlite_store`] | SQLite record and subscriber store |
//! | [`fetch`] | Listing page download |
//! | [`telegram`] | Bot API transport |
//! | [`pipeline`] | One fetch → extract → diff → notify cycle |
//! | [`scheduler`] | Interval trigger with overlap guard |
//! | [`register`] | `/start` subscriber registration |
//! | [`server`] | Health endpoint |
//!
//! Extraction, diffing, fan-out, and the store traits live in the
//! `listing-watch-core` crate.

pub mod app;
pub mod config;
pub mod db;
pub mod fetch;
pub mod list;
pub mod migrate;
pub mod pipeline;
pub mod register;
pub mod scheduler;
pub mod server;
pub mod sqlite_store;
pub mod telegram;
