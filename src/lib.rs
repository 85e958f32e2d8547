//! Bookmarks: a per-user bookmark tree with path-addressed folders and
//! favicon caching.
//!
//! This library crate exposes all modules for use by the binary and integration tests.

pub mod app;
pub mod database;
pub mod managers;
pub mod rpc_handler;
pub mod services;
pub mod store;
pub mod types;
