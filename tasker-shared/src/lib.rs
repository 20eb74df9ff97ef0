//! # Tasker Shared Library
//!
//! Domain types, data access and business rules for the Tasker API server.
//!
//! ## Module Organization
//!
//! - `models`: database models and their SQL
//! - `db`: connection pool and migrations
//! - `auth`: passwords, session tokens, authorization predicates
//! - `services`: domain operations (users, connections, tasks, search, stats)
//! - `calendar`: best-effort external calendar sync
//! - `error`: error codes shared by every component

pub mod auth;
pub mod calendar;
pub mod db;
pub mod error;
pub mod models;
pub mod services;

/// Current version of the Tasker shared library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
