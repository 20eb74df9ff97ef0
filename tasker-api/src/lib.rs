//! # Tasker API Server Library
//!
//! HTTP surface of the Tasker backend: routing, request parsing and the
//! mapping of domain errors onto HTTP responses. The domain itself lives in
//! `tasker_shared`.
//!
//! ## Modules
//!
//! - `app`: Application state and router builder
//! - `config`: Configuration management
//! - `error`: Error handling and HTTP response mapping
//! - `routes`: API route handlers

pub mod app;
pub mod config;
pub mod error;
pub mod routes;
