//! # Marketplace Answer Bot Library
//!
//! This library provides the core functionality for the answer bot service:
//! the webhook pipeline, OAuth credential exchange, persistence, and server
//! configuration.

pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod marketplace;
pub mod models;
pub mod oauth;
pub mod pipeline;
pub mod replier;
pub mod repositories;
pub mod server;
pub mod telemetry;
pub use migration;
