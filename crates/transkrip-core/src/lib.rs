//! Core types and trait definitions for the transkrip transcript warehouse.
//!
//! This crate is deliberately free of PDF and database dependencies. It holds
//! the star-schema row types, the ingestion rules, the diagnostics taxonomy
//! and the metric calculator; every other crate depends on it.

// We intentionally use native `async fn` in traits (stabilised in Rust 1.75).
// Suppress the advisory lint about `Send` bounds on the returned futures.
#![allow(async_fn_in_trait)]

pub mod config;
pub mod diagnostic;
pub mod dimension;
pub mod error;
pub mod extract;
pub mod fact;
pub mod grade;
pub mod metrics;
pub mod store;
pub mod transcript;

pub use error::{Error, Result};
