//! Revify client library.
//!
//! Drives the Revify review-analysis backend: URL validation, the
//! two-phase analysis flow (feature extraction, then analysis with a
//! user-narrowed feature selection), status polling, and report
//! derivations for display.

pub mod cli;
pub mod client;
pub mod config;
pub mod models;
pub mod progress;
pub mod report;
pub mod session;
pub mod urls;
