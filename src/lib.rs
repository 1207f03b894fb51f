//! Otto - one-shot build trigger scheduling
//!
//! Otto exposes a small REST API for scheduling a single future invocation
//! of a Jenkins `buildWithParameters` endpoint. A job row is persisted,
//! an in-memory one-shot trigger is armed for the requested instant, and
//! when it fires the executor performs the remote call exactly once and
//! records the outcome in an append-only history table.

#![allow(missing_docs)]

pub mod api;
pub mod app;
pub mod boot;
pub mod cli;
pub mod commands;
pub mod config;
pub mod database;
pub mod environment;
pub mod executor;
pub mod router;
pub mod scheduler;
pub mod setup_tracing;

#[cfg(test)]
mod tests;
