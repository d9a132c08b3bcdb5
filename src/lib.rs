//! Helper utilities for load testing a Jira-like issue tracker and a
//! Confluence-like wiki.
//!
//! The pieces a load test script needs around the load engine itself:
//! header presets, a rate-paced action executor, a task-set wrapper that
//! classifies failed HTTP responses, per-session state, logging setup and a
//! handful of data helpers.

pub mod actions;
pub mod app;
pub mod config;
pub mod data_source;
pub mod errors;
pub mod events;
pub mod executor;
pub mod extractor;
pub mod headers;
pub mod logging;
pub mod metrics;
pub mod runner;
pub mod session;
pub mod task_set;
pub mod timing;
pub mod utils;
