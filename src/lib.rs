//! restpager library
//!
//! Paginated REST fetching with a TTL cache, backoff retries and request
//! supersession, plus the terminal front end built on top of it.

pub mod app;
pub mod cache;
pub mod cli;
pub mod controller;
pub mod data;
pub mod fetch;
pub mod logging;
pub mod transport;
pub mod ui;
