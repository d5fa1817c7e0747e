//! Whisk batch image generation
//!
//! This library provides the core of whisk-batch: a sequential job queue that
//! turns prompt lines into calls against the Whisk image-generation API, the
//! client for that API, a file-backed credential store and the HTTP routes
//! that expose the queue.

pub mod app_state;
pub mod config;
pub mod models;
pub mod routes;
pub mod services;
