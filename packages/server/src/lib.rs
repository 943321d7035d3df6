//! Research pipeline API server.
//!
//! Wires the `scholarly` workflow engine to an HTTP surface: research
//! submission and polling, direct knowledge-store search, corpus
//! statistics and upload, and session lifecycle.

pub mod config;
pub mod kernel;
pub mod server;
