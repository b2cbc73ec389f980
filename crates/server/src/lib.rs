//! HTTP JSON API for the bookd engine.
//!
//! The binary lives in `main.rs`; the router and handlers are exported here
//! so integration tests can stand up the full surface in-process.

pub mod serve;
