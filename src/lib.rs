//! Lantern - GET-only HTTP/1.1 static file server
//!
//! Core library for the protocol layer, path resolution and the listener.

pub mod config;
pub mod files;
pub mod http;
pub mod server;
