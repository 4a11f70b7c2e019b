//! HTTP protocol implementation.
//!
//! A GET-only HTTP/1.1 server core with simple `Connection` header
//! negotiation for keep-alive.
//!
//! # Architecture
//!
//! - **`connection`**: The per-connection state machine and close policy
//! - **`parser`**: Parses requests out of a buffered byte stream under a read deadline
//! - **`request`**: HTTP request representation and header-name canonicalization
//! - **`response`**: HTTP response representation and the OK / Bad Request / Not Found builders
//! - **`writer`**: Serializes responses (sorted headers, file body) to the client
//! - **`mime`**: MIME type detection based on file extensions
//! - **`date`**: HTTP-date formatting
//!
//! # Connection State Machine
//!
//! ```text
//!        ┌──────────────────┐
//!        │ AwaitingRequest  │ ← Arm idle deadline, read one request
//!        └──────┬───────────┘
//!               │ Request parsed, or bad input / stalled request (400)
//!               │ (EOF or idle timeout with nothing received → Closed)
//!               ▼
//!        ┌──────────────────┐
//!        │   Responding     │ ← Write status line, sorted headers, file body
//!        └──────┬───────────┘
//!               │ Response sent
//!               ├─ 200 without Connection: close → AwaitingRequest
//!               └─ 400, 404, or Connection: close → Closed
//! ```
//!
//! # Example
//!
//! ```ignore
//! use lantern::http::connection::{Connection, ConnectionSettings};
//! use std::sync::Arc;
//! use tokio::net::TcpListener;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let settings = Arc::new(ConnectionSettings::from_config(&Default::default())?);
//!     let listener = TcpListener::bind("127.0.0.1:8080").await?;
//!
//!     loop {
//!         let (socket, _addr) = listener.accept().await?;
//!         let settings = settings.clone();
//!         tokio::spawn(async move {
//!             let mut conn = Connection::new(socket, settings);
//!             if let Err(e) = conn.run().await {
//!                 eprintln!("Connection error: {}", e);
//!             }
//!         });
//!     }
//! }
//! ```

pub mod connection;
pub mod date;
pub mod mime;
pub mod parser;
pub mod request;
pub mod response;
pub mod writer;

/// The only protocol version accepted or emitted.
pub const HTTP_VERSION: &str = "HTTP/1.1";
