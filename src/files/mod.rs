//! Static file lookup
//!
//! Everything needed to turn a request target into a file on disk that is
//! safe to serve.

pub mod resolver;

pub use resolver::{DocumentRoot, ResolvedFile, INDEX_FILE};
