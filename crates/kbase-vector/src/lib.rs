//! VectorStore implementations and LanceDB table helpers.
//!
//! - [`store::LanceStore`]: collections and documents persisted in LanceDB.
//! - [`memory::MemoryStore`]: exact in-memory store for tests and small corpora.
//! - [`import`]: JSON Lines bulk loader used by the CLI.

pub mod import;
pub mod memory;
pub mod schema;
pub mod store;
pub mod table;
pub mod writer;

pub use memory::MemoryStore;
pub use store::LanceStore;
