//! LMDB storage backend for the merit reward ledger.
//!
//! Implements all storage traits from `merit-store` using the `heed` LMDB
//! bindings. Each logical store maps to one or more LMDB databases within a
//! single environment; compound mutations go through [`WriteBatch`], one
//! write transaction per ledger operation.

pub mod account;
pub mod environment;
pub mod error;
pub mod history;
pub mod keys;
pub mod meta;
pub mod payout;
pub mod queue;
pub mod write_batch;

pub use environment::{LmdbEnvironment, SCHEMA_VERSION};
pub use error::LmdbError;
pub use write_batch::WriteBatch;
