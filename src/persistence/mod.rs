//! Persistence Layer
//!
//! Storage for the transaction log, trade snapshots, positions and the
//! pending queue.
//!
//! # Features
//! - Gap-free sequential transaction ids starting at 1
//! - Copy-on-read trade snapshots
//! - Single-step position read-modify-write
//! - Ordered, uniquely keyed pending queue
//!
//! State lives for the lifetime of the store instance; nothing survives a
//! restart.

pub mod in_memory;
pub mod pending_queue;

pub use in_memory::InMemoryTradeStore;
pub use pending_queue::PendingQueue;
