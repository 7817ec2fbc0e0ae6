//! # evidence-store-backend
//!
//! The synchronous store contract (`Store`), the read-cache mixin, the
//! sequence-counter bookkeeping shared by every persistent backend, and the
//! in-memory backend itself.
//!
//! Every backend crate (`evidence-store-kv`, `evidence-store-sql`) and this
//! one implement the same [`Store`] trait, so callers can swap persistence
//! engines without touching call sites.

pub mod cache;
pub mod counters;
pub mod memory;
pub mod traits;

pub use cache::ReadCache;
pub use counters::SequenceCounters;
pub use memory::InMemoryBackend;
pub use traits::Store;
