//! # bidali-testing
//!
//! In-memory adapters for testing services built on the bidali transport
//! without a broker: a batch sender with capacity limits and failure
//! injection, a checkpoint store with stall injection, and a delivery
//! callback collector.

pub mod collector;
pub mod memory_checkpoint;
pub mod memory_sender;

pub use collector::CollectingCallback;
pub use memory_checkpoint::MemoryCheckpointStore;
pub use memory_sender::{FlushedBatch, MemoryBatchSender, MemorySenderState, MemoryWireBatch};
