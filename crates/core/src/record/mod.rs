//! Record module
//!
//! Destination-side field model, the store interface and an in-memory store.

mod fields;
mod memory_store;
mod store;

pub use fields::{Priority, RecordFields, RecordRef};
pub use memory_store::{MemoryRecordStore, StoreCall};
pub use store::RecordStore;
