//! Transcript store implementations for Clerk.

pub mod csv_store;
pub mod in_memory;

pub use csv_store::CsvTranscriptStore;
pub use in_memory::InMemoryTranscriptStore;
