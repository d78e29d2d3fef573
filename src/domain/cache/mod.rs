//! Media cache domain module

mod entry;

pub use entry::{CacheEntry, CacheStats, MediaType};
