//! Registry index implementations

mod file;
mod in_memory;

pub use file::{FileRegistryIndex, REGISTRY_FILE};
pub use in_memory::InMemoryRegistryIndex;
