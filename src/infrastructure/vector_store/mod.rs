//! Vector storage implementations

mod file;
mod format;
mod index;

pub use file::FileVectorStorage;
pub use format::{MANIFEST_FILE, STAGING_DIR};
pub use index::InMemoryVectorIndex;
