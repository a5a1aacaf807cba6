//! On-disk layout of a pipeline namespace
//!
//! ```text
//! <root>/<id>/manifest.json      committed segment list
//! <root>/<id>/segment-000000.json
//! <root>/<id>/segment-000001.json
//! <root>/.staging/               half-built or half-deleted namespaces
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::pipeline::Fragment;

pub const MANIFEST_FILE: &str = "manifest.json";
pub const STAGING_DIR: &str = ".staging";
pub const FORMAT_VERSION: u32 = 1;

pub fn segment_file_name(sequence: usize) -> String {
    format!("segment-{:06}.json", sequence)
}

/// Lists the segments that make up a namespace. A segment file that is not
/// listed here was never committed and is ignored.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Manifest {
    pub format_version: u32,
    pub pipeline_id: u64,
    pub embedding_provider: String,
    pub dimensions: usize,
    pub segments: Vec<SegmentEntry>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Manifest {
    pub fn fragment_count(&self) -> usize {
        self.segments.iter().map(|s| s.fragments).sum()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SegmentEntry {
    pub file: String,
    pub fragments: usize,
    pub committed_at: DateTime<Utc>,
}

/// A fragment together with its embedding.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredRecord {
    pub fragment: Fragment,
    pub embedding: Vec<f32>,
}
