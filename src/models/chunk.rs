use std::fmt;
use std::ops::Range;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Deterministic chunk identifier: `<document_id>#<ordinal>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChunkId(String);

impl ChunkId {
    pub fn new(document_id: &Uuid, ordinal: usize) -> Self {
        Self(format!("{document_id}#{ordinal}"))
    }

    /// Wrap an id received from outside (e.g. an oracle citation).
    pub fn from_raw(raw: &str) -> Self {
        Self(raw.trim().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ChunkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Where the first character of a chunk came from in the original document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceLocation {
    /// 1-based page number, for paginated formats.
    pub page: Option<u32>,
    /// 0-based paragraph ordinal within the document.
    pub paragraph: usize,
    /// Byte offset of that paragraph in the original (decoded) source text.
    pub original_offset: usize,
}

/// A contiguous, provenance-tagged passage of extracted text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    pub id: ChunkId,
    pub document_id: Uuid,
    pub ordinal: usize,
    pub text: String,
    /// Character range in the document's extracted text.
    pub char_range: Range<usize>,
    pub location: SourceLocation,
}
