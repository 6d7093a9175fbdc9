//! Type definitions for diff segmentation

use serde::{Deserialize, Serialize};

/// One contiguous hunk parsed from a unified diff
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedHunk {
    /// The literal `@@ ... @@` header line
    pub header: String,
    pub old_start: u32,
    pub old_lines: u32,
    pub new_start: u32,
    pub new_lines: u32,
    /// Content lines in source order (context, added, removed)
    pub lines: Vec<String>,
}

/// A slice of one or more whole hunks sized to stay under a token budget
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiffChunk {
    pub old_start: u32,
    pub old_lines: u32,
    pub new_start: u32,
    pub new_lines: u32,
    /// Concatenated chunk text, including any leading overlap lines
    pub content: String,
    pub size_bytes: usize,
    /// Header of the chunk's first hunk; empty for the first chunk
    pub header: String,
}
