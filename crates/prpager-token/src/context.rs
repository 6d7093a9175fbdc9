//! Pagination cursor state and paged-response types

use serde::{Deserialize, Serialize};

/// Wire version stamped into newly encoded contexts. Tokens encoded before
/// versioning was introduced deserialize with version 0.
pub const CONTEXT_VERSION: u32 = 1;

/// The full cursor state embedded in a continuation token.
///
/// Never mutated in place: advancing the cursor means encoding a new
/// context derived from the old one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaginationContext {
    #[serde(default)]
    pub version: u32,
    pub pr_number: u64,
    pub owner: String,
    pub repo: String,
    pub current_file_index: usize,
    pub current_chunk_index: usize,
    pub total_files: usize,
    pub total_chunks: usize,
    pub session_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cached_summary: Option<String>,
    /// Encode timestamp, epoch milliseconds
    pub created_at: i64,
    pub ttl_minutes: u64,
}

/// Caller-supplied partial context for [`TokenCodec::encode`].
///
/// Unset counters default to zero; a missing `session_id` gets a fresh
/// random identifier at encode time.
///
/// [`TokenCodec::encode`]: crate::TokenCodec::encode
#[derive(Debug, Clone, Default)]
pub struct ContextParams {
    pub pr_number: u64,
    pub owner: String,
    pub repo: String,
    pub current_file_index: usize,
    pub current_chunk_index: usize,
    pub total_files: usize,
    pub total_chunks: usize,
    pub session_id: Option<String>,
    pub filename: Option<String>,
    pub cached_summary: Option<String>,
}

/// One page of data plus the cursor needed to fetch the next one
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PagedResponse<T> {
    pub data: T,
    pub pagination: Pagination,
}

/// Page indicators handed to the caller alongside the data
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pagination {
    pub has_next: bool,
    pub has_previous: bool,
    /// 1-based
    pub current_page: usize,
    pub total_pages: usize,
    pub context_token: String,
}

impl<T> PagedResponse<T> {
    /// Build the response for the chunk at zero-based `chunk_index`
    pub fn new(data: T, chunk_index: usize, total_chunks: usize, context_token: String) -> Self {
        PagedResponse {
            data,
            pagination: Pagination {
                has_next: chunk_index + 1 < total_chunks,
                has_previous: chunk_index > 0,
                current_page: chunk_index + 1,
                total_pages: total_chunks,
                context_token,
            },
        }
    }
}

/// Position and cost summary for a single chunk
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChunkMetadata {
    pub file_index: usize,
    pub chunk_index: usize,
    pub total_chunks: usize,
    pub lines_start: u32,
    pub lines_end: u32,
    pub estimated_tokens: usize,
}
