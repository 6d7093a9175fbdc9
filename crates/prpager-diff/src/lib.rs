//! Unified-diff segmentation under LLM token budgets
//!
//! This crate splits raw unified-diff patches into ordered, size-bounded
//! chunks that an LLM caller can retrieve one at a time. Hunks are atomic:
//! a chunk always contains whole hunks, and the token budget is a soft
//! target that a single oversized hunk may exceed.

mod chunker;
mod types;

pub use chunker::{
    chunk_file_diff, estimate_tokens, extract_overlap, format_chunk_with_line_numbers,
    is_complete_hunk, parse_diff_hunks, DEFAULT_MAX_TOKENS_PER_CHUNK, OVERLAP_LINES,
};
pub use types::{DiffChunk, ParsedHunk};
