//! Encrypted continuation tokens for stateless pagination
//!
//! All cursor state lives inside the token itself, so retrieval stays
//! stateless and horizontally scalable: no server-side session table, at
//! the cost of re-validating the token on every call. Tokens are
//! authenticated (AES-256-GCM), expire after a TTL, and are opaque
//! base64url strings safe to hand to an untrusted caller.

mod codec;
mod context;

pub use codec::{TokenCodec, TokenError, DEFAULT_TTL_MINUTES};
pub use context::{
    ChunkMetadata, ContextParams, PagedResponse, Pagination, PaginationContext, CONTEXT_VERSION,
};
