//! AES-256-GCM token encoding and decoding
//!
//! Token byte layout, preserved for interoperability:
//! `[16-byte nonce][16-byte tag][ciphertext]`, base64url without padding.

use aes::Aes256;
use aes_gcm::aead::generic_array::typenum::U16;
use aes_gcm::aead::generic_array::GenericArray;
use aes_gcm::aead::AeadInPlace;
use aes_gcm::{AesGcm, KeyInit};
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::Utc;
use thiserror::Error;
use uuid::Uuid;

use prpager_core::PaginationConfig;

use crate::context::{ContextParams, PaginationContext, CONTEXT_VERSION};

/// TTL applied when the caller has no opinion
pub const DEFAULT_TTL_MINUTES: u64 = 30;

const NONCE_LEN: usize = 16;
const TAG_LEN: usize = 16;

// The upstream wire format uses a 16-byte GCM nonce rather than the usual 12
type Aes256Gcm16 = AesGcm<Aes256, U16>;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TokenError {
    /// Token authenticated but exceeded its TTL; the caller should restart
    /// with explicit parameters
    #[error("context token has expired")]
    Expired,

    /// Token failed authentication or deserialization
    #[error("invalid context token")]
    Invalid,

    /// Key material was not 64 hex characters (32 bytes)
    #[error("encryption key must be 64 hex characters")]
    InvalidKey,
}

/// Encrypts pagination contexts into opaque continuation tokens.
///
/// The key must be initialized once before any encode/decode call and
/// never rotated mid-process: rotation invalidates every outstanding token.
#[derive(Debug)]
pub struct TokenCodec {
    key: [u8; 32],
}

impl TokenCodec {
    pub fn new(key: [u8; 32]) -> Self {
        TokenCodec { key }
    }

    /// Parse a 64-hex-character key
    pub fn from_hex(key_hex: &str) -> Result<Self, TokenError> {
        let bytes = hex::decode(key_hex).map_err(|_| TokenError::InvalidKey)?;
        let key: [u8; 32] = bytes.try_into().map_err(|_| TokenError::InvalidKey)?;
        Ok(TokenCodec::new(key))
    }

    /// Require a key from the `ENCRYPTION_KEY` environment variable
    pub fn from_env() -> Result<Self, TokenError> {
        match std::env::var("ENCRYPTION_KEY") {
            Ok(key_hex) => Self::from_hex(&key_hex),
            Err(_) => Err(TokenError::InvalidKey),
        }
    }

    /// Build a codec from configuration, falling back to an ephemeral key
    /// when none is configured
    pub fn from_config(config: &PaginationConfig) -> Result<Self, TokenError> {
        match &config.encryption_key {
            Some(key_hex) => Self::from_hex(key_hex),
            None => Ok(Self::ephemeral()),
        }
    }

    /// Generate a random key for the process lifetime.
    ///
    /// Tokens minted under an ephemeral key cannot be decoded by any other
    /// process instance, so resumption breaks across restarts. Configure a
    /// persistent key for anything beyond a single long-lived process.
    pub fn ephemeral() -> Self {
        tracing::warn!(
            "no encryption key configured; using an ephemeral key, \
             continuation tokens will not survive a restart"
        );
        TokenCodec::new(rand::random())
    }

    /// Fill unset fields, stamp `created_at` and the TTL, and seal the
    /// context into an opaque token.
    ///
    /// A fresh random nonce is used per call, so encoding the same params
    /// twice yields different tokens; the embedded session id also differs
    /// unless one was supplied.
    pub fn encode(&self, params: &ContextParams, ttl_minutes: u64) -> Result<String, TokenError> {
        let context = PaginationContext {
            version: CONTEXT_VERSION,
            pr_number: params.pr_number,
            owner: params.owner.clone(),
            repo: params.repo.clone(),
            current_file_index: params.current_file_index,
            current_chunk_index: params.current_chunk_index,
            total_files: params.total_files,
            total_chunks: params.total_chunks,
            session_id: params
                .session_id
                .clone()
                .unwrap_or_else(|| Uuid::new_v4().to_string()),
            filename: params.filename.clone(),
            cached_summary: params.cached_summary.clone(),
            created_at: Utc::now().timestamp_millis(),
            ttl_minutes,
        };

        let cipher = Aes256Gcm16::new(GenericArray::from_slice(&self.key));
        let nonce: [u8; NONCE_LEN] = rand::random();

        let mut buffer = serde_json::to_vec(&context).map_err(|_| TokenError::Invalid)?;
        let tag = cipher
            .encrypt_in_place_detached(GenericArray::from_slice(&nonce), b"", &mut buffer)
            .map_err(|_| TokenError::Invalid)?;

        let mut raw = Vec::with_capacity(NONCE_LEN + TAG_LEN + buffer.len());
        raw.extend_from_slice(&nonce);
        raw.extend_from_slice(&tag);
        raw.extend_from_slice(&buffer);

        Ok(URL_SAFE_NO_PAD.encode(raw))
    }

    /// Authenticate, decrypt, and expiry-check a token.
    ///
    /// Fails closed: any bit-level tampering or corruption yields
    /// [`TokenError::Invalid`], never a decoded-but-wrong context. An
    /// authentic token older than its TTL yields [`TokenError::Expired`].
    pub fn decode(&self, token: &str) -> Result<PaginationContext, TokenError> {
        let raw = URL_SAFE_NO_PAD
            .decode(token)
            .map_err(|_| TokenError::Invalid)?;
        if raw.len() < NONCE_LEN + TAG_LEN {
            return Err(TokenError::Invalid);
        }

        let (nonce, rest) = raw.split_at(NONCE_LEN);
        let (tag, ciphertext) = rest.split_at(TAG_LEN);

        let cipher = Aes256Gcm16::new(GenericArray::from_slice(&self.key));
        let mut buffer = ciphertext.to_vec();
        cipher
            .decrypt_in_place_detached(
                GenericArray::from_slice(nonce),
                b"",
                &mut buffer,
                GenericArray::from_slice(tag),
            )
            .map_err(|_| TokenError::Invalid)?;

        let context: PaginationContext =
            serde_json::from_slice(&buffer).map_err(|_| TokenError::Invalid)?;

        let age_minutes =
            (Utc::now().timestamp_millis() - context.created_at) as f64 / 60_000.0;
        if age_minutes > context.ttl_minutes as f64 {
            return Err(TokenError::Expired);
        }

        Ok(context)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_codec() -> TokenCodec {
        TokenCodec::new([7u8; 32])
    }

    fn sample_params() -> ContextParams {
        ContextParams {
            pr_number: 42,
            owner: "octo".to_string(),
            repo: "demo".to_string(),
            current_file_index: 0,
            current_chunk_index: 2,
            total_files: 1,
            total_chunks: 5,
            session_id: Some("session-1".to_string()),
            filename: Some("src/lib.rs".to_string()),
            cached_summary: None,
        }
    }

    #[test]
    fn test_round_trip() {
        let codec = test_codec();
        let token = codec.encode(&sample_params(), 30).unwrap();
        let context = codec.decode(&token).unwrap();

        assert_eq!(context.version, CONTEXT_VERSION);
        assert_eq!(context.pr_number, 42);
        assert_eq!(context.owner, "octo");
        assert_eq!(context.repo, "demo");
        assert_eq!(context.current_chunk_index, 2);
        assert_eq!(context.total_chunks, 5);
        assert_eq!(context.session_id, "session-1");
        assert_eq!(context.filename.as_deref(), Some("src/lib.rs"));
        assert!(context.cached_summary.is_none());
        assert_eq!(context.ttl_minutes, 30);
        assert!(context.created_at > 0);
    }

    #[test]
    fn test_defaults_filled_at_encode() {
        let codec = test_codec();
        let token = codec.encode(&ContextParams::default(), 30).unwrap();
        let context = codec.decode(&token).unwrap();

        assert_eq!(context.pr_number, 0);
        assert_eq!(context.owner, "");
        assert_eq!(context.current_chunk_index, 0);
        // A session id was generated
        assert!(!context.session_id.is_empty());
    }

    #[test]
    fn test_encode_is_nondeterministic() {
        let codec = test_codec();
        let params = ContextParams::default();
        let first = codec.encode(&params, 30).unwrap();
        let second = codec.encode(&params, 30).unwrap();
        assert_ne!(first, second);

        // Generated session ids differ too
        let first_session = codec.decode(&first).unwrap().session_id;
        let second_session = codec.decode(&second).unwrap().session_id;
        assert_ne!(first_session, second_session);
    }

    #[test]
    fn test_token_layout() {
        let codec = test_codec();
        let token = codec.encode(&sample_params(), 30).unwrap();

        // URL-safe alphabet, no padding
        assert!(!token.contains('='));
        assert!(!token.contains('+'));
        assert!(!token.contains('/'));

        let raw = URL_SAFE_NO_PAD.decode(&token).unwrap();
        assert!(raw.len() > NONCE_LEN + TAG_LEN);
    }

    #[test]
    fn test_expired_token() {
        let codec = test_codec();
        let token = codec.encode(&sample_params(), 0).unwrap();
        std::thread::sleep(std::time::Duration::from_millis(10));
        assert_eq!(codec.decode(&token), Err(TokenError::Expired));
    }

    #[test]
    fn test_tampered_ciphertext_rejected() {
        let codec = test_codec();
        let token = codec.encode(&sample_params(), 30).unwrap();
        let mut raw = URL_SAFE_NO_PAD.decode(&token).unwrap();

        let last = raw.len() - 1;
        raw[last] ^= 0x01;
        let tampered = URL_SAFE_NO_PAD.encode(&raw);
        assert_eq!(codec.decode(&tampered), Err(TokenError::Invalid));
    }

    #[test]
    fn test_tampered_tag_rejected() {
        let codec = test_codec();
        let token = codec.encode(&sample_params(), 30).unwrap();
        let mut raw = URL_SAFE_NO_PAD.decode(&token).unwrap();

        raw[NONCE_LEN] ^= 0x80;
        let tampered = URL_SAFE_NO_PAD.encode(&raw);
        assert_eq!(codec.decode(&tampered), Err(TokenError::Invalid));
    }

    #[test]
    fn test_wrong_key_rejected() {
        let codec = test_codec();
        let token = codec.encode(&sample_params(), 30).unwrap();

        let other = TokenCodec::new([8u8; 32]);
        assert_eq!(other.decode(&token), Err(TokenError::Invalid));
    }

    #[test]
    fn test_garbage_tokens_rejected() {
        let codec = test_codec();
        assert_eq!(codec.decode(""), Err(TokenError::Invalid));
        assert_eq!(codec.decode("not base64 !!!"), Err(TokenError::Invalid));
        // Valid base64 but too short to hold nonce + tag
        assert_eq!(
            codec.decode(&URL_SAFE_NO_PAD.encode([0u8; 8])),
            Err(TokenError::Invalid)
        );
    }

    #[test]
    fn test_from_hex() {
        let key_hex = "00".repeat(32);
        assert!(TokenCodec::from_hex(&key_hex).is_ok());

        assert_eq!(
            TokenCodec::from_hex("deadbeef").unwrap_err(),
            TokenError::InvalidKey
        );
        assert_eq!(
            TokenCodec::from_hex("zz".repeat(32).as_str()).unwrap_err(),
            TokenError::InvalidKey
        );
    }

    #[test]
    fn test_from_config() {
        let config = PaginationConfig {
            default_ttl_minutes: 30,
            encryption_key: Some("11".repeat(32)),
        };
        let codec = TokenCodec::from_config(&config).unwrap();
        let token = codec.encode(&sample_params(), 30).unwrap();
        assert!(codec.decode(&token).is_ok());

        // No configured key falls back to an ephemeral one that still works
        // within the process
        let ephemeral = TokenCodec::from_config(&PaginationConfig {
            default_ttl_minutes: 30,
            encryption_key: None,
        })
        .unwrap();
        let token = ephemeral.encode(&sample_params(), 30).unwrap();
        assert!(ephemeral.decode(&token).is_ok());
        // But a differently keyed codec cannot read it
        assert!(codec.decode(&token).is_err());
    }
}
