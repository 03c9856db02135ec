//! Signed, self-contained access credentials.
//!
//! A credential is an HS256 JWT carrying the token identity and an absolute
//! expiry. The codec checks signature and expiry on its own; whether the
//! identity is still live is the [`TokenStore`](crate::token_store::TokenStore)'s call.

use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::error::CodecError;

/// Opaque token identity: a random 128-bit UUID rendered as a string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TokenId(String);

impl TokenId {
    /// Mint a fresh identity.
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for TokenId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl fmt::Display for TokenId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    token_id: TokenId,
    exp: u64,
}

/// Absolute expiry `ttl` from now, truncated to whole seconds so the
/// credential claim and the store record agree exactly.
pub fn expiry_after(ttl: Duration) -> DateTime<Utc> {
    let ttl_secs = i64::try_from(ttl.as_secs()).unwrap_or(i64::MAX);
    let secs = Utc::now().timestamp().saturating_add(ttl_secs);
    DateTime::from_timestamp(secs, 0).unwrap_or(DateTime::<Utc>::MAX_UTC)
}

/// Issues and verifies credentials with a process-wide symmetric key.
#[derive(Clone)]
pub struct TokenCodec {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
}

impl fmt::Debug for TokenCodec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenCodec")
            .field("algorithm", &Algorithm::HS256)
            .field("secret", &"[REDACTED]")
            .finish()
    }
}

impl TokenCodec {
    pub fn new(secret: &[u8]) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp"]);

        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            validation,
        }
    }

    /// Sign a credential for `identity` that expires `ttl` from now.
    pub fn issue(&self, identity: &TokenId, ttl: Duration) -> Result<String, CodecError> {
        self.issue_until(identity, expiry_after(ttl))
    }

    /// Sign a credential for `identity` with an explicit expiry claim.
    pub fn issue_until(
        &self,
        identity: &TokenId,
        expires_at: DateTime<Utc>,
    ) -> Result<String, CodecError> {
        let claims = Claims {
            token_id: identity.clone(),
            exp: u64::try_from(expires_at.timestamp()).unwrap_or(0),
        };
        jsonwebtoken::encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| CodecError::Signing(e.to_string()))
    }

    /// Check signature and expiry, returning the embedded identity.
    pub fn verify(&self, credential: &str) -> Result<TokenId, CodecError> {
        let data = jsonwebtoken::decode::<Claims>(credential, &self.decoding, &self.validation)
            .map_err(|e| match e.kind() {
                ErrorKind::InvalidSignature => CodecError::InvalidSignature,
                ErrorKind::ExpiredSignature => CodecError::Expired,
                _ => CodecError::Malformed(e.to_string()),
            })?;

        // The library accepts exp == now; a credential is dead at its expiry instant.
        let now = u64::try_from(Utc::now().timestamp()).unwrap_or(0);
        if data.claims.exp <= now {
            return Err(CodecError::Expired);
        }

        Ok(data.claims.token_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &[u8] = b"0123456789abcdef0123456789abcdef";

    #[test]
    fn test_issue_then_verify_returns_identity() {
        let codec = TokenCodec::new(SECRET);
        let id = TokenId::generate();
        let credential = codec.issue(&id, Duration::from_secs(3600)).unwrap();
        assert_eq!(codec.verify(&credential).unwrap(), id);
    }

    #[test]
    fn test_identities_are_unique() {
        let a = TokenId::generate();
        let b = TokenId::generate();
        assert_ne!(a, b);
        assert_eq!(a.as_str().len(), 36);
    }

    #[test]
    fn test_past_expiry_is_rejected() {
        let codec = TokenCodec::new(SECRET);
        let id = TokenId::generate();
        let expired_at = Utc::now() - chrono::Duration::seconds(5);
        let credential = codec.issue_until(&id, expired_at).unwrap();
        assert_eq!(codec.verify(&credential), Err(CodecError::Expired));
    }

    #[test]
    fn test_expiry_at_current_second_is_rejected() {
        let codec = TokenCodec::new(SECRET);
        let credential = codec
            .issue_until(&TokenId::generate(), expiry_after(Duration::ZERO))
            .unwrap();
        assert_eq!(codec.verify(&credential), Err(CodecError::Expired));
    }

    #[test]
    fn test_wrong_key_is_invalid_signature() {
        let issuer = TokenCodec::new(SECRET);
        let other = TokenCodec::new(b"a-completely-different-signing-key");
        let credential = issuer
            .issue(&TokenId::generate(), Duration::from_secs(60))
            .unwrap();
        assert_eq!(other.verify(&credential), Err(CodecError::InvalidSignature));
    }

    #[test]
    fn test_garbage_is_malformed() {
        let codec = TokenCodec::new(SECRET);
        assert!(matches!(codec.verify("not-a-token"), Err(CodecError::Malformed(_))));
        assert!(matches!(codec.verify(""), Err(CodecError::Malformed(_))));
        assert!(matches!(codec.verify("a.b.c"), Err(CodecError::Malformed(_))));
    }

    #[test]
    fn test_tampered_bytes_never_verify() {
        let codec = TokenCodec::new(SECRET);
        let credential = codec
            .issue(&TokenId::generate(), Duration::from_secs(3600))
            .unwrap();

        for i in 0..credential.len() {
            let mut bytes = credential.clone().into_bytes();
            bytes[i] = if bytes[i] == b'A' { b'B' } else { b'A' };
            let tampered = String::from_utf8(bytes).unwrap();
            match codec.verify(&tampered) {
                Err(CodecError::InvalidSignature) | Err(CodecError::Malformed(_)) => {}
                other => panic!("byte {i} flip produced {other:?}"),
            }
        }
    }

    #[test]
    fn test_debug_redacts_secret() {
        let codec = TokenCodec::new(SECRET);
        let rendered = format!("{codec:?}");
        assert!(rendered.contains("[REDACTED]"));
        assert!(!rendered.contains("0123456789abcdef"));
    }
}
