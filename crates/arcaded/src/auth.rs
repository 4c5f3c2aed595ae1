//! Authentication
//!
//! Teacher bearer tokens are HS256 JWTs signed by the identity provider
//! with a shared secret; we only verify. Player tokens are opaque 128-bit
//! random values minted at join and held in actor state, never persisted.

use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use rand::Rng;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use arcade_core::protocol::constants::PLAYER_TOKEN_BYTES;

#[derive(Error, Debug)]
pub enum AuthError {
    #[error("Missing bearer token")]
    Missing,

    #[error("Invalid bearer token")]
    Invalid,
}

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    sub: String,
    exp: usize,
}

/// Verifies teacher bearer tokens
#[derive(Clone)]
pub struct TeacherAuth {
    decoding_key: DecodingKey,
    encoding_key: EncodingKey,
    validation: Validation,
}

impl TeacherAuth {
    pub fn new(secret: &str) -> Self {
        Self {
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            validation: Validation::new(Algorithm::HS256),
        }
    }

    /// Verify a raw token and return the teacher id (`sub` claim)
    pub fn verify_token(&self, token: &str) -> Result<String, AuthError> {
        jsonwebtoken::decode::<Claims>(token, &self.decoding_key, &self.validation)
            .map(|data| data.claims.sub)
            .map_err(|_| AuthError::Invalid)
    }

    /// Extract and verify an `Authorization: Bearer ...` header value
    pub fn verify_bearer(&self, header: Option<&str>) -> Result<String, AuthError> {
        let header = header.ok_or(AuthError::Missing)?;
        let token = header.strip_prefix("Bearer ").ok_or(AuthError::Missing)?;
        self.verify_token(token)
    }

    /// Sign a token for the given teacher id. The identity provider does
    /// this in production; the daemon only uses it for tooling and tests.
    pub fn sign(&self, teacher_id: &str, ttl_seconds: u64) -> anyhow::Result<String> {
        let exp = chrono::Utc::now().timestamp() as usize + ttl_seconds as usize;
        let claims = Claims {
            sub: teacher_id.to_string(),
            exp,
        };
        let token =
            jsonwebtoken::encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)?;
        Ok(token)
    }
}

/// Mint an opaque player token: 128 bits of CSPRNG entropy, hex-encoded
pub fn mint_player_token() -> String {
    let mut bytes = [0u8; PLAYER_TOKEN_BYTES];
    rand::rng().fill(&mut bytes[..]);
    hex::encode(bytes)
}
