//! HS256 bearer tokens.

use chrono::{Duration, Utc};
use domains::ports::TokenService;
use domains::{Actor, DomainError, IssuedToken, Result};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tracing::debug;

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    sub: String,
    iat: i64,
    exp: i64,
    user_id: i64,
    student_id: Option<String>,
    role: String,
}

pub struct JwtTokenService {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    ttl: Duration,
}

impl JwtTokenService {
    pub fn new(secret: &SecretString, ttl: Duration) -> Self {
        let key = secret.expose_secret().as_bytes();
        Self {
            encoding: EncodingKey::from_secret(key),
            decoding: DecodingKey::from_secret(key),
            validation: Validation::new(Algorithm::HS256),
            ttl,
        }
    }
}

impl TokenService for JwtTokenService {
    fn issue(&self, actor: &Actor) -> Result<IssuedToken> {
        let now = Utc::now();
        let expires_at = now + self.ttl;
        let claims = Claims {
            sub: actor.user_id.to_string(),
            iat: now.timestamp(),
            exp: expires_at.timestamp(),
            user_id: actor.user_id,
            student_id: actor.student_id.clone(),
            role: actor.role.as_str().to_string(),
        };
        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(DomainError::internal)?;
        Ok(IssuedToken { token, expires_at })
    }

    fn verify(&self, token: &str) -> Result<Actor> {
        let data = decode::<Claims>(token, &self.decoding, &self.validation).map_err(|err| {
            debug!(error = %err, "rejected bearer token");
            DomainError::Unauthorized
        })?;
        let claims = data.claims;
        let role = claims.role.parse().map_err(|_| DomainError::Unauthorized)?;
        Ok(Actor {
            user_id: claims.user_id,
            student_id: claims.student_id,
            role,
        })
    }
}
