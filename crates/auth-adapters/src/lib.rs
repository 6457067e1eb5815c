//! # auth-adapters
//!
//! Password hashing and bearer tokens for the `PasswordHasher` and
//! `TokenService` ports.

pub mod argon;
#[cfg(feature = "auth-jwt")]
pub mod jwt;

pub use argon::Argon2Hasher;
#[cfg(feature = "auth-jwt")]
pub use jwt::JwtTokenService;
