//! Account registration and login.

use std::sync::Arc;

use domains::ports::{PasswordHasher, Store, TokenService, UserRepo};
use domains::{Actor, DomainError, IssuedToken, NewUser, Result, User};
use tracing::{debug, info, instrument};

/// How a login identifier is resolved to an account.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginIdentifier<'a> {
    StudentId(&'a str),
    Email(&'a str),
}

impl<'a> LoginIdentifier<'a> {
    /// All-digit input is a student id; anything else is treated as an email.
    pub fn classify(raw: &'a str) -> Self {
        let raw = raw.trim();
        if !raw.is_empty() && raw.bytes().all(|b| b.is_ascii_digit()) {
            LoginIdentifier::StudentId(raw)
        } else {
            LoginIdentifier::Email(raw)
        }
    }
}

#[derive(Clone)]
pub struct Registration {
    /// Display name; defaults to the local part of the email.
    pub name: Option<String>,
    pub email: String,
    pub student_id: Option<String>,
    pub password: String,
}

pub struct UserService {
    store: Arc<dyn Store>,
    hasher: Arc<dyn PasswordHasher>,
    tokens: Arc<dyn TokenService>,
}

impl UserService {
    pub fn new(
        store: Arc<dyn Store>,
        hasher: Arc<dyn PasswordHasher>,
        tokens: Arc<dyn TokenService>,
    ) -> Self {
        Self { store, hasher, tokens }
    }

    /// The password is hashed before the transaction opens so the store is
    /// never held across argon2.
    #[instrument(skip_all)]
    pub async fn register(&self, req: Registration) -> Result<User> {
        let password_hash = self.hasher.hash(&req.password).await?;
        let mut tx = self.store.begin().await?;

        if tx.find_user_by_email(&req.email).await?.is_some() {
            debug!("email already registered");
            return Err(DomainError::AlreadyExists("user already exists".into()));
        }
        if let Some(student_id) = req.student_id.as_deref() {
            if tx.find_user_by_student_id(student_id).await?.is_some() {
                debug!("student id already registered");
                return Err(DomainError::AlreadyExists("user already exists".into()));
            }
        }

        let name = req.name.unwrap_or_else(|| {
            req.email
                .split('@')
                .next()
                .unwrap_or_default()
                .to_string()
        });

        let user = tx
            .insert_user(NewUser {
                name,
                email: req.email,
                student_id: req.student_id,
                password_hash,
            })
            .await?;
        tx.commit().await?;

        info!(user_id = user.id, "user registered");
        Ok(user)
    }

    /// Verifies credentials and issues a bearer token.
    #[instrument(skip_all)]
    pub async fn login(&self, identifier: &str, password: &str) -> Result<IssuedToken> {
        let mut tx = self.store.begin().await?;
        let user = match LoginIdentifier::classify(identifier) {
            LoginIdentifier::StudentId(student_id) => tx.find_user_by_student_id(student_id).await?,
            LoginIdentifier::Email(email) => tx.find_user_by_email(email).await?,
        };
        tx.commit().await?;

        let Some(user) = user else {
            debug!("no account for identifier");
            // Same argon2 cost as a real verify, so timing does not reveal the miss.
            let _ = self.hasher.hash(password).await;
            return Err(DomainError::FailedLogin);
        };
        if !self.hasher.verify(&user.password_hash, password).await? {
            debug!(user_id = user.id, "password mismatch");
            return Err(DomainError::FailedLogin);
        }

        let token = self.tokens.issue(&Actor {
            user_id: user.id,
            student_id: user.student_id.clone(),
            role: user.role,
        })?;
        info!(user_id = user.id, "login succeeded");
        Ok(token)
    }

    /// Decodes a bearer token into the acting user.
    pub fn authenticate(&self, token: &str) -> Result<Actor> {
        self.tokens.verify(token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn digits_route_to_student_id() {
        assert_eq!(
            LoginIdentifier::classify("2101234567"),
            LoginIdentifier::StudentId("2101234567")
        );
    }

    #[test]
    fn emails_and_mixed_input_route_to_email() {
        assert_eq!(
            LoginIdentifier::classify("ana@example.com"),
            LoginIdentifier::Email("ana@example.com")
        );
        assert_eq!(LoginIdentifier::classify("21a0"), LoginIdentifier::Email("21a0"));
        assert_eq!(LoginIdentifier::classify(""), LoginIdentifier::Email(""));
    }
}
