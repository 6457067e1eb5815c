//! Shared fixtures: services wired to a fresh in-memory store.

#![allow(dead_code)]

use std::sync::Arc;

use auth_adapters::{Argon2Hasher, JwtTokenService};
use domains::ports::{PasswordHasher, TokenService};
use domains::{Actor, Forum, NewForum, Role, Thread};
use secrecy::SecretString;
use services::Services;
use storage_adapters::MemoryStore;

pub const JWT_SECRET: &str = "integration-secret";

pub struct Harness {
    pub store: MemoryStore,
    pub services: Services,
}

pub fn token_service() -> JwtTokenService {
    JwtTokenService::new(&SecretString::from(JWT_SECRET), chrono::Duration::hours(1))
}

impl Harness {
    pub fn new() -> Self {
        Self::with_ports(Arc::new(Argon2Hasher::new()), Arc::new(token_service()))
    }

    pub fn with_ports(hasher: Arc<dyn PasswordHasher>, tokens: Arc<dyn TokenService>) -> Self {
        Self::on_store(MemoryStore::new(), hasher, tokens)
    }

    pub fn on_store(
        store: MemoryStore,
        hasher: Arc<dyn PasswordHasher>,
        tokens: Arc<dyn TokenService>,
    ) -> Self {
        let services = Services::new(Arc::new(store.clone()), hasher, tokens);
        Self { store, services }
    }

    /// A regular account that exists in the store.
    pub async fn user(&self, name: &str) -> Actor {
        self.account(name, Role::User).await
    }

    pub async fn account(&self, name: &str, role: Role) -> Actor {
        let email = format!("{}@example.com", name.to_lowercase());
        let user_id = self.store.seed_user(name, &email, role, "unused").await;
        Actor {
            user_id,
            student_id: None,
            role,
        }
    }

    pub async fn forum(&self, owner: &Actor, name: &str) -> Forum {
        self.services
            .forums
            .create_forum(
                owner,
                NewForum {
                    name: name.to_string(),
                    introduction: format!("{name} introduction"),
                    category: Some("hobby".into()),
                },
            )
            .await
            .unwrap()
    }

    pub async fn thread(&self, author: &Actor, forum: &Forum, title: &str) -> Thread {
        self.services
            .threads
            .create_thread(author, &forum.id.to_string(), title.into(), "body".into())
            .await
            .unwrap()
    }
}
