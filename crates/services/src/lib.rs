//! # services
//!
//! The authorization and mutation rule engine. Each operation opens one
//! store transaction, runs its gates, performs its writes and commits; an
//! early return drops the transaction and rolls everything back.

pub mod forum;
pub mod rules;
pub mod thread;
pub mod user;

use std::sync::Arc;

use domains::ports::{PasswordHasher, Store, TokenService};

pub use forum::ForumService;
pub use rules::parse_id;
pub use thread::ThreadService;
pub use user::{LoginIdentifier, Registration, UserService};

/// All services, composed from the same adapters.
pub struct Services {
    pub users: UserService,
    pub forums: ForumService,
    pub threads: ThreadService,
}

impl Services {
    pub fn new(
        store: Arc<dyn Store>,
        hasher: Arc<dyn PasswordHasher>,
        tokens: Arc<dyn TokenService>,
    ) -> Self {
        Self {
            users: UserService::new(store.clone(), hasher, tokens),
            forums: ForumService::new(store.clone()),
            threads: ThreadService::new(store),
        }
    }
}
