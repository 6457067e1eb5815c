//! # seed
//!
//! Creates a demo account and a demo forum through the services, against the
//! configured database. Safe to run repeatedly.

use std::sync::Arc;

use anyhow::{bail, Context};
use auth_adapters::{Argon2Hasher, JwtTokenService};
use configs::Settings;
use domains::{DomainError, NewForum};
use secrecy::ExposeSecret;
use services::{Registration, Services};
use storage_adapters::PgStore;
use tracing::info;
use tracing_subscriber::EnvFilter;

const DEMO_EMAIL: &str = "demo@talkboard.local";
const DEMO_STUDENT_ID: &str = "2100000001";
const DEMO_PASSWORD: &str = "talkboard-demo";
const DEMO_FORUM: &str = "General";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let settings = Settings::load().context("loading configuration")?;
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&settings.log.filter)),
        )
        .init();

    let Some(url) = settings.database.url.as_ref() else {
        bail!("database.url must be set to seed a database");
    };
    let store = PgStore::connect(url.expose_secret(), settings.database.max_connections).await?;
    store.migrate().await?;

    let services = Services::new(
        Arc::new(store),
        Arc::new(Argon2Hasher::new()),
        Arc::new(JwtTokenService::new(
            &settings.auth.jwt_secret,
            chrono::Duration::seconds(settings.auth.token_ttl_secs),
        )),
    );

    match services
        .users
        .register(Registration {
            name: Some("Demo".into()),
            email: DEMO_EMAIL.into(),
            student_id: Some(DEMO_STUDENT_ID.into()),
            password: DEMO_PASSWORD.into(),
        })
        .await
    {
        Ok(user) => info!(user_id = user.id, "demo user created"),
        Err(DomainError::AlreadyExists(_)) => info!("demo user already present"),
        Err(err) => return Err(err.into()),
    }

    let issued = services.users.login(DEMO_EMAIL, DEMO_PASSWORD).await?;
    let actor = services.users.authenticate(&issued.token)?;

    match services
        .forums
        .create_forum(
            &actor,
            NewForum {
                name: DEMO_FORUM.into(),
                introduction: "Say hello.".into(),
                category: Some("general".into()),
            },
        )
        .await
    {
        Ok(forum) => info!(forum_id = forum.id, "demo forum created"),
        Err(DomainError::AlreadyExists(_)) => info!("demo forum already present"),
        Err(err) => return Err(err.into()),
    }

    info!(email = DEMO_EMAIL, "seed complete");
    Ok(())
}
