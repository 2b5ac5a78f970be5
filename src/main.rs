mod config;
mod models;
mod providers;
mod services;
mod ui;

use std::sync::Arc;

use anyhow::Result;
use tracing_subscriber::EnvFilter;

use crate::providers::{HttpIdentityGateway, HttpModelBackend};
use crate::services::store::shared_store;
use crate::services::{
    ChatManager, CredentialStore, Database, FeedbackService, MessageDispatcher, SessionResolver,
};
use crate::ui::repl::Repl;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cfg = config::Config::from_env();

    let db = Database::new().await?;

    let credentials = match CredentialStore::new().await {
        Ok(store) => Some(store),
        Err(e) => {
            tracing::warn!("Keyring unavailable, sessions will not persist: {}", e);
            None
        }
    };

    let gateway = Arc::new(HttpIdentityGateway::new(cfg.auth_base_url.clone()));
    let resolver =
        Arc::new(SessionResolver::resolve(db.clone(), gateway, credentials).await?);

    let mut identity_events = resolver.subscribe();
    tokio::spawn(async move {
        while identity_events.changed().await.is_ok() {
            let authenticated = identity_events.borrow_and_update().is_authenticated();
            tracing::info!(authenticated, "identity changed");
        }
    });

    let backend = Arc::new(HttpModelBackend::new(
        cfg.model_base_url.clone(),
        cfg.model_api_key.clone(),
    ));

    let chats = Arc::new(ChatManager::new(db.clone(), resolver.clone()));
    let dispatcher = MessageDispatcher::new(
        shared_store(),
        backend,
        db.clone(),
        resolver.clone(),
        chats.clone(),
    );
    dispatcher.restore_view().await?;

    let feedback = FeedbackService::new(db, resolver.clone());

    Repl::new(dispatcher, resolver, chats, feedback).run().await
}
