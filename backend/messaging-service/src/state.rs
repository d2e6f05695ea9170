use crate::{
    config::{Config, JwtKey},
    db,
    error::AppError,
    repository::PgMessageRepository,
    services::{
        directory::PgDirectory,
        identity::{IdentityVerifier, JwtIdentityVerifier},
        message_store::MessageStore,
        notifier::{LogNotifier, Notifier, WebhookNotifier},
    },
    websocket::{ConnectionRegistry, Gateway},
};
use crypto_core::jwt::JwtValidator;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub store: MessageStore,
    pub gateway: Gateway,
    pub identity: Arc<dyn IdentityVerifier>,
}

impl AppState {
    pub fn new(
        config: Arc<Config>,
        store: MessageStore,
        gateway: Gateway,
        identity: Arc<dyn IdentityVerifier>,
    ) -> Self {
        Self {
            config,
            store,
            gateway,
            identity,
        }
    }

    /// Wire the production object graph: Postgres storage, JWT verification
    /// and the configured notifier.
    pub async fn from_config(config: Arc<Config>) -> Result<Self, AppError> {
        let pool = db::init_pool(&config.database_url, config.db_max_connections)
            .await
            .map_err(|e| AppError::StartServer(format!("db: {e}")))?;
        db::run_migrations(&pool)
            .await
            .map_err(|e| AppError::StartServer(format!("database migrations failed: {e}")))?;

        let validator = match &config.jwt_key {
            JwtKey::RsaPublicPem(pem) => JwtValidator::from_rsa_pem(pem),
            JwtKey::Secret(secret) => JwtValidator::from_secret(secret.as_bytes()),
        }
        .map_err(|e| AppError::StartServer(format!("init jwt: {e}")))?;
        let identity: Arc<dyn IdentityVerifier> = Arc::new(JwtIdentityVerifier::new(validator));

        let notifier: Arc<dyn Notifier> = match &config.notification_webhook_url {
            Some(url) => {
                tracing::info!(endpoint = %url, "offline notifications via webhook");
                Arc::new(
                    WebhookNotifier::new(url.clone())
                        .map_err(|e| AppError::StartServer(format!("notifier: {e}")))?,
                )
            }
            None => Arc::new(LogNotifier),
        };

        let directory = Arc::new(PgDirectory::new(pool.clone()));
        let store = MessageStore::new(
            Arc::new(PgMessageRepository::new(pool)),
            directory.clone(),
            directory.clone(),
        );
        let gateway = Gateway::new(
            store.clone(),
            identity.clone(),
            directory,
            notifier,
            ConnectionRegistry::new(),
        );

        Ok(Self::new(config, store, gateway, identity))
    }
}
