use dotenvy::dotenv;
use std::env;
use std::time::Duration;

use crate::error::AppError;

/// Key material used to verify bearer credentials.
#[derive(Debug, Clone)]
pub enum JwtKey {
    /// RS256 public key (PEM), as issued by the identity service.
    RsaPublicPem(String),
    /// HS256 shared secret, for local development.
    Secret(String),
}

#[derive(Debug, Clone)]
pub struct WebSocketConfig {
    pub heartbeat_interval: Duration,
    pub client_timeout: Duration,
}

impl Default for WebSocketConfig {
    fn default() -> Self {
        Self {
            heartbeat_interval: Duration::from_secs(5),
            client_timeout: Duration::from_secs(30),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub db_max_connections: u32,
    pub port: u16,
    pub jwt_key: JwtKey,
    pub notification_webhook_url: Option<String>,
    pub ws: WebSocketConfig,
}

impl Config {
    pub fn from_env() -> Result<Self, AppError> {
        dotenv().ok();

        let database_url =
            env::var("DATABASE_URL").map_err(|_| AppError::Config("DATABASE_URL missing".into()))?;
        let db_max_connections = env::var("DB_MAX_CONNECTIONS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(10);
        let port = env::var("PORT")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(3000);

        let jwt_key = match crypto_core::jwt::load_validation_key()
            .map_err(|e| AppError::Config(format!("JWT public key: {e}")))?
        {
            Some(pem) => JwtKey::RsaPublicPem(pem),
            None => match env::var("JWT_SECRET") {
                Ok(secret) if !secret.trim().is_empty() => {
                    tracing::warn!("JWT_SECRET set: using HS256 validation (development only)");
                    JwtKey::Secret(secret)
                }
                _ => {
                    return Err(AppError::Config(
                        "JWT_PUBLIC_KEY_PEM, JWT_PUBLIC_KEY_FILE or JWT_SECRET must be set".into(),
                    ))
                }
            },
        };

        let notification_webhook_url = env::var("NOTIFICATION_WEBHOOK_URL")
            .ok()
            .filter(|s| !s.trim().is_empty());

        let defaults = WebSocketConfig::default();
        let ws = WebSocketConfig {
            heartbeat_interval: duration_secs("WS_HEARTBEAT_INTERVAL_SECS")
                .unwrap_or(defaults.heartbeat_interval),
            client_timeout: duration_secs("WS_CLIENT_TIMEOUT_SECS")
                .unwrap_or(defaults.client_timeout),
        };
        if ws.client_timeout <= ws.heartbeat_interval {
            return Err(AppError::Config(
                "WS_CLIENT_TIMEOUT_SECS must be greater than WS_HEARTBEAT_INTERVAL_SECS".into(),
            ));
        }

        Ok(Self {
            database_url,
            db_max_connections,
            port,
            jwt_key,
            notification_webhook_url,
            ws,
        })
    }

    pub fn test_defaults() -> Self {
        Self {
            database_url: "postgres://localhost/marketplace_test".into(),
            db_max_connections: 2,
            port: 0,
            jwt_key: JwtKey::Secret("test-secret".into()),
            notification_webhook_url: None,
            ws: WebSocketConfig::default(),
        }
    }
}

fn duration_secs(var: &str) -> Option<Duration> {
    env::var(var)
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .filter(|secs| *secs > 0)
        .map(Duration::from_secs)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_websocket_defaults() {
        let ws = WebSocketConfig::default();
        assert_eq!(ws.heartbeat_interval, Duration::from_secs(5));
        assert_eq!(ws.client_timeout, Duration::from_secs(30));
    }

    #[test]
    fn test_test_defaults_use_shared_secret() {
        let cfg = Config::test_defaults();
        assert!(matches!(cfg.jwt_key, JwtKey::Secret(_)));
        assert!(cfg.notification_webhook_url.is_none());
    }
}
