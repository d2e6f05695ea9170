use async_trait::async_trait;
use crypto_core::jwt::JwtValidator;
use uuid::Uuid;

use crate::error::IdentityError;

/// Resolves a bearer credential to the user it was issued to.
#[async_trait]
pub trait IdentityVerifier: Send + Sync {
    async fn verify(&self, token: &str) -> Result<Uuid, IdentityError>;
}

/// Verifies identity-service access tokens locally against the configured key.
#[derive(Clone)]
pub struct JwtIdentityVerifier {
    validator: JwtValidator,
}

impl JwtIdentityVerifier {
    pub fn new(validator: JwtValidator) -> Self {
        Self { validator }
    }
}

#[async_trait]
impl IdentityVerifier for JwtIdentityVerifier {
    async fn verify(&self, token: &str) -> Result<Uuid, IdentityError> {
        self.validator.user_id(token).map_err(|e| {
            tracing::debug!(error = %e, "credential rejected");
            IdentityError::Invalid(e.to_string())
        })
    }
}
