/// JWT validation for services that consume identity-service tokens.
///
/// Production deployments validate RS256 tokens against the identity
/// service's public key. HS256 with a shared secret is accepted for local
/// development and tests only; the service decides which one to build from
/// its configuration.
///
/// ## Usage
///
/// ```rust,ignore
/// use crypto_core::jwt::JwtValidator;
///
/// let pem = crypto_core::jwt::load_validation_key()?.expect("JWT_PUBLIC_KEY_PEM");
/// let validator = JwtValidator::from_rsa_pem(&pem)?;
/// let user_id = validator.user_id(token)?;
/// ```
use anyhow::{anyhow, Context, Result};
use jsonwebtoken::{decode, Algorithm, DecodingKey, TokenData, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Access tokens carry this `token_type`; refresh tokens are rejected.
const ACCESS_TOKEN_TYPE: &str = "access";

/// Claims consumed by downstream services.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    /// Subject (user ID as UUID string)
    pub sub: String,
    /// Issued at (Unix timestamp)
    #[serde(default)]
    pub iat: i64,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
    /// "access" or "refresh"; absent on tokens minted by older issuers
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_type: Option<String>,
}

/// Immutable validator built once at startup and shared behind an `Arc`.
#[derive(Clone)]
pub struct JwtValidator {
    decoding_key: DecodingKey,
    validation: Validation,
}

impl JwtValidator {
    /// RS256 validator from a PEM-encoded RSA public key.
    pub fn from_rsa_pem(public_key_pem: &str) -> Result<Self> {
        let decoding_key = DecodingKey::from_rsa_pem(public_key_pem.as_bytes())
            .map_err(|e| anyhow!("Invalid RSA public key PEM: {e}"))?;
        Ok(Self::with_key(decoding_key, Algorithm::RS256))
    }

    /// HS256 validator from a shared secret.
    pub fn from_secret(secret: &[u8]) -> Result<Self> {
        if secret.is_empty() {
            return Err(anyhow!("JWT secret must not be empty"));
        }
        Ok(Self::with_key(
            DecodingKey::from_secret(secret),
            Algorithm::HS256,
        ))
    }

    fn with_key(decoding_key: DecodingKey, algorithm: Algorithm) -> Self {
        let mut validation = Validation::new(algorithm);
        validation.validate_exp = true;
        Self {
            decoding_key,
            validation,
        }
    }

    /// Verify signature and expiry.
    pub fn validate(&self, token: &str) -> Result<TokenData<Claims>> {
        decode::<Claims>(token, &self.decoding_key, &self.validation)
            .map_err(|e| anyhow!("Token validation failed: {e}"))
    }

    /// Validate the token and return the user it was issued to.
    ///
    /// Refresh tokens are not accepted as credentials.
    pub fn user_id(&self, token: &str) -> Result<Uuid> {
        let token_data = self.validate(token)?;
        if let Some(token_type) = token_data.claims.token_type.as_deref() {
            if token_type != ACCESS_TOKEN_TYPE {
                return Err(anyhow!("Token type '{token_type}' is not an access token"));
            }
        }
        Uuid::parse_str(&token_data.claims.sub)
            .map_err(|e| anyhow!("Invalid user ID format in token: {e}"))
    }
}

/// Read the RS256 public key from `JWT_PUBLIC_KEY_PEM`, falling back to the
/// file named by `JWT_PUBLIC_KEY_FILE`. `Ok(None)` when neither is set.
pub fn load_validation_key() -> Result<Option<String>> {
    if let Ok(pem) = std::env::var("JWT_PUBLIC_KEY_PEM") {
        if !pem.trim().is_empty() {
            return Ok(Some(pem));
        }
    }

    match std::env::var("JWT_PUBLIC_KEY_FILE") {
        Ok(path) if !path.trim().is_empty() => {
            tracing::info!(jwt_public_key_file = %path, "loading JWT public key from file");
            let pem = std::fs::read_to_string(&path)
                .with_context(|| format!("read JWT public key file {path}"))?;
            Ok(Some(pem))
        }
        _ => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use jsonwebtoken::{encode, EncodingKey, Header};

    const SECRET: &[u8] = b"test-secret-do-not-use";

    fn mint(sub: &str, expires_in: Duration, token_type: Option<&str>) -> String {
        let now = Utc::now();
        let claims = Claims {
            sub: sub.to_string(),
            iat: now.timestamp(),
            exp: (now + expires_in).timestamp(),
            token_type: token_type.map(str::to_string),
        };
        encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(SECRET),
        )
        .unwrap()
    }

    #[test]
    fn test_valid_access_token_yields_user_id() {
        let validator = JwtValidator::from_secret(SECRET).unwrap();
        let user_id = Uuid::new_v4();
        let token = mint(&user_id.to_string(), Duration::hours(1), Some("access"));

        assert_eq!(validator.user_id(&token).unwrap(), user_id);
    }

    #[test]
    fn test_token_without_type_is_accepted() {
        let validator = JwtValidator::from_secret(SECRET).unwrap();
        let user_id = Uuid::new_v4();
        let token = mint(&user_id.to_string(), Duration::hours(1), None);

        assert_eq!(validator.user_id(&token).unwrap(), user_id);
    }

    #[test]
    fn test_refresh_token_is_rejected() {
        let validator = JwtValidator::from_secret(SECRET).unwrap();
        let token = mint(&Uuid::new_v4().to_string(), Duration::hours(1), Some("refresh"));

        assert!(validator.user_id(&token).is_err());
    }

    #[test]
    fn test_expired_token_is_rejected() {
        let validator = JwtValidator::from_secret(SECRET).unwrap();
        let token = mint(&Uuid::new_v4().to_string(), Duration::hours(-2), Some("access"));

        assert!(validator.validate(&token).is_err());
    }

    #[test]
    fn test_wrong_secret_is_rejected() {
        let validator = JwtValidator::from_secret(b"another-secret").unwrap();
        let token = mint(&Uuid::new_v4().to_string(), Duration::hours(1), None);

        assert!(validator.validate(&token).is_err());
    }

    #[test]
    fn test_non_uuid_subject_is_rejected() {
        let validator = JwtValidator::from_secret(SECRET).unwrap();
        let token = mint("not-a-uuid", Duration::hours(1), None);

        assert!(validator.user_id(&token).is_err());
    }

    #[test]
    fn test_garbage_inputs() {
        assert!(JwtValidator::from_secret(b"").is_err());
        assert!(JwtValidator::from_rsa_pem("not a pem").is_err());

        let validator = JwtValidator::from_secret(SECRET).unwrap();
        assert!(validator.validate("not.a.jwt").is_err());
        assert!(validator.validate("").is_err());
    }
}
