use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::core::config::AuthConfig;

#[derive(Debug, thiserror::Error)]
pub enum JwtError {
    #[error("JWT secret is not configured")]
    NotConfigured,
    #[error("Token validation failed: {0}")]
    Invalid(#[from] jsonwebtoken::errors::Error),
    #[error("Subject is not a valid user id: {0}")]
    InvalidSubject(String),
}

/// Claims carried by a Supabase Auth access token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub aud: String,
    pub exp: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iat: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
}

impl Claims {
    pub fn user_id(&self) -> Result<Uuid, JwtError> {
        Uuid::parse_str(&self.sub).map_err(|_| JwtError::InvalidSubject(self.sub.clone()))
    }
}

#[derive(Clone)]
pub struct SupabaseJwt {
    decoding_key: Option<DecodingKey>,
    validation: Validation,
}

impl std::fmt::Debug for SupabaseJwt {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SupabaseJwt")
            .field("configured", &self.decoding_key.is_some())
            .finish()
    }
}

impl SupabaseJwt {
    pub fn new(config: &AuthConfig) -> Self {
        let decoding_key = if config.jwt_secret.is_empty() {
            None
        } else {
            Some(DecodingKey::from_secret(config.jwt_secret.as_bytes()))
        };

        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_audience(&[config.audience.as_str()]);
        validation.leeway = 30;

        Self {
            decoding_key,
            validation,
        }
    }

    pub fn verify(&self, token: &str) -> Result<Claims, JwtError> {
        let key = self.decoding_key.as_ref().ok_or(JwtError::NotConfigured)?;
        let data = decode::<Claims>(token, key, &self.validation)?;
        Ok(data.claims)
    }
}

pub fn extract_bearer_token(auth_header: &str) -> Option<&str> {
    auth_header
        .strip_prefix("Bearer ")
        .or_else(|| auth_header.strip_prefix("bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{encode, EncodingKey, Header};

    const SECRET: &str = "super-secret-jwt-token-with-at-least-32-characters";

    fn auth_config() -> AuthConfig {
        AuthConfig {
            jwt_secret: SECRET.to_string(),
            audience: "authenticated".to_string(),
        }
    }

    fn token_for(sub: &str, aud: &str, exp_offset: i64, secret: &str) -> String {
        let claims = Claims {
            sub: sub.to_string(),
            aud: aud.to_string(),
            exp: chrono::Utc::now().timestamp() + exp_offset,
            iat: Some(chrono::Utc::now().timestamp()),
            email: Some("manager@example.com".to_string()),
            role: Some("authenticated".to_string()),
        };
        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .expect("encode token")
    }

    #[test]
    fn test_verify_valid_token() {
        let user_id = Uuid::new_v4();
        let jwt = SupabaseJwt::new(&auth_config());
        let token = token_for(&user_id.to_string(), "authenticated", 3600, SECRET);

        let claims = jwt.verify(&token).expect("valid token");
        assert_eq!(claims.user_id().expect("uuid subject"), user_id);
        assert_eq!(claims.email.as_deref(), Some("manager@example.com"));
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let jwt = SupabaseJwt::new(&auth_config());
        let token = token_for(
            &Uuid::new_v4().to_string(),
            "authenticated",
            3600,
            "another-secret-that-is-also-long-enough",
        );
        assert!(matches!(jwt.verify(&token), Err(JwtError::Invalid(_))));
    }

    #[test]
    fn test_expired_token_rejected() {
        let jwt = SupabaseJwt::new(&auth_config());
        let token = token_for(&Uuid::new_v4().to_string(), "authenticated", -3600, SECRET);
        assert!(jwt.verify(&token).is_err());
    }

    #[test]
    fn test_wrong_audience_rejected() {
        let jwt = SupabaseJwt::new(&auth_config());
        let token = token_for(&Uuid::new_v4().to_string(), "anon", 3600, SECRET);
        assert!(jwt.verify(&token).is_err());
    }

    #[test]
    fn test_unconfigured_secret() {
        let jwt = SupabaseJwt::new(&AuthConfig::default());
        assert!(matches!(jwt.verify("a.b.c"), Err(JwtError::NotConfigured)));
    }

    #[test]
    fn test_extract_bearer_token() {
        assert_eq!(extract_bearer_token("Bearer abc.def"), Some("abc.def"));
        assert_eq!(extract_bearer_token("bearer abc"), Some("abc"));
        assert_eq!(extract_bearer_token("Bearer "), None);
        assert_eq!(extract_bearer_token("Basic abc"), None);
    }
}
