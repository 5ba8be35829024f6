use anyhow::{anyhow, Result};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::user::UserRole;

/// Bearer token claims.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String, // user id
    pub email: String,
    pub role: UserRole,
    pub iat: i64,
    pub exp: i64,
}

impl Claims {
    pub fn user_id(&self) -> Result<Uuid> {
        Uuid::parse_str(&self.sub).map_err(|e| anyhow!("Invalid subject in token: {e}"))
    }
}

/// Issues and verifies HS256 access tokens.
#[derive(Clone)]
pub struct TokenIssuer {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    lifetime: Duration,
}

impl TokenIssuer {
    pub fn new(secret: &str, lifetime_hours: i64) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            lifetime: Duration::hours(lifetime_hours),
        }
    }

    pub fn issue(&self, user_id: Uuid, email: &str, role: UserRole) -> Result<String> {
        let now = Utc::now();
        let claims = Claims {
            sub: user_id.to_string(),
            email: email.to_string(),
            role,
            iat: now.timestamp(),
            exp: (now + self.lifetime).timestamp(),
        };
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| anyhow!("Failed to encode access token: {e}"))
    }

    /// Checks signature and expiry.
    pub fn verify(&self, token: &str) -> Result<Claims> {
        let validation = Validation::new(Algorithm::HS256);
        decode::<Claims>(token, &self.decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(|e| anyhow!("Invalid token: {e}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_issue_then_verify() {
        let issuer = TokenIssuer::new("test-secret", 1);
        let user_id = Uuid::new_v4();
        let token = issuer
            .issue(user_id, "participant@sahpra.org.za", UserRole::Participant)
            .expect("token");
        let claims = issuer.verify(&token).expect("claims");
        assert_eq!(claims.user_id().unwrap(), user_id);
        assert_eq!(claims.role, UserRole::Participant);
        assert!(claims.exp > claims.iat);
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let token = TokenIssuer::new("secret-a", 1)
            .issue(Uuid::new_v4(), "a@b.org", UserRole::Facilitator)
            .unwrap();
        assert!(TokenIssuer::new("secret-b", 1).verify(&token).is_err());
    }

    #[test]
    fn test_expired_token_rejected() {
        // Past the default 60s leeway.
        let issuer = TokenIssuer::new("secret", -1);
        let token = issuer
            .issue(Uuid::new_v4(), "a@b.org", UserRole::SystemAdmin)
            .unwrap();
        assert!(issuer.verify(&token).is_err());
    }

    #[test]
    fn test_garbage_rejected() {
        assert!(TokenIssuer::new("secret", 1).verify("not.a.token").is_err());
    }
}
