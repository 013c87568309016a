//! Client for the hosted auth provider.
//!
//! Sessions are issued by the provider; the server only asks it who an
//! access token belongs to.

use reqwest::StatusCode;
use serde::Deserialize;
use std::time::Duration;
use uuid::Uuid;

use crate::config::AuthConfig;
use crate::error::{AppError, AppResult};

/// User as reported by the provider.
#[derive(Debug, Clone, Deserialize)]
pub struct ProviderUser {
    pub id: Uuid,
    #[serde(default)]
    pub email: Option<String>,
}

/// HTTP client for the provider's user endpoint.
#[derive(Debug, Clone)]
pub struct AuthProvider {
    client: reqwest::Client,
    user_endpoint: String,
    api_key: String,
}

impl AuthProvider {
    pub fn new(config: &AuthConfig) -> AppResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| AppError::Config(format!("Failed to build auth client: {}", e)))?;

        Ok(Self {
            client,
            user_endpoint: config.user_endpoint(),
            api_key: config.api_key.clone(),
        })
    }

    /// Resolve an access token to its user.
    ///
    /// Rejected tokens are `AppError::Auth`; provider outages are
    /// `AppError::ExternalService`.
    pub async fn fetch_user(&self, access_token: &str) -> AppResult<ProviderUser> {
        let response = self
            .client
            .get(&self.user_endpoint)
            .header("apikey", &self.api_key)
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(|e| AppError::ExternalService(format!("Auth provider unreachable: {}", e)))?;

        match response.status() {
            s if s.is_success() => {
                let user = response.json::<ProviderUser>().await.map_err(|e| {
                    AppError::ExternalService(format!("Invalid auth provider response: {}", e))
                })?;
                Ok(user)
            }
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                Err(AppError::Auth("Invalid or expired session".to_string()))
            }
            s => Err(AppError::ExternalService(format!(
                "Auth provider returned {}",
                s
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_user_deserialization() {
        let id = Uuid::new_v4();
        let json = format!(
            r#"{{"id": "{}", "email": "tech@specchem.com", "aud": "authenticated", "role": "authenticated"}}"#,
            id
        );
        let user: ProviderUser = serde_json::from_str(&json).unwrap();
        assert_eq!(user.id, id);
        assert_eq!(user.email.as_deref(), Some("tech@specchem.com"));
    }

    #[test]
    fn test_new_uses_config_endpoint() {
        let config = AuthConfig {
            provider_url: "https://auth.specchem.test".to_string(),
            ..AuthConfig::default()
        };
        let provider = AuthProvider::new(&config).unwrap();
        assert_eq!(provider.user_endpoint, "https://auth.specchem.test/auth/v1/user");
    }
}
