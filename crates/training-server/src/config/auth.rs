//! Auth provider configuration.

use serde::Deserialize;
use uuid::Uuid;

/// Auth configuration loaded from environment variables.
///
/// Environment variables are prefixed with `AUTH_`:
/// - `AUTH_PROVIDER_URL`: Base URL of the hosted auth provider
/// - `AUTH_API_KEY`: Public API key sent as the `apikey` header
/// - `AUTH_SESSION_TTL_SECS`: How long a validated session is cached (default: 300)
/// - `AUTH_REQUEST_TIMEOUT_SECS`: Provider request timeout (default: 10)
/// - `AUTH_BYPASS`: Skip provider validation (development only)
/// - `AUTH_BYPASS_USER_ID`, `AUTH_BYPASS_EMAIL`, `AUTH_BYPASS_PLANT_ID`,
///   `AUTH_BYPASS_ROLES`: Identity used while bypass is enabled
#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    /// Auth provider base URL
    #[serde(default = "default_provider_url")]
    pub provider_url: String,

    /// Provider API key
    #[serde(default)]
    pub api_key: String,

    /// Session cache TTL in seconds
    #[serde(default = "default_session_ttl")]
    pub session_ttl_secs: u64,

    /// Provider request timeout in seconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// Development bypass
    #[serde(default)]
    pub bypass: bool,

    /// Bypass identity: user id
    #[serde(default)]
    pub bypass_user_id: Option<String>,

    /// Bypass identity: email
    #[serde(default = "default_bypass_email")]
    pub bypass_email: String,

    /// Bypass identity: plant id
    #[serde(default)]
    pub bypass_plant_id: Option<String>,

    /// Bypass identity: admin roles
    #[serde(default = "default_bypass_roles")]
    pub bypass_roles: Vec<String>,
}

fn default_provider_url() -> String {
    "http://localhost:54321".to_string()
}

fn default_session_ttl() -> u64 {
    300
}

fn default_request_timeout() -> u64 {
    10
}

fn default_bypass_email() -> String {
    "dev@localhost".to_string()
}

fn default_bypass_roles() -> Vec<String> {
    vec!["dev_admin".to_string()]
}

impl AuthConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, envy::Error> {
        envy::prefixed("AUTH_").from_env::<AuthConfig>()
    }

    /// Endpoint returning the user behind an access token.
    pub fn user_endpoint(&self) -> String {
        format!("{}/auth/v1/user", self.provider_url.trim_end_matches('/'))
    }

    /// Bypass user id, nil when unset or malformed.
    pub fn bypass_user_uuid(&self) -> Uuid {
        parse_or_nil(self.bypass_user_id.as_deref())
    }

    /// Bypass plant id, nil when unset or malformed.
    pub fn bypass_plant_uuid(&self) -> Uuid {
        parse_or_nil(self.bypass_plant_id.as_deref())
    }
}

fn parse_or_nil(value: Option<&str>) -> Uuid {
    value
        .and_then(|v| Uuid::parse_str(v.trim()).ok())
        .unwrap_or_else(Uuid::nil)
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            provider_url: default_provider_url(),
            api_key: String::new(),
            session_ttl_secs: default_session_ttl(),
            request_timeout_secs: default_request_timeout(),
            bypass: false,
            bypass_user_id: None,
            bypass_email: default_bypass_email(),
            bypass_plant_id: None,
            bypass_roles: default_bypass_roles(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AuthConfig::default();
        assert_eq!(config.session_ttl_secs, 300);
        assert!(!config.bypass);
        assert_eq!(config.bypass_roles, vec!["dev_admin".to_string()]);
    }

    #[test]
    fn test_user_endpoint_trims_slash() {
        let config = AuthConfig {
            provider_url: "https://auth.example.com/".to_string(),
            ..AuthConfig::default()
        };
        assert_eq!(config.user_endpoint(), "https://auth.example.com/auth/v1/user");
    }

    #[test]
    fn test_bypass_ids() {
        let id = Uuid::new_v4();
        let config = AuthConfig {
            bypass_user_id: Some(id.to_string()),
            bypass_plant_id: Some("not-a-uuid".to_string()),
            ..AuthConfig::default()
        };
        assert_eq!(config.bypass_user_uuid(), id);
        assert!(config.bypass_plant_uuid().is_nil());
    }
}
