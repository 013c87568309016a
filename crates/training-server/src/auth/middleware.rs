use axum::{
    extract::{Request, State},
    http::HeaderMap,
    middleware::Next,
    response::Response,
};

use super::types::UserContext;
use super::AuthState;
use crate::db::models::{AdminRole, RoleGrant};
use crate::db::{begin_scoped, queries, PlantScope};
use crate::error::{AppError, AppResult};

/// Cookies the provider's browser client may store the access token in.
const TOKEN_COOKIES: [&str; 2] = ["sb-access-token", "session_token"];

/// Middleware to validate the session token and inject the user context.
pub async fn auth_middleware(
    State(state): State<AuthState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = match extract_session_token(request.headers()) {
        Some(token) => token.to_string(),
        None => {
            tracing::warn!(path = %request.uri().path(), "No session token provided");
            return Err(AppError::Auth("Missing authentication token".to_string()));
        }
    };

    let user = if state.config.bypass {
        tracing::warn!("AUTH BYPASS ENABLED - skipping session validation (dev mode)");
        bypass_context(&state)
    } else if let Some(cached) = state.sessions.get(&token).await {
        tracing::debug!(user_id = %cached.user_id, "Session cache hit");
        cached
    } else {
        let user = resolve_session(&state, &token).await?;
        state.sessions.insert(token, user.clone()).await;
        tracing::info!(user_id = %user.user_id, plant_id = %user.plant_id, "Authenticated user");
        user
    };

    request.extensions_mut().insert(user);
    Ok(next.run(request).await)
}

/// Validate the token with the provider and load the caller's profile.
async fn resolve_session(state: &AuthState, token: &str) -> AppResult<UserContext> {
    let provider_user = state.provider.fetch_user(token).await?;

    let mut tx = begin_scoped(&state.db, PlantScope::all_plants()).await?;
    let profile = queries::profile::get_profile(&mut tx, provider_user.id, None)
        .await?
        .ok_or_else(|| {
            tracing::warn!(user_id = %provider_user.id, "No training profile for user");
            AppError::Forbidden("No training profile for this account".to_string())
        })?;

    if !profile.is_active {
        tracing::warn!(user_id = %profile.id, "Deactivated user attempted access");
        return Err(AppError::Forbidden("Account is deactivated".to_string()));
    }

    let roles = queries::profile::list_roles(&mut tx, profile.id)
        .await?
        .iter()
        .filter_map(RoleGrant::from_row)
        .collect();
    tx.commit().await?;

    Ok(UserContext {
        user_id: profile.id,
        email: profile.email,
        full_name: profile.full_name,
        plant_id: profile.plant_id,
        locale: profile.preferred_locale,
        roles,
    })
}

fn bypass_context(state: &AuthState) -> UserContext {
    let roles = state
        .config
        .bypass_roles
        .iter()
        .filter_map(|r| r.parse::<AdminRole>().ok())
        .map(|role| RoleGrant {
            role,
            plant_id: None,
        })
        .collect();

    UserContext {
        user_id: state.config.bypass_user_uuid(),
        email: state.config.bypass_email.clone(),
        full_name: "Dev User".to_string(),
        plant_id: state.config.bypass_plant_uuid(),
        locale: "en".to_string(),
        roles,
    }
}

/// Extract the session token from request headers or cookies
pub fn extract_session_token(headers: &HeaderMap) -> Option<&str> {
    if let Some(token) = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
    {
        return non_empty(token);
    }

    if let Some(token) = headers.get("x-session-token").and_then(|v| v.to_str().ok()) {
        return non_empty(token);
    }

    let cookies = headers.get("cookie").and_then(|v| v.to_str().ok())?;
    cookies.split(';').find_map(|cookie| {
        let (name, value) = cookie.trim().split_once('=')?;
        if TOKEN_COOKIES.contains(&name) {
            non_empty(value)
        } else {
            None
        }
    })
}

fn non_empty(token: &str) -> Option<&str> {
    let token = token.trim();
    (!token.is_empty()).then_some(token)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers(pairs: &[(&'static str, &str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in pairs {
            map.insert(*name, HeaderValue::from_str(value).unwrap());
        }
        map
    }

    #[test]
    fn test_bearer_token() {
        let h = headers(&[("authorization", "Bearer abc.def")]);
        assert_eq!(extract_session_token(&h), Some("abc.def"));
    }

    #[test]
    fn test_bearer_takes_precedence() {
        let h = headers(&[
            ("authorization", "Bearer first"),
            ("x-session-token", "second"),
        ]);
        assert_eq!(extract_session_token(&h), Some("first"));
    }

    #[test]
    fn test_session_header() {
        let h = headers(&[("x-session-token", "tok")]);
        assert_eq!(extract_session_token(&h), Some("tok"));
    }

    #[test]
    fn test_cookie_token() {
        let h = headers(&[("cookie", "theme=dark; sb-access-token=jwt123; other=1")]);
        assert_eq!(extract_session_token(&h), Some("jwt123"));

        let h = headers(&[("cookie", "session_token=legacy")]);
        assert_eq!(extract_session_token(&h), Some("legacy"));
    }

    #[test]
    fn test_missing_or_blank_token() {
        assert_eq!(extract_session_token(&HeaderMap::new()), None);
        assert_eq!(extract_session_token(&headers(&[("authorization", "Basic xyz")])), None);
        assert_eq!(extract_session_token(&headers(&[("authorization", "Bearer  ")])), None);
        assert_eq!(extract_session_token(&headers(&[("cookie", "theme=dark")])), None);
    }
}
