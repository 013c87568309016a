//! Route table for the training API.

use axum::{
    http::{header, HeaderName, HeaderValue, Method},
    middleware,
    routing::{delete, get, patch, post, put},
    Router,
};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::auth::{auth_middleware, AuthState};
use crate::config::AppConfig;
use crate::handlers::{self, admin, learner, system};
use crate::state::{AppState, Services};

/// Build the application router with all routes.
///
/// `/health` and `/api/health` are public; everything else runs behind the
/// session middleware.
pub fn build_router(state: AppState, services: Services, auth: AuthState) -> Router {
    let cors = cors_layer(&state.config);

    // Health check routes (no auth required)
    let health_routes = Router::new()
        .route("/health", get(handlers::health_check))
        .route("/api/health", get(handlers::api_health))
        .with_state(state.clone());

    let system_routes = Router::new()
        .route("/api/db/validate", get(system::validate_database))
        .with_state(state);

    // Learner routes
    let learner_routes = Router::new()
        .route("/api/me", get(learner::me))
        .route("/api/courses", get(learner::list_courses))
        .route("/api/courses/{course_id}", get(learner::get_course))
        .route(
            "/api/enrollments",
            get(learner::my_enrollments).post(learner::enroll),
        )
        .route("/api/progress", get(learner::list_progress))
        .route(
            "/api/progress/{course_id}",
            get(learner::get_progress).put(learner::update_progress),
        )
        .route("/api/activity", post(learner::record_activity))
        .route("/api/question-events", post(learner::submit_answer));

    // Admin routes
    let admin_routes = Router::new()
        .route(
            "/api/admin/plants",
            get(admin::plants::list).post(admin::plants::create),
        )
        .route("/api/admin/plants/{plant_id}", patch(admin::plants::update))
        .route(
            "/api/admin/users",
            get(admin::users::list).post(admin::users::create),
        )
        .route(
            "/api/admin/users/{user_id}",
            get(admin::users::get)
                .patch(admin::users::update)
                .delete(admin::users::deactivate),
        )
        .route(
            "/api/admin/users/{user_id}/roles/{role}",
            put(admin::users::grant_role).delete(admin::users::revoke_role),
        )
        .route(
            "/api/admin/courses",
            get(admin::courses::list).post(admin::courses::create),
        )
        .route(
            "/api/admin/courses/{course_id}",
            get(admin::courses::get)
                .patch(admin::courses::update)
                .delete(admin::courses::delete),
        )
        .route(
            "/api/admin/courses/{course_id}/publish",
            post(admin::courses::publish),
        )
        .route(
            "/api/admin/courses/{course_id}/unpublish",
            post(admin::courses::unpublish),
        )
        .route(
            "/api/admin/courses/{course_id}/sections",
            post(admin::courses::create_section),
        )
        .route(
            "/api/admin/sections/{section_id}",
            patch(admin::courses::update_section).delete(admin::courses::delete_section),
        )
        .route(
            "/api/admin/sections/{section_id}/blocks",
            post(admin::courses::create_block),
        )
        .route(
            "/api/admin/blocks/{block_id}",
            patch(admin::courses::update_block).delete(admin::courses::delete_block),
        )
        .route(
            "/api/admin/sections/{section_id}/questions",
            post(admin::courses::create_question),
        )
        .route(
            "/api/admin/questions/{question_id}",
            patch(admin::courses::update_question).delete(admin::courses::delete_question),
        )
        .route(
            "/api/admin/translations",
            get(admin::courses::list_translations).put(admin::courses::upsert_translation),
        )
        .route(
            "/api/admin/translations/{translation_id}",
            delete(admin::courses::delete_translation),
        )
        .route(
            "/api/admin/enrollments",
            get(admin::enrollments::list).post(admin::enrollments::assign),
        )
        .route(
            "/api/admin/enrollments/{enrollment_id}",
            patch(admin::enrollments::update).delete(admin::enrollments::delete),
        )
        .route(
            "/api/admin/analytics/overview",
            get(admin::analytics::overview),
        )
        .route(
            "/api/admin/analytics/courses/{course_id}",
            get(admin::analytics::course),
        )
        .route(
            "/api/admin/analytics/activity",
            get(admin::analytics::activity),
        );

    let protected_routes = learner_routes
        .merge(admin_routes)
        .with_state(services)
        .merge(system_routes)
        .layer(middleware::from_fn_with_state(auth, auth_middleware));

    Router::new()
        .merge(health_routes)
        .merge(protected_routes)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}

/// Configured origins, or any origin when none are set.
fn cors_layer(config: &AppConfig) -> CorsLayer {
    let origins: Vec<HeaderValue> = config
        .cors_origin_list()
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    if origins.is_empty() {
        return CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);
    }

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([
            header::AUTHORIZATION,
            header::CONTENT_TYPE,
            HeaderName::from_static("x-session-token"),
        ])
        .allow_credentials(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    use crate::config::{AuthConfig, DatabaseConfig};
    use crate::db::create_lazy_pool;

    fn test_router(auth_config: AuthConfig) -> Router {
        let config = AppConfig::default();
        let pool = create_lazy_pool(&DatabaseConfig::default(), &config.schema);
        let auth = tokio_test::assert_ok!(AuthState::new(auth_config, pool.clone()));
        let services = Services::new(pool.clone(), auth.sessions.clone());
        build_router(AppState::new(pool, config), services, auth)
    }

    fn bypass(roles: &[&str]) -> AuthConfig {
        AuthConfig {
            bypass: true,
            bypass_roles: roles.iter().map(|r| r.to_string()).collect(),
            ..AuthConfig::default()
        }
    }

    fn json_request(method: Method, uri: &str, body: &str) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header(header::AUTHORIZATION, "Bearer dev-token")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn test_health_is_public() {
        let response = test_router(AuthConfig::default())
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["status"], "ok");
    }

    #[tokio::test]
    async fn test_missing_token_is_unauthorized() {
        let response = test_router(AuthConfig::default())
            .oneshot(Request::get("/api/me").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_admin_route_rejects_invalid_body() {
        let response = test_router(bypass(&["dev_admin"]))
            .oneshot(json_request(
                Method::POST,
                "/api/admin/plants",
                r#"{"code": "", "name": ""}"#,
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn test_learner_cannot_manage_plants() {
        let response = test_router(bypass(&[]))
            .oneshot(json_request(
                Method::POST,
                "/api/admin/plants",
                r#"{"code": "MKE", "name": "Milwaukee"}"#,
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_hr_admin_cannot_validate_schema() {
        let response = test_router(bypass(&["hr_admin"]))
            .oneshot(
                Request::get("/api/db/validate")
                    .header(header::AUTHORIZATION, "Bearer dev-token")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[test]
    fn test_cors_layer_ignores_invalid_origins() {
        let config = AppConfig {
            cors_origins: Some("https://training.specchem.com,bad\norigin".to_string()),
            ..AppConfig::default()
        };
        // Builds without panicking when one origin is not a valid header value.
        let _ = cors_layer(&config);
    }
}
