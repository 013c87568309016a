//! Application state for the training server.
//!
//! Shared resources are cloned into each route group: system routes take
//! [`AppState`], domain routes take their service from [`Services`].

use std::sync::Arc;

use crate::auth::SessionCache;
use crate::config::AppConfig;
use crate::db::DbPool;
use crate::services::{
    AnalyticsService, ContentService, CourseService, EnrollmentService, EventService,
    PlantService, ProgressService, UserService,
};

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool
    pub db: DbPool,

    /// Application configuration
    pub config: Arc<AppConfig>,

    /// Server start time for uptime calculation
    pub start_time: std::time::Instant,
}

impl AppState {
    pub fn new(db: DbPool, config: AppConfig) -> Self {
        Self {
            db,
            config: Arc::new(config),
            start_time: std::time::Instant::now(),
        }
    }

    /// Get the server uptime in seconds.
    pub fn uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }
}

/// Every domain service, built over one pool.
#[derive(Clone)]
pub struct Services {
    pub plants: PlantService,
    pub users: UserService,
    pub courses: CourseService,
    pub content: ContentService,
    pub enrollments: EnrollmentService,
    pub progress: ProgressService,
    pub events: EventService,
    pub analytics: AnalyticsService,
}

impl Services {
    /// `sessions` is shared with the auth middleware so user changes can
    /// evict cached sessions.
    pub fn new(pool: DbPool, sessions: SessionCache) -> Self {
        Self {
            plants: PlantService::new(pool.clone()),
            users: UserService::new(pool.clone(), sessions),
            courses: CourseService::new(pool.clone()),
            content: ContentService::new(pool.clone()),
            enrollments: EnrollmentService::new(pool.clone()),
            progress: ProgressService::new(pool.clone()),
            events: EventService::new(pool.clone()),
            analytics: AnalyticsService::new(pool),
        }
    }
}
