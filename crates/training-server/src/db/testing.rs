//! PostgreSQL fixture for service tests.
//!
//! Tests call [`TestDb::connect`] and return early on `None`, so the suite
//! passes without a database. Set `DATABASE_URL`, or `POSTGRES_HOST` with
//! the other `POSTGRES_*` variables, to run them. Every fixture gets its own
//! schema, dropped by [`TestDb::close`].

use std::time::Duration;

use sqlx::postgres::{PgConnectOptions, PgPoolOptions};
use uuid::Uuid;

use crate::auth::{SessionCache, UserContext};
use crate::config::DatabaseConfig;
use crate::db::models::{
    AdminRole, CreateCourseRequest, CreatePlantRequest, CreateQuestionRequest,
    CreateSectionRequest, CreateUserRequest, Course, CourseSection, Plant, QuizQuestion, RoleGrant,
};
use crate::db::{schema, DbPool};
use crate::services::{ContentService, CourseService, PlantService, UserService};

pub struct TestDb {
    pub pool: DbPool,
    schema: String,
}

impl TestDb {
    pub async fn connect() -> Option<Self> {
        let options = match std::env::var("DATABASE_URL") {
            Ok(url) => url
                .parse::<PgConnectOptions>()
                .expect("DATABASE_URL is not a valid postgres url"),
            Err(_) if std::env::var("POSTGRES_HOST").is_ok() => DatabaseConfig::from_env()
                .expect("invalid POSTGRES_* settings")
                .connect_options(),
            Err(_) => {
                eprintln!("DATABASE_URL not set, skipping database test");
                return None;
            }
        };

        let schema = format!("training_test_{}", Uuid::new_v4().simple());
        let pool = PgPoolOptions::new()
            .max_connections(8)
            .connect_with(options.options([("search_path", schema.as_str())]))
            .await
            .expect("connect to test database");
        schema::init(&pool, &schema).await.expect("init test schema");

        Some(Self { pool, schema })
    }

    /// Whether the connected role ignores row-level security.
    pub async fn bypasses_rls(&self) -> bool {
        sqlx::query_scalar::<_, bool>(
            "SELECT rolsuper OR rolbypassrls FROM pg_roles WHERE rolname = current_user",
        )
        .fetch_one(&self.pool)
        .await
        .expect("read role attributes")
    }

    pub async fn close(self) {
        sqlx::raw_sql(&format!("DROP SCHEMA IF EXISTS {} CASCADE", self.schema))
            .execute(&self.pool)
            .await
            .expect("drop test schema");
        self.pool.close().await;
    }
}

/// A dev_admin context. [`Seed::new`] gives it a profile.
pub fn dev_admin(plant_id: Uuid) -> UserContext {
    UserContext {
        user_id: Uuid::new_v4(),
        email: "dev@specchem.com".to_string(),
        full_name: "Dev Admin".to_string(),
        plant_id,
        locale: "en".to_string(),
        roles: vec![RoleGrant {
            role: AdminRole::DevAdmin,
            plant_id: None,
        }],
    }
}

/// Plain learner context matching a seeded profile.
pub fn learner(user_id: Uuid, plant_id: Uuid) -> UserContext {
    UserContext {
        user_id,
        email: format!("{}@specchem.com", user_id.simple()),
        full_name: "Operator".to_string(),
        plant_id,
        locale: "en".to_string(),
        roles: vec![],
    }
}

/// Seeds rows through the services, as a dev_admin.
pub struct Seed {
    pub admin: UserContext,
    pool: DbPool,
}

impl Seed {
    /// Creates a home plant and the admin's own profile in it.
    pub async fn new(db: &TestDb) -> (Self, Plant) {
        let bootstrap = dev_admin(Uuid::nil());
        let plant = PlantService::new(db.pool.clone())
            .create(
                &bootstrap,
                CreatePlantRequest {
                    code: "KC-01".to_string(),
                    name: "Kansas City".to_string(),
                },
            )
            .await
            .expect("seed plant");

        let admin = UserContext {
            plant_id: plant.id,
            ..bootstrap
        };
        let seed = Self {
            admin,
            pool: db.pool.clone(),
        };
        seed.profile_with_id(seed.admin.user_id, plant.id).await;
        (seed, plant)
    }

    pub async fn plant(&self, code: &str) -> Plant {
        PlantService::new(self.pool.clone())
            .create(
                &self.admin,
                CreatePlantRequest {
                    code: code.to_string(),
                    name: format!("Plant {}", code),
                },
            )
            .await
            .expect("seed plant")
    }

    /// A learner profile in `plant_id`, returned as its session context.
    pub async fn learner(&self, plant_id: Uuid) -> UserContext {
        let id = Uuid::new_v4();
        self.profile_with_id(id, plant_id).await;
        learner(id, plant_id)
    }

    async fn profile_with_id(&self, id: Uuid, plant_id: Uuid) {
        UserService::new(self.pool.clone(), SessionCache::new(Duration::from_secs(60)))
            .create(
                &self.admin,
                CreateUserRequest {
                    id,
                    email: format!("{}@specchem.com", id.simple()),
                    full_name: "Operator".to_string(),
                    plant_id,
                    job_title: None,
                    preferred_locale: None,
                },
            )
            .await
            .expect("seed profile");
    }

    /// A published course with one section holding one single-choice question.
    pub async fn course(&self, slug: &str) -> (Course, CourseSection, QuizQuestion) {
        let courses = CourseService::new(self.pool.clone());
        let content = ContentService::new(self.pool.clone());

        let course = courses
            .create(
                &self.admin,
                CreateCourseRequest {
                    slug: slug.to_string(),
                    title: "Lockout / Tagout".to_string(),
                    description: None,
                    estimated_minutes: None,
                    passing_score: None,
                },
            )
            .await
            .expect("seed course");
        let section = content
            .create_section(
                &self.admin,
                course.id,
                CreateSectionRequest {
                    title: "Energy sources".to_string(),
                    position: 0,
                    estimated_minutes: None,
                },
            )
            .await
            .expect("seed section");
        let question = content
            .create_question(
                &self.admin,
                section.id,
                CreateQuestionRequest {
                    prompt: "Who may remove a lock?".to_string(),
                    question_type: "single_choice".to_string(),
                    options: vec!["Anyone".to_string(), "The person who applied it".to_string()],
                    correct_answers: vec![1],
                    explanation: None,
                    position: 0,
                },
            )
            .await
            .expect("seed question");
        let course = courses
            .set_published(&self.admin, course.id, true)
            .await
            .expect("publish course");

        (course, section, question)
    }
}
