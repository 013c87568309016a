//! Business logic services.
//!
//! Services own the access rules and map rows to response DTOs; handlers
//! stay thin and queries stay free of policy.

pub mod analytics;
pub mod content;
pub mod course;
pub mod enrollment;
pub mod event;
pub mod plant;
pub mod progress;
pub mod user;

pub use analytics::AnalyticsService;
pub use content::ContentService;
pub use course::CourseService;
pub use enrollment::EnrollmentService;
pub use event::EventService;
pub use plant::PlantService;
pub use progress::ProgressService;
pub use user::UserService;
