//! Admin API handlers.
//!
//! Role checks live in the services; handlers only extract and forward.

pub mod analytics;
pub mod courses;
pub mod enrollments;
pub mod plants;
pub mod users;
