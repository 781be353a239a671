//! Physical activities and the kcal they burn.

pub mod handlers;
pub mod repo;
pub mod services;

pub use handlers::router;
pub use repo::{Activity, ActivityRepository};
