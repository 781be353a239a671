//! Logged meals ("plates"): model, persistence, duplicate detection and the operations
//! behind the `/plates` routes.

pub mod dedup;
pub mod dto;
pub mod handlers;
pub mod memory;
pub mod model;
pub mod repo;
mod repo_types;
pub mod services;

pub use handlers::router;
pub use model::{Ingredient, Plate};
pub use repo::PlateRepository;
