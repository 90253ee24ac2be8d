//! SQLite storage implementation for recurring jobs.

mod model;
mod repository;

pub use model::RecurringJobDB;
pub use repository::RecurringJobRepository;
