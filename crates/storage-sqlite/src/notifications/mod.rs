//! SQLite storage implementation for the notification inbox.

mod model;
mod repository;

pub use model::NotificationDB;
pub use repository::NotificationRepository;
