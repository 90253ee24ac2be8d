//! Notifications module - user alerts raised by budgets, wallets and jobs.

mod notifications_model;
mod notifications_service;
mod notifications_traits;
mod sink;


pub use notifications_model::{NewNotification, Notification, NotificationType};
pub use notifications_service::NotificationService;
pub use notifications_traits::{NotificationRepositoryTrait, NotificationServiceTrait};
pub use sink::{
    notify_best_effort, MockNotificationSink, NoOpNotificationSink, NotificationSink,
    SentNotification,
};
