//! Notification domain models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::constants::{MAX_NOTIFICATION_MESSAGE_LEN, MAX_TITLE_LEN};
use crate::errors::{Error, Result, ValidationError};

/// Kinds of user notification raised by the finance core.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NotificationType {
    /// A budget's usage reached its alert threshold.
    BudgetThreshold,
    /// A budget's usage went past 100%.
    BudgetExceeded,
    /// A recurring job was switched off after a permanent failure.
    RecurringJobDeactivated,
    /// A recurring job failed and will be retried on the next batch.
    RecurringJobFailed,
    /// A shared wallet's share ratios no longer sum to 1.
    SharedWalletRatioDeviation,
}

impl NotificationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationType::BudgetThreshold => "BUDGET_THRESHOLD",
            NotificationType::BudgetExceeded => "BUDGET_EXCEEDED",
            NotificationType::RecurringJobDeactivated => "RECURRING_JOB_DEACTIVATED",
            NotificationType::RecurringJobFailed => "RECURRING_JOB_FAILED",
            NotificationType::SharedWalletRatioDeviation => "SHARED_WALLET_RATIO_DEVIATION",
        }
    }
}

impl std::fmt::Display for NotificationType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for NotificationType {
    type Err = Error;

    fn from_str(value: &str) -> Result<Self> {
        match value {
            "BUDGET_THRESHOLD" => Ok(NotificationType::BudgetThreshold),
            "BUDGET_EXCEEDED" => Ok(NotificationType::BudgetExceeded),
            "RECURRING_JOB_DEACTIVATED" => Ok(NotificationType::RecurringJobDeactivated),
            "RECURRING_JOB_FAILED" => Ok(NotificationType::RecurringJobFailed),
            "SHARED_WALLET_RATIO_DEVIATION" => Ok(NotificationType::SharedWalletRatioDeviation),
            other => Err(Error::invalid_input(format!(
                "Unknown notification type '{}'",
                other
            ))),
        }
    }
}

/// A notification stored for a user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: String,
    pub user_id: String,
    #[serde(rename = "type")]
    pub notification_type: NotificationType,
    pub title: String,
    pub message: String,
    pub metadata: Option<serde_json::Value>,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

/// Input model for storing a notification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewNotification {
    pub user_id: String,
    #[serde(rename = "type")]
    pub notification_type: NotificationType,
    pub title: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
}

impl NewNotification {
    pub fn new(
        user_id: &str,
        notification_type: NotificationType,
        title: &str,
        message: &str,
    ) -> Self {
        Self {
            user_id: user_id.to_string(),
            notification_type,
            title: title.trim().to_string(),
            message: message.trim().to_string(),
            metadata: None,
        }
    }

    pub fn with_metadata(mut self, metadata: serde_json::Value) -> Self {
        self.metadata = Some(metadata);
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.user_id.trim().is_empty() {
            return Err(Error::Validation(ValidationError::MissingField(
                "userId".to_string(),
            )));
        }
        if self.title.is_empty() || self.title.chars().count() > MAX_TITLE_LEN {
            return Err(Error::invalid_input(format!(
                "Notification title must be 1 to {} characters",
                MAX_TITLE_LEN
            )));
        }
        if self.message.chars().count() > MAX_NOTIFICATION_MESSAGE_LEN {
            return Err(Error::invalid_input(format!(
                "Notification message exceeds {} characters",
                MAX_NOTIFICATION_MESSAGE_LEN
            )));
        }
        Ok(())
    }
}
