//! Notification scheduler contract.
//!
//! # Responsibility
//! - Describe the platform notification API consumed by task reminders.
//! - Keep platform delivery out of core; hosts provide the implementation.
//!
//! # Invariants
//! - Trigger notifications are identified by opaque string ids.
//! - Implementations must not panic; failures surface as `NotificationError`.

use chrono::{DateTime, Utc};
use std::error::Error;
use std::fmt::{Display, Formatter};

mod planning;

pub use planning::{NotificationOp, PlanningScheduler};

pub type NotificationId = String;
pub type NotifyResult<T> = Result<T, NotificationError>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotificationError {
    PermissionDenied,
    UnknownId(NotificationId),
    /// Platform-reported failure with a diagnostic message.
    Platform(String),
}

impl Display for NotificationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::PermissionDenied => write!(f, "notification permission denied"),
            Self::UnknownId(id) => write!(f, "no pending notification with id `{id}`"),
            Self::Platform(message) => write!(f, "notification platform error: {message}"),
        }
    }
}

impl Error for NotificationError {}

/// Android-style delivery channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationChannel {
    pub id: String,
    pub name: String,
}

/// One point-in-time notification to schedule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TriggerRequest {
    pub title: String,
    pub body: String,
    pub timestamp: DateTime<Utc>,
    pub channel_id: String,
}

/// Platform notification API.
pub trait NotificationScheduler {
    /// Returns whether notifications are currently authorized.
    fn has_permission(&self) -> NotifyResult<bool>;
    /// Asks the user for permission; returns the resulting grant.
    fn request_permission(&mut self) -> NotifyResult<bool>;
    fn create_channel(&mut self, channel: &NotificationChannel) -> NotifyResult<String>;
    fn create_trigger_notification(&mut self, request: &TriggerRequest)
        -> NotifyResult<NotificationId>;
    fn cancel_trigger_notification(&mut self, id: &str) -> NotifyResult<()>;
    fn trigger_notification_ids(&self) -> NotifyResult<Vec<NotificationId>>;
    /// Shows a notification immediately.
    fn display_notification(&mut self, title: &str, body: &str) -> NotifyResult<()>;
}

impl<T: NotificationScheduler + ?Sized> NotificationScheduler for &mut T {
    fn has_permission(&self) -> NotifyResult<bool> {
        (**self).has_permission()
    }

    fn request_permission(&mut self) -> NotifyResult<bool> {
        (**self).request_permission()
    }

    fn create_channel(&mut self, channel: &NotificationChannel) -> NotifyResult<String> {
        (**self).create_channel(channel)
    }

    fn create_trigger_notification(
        &mut self,
        request: &TriggerRequest,
    ) -> NotifyResult<NotificationId> {
        (**self).create_trigger_notification(request)
    }

    fn cancel_trigger_notification(&mut self, id: &str) -> NotifyResult<()> {
        (**self).cancel_trigger_notification(id)
    }

    fn trigger_notification_ids(&self) -> NotifyResult<Vec<NotificationId>> {
        (**self).trigger_notification_ids()
    }

    fn display_notification(&mut self, title: &str, body: &str) -> NotifyResult<()> {
        (**self).display_notification(title, body)
    }
}
