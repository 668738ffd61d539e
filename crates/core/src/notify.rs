//! Notification dispatch port.
//!
//! Delivery (email templates, push) is owned by the platform's notification
//! service; the workflow only emits events through this capability
//! interface. Dispatch is fire-and-forget: callers log failures and carry
//! on, a committed activation decision is never rolled back because an
//! email could not be sent.

use async_trait::async_trait;

use crate::CoreResult;

/// Fallback rejection reason used in notifications when the admin left no
/// notes.
pub const DEFAULT_REJECTION_REASON: &str = "Credentials could not be verified";

/// Events the doctor service emits towards the notification sink.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotificationEvent {
    DoctorApproved {
        doctor_user_id: String,
        doctor_email: String,
        first_name: String,
        last_name: String,
    },
    DoctorRejected {
        doctor_user_id: String,
        doctor_email: String,
        last_name: String,
        reason: String,
    },
}

impl NotificationEvent {
    pub fn recipient(&self) -> &str {
        match self {
            NotificationEvent::DoctorApproved { doctor_email, .. } => doctor_email,
            NotificationEvent::DoctorRejected { doctor_email, .. } => doctor_email,
        }
    }
}

/// Fire-and-forget notification dispatch.
#[async_trait]
pub trait NotificationSink: Send + Sync {
    async fn notify(&self, event: NotificationEvent) -> CoreResult<()>;
}

/// Sink that records events to the log only. Stands in wherever the real
/// notification service is not wired up.
#[derive(Default)]
pub struct LogNotificationSink;

impl LogNotificationSink {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl NotificationSink for LogNotificationSink {
    async fn notify(&self, event: NotificationEvent) -> CoreResult<()> {
        match &event {
            NotificationEvent::DoctorApproved { doctor_email, .. } => {
                tracing::info!(recipient = %doctor_email, "activation confirmation notification");
            }
            NotificationEvent::DoctorRejected { doctor_email, reason, .. } => {
                tracing::info!(
                    recipient = %doctor_email,
                    %reason,
                    "activation rejection notification"
                );
            }
        }
        Ok(())
    }
}
