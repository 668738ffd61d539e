//! Appointment entity and its status state machine.
//!
//! States: SCHEDULED, CONFIRMED, IN_PROGRESS, COMPLETED, CANCELLED, NO_SHOW.
//! COMPLETED, CANCELLED and NO_SHOW are terminal: once reached, no further
//! clinical mutation is permitted. Transitions are one-directional except
//! SCHEDULED↔CONFIRMED (a confirmed appointment falls back to SCHEDULED only
//! through rescheduling flows outside this entity).

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::config::CANCELLATION_NOTICE_HOURS;
use crate::{CoreError, CoreResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AppointmentStatus {
    Scheduled,
    Confirmed,
    InProgress,
    Completed,
    Cancelled,
    NoShow,
}

impl AppointmentStatus {
    /// All states, in display order for count maps.
    pub const ALL: [AppointmentStatus; 6] = [
        AppointmentStatus::Scheduled,
        AppointmentStatus::Confirmed,
        AppointmentStatus::InProgress,
        AppointmentStatus::Completed,
        AppointmentStatus::Cancelled,
        AppointmentStatus::NoShow,
    ];

    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            AppointmentStatus::Completed | AppointmentStatus::Cancelled | AppointmentStatus::NoShow
        )
    }

    /// SCHEDULED or CONFIRMED: the appointment still occupies its slot and
    /// can move forward in the lifecycle.
    pub fn is_schedulable(self) -> bool {
        matches!(self, AppointmentStatus::Scheduled | AppointmentStatus::Confirmed)
    }

    /// States that block a doctor's calendar for conflict detection.
    pub fn blocks_slot(self) -> bool {
        matches!(
            self,
            AppointmentStatus::Scheduled
                | AppointmentStatus::Confirmed
                | AppointmentStatus::InProgress
        )
    }
}

impl fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            AppointmentStatus::Scheduled => "SCHEDULED",
            AppointmentStatus::Confirmed => "CONFIRMED",
            AppointmentStatus::InProgress => "IN_PROGRESS",
            AppointmentStatus::Completed => "COMPLETED",
            AppointmentStatus::Cancelled => "CANCELLED",
            AppointmentStatus::NoShow => "NO_SHOW",
        };
        write!(f, "{s}")
    }
}

impl FromStr for AppointmentStatus {
    type Err = CoreError;

    fn from_str(s: &str) -> CoreResult<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "SCHEDULED" => Ok(AppointmentStatus::Scheduled),
            "CONFIRMED" => Ok(AppointmentStatus::Confirmed),
            "IN_PROGRESS" => Ok(AppointmentStatus::InProgress),
            "COMPLETED" => Ok(AppointmentStatus::Completed),
            "CANCELLED" => Ok(AppointmentStatus::Cancelled),
            "NO_SHOW" => Ok(AppointmentStatus::NoShow),
            other => Err(CoreError::InvalidArgument(format!(
                "invalid appointment status: {other}"
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AppointmentType {
    Consultation,
    FollowUp,
    Emergency,
    CheckUp,
    Vaccination,
}

impl Default for AppointmentType {
    fn default() -> Self {
        AppointmentType::Consultation
    }
}

impl fmt::Display for AppointmentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            AppointmentType::Consultation => "CONSULTATION",
            AppointmentType::FollowUp => "FOLLOW_UP",
            AppointmentType::Emergency => "EMERGENCY",
            AppointmentType::CheckUp => "CHECK_UP",
            AppointmentType::Vaccination => "VACCINATION",
        };
        write!(f, "{s}")
    }
}

impl FromStr for AppointmentType {
    type Err = CoreError;

    fn from_str(s: &str) -> CoreResult<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "CONSULTATION" => Ok(AppointmentType::Consultation),
            "FOLLOW_UP" => Ok(AppointmentType::FollowUp),
            "EMERGENCY" => Ok(AppointmentType::Emergency),
            "CHECK_UP" => Ok(AppointmentType::CheckUp),
            "VACCINATION" => Ok(AppointmentType::Vaccination),
            other => Err(CoreError::InvalidArgument(format!(
                "invalid appointment type: {other}"
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentStatus {
    Pending,
    Paid,
    Refunded,
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PaymentStatus::Pending => "PENDING",
            PaymentStatus::Paid => "PAID",
            PaymentStatus::Refunded => "REFUNDED",
        };
        write!(f, "{s}")
    }
}

/// Clinical outcome recorded when an appointment completes.
#[derive(Debug, Clone, Default)]
pub struct ConsultationOutcome {
    pub diagnosis: Option<String>,
    pub prescription: Option<String>,
    pub treatment_plan: Option<String>,
    pub notes: Option<String>,
}

/// A medical appointment between a doctor and a patient.
///
/// The patient contact fields are denormalized copies from the user
/// directory, cached at booking time for read-path performance and accepted
/// to go stale.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Appointment {
    pub id: String,
    pub doctor_id: String,
    pub patient_user_id: String,

    pub patient_name: String,
    pub patient_email: Option<String>,
    pub patient_phone: Option<String>,

    /// Scheduling window: [start_time, end_time).
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub duration_minutes: u32,

    pub appointment_type: AppointmentType,
    pub status: AppointmentStatus,

    pub reason_for_visit: Option<String>,
    pub symptoms: Option<String>,
    pub patient_notes: Option<String>,

    pub diagnosis: Option<String>,
    pub prescription: Option<String>,
    pub treatment_plan: Option<String>,
    pub doctor_notes: Option<String>,
    pub follow_up_instructions: Option<String>,
    pub follow_up_date: Option<DateTime<Utc>>,

    pub consultation_fee: Option<f64>,
    pub payment_status: PaymentStatus,
    pub payment_method: Option<String>,

    pub cancelled_at: Option<DateTime<Utc>>,
    pub cancelled_by: Option<String>,
    pub cancellation_reason: Option<String>,
    pub rescheduled_from: Option<DateTime<Utc>>,
    pub rescheduled_reason: Option<String>,

    pub completed_at: Option<DateTime<Utc>>,
    pub checked_in_at: Option<DateTime<Utc>>,

    pub rating: Option<u8>,
    pub patient_feedback: Option<String>,

    pub reminder_sent: bool,
    pub reminder_sent_at: Option<DateTime<Utc>>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub created_by: Option<String>,
}

impl Appointment {
    /// Create a SCHEDULED appointment with the window derived from start and
    /// duration.
    pub fn new(
        doctor_id: impl Into<String>,
        patient_user_id: impl Into<String>,
        patient_name: impl Into<String>,
        start_time: DateTime<Utc>,
        duration_minutes: u32,
        appointment_type: AppointmentType,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            doctor_id: doctor_id.into(),
            patient_user_id: patient_user_id.into(),
            patient_name: patient_name.into(),
            patient_email: None,
            patient_phone: None,
            start_time,
            end_time: start_time + Duration::minutes(i64::from(duration_minutes)),
            duration_minutes,
            appointment_type,
            status: AppointmentStatus::Scheduled,
            reason_for_visit: None,
            symptoms: None,
            patient_notes: None,
            diagnosis: None,
            prescription: None,
            treatment_plan: None,
            doctor_notes: None,
            follow_up_instructions: None,
            follow_up_date: None,
            consultation_fee: None,
            payment_status: PaymentStatus::Pending,
            payment_method: None,
            cancelled_at: None,
            cancelled_by: None,
            cancellation_reason: None,
            rescheduled_from: None,
            rescheduled_reason: None,
            completed_at: None,
            checked_in_at: None,
            rating: None,
            patient_feedback: None,
            reminder_sent: false,
            reminder_sent_at: None,
            created_at: now,
            updated_at: now,
            created_by: None,
        }
    }

    pub fn is_schedulable(&self) -> bool {
        self.status.is_schedulable()
    }

    /// Half-open interval overlap with [start, end): touching boundaries do
    /// not conflict.
    pub fn overlaps(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> bool {
        start < self.end_time && end > self.start_time
    }

    /// True iff the appointment is still schedulable and starts strictly
    /// more than the cancellation notice ahead of `now`. False exactly at
    /// the boundary.
    pub fn can_be_cancelled(&self, now: DateTime<Utc>) -> bool {
        self.is_schedulable()
            && self.start_time > now + Duration::hours(CANCELLATION_NOTICE_HOURS)
    }

    /// Rescheduling needs no notice period, only a future start.
    pub fn can_be_rescheduled(&self, now: DateTime<Utc>) -> bool {
        self.is_schedulable() && self.start_time > now
    }

    /// SCHEDULED → CONFIRMED.
    pub fn confirm(&mut self, now: DateTime<Utc>) -> CoreResult<()> {
        if self.status != AppointmentStatus::Scheduled {
            return Err(self.transition_conflict("confirm"));
        }
        self.status = AppointmentStatus::Confirmed;
        self.updated_at = now;
        Ok(())
    }

    /// {SCHEDULED, CONFIRMED} → IN_PROGRESS, recording arrival time.
    pub fn check_in(&mut self, now: DateTime<Utc>) -> CoreResult<()> {
        if !self.status.is_schedulable() {
            return Err(self.transition_conflict("check in"));
        }
        self.status = AppointmentStatus::InProgress;
        self.checked_in_at = Some(now);
        self.updated_at = now;
        Ok(())
    }

    /// Any non-terminal state → COMPLETED, recording the consultation
    /// outcome.
    pub fn complete(&mut self, outcome: ConsultationOutcome, now: DateTime<Utc>) -> CoreResult<()> {
        if self.status.is_terminal() {
            return Err(self.transition_conflict("complete"));
        }
        self.status = AppointmentStatus::Completed;
        self.completed_at = Some(now);
        self.diagnosis = outcome.diagnosis;
        self.prescription = outcome.prescription;
        self.treatment_plan = outcome.treatment_plan;
        self.doctor_notes = outcome.notes;
        self.updated_at = now;
        Ok(())
    }

    /// {SCHEDULED, CONFIRMED} → CANCELLED, requiring the notice period.
    pub fn cancel(
        &mut self,
        cancelled_by: &str,
        reason: Option<&str>,
        now: DateTime<Utc>,
    ) -> CoreResult<()> {
        if !self.can_be_cancelled(now) {
            return Err(CoreError::Conflict(format!(
                "appointment {} cannot be cancelled less than {CANCELLATION_NOTICE_HOURS}h \
                 before its start (status {})",
                self.id, self.status
            )));
        }
        self.status = AppointmentStatus::Cancelled;
        self.cancelled_at = Some(now);
        self.cancelled_by = Some(cancelled_by.to_string());
        self.cancellation_reason = reason.map(str::to_string);
        self.updated_at = now;
        Ok(())
    }

    /// {SCHEDULED, CONFIRMED, IN_PROGRESS} → NO_SHOW. Terminal states refuse.
    pub fn mark_no_show(&mut self, now: DateTime<Utc>) -> CoreResult<()> {
        if !self.status.blocks_slot() {
            return Err(self.transition_conflict("mark as no-show"));
        }
        self.status = AppointmentStatus::NoShow;
        self.updated_at = now;
        Ok(())
    }

    fn transition_conflict(&self, verb: &str) -> CoreError {
        CoreError::Conflict(format!(
            "cannot {verb} appointment {} in status {}",
            self.id, self.status
        ))
    }
}
