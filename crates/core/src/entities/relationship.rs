//! The doctor↔patient relationship ledger entry.
//!
//! Stores only the relationship and its usage counters; patient demographics
//! are owned by the user directory. At most one entry exists per
//! (doctor_id, patient_user_id) pair; the store enforces the uniqueness.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::{CoreError, CoreResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RelationshipStatus {
    Active,
    Inactive,
    Terminated,
}

impl fmt::Display for RelationshipStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RelationshipStatus::Active => "ACTIVE",
            RelationshipStatus::Inactive => "INACTIVE",
            RelationshipStatus::Terminated => "TERMINATED",
        };
        write!(f, "{s}")
    }
}

impl FromStr for RelationshipStatus {
    type Err = CoreError;

    fn from_str(s: &str) -> CoreResult<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "ACTIVE" => Ok(RelationshipStatus::Active),
            "INACTIVE" => Ok(RelationshipStatus::Inactive),
            "TERMINATED" => Ok(RelationshipStatus::Terminated),
            other => Err(CoreError::InvalidArgument(format!(
                "invalid relationship status: {other}"
            ))),
        }
    }
}

/// One doctor↔patient link with its consultation/appointment counters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DoctorPatient {
    pub id: String,
    pub doctor_id: String,
    /// Reference to the patient's record in the user directory.
    pub patient_user_id: String,
    pub status: RelationshipStatus,
    pub assigned_at: DateTime<Utc>,

    pub first_consultation_date: Option<DateTime<Utc>>,
    pub last_consultation_date: Option<DateTime<Utc>>,
    pub total_consultations: u64,
    pub total_appointments: u64,

    pub medical_notes: Option<String>,
    pub terminated_at: Option<DateTime<Utc>>,
    pub termination_reason: Option<String>,
    pub updated_at: DateTime<Utc>,
}

impl DoctorPatient {
    /// Open an ACTIVE relationship with zeroed counters.
    pub fn new(
        doctor_id: impl Into<String>,
        patient_user_id: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            doctor_id: doctor_id.into(),
            patient_user_id: patient_user_id.into(),
            status: RelationshipStatus::Active,
            assigned_at: now,
            first_consultation_date: None,
            last_consultation_date: None,
            total_consultations: 0,
            total_appointments: 0,
            medical_notes: None,
            terminated_at: None,
            termination_reason: None,
            updated_at: now,
        }
    }

    pub fn is_active(&self) -> bool {
        self.status == RelationshipStatus::Active
    }

    /// Count a completed consultation. The first consultation timestamp is
    /// written only once.
    pub fn record_consultation(&mut self, now: DateTime<Utc>) {
        self.total_consultations += 1;
        self.last_consultation_date = Some(now);
        if self.first_consultation_date.is_none() {
            self.first_consultation_date = Some(now);
        }
        self.updated_at = now;
    }

    /// Count a booked appointment.
    pub fn record_appointment(&mut self, now: DateTime<Utc>) {
        self.total_appointments += 1;
        self.updated_at = now;
    }

    /// End the relationship. The row is kept, never physically deleted.
    pub fn terminate(&mut self, reason: Option<&str>, now: DateTime<Utc>) {
        self.status = RelationshipStatus::Terminated;
        self.terminated_at = Some(now);
        self.termination_reason = reason.map(str::to_string);
        self.updated_at = now;
    }

    /// Reopen a previously inactive or terminated relationship.
    pub fn reactivate(&mut self, now: DateTime<Utc>) {
        self.status = RelationshipStatus::Active;
        self.terminated_at = None;
        self.termination_reason = None;
        self.updated_at = now;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_first_consultation_date_written_once() {
        let t0 = Utc::now();
        let t1 = t0 + Duration::hours(1);
        let mut rel = DoctorPatient::new("d-1", "p-1", t0);

        rel.record_consultation(t0);
        assert_eq!(rel.total_consultations, 1);
        assert_eq!(rel.first_consultation_date, Some(t0));
        assert_eq!(rel.last_consultation_date, Some(t0));

        rel.record_consultation(t1);
        assert_eq!(rel.total_consultations, 2);
        assert_eq!(rel.first_consultation_date, Some(t0));
        assert_eq!(rel.last_consultation_date, Some(t1));
    }

    #[test]
    fn test_terminate_keeps_counters() {
        let now = Utc::now();
        let mut rel = DoctorPatient::new("d-1", "p-1", now);
        rel.record_appointment(now);
        rel.terminate(Some("moved away"), now);

        assert_eq!(rel.status, RelationshipStatus::Terminated);
        assert!(!rel.is_active());
        assert_eq!(rel.total_appointments, 1);
        assert_eq!(rel.termination_reason.as_deref(), Some("moved away"));
    }

    #[test]
    fn test_reactivate_clears_termination_metadata() {
        let now = Utc::now();
        let mut rel = DoctorPatient::new("d-1", "p-1", now);
        rel.terminate(None, now);
        rel.reactivate(now);

        assert!(rel.is_active());
        assert!(rel.terminated_at.is_none());
        assert!(rel.termination_reason.is_none());
    }
}
