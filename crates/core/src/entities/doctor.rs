//! Doctor entity and activation state.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::{CoreError, CoreResult};

/// Activation state of a doctor's registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActivationStatus {
    Pending,
    Approved,
    Rejected,
}

impl fmt::Display for ActivationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ActivationStatus::Pending => "PENDING",
            ActivationStatus::Approved => "APPROVED",
            ActivationStatus::Rejected => "REJECTED",
        };
        write!(f, "{s}")
    }
}

/// A registered doctor.
///
/// The doctor owns its activation state and the cached counters exclusively;
/// relationship and appointment records reference it by id only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Doctor {
    pub id: String,
    /// Owning identity in the user directory.
    pub user_id: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub medical_license_number: String,
    pub specialization: String,
    pub hospital_affiliation: Option<String>,
    pub years_of_experience: Option<u32>,

    pub is_activated: bool,
    pub activation_status: ActivationStatus,
    pub activation_request_date: Option<DateTime<Utc>>,
    pub activated_by: Option<String>,
    pub activation_date: Option<DateTime<Utc>>,
    pub rejected_by: Option<String>,
    pub rejection_date: Option<DateTime<Utc>>,
    pub rejection_reason: Option<String>,

    /// Count of ACTIVE relationships, recomputed at every assignment write.
    pub total_patients: u64,
    pub total_consultations: u64,
    pub average_rating: Option<f64>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Doctor {
    /// Create a pending registration.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        user_id: impl Into<String>,
        email: impl Into<String>,
        first_name: impl Into<String>,
        last_name: impl Into<String>,
        medical_license_number: impl Into<String>,
        specialization: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.into(),
            email: email.into(),
            first_name: first_name.into(),
            last_name: last_name.into(),
            medical_license_number: medical_license_number.into(),
            specialization: specialization.into(),
            hospital_affiliation: None,
            years_of_experience: None,
            is_activated: false,
            activation_status: ActivationStatus::Pending,
            activation_request_date: Some(now),
            activated_by: None,
            activation_date: None,
            rejected_by: None,
            rejection_date: None,
            rejection_reason: None,
            total_patients: 0,
            total_consultations: 0,
            average_rating: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }

    /// Approve the registration. `is_activated` is true only here, keeping
    /// the activation invariant inside the entity's two mutators.
    pub fn approve(&mut self, admin_id: &str, now: DateTime<Utc>) {
        self.is_activated = true;
        self.activation_status = ActivationStatus::Approved;
        self.activated_by = Some(admin_id.to_string());
        self.activation_date = Some(now);
        self.updated_at = now;
    }

    /// Reject the registration, recording the reviewing admin and reason.
    pub fn reject(&mut self, admin_id: &str, reason: Option<&str>, now: DateTime<Utc>) {
        self.is_activated = false;
        self.activation_status = ActivationStatus::Rejected;
        self.rejected_by = Some(admin_id.to_string());
        self.rejection_date = Some(now);
        self.rejection_reason = reason.map(str::to_string);
        self.updated_at = now;
    }
}

/// Decision applied to an activation request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActivationAction {
    Approve,
    Reject,
}

impl FromStr for ActivationAction {
    type Err = CoreError;

    /// Case-insensitive, matching the wire contract (`APPROVE` / `REJECT`).
    fn from_str(s: &str) -> CoreResult<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "APPROVE" => Ok(ActivationAction::Approve),
            "REJECT" => Ok(ActivationAction::Reject),
            other => Err(CoreError::InvalidArgument(format!(
                "invalid activation action: {other}"
            ))),
        }
    }
}

impl fmt::Display for ActivationAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ActivationAction::Approve => "APPROVE",
            ActivationAction::Reject => "REJECT",
        };
        write!(f, "{s}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doctor() -> Doctor {
        Doctor::new("u-1", "a@clinic.test", "Ada", "Byron", "ML-1", "Cardiology", Utc::now())
    }

    #[test]
    fn test_new_doctor_is_pending_and_not_activated() {
        let d = doctor();
        assert_eq!(d.activation_status, ActivationStatus::Pending);
        assert!(!d.is_activated);
    }

    #[test]
    fn test_approve_sets_activation_invariant() {
        let mut d = doctor();
        d.approve("admin-1", Utc::now());
        assert!(d.is_activated);
        assert_eq!(d.activation_status, ActivationStatus::Approved);
        assert_eq!(d.activated_by.as_deref(), Some("admin-1"));
        assert!(d.activation_date.is_some());
    }

    #[test]
    fn test_reject_records_reason_and_clears_activation() {
        let mut d = doctor();
        d.reject("admin-1", Some("licence lapsed"), Utc::now());
        assert!(!d.is_activated);
        assert_eq!(d.activation_status, ActivationStatus::Rejected);
        assert_eq!(d.rejection_reason.as_deref(), Some("licence lapsed"));
    }

    #[test]
    fn test_action_parses_case_insensitively() {
        assert_eq!("approve".parse::<ActivationAction>().unwrap(), ActivationAction::Approve);
        assert_eq!(" REJECT ".parse::<ActivationAction>().unwrap(), ActivationAction::Reject);
        assert!(matches!(
            "DEFER".parse::<ActivationAction>(),
            Err(CoreError::InvalidArgument(_))
        ));
    }
}
