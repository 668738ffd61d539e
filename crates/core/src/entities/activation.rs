//! Activation requests: one pending approval case per doctor registration,
//! resolved exactly once by an admin.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::entities::doctor::{ActivationAction, Doctor};
use crate::{CoreError, CoreResult};

/// A pending or processed activation request.
///
/// Carries a snapshot of the doctor's registration fields so the admin queue
/// renders without a second lookup; the snapshot is accepted to go stale.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivationRequest {
    pub id: String,
    pub doctor_id: String,
    pub doctor_email: String,
    pub doctor_full_name: String,
    pub medical_license_number: String,
    pub specialization: String,
    pub hospital_affiliation: Option<String>,
    pub years_of_experience: Option<u32>,

    pub is_pending: bool,
    pub requested_at: DateTime<Utc>,

    pub processed_by: Option<String>,
    pub processed_by_email: Option<String>,
    pub action: Option<ActivationAction>,
    pub notes: Option<String>,
    pub processed_at: Option<DateTime<Utc>>,
}

impl ActivationRequest {
    /// Open a request for a freshly registered doctor.
    pub fn for_doctor(doctor: &Doctor, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            doctor_id: doctor.id.clone(),
            doctor_email: doctor.email.clone(),
            doctor_full_name: doctor.full_name(),
            medical_license_number: doctor.medical_license_number.clone(),
            specialization: doctor.specialization.clone(),
            hospital_affiliation: doctor.hospital_affiliation.clone(),
            years_of_experience: doctor.years_of_experience,
            is_pending: true,
            requested_at: now,
            processed_by: None,
            processed_by_email: None,
            action: None,
            notes: None,
            processed_at: None,
        }
    }

    /// Resolve the request.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::Conflict` if the request has already been
    /// processed; a decision is applied exactly once.
    pub fn mark_processed(
        &mut self,
        admin_id: &str,
        admin_email: &str,
        action: ActivationAction,
        notes: Option<&str>,
        now: DateTime<Utc>,
    ) -> CoreResult<()> {
        if !self.is_pending {
            return Err(CoreError::Conflict(format!(
                "activation request {} already processed",
                self.id
            )));
        }

        self.is_pending = false;
        self.processed_by = Some(admin_id.to_string());
        self.processed_by_email = Some(admin_email.to_string());
        self.action = Some(action);
        self.notes = notes.map(str::to_string);
        self.processed_at = Some(now);
        Ok(())
    }
}
