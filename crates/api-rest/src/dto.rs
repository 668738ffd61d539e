//! Request and response shapes for the REST surface.
//!
//! Field names are camelCase to match the platform's existing JSON
//! contracts; status enums travel as their SCREAMING_SNAKE_CASE strings.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use dds_core::entities::Appointment;
use dds_core::services::{
    AppointmentCounts, DashboardStatistics, PatientCounts, PatientSummary, PendingDoctor,
};
use dds_core::store::Page;

/// Generic acknowledgement body.
#[derive(Debug, Serialize, ToSchema)]
pub struct MessageRes {
    pub message: String,
}

// ============================================================================
// ACTIVATION
// ============================================================================

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PendingDoctorRes {
    /// Activation request id, when one is on file.
    pub id: Option<String>,
    pub doctor_id: String,
    pub email: String,
    pub full_name: String,
    pub medical_license_number: String,
    pub specialization: String,
    pub hospital_affiliation: Option<String>,
    pub years_of_experience: Option<u32>,
    pub registration_date: DateTime<Utc>,
    pub activation_request_date: Option<DateTime<Utc>>,
}

impl From<PendingDoctor> for PendingDoctorRes {
    fn from(p: PendingDoctor) -> Self {
        Self {
            id: p.request_id,
            doctor_id: p.doctor_id,
            email: p.email,
            full_name: p.full_name,
            medical_license_number: p.medical_license_number,
            specialization: p.specialization,
            hospital_affiliation: p.hospital_affiliation,
            years_of_experience: p.years_of_experience,
            registration_date: p.registration_date,
            activation_request_date: p.request_date,
        }
    }
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProcessActivationReq {
    pub doctor_id: String,
    /// APPROVE or REJECT.
    pub action: String,
    pub notes: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PendingCountRes {
    pub pending: u64,
}

// ============================================================================
// DASHBOARD
// ============================================================================

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStatisticsRes {
    pub doctor_id: String,
    pub total_patients: u64,
    pub active_patients: u64,
    pub total_appointments: u64,
    pub upcoming_appointments: u64,
    pub today_appointments: u64,
    pub completed_today: u64,
    pub pending_today: u64,
    pub this_week_appointments: u64,
    pub completed_this_month: u64,
    pub new_patients_this_month: u64,
    pub total_consultations: u64,
    pub average_rating: Option<f64>,
}

impl From<DashboardStatistics> for DashboardStatisticsRes {
    fn from(s: DashboardStatistics) -> Self {
        Self {
            doctor_id: s.doctor_id,
            total_patients: s.total_patients,
            active_patients: s.active_patients,
            total_appointments: s.total_appointments,
            upcoming_appointments: s.upcoming_appointments,
            today_appointments: s.today_appointments,
            completed_today: s.completed_today,
            pending_today: s.pending_today,
            this_week_appointments: s.this_week_appointments,
            completed_this_month: s.completed_this_month,
            new_patients_this_month: s.new_patients_this_month,
            total_consultations: s.total_consultations,
            average_rating: s.average_rating,
        }
    }
}

/// Summary information about a patient, as shown in lists and search
/// results. `patientId` is the relationship id; demographics come from the
/// user directory.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PatientSummaryRes {
    pub patient_id: String,
    pub user_id: String,
    pub first_name: String,
    pub last_name: String,
    pub full_name: String,
    pub email: String,
    pub phone_number: Option<String>,
    pub birth_date: Option<NaiveDate>,
    pub age: Option<u32>,
    pub gender: Option<String>,
    pub patient_status: String,
    pub first_consultation_date: Option<DateTime<Utc>>,
    pub last_consultation_date: Option<DateTime<Utc>>,
    pub total_consultations: u64,
    pub next_appointment_date: Option<DateTime<Utc>>,
    pub next_appointment_type: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<PatientSummary> for PatientSummaryRes {
    fn from(p: PatientSummary) -> Self {
        Self {
            patient_id: p.relationship_id,
            user_id: p.user_id,
            first_name: p.first_name,
            last_name: p.last_name,
            full_name: p.full_name,
            email: p.email,
            phone_number: p.phone_number,
            birth_date: p.birth_date,
            age: p.age,
            gender: p.gender,
            patient_status: p.status.to_string(),
            first_consultation_date: p.first_consultation_date,
            last_consultation_date: p.last_consultation_date,
            total_consultations: p.total_consultations,
            next_appointment_date: p.next_appointment_date,
            next_appointment_type: p.next_appointment_type.map(|t| t.to_string()),
            created_at: p.assigned_at,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PatientListRes {
    pub patients: Vec<PatientSummaryRes>,
    pub page: u32,
    pub size: u32,
    pub total_items: u64,
    pub total_pages: u32,
}

impl From<Page<PatientSummary>> for PatientListRes {
    fn from(page: Page<PatientSummary>) -> Self {
        Self {
            patients: page.items.into_iter().map(Into::into).collect(),
            page: page.page,
            size: page.size,
            total_items: page.total_items,
            total_pages: page.total_pages,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PatientCountRes {
    pub active: u64,
    pub inactive: u64,
    pub total: u64,
}

impl From<PatientCounts> for PatientCountRes {
    fn from(c: PatientCounts) -> Self {
        Self {
            active: c.active,
            inactive: c.inactive,
            total: c.total,
        }
    }
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AssignPatientReq {
    pub patient_user_id: String,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RelationshipRes {
    pub relationship_id: String,
    pub doctor_id: String,
    pub patient_user_id: String,
    pub status: String,
    pub assigned_at: DateTime<Utc>,
    pub total_consultations: u64,
    pub total_appointments: u64,
}

impl From<dds_core::entities::DoctorPatient> for RelationshipRes {
    fn from(r: dds_core::entities::DoctorPatient) -> Self {
        Self {
            relationship_id: r.id,
            doctor_id: r.doctor_id,
            patient_user_id: r.patient_user_id,
            status: r.status.to_string(),
            assigned_at: r.assigned_at,
            total_consultations: r.total_consultations,
            total_appointments: r.total_appointments,
        }
    }
}

// ============================================================================
// APPOINTMENTS
// ============================================================================

/// Complete appointment information, as displayed to doctors.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AppointmentRes {
    pub appointment_id: String,
    pub doctor_id: String,
    pub patient_id: String,

    pub patient_name: String,
    pub patient_email: Option<String>,
    pub patient_phone: Option<String>,

    pub appointment_date: DateTime<Utc>,
    pub appointment_end_date: DateTime<Utc>,
    pub duration_minutes: u32,
    pub appointment_type: String,
    pub status: String,

    pub reason_for_visit: Option<String>,
    pub symptoms: Option<String>,
    pub patient_notes: Option<String>,

    pub diagnosis: Option<String>,
    pub prescription: Option<String>,
    pub treatment_plan: Option<String>,
    pub doctor_notes: Option<String>,

    pub consultation_fee: Option<f64>,
    pub payment_status: String,

    pub cancelled_at: Option<DateTime<Utc>>,
    pub cancellation_reason: Option<String>,
    pub completed_at: Option<DateTime<Utc>>,
    pub checked_in_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl From<Appointment> for AppointmentRes {
    fn from(a: Appointment) -> Self {
        Self {
            appointment_id: a.id,
            doctor_id: a.doctor_id,
            patient_id: a.patient_user_id,
            patient_name: a.patient_name,
            patient_email: a.patient_email,
            patient_phone: a.patient_phone,
            appointment_date: a.start_time,
            appointment_end_date: a.end_time,
            duration_minutes: a.duration_minutes,
            appointment_type: a.appointment_type.to_string(),
            status: a.status.to_string(),
            reason_for_visit: a.reason_for_visit,
            symptoms: a.symptoms,
            patient_notes: a.patient_notes,
            diagnosis: a.diagnosis,
            prescription: a.prescription,
            treatment_plan: a.treatment_plan,
            doctor_notes: a.doctor_notes,
            consultation_fee: a.consultation_fee,
            payment_status: a.payment_status.to_string(),
            cancelled_at: a.cancelled_at,
            cancellation_reason: a.cancellation_reason,
            completed_at: a.completed_at,
            checked_in_at: a.checked_in_at,
            created_at: a.created_at,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AppointmentListRes {
    pub appointments: Vec<AppointmentRes>,
    pub page: u32,
    pub size: u32,
    pub total_items: u64,
    pub total_pages: u32,
}

impl From<Page<Appointment>> for AppointmentListRes {
    fn from(page: Page<Appointment>) -> Self {
        Self {
            appointments: page.items.into_iter().map(Into::into).collect(),
            page: page.page,
            size: page.size,
            total_items: page.total_items,
            total_pages: page.total_pages,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AppointmentCountRes {
    pub scheduled: u64,
    pub confirmed: u64,
    pub in_progress: u64,
    pub completed: u64,
    pub cancelled: u64,
    pub no_show: u64,
    pub total: u64,
}

impl From<AppointmentCounts> for AppointmentCountRes {
    fn from(c: AppointmentCounts) -> Self {
        Self {
            scheduled: c.scheduled,
            confirmed: c.confirmed,
            in_progress: c.in_progress,
            completed: c.completed,
            cancelled: c.cancelled,
            no_show: c.no_show,
            total: c.total,
        }
    }
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleAppointmentReq {
    pub patient_user_id: String,
    pub appointment_date: DateTime<Utc>,
    pub duration_minutes: Option<u32>,
    /// CONSULTATION, FOLLOW_UP, EMERGENCY, CHECK_UP or VACCINATION.
    pub appointment_type: Option<String>,
    pub reason_for_visit: Option<String>,
    pub symptoms: Option<String>,
    pub patient_notes: Option<String>,
    pub consultation_fee: Option<f64>,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CompleteAppointmentReq {
    pub diagnosis: Option<String>,
    pub prescription: Option<String>,
    pub treatment_plan: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CancelAppointmentReq {
    pub reason: Option<String>,
}
