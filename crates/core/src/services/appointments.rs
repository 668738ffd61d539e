//! Appointment lifecycle operations.
//!
//! Booking runs the advisory conflict check before insert (the store has no
//! unique-window constraint) and keeps the assignment ledger in step;
//! per-appointment operations drive the entity's state machine. Every
//! operation verifies the appointment belongs to the acting doctor; a
//! mismatch reads as NotFound so foreign appointment ids leak nothing.

use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;

use crate::config::DEFAULT_APPOINTMENT_DURATION_MINUTES;
use crate::directory::UserDirectory;
use crate::entities::{Appointment, AppointmentType, ConsultationOutcome};
use crate::services::assignment::AssignmentService;
use crate::store::{AppointmentStore, DoctorStore};
use crate::{CoreError, CoreResult};

/// A booking request for a new appointment.
#[derive(Debug, Clone)]
pub struct ScheduleAppointment {
    pub patient_user_id: String,
    pub start_time: DateTime<Utc>,
    /// Defaults to [`DEFAULT_APPOINTMENT_DURATION_MINUTES`].
    pub duration_minutes: Option<u32>,
    /// Defaults to CONSULTATION.
    pub appointment_type: Option<String>,
    pub reason_for_visit: Option<String>,
    pub symptoms: Option<String>,
    pub patient_notes: Option<String>,
    pub consultation_fee: Option<f64>,
    pub created_by: Option<String>,
}

pub struct AppointmentService {
    doctors: Arc<dyn DoctorStore>,
    appointments: Arc<dyn AppointmentStore>,
    directory: Arc<dyn UserDirectory>,
    assignments: Arc<AssignmentService>,
}

impl AppointmentService {
    pub fn new(
        doctors: Arc<dyn DoctorStore>,
        appointments: Arc<dyn AppointmentStore>,
        directory: Arc<dyn UserDirectory>,
        assignments: Arc<AssignmentService>,
    ) -> Self {
        Self {
            doctors,
            appointments,
            directory,
            assignments,
        }
    }

    /// Book an appointment.
    ///
    /// Verifies both parties, rejects overlapping windows, denormalizes the
    /// patient's contact details onto the row, and records the booking on
    /// the assignment ledger (creating the relationship on a first booking).
    ///
    /// # Errors
    ///
    /// * `NotFound`: doctor absent or patient unknown to the directory.
    /// * `InvalidArgument`: start not in the future, zero duration, or an
    ///   unrecognised appointment type.
    /// * `Conflict`: the window overlaps a slot-blocking appointment.
    pub async fn schedule(
        &self,
        doctor_id: &str,
        request: ScheduleAppointment,
    ) -> CoreResult<Appointment> {
        tracing::info!(%doctor_id, patient_user_id = %request.patient_user_id, "booking appointment");

        self.doctors
            .find_by_id(doctor_id)
            .await?
            .ok_or_else(|| CoreError::doctor_not_found(doctor_id))?;

        let patient = self
            .directory
            .get_by_id(&request.patient_user_id)
            .await?
            .ok_or_else(|| {
                CoreError::NotFound(format!(
                    "patient not found in user directory: {}",
                    request.patient_user_id
                ))
            })?;

        let now = Utc::now();
        if request.start_time <= now {
            return Err(CoreError::InvalidArgument(
                "appointment must be scheduled for a future time".into(),
            ));
        }

        let duration = request
            .duration_minutes
            .unwrap_or(DEFAULT_APPOINTMENT_DURATION_MINUTES);
        if duration == 0 {
            return Err(CoreError::InvalidArgument(
                "appointment duration must be greater than zero".into(),
            ));
        }

        let appointment_type = match &request.appointment_type {
            Some(s) => s.parse::<AppointmentType>()?,
            None => AppointmentType::default(),
        };

        let end_time = request.start_time + Duration::minutes(i64::from(duration));
        let conflicts = self
            .appointments
            .find_conflicting(doctor_id, request.start_time, end_time)
            .await?;
        if let Some(existing) = conflicts.first() {
            tracing::warn!(%doctor_id, conflicting_id = %existing.id, "appointment window conflict");
            return Err(CoreError::Conflict(format!(
                "requested window overlaps appointment {}",
                existing.id
            )));
        }

        let mut appointment = Appointment::new(
            doctor_id,
            request.patient_user_id.clone(),
            patient.full_name(),
            request.start_time,
            duration,
            appointment_type,
            now,
        );
        appointment.patient_email = Some(patient.email.clone());
        appointment.patient_phone = patient.phone_number.clone();
        appointment.reason_for_visit = request.reason_for_visit;
        appointment.symptoms = request.symptoms;
        appointment.patient_notes = request.patient_notes;
        appointment.consultation_fee = request.consultation_fee;
        appointment.created_by = request.created_by;

        let appointment = self.appointments.insert(appointment).await?;

        // First booking with this doctor creates the relationship.
        self.assignments
            .assign(doctor_id, &request.patient_user_id)
            .await?;
        self.assignments
            .record_appointment(doctor_id, &request.patient_user_id)
            .await?;

        tracing::info!(appointment_id = %appointment.id, "appointment booked");
        Ok(appointment)
    }

    /// SCHEDULED → CONFIRMED.
    pub async fn confirm(&self, doctor_id: &str, appointment_id: &str) -> CoreResult<Appointment> {
        let mut appointment = self.owned(doctor_id, appointment_id).await?;
        appointment.confirm(Utc::now())?;
        self.appointments.save(&appointment).await?;
        Ok(appointment)
    }

    /// Patient arrived: {SCHEDULED, CONFIRMED} → IN_PROGRESS.
    pub async fn check_in(&self, doctor_id: &str, appointment_id: &str) -> CoreResult<Appointment> {
        let mut appointment = self.owned(doctor_id, appointment_id).await?;
        appointment.check_in(Utc::now())?;
        self.appointments.save(&appointment).await?;
        Ok(appointment)
    }

    /// Complete the appointment with its consultation outcome and count the
    /// consultation on the assignment ledger.
    pub async fn complete(
        &self,
        doctor_id: &str,
        appointment_id: &str,
        outcome: ConsultationOutcome,
    ) -> CoreResult<Appointment> {
        let mut appointment = self.owned(doctor_id, appointment_id).await?;
        appointment.complete(outcome, Utc::now())?;
        self.appointments.save(&appointment).await?;

        // Ledger update is a separate write; see DESIGN.md on consistency.
        self.assignments
            .record_consultation(doctor_id, &appointment.patient_user_id)
            .await?;

        tracing::info!(appointment_id = %appointment.id, "appointment completed");
        Ok(appointment)
    }

    /// Cancel with the 24-hour notice rule.
    pub async fn cancel(
        &self,
        doctor_id: &str,
        appointment_id: &str,
        cancelled_by: &str,
        reason: Option<&str>,
    ) -> CoreResult<Appointment> {
        let mut appointment = self.owned(doctor_id, appointment_id).await?;
        appointment.cancel(cancelled_by, reason, Utc::now())?;
        self.appointments.save(&appointment).await?;
        tracing::info!(appointment_id = %appointment.id, "appointment cancelled");
        Ok(appointment)
    }

    /// Mark the patient as a no-show.
    pub async fn mark_no_show(
        &self,
        doctor_id: &str,
        appointment_id: &str,
    ) -> CoreResult<Appointment> {
        let mut appointment = self.owned(doctor_id, appointment_id).await?;
        appointment.mark_no_show(Utc::now())?;
        self.appointments.save(&appointment).await?;
        Ok(appointment)
    }

    /// Slot-blocking appointments overlapping the half-open window
    /// [start, end). Advisory: callers booking outside [`schedule`] must run
    /// this before inserting.
    ///
    /// [`schedule`]: Self::schedule
    pub async fn conflicts(
        &self,
        doctor_id: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> CoreResult<Vec<Appointment>> {
        self.appointments.find_conflicting(doctor_id, start, end).await
    }

    async fn owned(&self, doctor_id: &str, appointment_id: &str) -> CoreResult<Appointment> {
        let appointment = self
            .appointments
            .find_by_id(appointment_id)
            .await?
            .filter(|a| a.doctor_id == doctor_id);
        appointment.ok_or_else(|| {
            CoreError::NotFound(format!("appointment not found: {appointment_id}"))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::directory::{MemoryDirectory, UserRecord};
    use crate::entities::{AppointmentStatus, Doctor};
    use crate::store::MemoryStore;

    struct Fixture {
        store: Arc<MemoryStore>,
        svc: AppointmentService,
        doctor: Doctor,
    }

    async fn fixture() -> Fixture {
        let store = Arc::new(MemoryStore::new());
        let directory = Arc::new(MemoryDirectory::new());
        directory.put(UserRecord {
            id: "p-1".into(),
            email: "john@example.test".into(),
            first_name: "John".into(),
            last_name: "Smith".into(),
            phone_number: Some("+353 1 000000".into()),
            birth_date: None,
            gender: None,
        });

        let doctor = Doctor::new(
            "u-doc",
            "ada@clinic.test",
            "Ada",
            "Byron",
            "ML-1",
            "Cardiology",
            Utc::now(),
        );
        DoctorStore::insert(store.as_ref(), doctor.clone()).await.unwrap();

        let assignments = Arc::new(AssignmentService::new(
            store.clone(),
            store.clone(),
            directory.clone(),
        ));
        let svc = AppointmentService::new(store.clone(), store.clone(), directory, assignments);
        Fixture { store, svc, doctor }
    }

    fn booking(start: DateTime<Utc>) -> ScheduleAppointment {
        ScheduleAppointment {
            patient_user_id: "p-1".into(),
            start_time: start,
            duration_minutes: None,
            appointment_type: None,
            reason_for_visit: Some("persistent cough".into()),
            symptoms: None,
            patient_notes: None,
            consultation_fee: None,
            created_by: Some("p-1".into()),
        }
    }

    #[tokio::test]
    async fn test_schedule_denormalizes_patient_and_updates_ledger() {
        let f = fixture().await;
        let start = Utc::now() + Duration::days(3);

        let appt = f.svc.schedule(&f.doctor.id, booking(start)).await.unwrap();
        assert_eq!(appt.status, AppointmentStatus::Scheduled);
        assert_eq!(appt.patient_name, "John Smith");
        assert_eq!(appt.patient_email.as_deref(), Some("john@example.test"));
        assert_eq!(appt.duration_minutes, 30);
        assert_eq!(appt.end_time, start + Duration::minutes(30));

        let rel = crate::store::RelationshipStore::find_by_pair(f.store.as_ref(), &f.doctor.id, "p-1")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(rel.total_appointments, 1);
    }

    #[tokio::test]
    async fn test_schedule_rejects_overlap_but_allows_touching_windows() {
        let f = fixture().await;
        let start = Utc::now() + Duration::days(3);

        let first = f.svc.schedule(&f.doctor.id, booking(start)).await.unwrap();
        f.svc.confirm(&f.doctor.id, &first.id).await.unwrap();

        // [start+15m, start+45m) overlaps [start, start+30).
        let overlapping = f
            .svc
            .schedule(&f.doctor.id, booking(start + Duration::minutes(15)))
            .await;
        assert!(matches!(overlapping, Err(CoreError::Conflict(_))));
        assert_eq!(
            crate::store::AppointmentStore::count_by_doctor(f.store.as_ref(), &f.doctor.id)
                .await
                .unwrap(),
            1
        );

        // [start+30m, start+60m) touches the boundary and is accepted.
        f.svc
            .schedule(&f.doctor.id, booking(start + Duration::minutes(30)))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_schedule_rejects_past_start_and_unknown_type() {
        let f = fixture().await;

        let past = f
            .svc
            .schedule(&f.doctor.id, booking(Utc::now() - Duration::hours(1)))
            .await;
        assert!(matches!(past, Err(CoreError::InvalidArgument(_))));

        let mut bad_type = booking(Utc::now() + Duration::days(1));
        bad_type.appointment_type = Some("HOUSE_CALL".into());
        let result = f.svc.schedule(&f.doctor.id, bad_type).await;
        assert!(matches!(result, Err(CoreError::InvalidArgument(_))));
    }

    #[tokio::test]
    async fn test_complete_records_consultation_on_ledger() {
        let f = fixture().await;
        let appt = f
            .svc
            .schedule(&f.doctor.id, booking(Utc::now() + Duration::days(3)))
            .await
            .unwrap();

        f.svc.check_in(&f.doctor.id, &appt.id).await.unwrap();
        let done = f
            .svc
            .complete(
                &f.doctor.id,
                &appt.id,
                ConsultationOutcome {
                    diagnosis: Some("bronchitis".into()),
                    prescription: None,
                    treatment_plan: None,
                    notes: None,
                },
            )
            .await
            .unwrap();
        assert_eq!(done.status, AppointmentStatus::Completed);

        let rel = crate::store::RelationshipStore::find_by_pair(f.store.as_ref(), &f.doctor.id, "p-1")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(rel.total_consultations, 1);
        assert!(rel.first_consultation_date.is_some());
    }

    #[tokio::test]
    async fn test_cancel_enforces_notice_period() {
        let f = fixture().await;

        let soon = f
            .svc
            .schedule(&f.doctor.id, booking(Utc::now() + Duration::hours(2)))
            .await
            .unwrap();
        let refused = f.svc.cancel(&f.doctor.id, &soon.id, "p-1", Some("cold")).await;
        assert!(matches!(refused, Err(CoreError::Conflict(_))));

        let later = f
            .svc
            .schedule(&f.doctor.id, booking(Utc::now() + Duration::days(3)))
            .await
            .unwrap();
        let cancelled = f
            .svc
            .cancel(&f.doctor.id, &later.id, "p-1", Some("travel"))
            .await
            .unwrap();
        assert_eq!(cancelled.status, AppointmentStatus::Cancelled);
        assert_eq!(cancelled.cancellation_reason.as_deref(), Some("travel"));
    }

    #[tokio::test]
    async fn test_no_show_refused_after_completion() {
        let f = fixture().await;
        let appt = f
            .svc
            .schedule(&f.doctor.id, booking(Utc::now() + Duration::days(3)))
            .await
            .unwrap();
        f.svc
            .complete(&f.doctor.id, &appt.id, ConsultationOutcome::default())
            .await
            .unwrap();

        let refused = f.svc.mark_no_show(&f.doctor.id, &appt.id).await;
        assert!(matches!(refused, Err(CoreError::Conflict(_))));
    }

    #[tokio::test]
    async fn test_operations_hide_foreign_appointments() {
        let f = fixture().await;
        let appt = f
            .svc
            .schedule(&f.doctor.id, booking(Utc::now() + Duration::days(3)))
            .await
            .unwrap();

        let result = f.svc.confirm("some-other-doctor", &appt.id).await;
        assert!(matches!(result, Err(CoreError::NotFound(_))));
    }
}
