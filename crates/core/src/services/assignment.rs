//! Patient assignment ledger.
//!
//! Maintains the doctor↔patient relationship rows and their usage counters,
//! and keeps the doctor's cached active-patient count in step with the
//! ledger. Assignment is idempotent: booking a second appointment with the
//! same doctor reuses the existing relationship.

use chrono::Utc;
use std::sync::Arc;

use crate::directory::UserDirectory;
use crate::entities::{DoctorPatient, RelationshipStatus};
use crate::store::{DoctorStore, RelationshipStore};
use crate::{CoreError, CoreResult};

pub struct AssignmentService {
    doctors: Arc<dyn DoctorStore>,
    relationships: Arc<dyn RelationshipStore>,
    directory: Arc<dyn UserDirectory>,
}

impl AssignmentService {
    pub fn new(
        doctors: Arc<dyn DoctorStore>,
        relationships: Arc<dyn RelationshipStore>,
        directory: Arc<dyn UserDirectory>,
    ) -> Self {
        Self {
            doctors,
            relationships,
            directory,
        }
    }

    /// Assign a patient to a doctor, or return the existing relationship.
    ///
    /// Called when a patient books their first appointment with a doctor or
    /// when a doctor adds a patient manually. Creating a relationship also
    /// recomputes the doctor's cached active-patient count.
    ///
    /// # Errors
    ///
    /// * `NotFound`: doctor absent, or the patient id is unknown to the
    ///   user directory.
    pub async fn assign(&self, doctor_id: &str, patient_user_id: &str) -> CoreResult<DoctorPatient> {
        tracing::info!(%doctor_id, %patient_user_id, "assigning patient to doctor");

        let doctor = self
            .doctors
            .find_by_id(doctor_id)
            .await?
            .ok_or_else(|| CoreError::doctor_not_found(doctor_id))?;

        self.directory
            .get_by_id(patient_user_id)
            .await?
            .ok_or_else(|| {
                CoreError::NotFound(format!("patient not found in user directory: {patient_user_id}"))
            })?;

        if let Some(existing) = self
            .relationships
            .find_by_pair(doctor_id, patient_user_id)
            .await?
        {
            return Ok(existing);
        }

        let relationship = self
            .relationships
            .insert(DoctorPatient::new(doctor_id, patient_user_id, Utc::now()))
            .await?;

        self.refresh_patient_count(&doctor.id).await?;
        tracing::info!(relationship_id = %relationship.id, "patient assigned");
        Ok(relationship)
    }

    /// Authorization guard used by appointment and dashboard operations.
    pub async fn verify_belongs(&self, doctor_id: &str, patient_user_id: &str) -> CoreResult<bool> {
        self.relationships.exists_by_pair(doctor_id, patient_user_id).await
    }

    /// The relationship row for the pair.
    ///
    /// # Errors
    ///
    /// `NotFound` when the patient is not assigned to this doctor.
    pub async fn relationship(
        &self,
        doctor_id: &str,
        patient_user_id: &str,
    ) -> CoreResult<DoctorPatient> {
        self.relationships
            .find_by_pair(doctor_id, patient_user_id)
            .await?
            .ok_or_else(|| {
                CoreError::NotFound(format!(
                    "patient {patient_user_id} is not assigned to doctor {doctor_id}"
                ))
            })
    }

    /// Count a completed consultation on the relationship and the doctor's
    /// cached total.
    pub async fn record_consultation(
        &self,
        doctor_id: &str,
        patient_user_id: &str,
    ) -> CoreResult<DoctorPatient> {
        let mut relationship = self.relationship(doctor_id, patient_user_id).await?;
        relationship.record_consultation(Utc::now());
        self.relationships.save(&relationship).await?;

        if let Some(mut doctor) = self.doctors.find_by_id(doctor_id).await? {
            doctor.total_consultations += 1;
            doctor.updated_at = Utc::now();
            self.doctors.save(&doctor).await?;
        }

        tracing::info!(%doctor_id, %patient_user_id, "recorded consultation");
        Ok(relationship)
    }

    /// Count a booked appointment on the relationship.
    pub async fn record_appointment(
        &self,
        doctor_id: &str,
        patient_user_id: &str,
    ) -> CoreResult<DoctorPatient> {
        let mut relationship = self.relationship(doctor_id, patient_user_id).await?;
        relationship.record_appointment(Utc::now());
        self.relationships.save(&relationship).await?;

        tracing::info!(%doctor_id, %patient_user_id, "recorded appointment");
        Ok(relationship)
    }

    /// Explicitly end a relationship. The row survives for history; the
    /// doctor's cached active-patient count drops.
    pub async fn terminate(
        &self,
        doctor_id: &str,
        patient_user_id: &str,
        reason: Option<&str>,
    ) -> CoreResult<DoctorPatient> {
        let mut relationship = self.relationship(doctor_id, patient_user_id).await?;
        relationship.terminate(reason, Utc::now());
        self.relationships.save(&relationship).await?;
        self.refresh_patient_count(doctor_id).await?;

        tracing::info!(%doctor_id, %patient_user_id, "relationship terminated");
        Ok(relationship)
    }

    /// Recompute the doctor's cached patient count from the ACTIVE
    /// relationship count. Runs on every assignment/termination write; the
    /// cache is for dashboard read latency, not a source of truth.
    async fn refresh_patient_count(&self, doctor_id: &str) -> CoreResult<()> {
        let active = self
            .relationships
            .count_by_doctor_and_status(doctor_id, RelationshipStatus::Active)
            .await?;

        let mut doctor = self
            .doctors
            .find_by_id(doctor_id)
            .await?
            .ok_or_else(|| CoreError::doctor_not_found(doctor_id))?;
        doctor.total_patients = active;
        doctor.updated_at = Utc::now();
        self.doctors.save(&doctor).await?;

        tracing::debug!(%doctor_id, active, "refreshed cached patient count");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::directory::{MemoryDirectory, UserRecord};
    use crate::entities::Doctor;
    use crate::store::MemoryStore;

    fn patient_record(id: &str) -> UserRecord {
        UserRecord {
            id: id.into(),
            email: format!("{id}@example.test"),
            first_name: "John".into(),
            last_name: "Smith".into(),
            phone_number: None,
            birth_date: None,
            gender: None,
        }
    }

    async fn seed_doctor(store: &Arc<MemoryStore>) -> Doctor {
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
        doctor
    }

    fn service(store: &Arc<MemoryStore>, directory: &Arc<MemoryDirectory>) -> AssignmentService {
        AssignmentService::new(store.clone(), store.clone(), directory.clone())
    }

    #[tokio::test]
    async fn test_assign_is_idempotent() {
        let store = Arc::new(MemoryStore::new());
        let directory = Arc::new(MemoryDirectory::new());
        directory.put(patient_record("p-1"));
        let svc = service(&store, &directory);
        let doctor = seed_doctor(&store).await;

        let first = svc.assign(&doctor.id, "p-1").await.unwrap();
        let second = svc.assign(&doctor.id, "p-1").await.unwrap();
        assert_eq!(first.id, second.id);
        assert_eq!(
            RelationshipStore::count_by_doctor(store.as_ref(), &doctor.id)
                .await
                .unwrap(),
            1
        );
    }

    #[tokio::test]
    async fn test_assign_requires_doctor_and_directory_user() {
        let store = Arc::new(MemoryStore::new());
        let directory = Arc::new(MemoryDirectory::new());
        directory.put(patient_record("p-1"));
        let svc = service(&store, &directory);

        let no_doctor = svc.assign("missing", "p-1").await;
        assert!(matches!(no_doctor, Err(CoreError::NotFound(_))));

        let doctor = seed_doctor(&store).await;
        let no_patient = svc.assign(&doctor.id, "p-unknown").await;
        assert!(matches!(no_patient, Err(CoreError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_assign_refreshes_cached_patient_count() {
        let store = Arc::new(MemoryStore::new());
        let directory = Arc::new(MemoryDirectory::new());
        directory.put(patient_record("p-1"));
        directory.put(patient_record("p-2"));
        let svc = service(&store, &directory);
        let doctor = seed_doctor(&store).await;

        svc.assign(&doctor.id, "p-1").await.unwrap();
        svc.assign(&doctor.id, "p-2").await.unwrap();

        let saved = DoctorStore::find_by_id(store.as_ref(), &doctor.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(saved.total_patients, 2);
    }

    #[tokio::test]
    async fn test_record_consultation_updates_counters_and_dates() {
        let store = Arc::new(MemoryStore::new());
        let directory = Arc::new(MemoryDirectory::new());
        directory.put(patient_record("p-1"));
        let svc = service(&store, &directory);
        let doctor = seed_doctor(&store).await;
        svc.assign(&doctor.id, "p-1").await.unwrap();

        let before = Utc::now();
        let rel = svc.record_consultation(&doctor.id, "p-1").await.unwrap();
        assert_eq!(rel.total_consultations, 1);
        let first = rel.first_consultation_date.unwrap();
        assert!(first >= before);
        assert_eq!(rel.first_consultation_date, rel.last_consultation_date);

        let rel = svc.record_consultation(&doctor.id, "p-1").await.unwrap();
        assert_eq!(rel.total_consultations, 2);
        // First-consultation date set only once.
        assert_eq!(rel.first_consultation_date.unwrap(), first);
        assert!(rel.last_consultation_date.unwrap() >= first);

        let saved = DoctorStore::find_by_id(store.as_ref(), &doctor.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(saved.total_consultations, 2);
    }

    #[tokio::test]
    async fn test_counters_require_existing_relationship() {
        let store = Arc::new(MemoryStore::new());
        let directory = Arc::new(MemoryDirectory::new());
        let svc = service(&store, &directory);
        let doctor = seed_doctor(&store).await;

        let consultation = svc.record_consultation(&doctor.id, "p-1").await;
        assert!(matches!(consultation, Err(CoreError::NotFound(_))));
        let appointment = svc.record_appointment(&doctor.id, "p-1").await;
        assert!(matches!(appointment, Err(CoreError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_terminate_drops_cached_active_count() {
        let store = Arc::new(MemoryStore::new());
        let directory = Arc::new(MemoryDirectory::new());
        directory.put(patient_record("p-1"));
        let svc = service(&store, &directory);
        let doctor = seed_doctor(&store).await;
        svc.assign(&doctor.id, "p-1").await.unwrap();

        let rel = svc.terminate(&doctor.id, "p-1", Some("moved away")).await.unwrap();
        assert_eq!(rel.status, RelationshipStatus::Terminated);

        let saved = DoctorStore::find_by_id(store.as_ref(), &doctor.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(saved.total_patients, 0);
        // Row survives for history.
        assert!(svc.verify_belongs(&doctor.id, "p-1").await.unwrap());
    }
}
