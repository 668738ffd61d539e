//! In-memory reference implementation of the store ports.
//!
//! Backs the server binary in local/dev deployments and every test. Each
//! collection is an id-keyed map behind its own `RwLock`, giving the same
//! per-document atomicity (and nothing stronger) that the ports promise; a
//! document-database adapter replaces this behind the same traits in
//! production.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::RwLock;

use crate::entities::doctor::ActivationStatus;
use crate::entities::{
    ActivationRequest, Appointment, AppointmentStatus, Doctor, DoctorPatient, RelationshipStatus,
};
use crate::store::{
    ActivationRequestStore, AppointmentStore, DoctorStore, Page, PageRequest, RelationshipStore,
};
use crate::{CoreError, CoreResult};

/// Map-backed store implementing all four entity ports.
#[derive(Default)]
pub struct MemoryStore {
    doctors: RwLock<HashMap<String, Doctor>>,
    requests: RwLock<HashMap<String, ActivationRequest>>,
    relationships: RwLock<HashMap<String, DoctorPatient>>,
    appointments: RwLock<HashMap<String, Appointment>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read<T>(lock: &RwLock<T>) -> CoreResult<std::sync::RwLockReadGuard<'_, T>> {
        lock.read()
            .map_err(|_| CoreError::Store("store lock poisoned".into()))
    }

    fn write<T>(lock: &RwLock<T>) -> CoreResult<std::sync::RwLockWriteGuard<'_, T>> {
        lock.write()
            .map_err(|_| CoreError::Store("store lock poisoned".into()))
    }
}

#[async_trait]
impl DoctorStore for MemoryStore {
    async fn insert(&self, doctor: Doctor) -> CoreResult<Doctor> {
        let mut doctors = Self::write(&self.doctors)?;
        doctors.insert(doctor.id.clone(), doctor.clone());
        Ok(doctor)
    }

    async fn find_by_id(&self, id: &str) -> CoreResult<Option<Doctor>> {
        Ok(Self::read(&self.doctors)?.get(id).cloned())
    }

    async fn find_by_user_id(&self, user_id: &str) -> CoreResult<Option<Doctor>> {
        Ok(Self::read(&self.doctors)?
            .values()
            .find(|d| d.user_id == user_id)
            .cloned())
    }

    async fn find_by_activation_status(
        &self,
        status: ActivationStatus,
    ) -> CoreResult<Vec<Doctor>> {
        let mut doctors: Vec<Doctor> = Self::read(&self.doctors)?
            .values()
            .filter(|d| d.activation_status == status)
            .cloned()
            .collect();
        doctors.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(doctors)
    }

    async fn save(&self, doctor: &Doctor) -> CoreResult<()> {
        let mut doctors = Self::write(&self.doctors)?;
        doctors.insert(doctor.id.clone(), doctor.clone());
        Ok(())
    }
}

#[async_trait]
impl ActivationRequestStore for MemoryStore {
    async fn insert(&self, request: ActivationRequest) -> CoreResult<ActivationRequest> {
        let mut requests = Self::write(&self.requests)?;
        requests.insert(request.id.clone(), request.clone());
        Ok(request)
    }

    async fn find_by_doctor_id(&self, doctor_id: &str) -> CoreResult<Option<ActivationRequest>> {
        Ok(Self::read(&self.requests)?
            .values()
            .find(|r| r.doctor_id == doctor_id)
            .cloned())
    }

    async fn count_pending(&self) -> CoreResult<u64> {
        Ok(Self::read(&self.requests)?
            .values()
            .filter(|r| r.is_pending)
            .count() as u64)
    }

    async fn save(&self, request: &ActivationRequest) -> CoreResult<()> {
        let mut requests = Self::write(&self.requests)?;
        requests.insert(request.id.clone(), request.clone());
        Ok(())
    }
}

#[async_trait]
impl RelationshipStore for MemoryStore {
    async fn insert(&self, relationship: DoctorPatient) -> CoreResult<DoctorPatient> {
        let mut relationships = Self::write(&self.relationships)?;
        let duplicate = relationships.values().any(|r| {
            r.doctor_id == relationship.doctor_id
                && r.patient_user_id == relationship.patient_user_id
        });
        if duplicate {
            return Err(CoreError::Conflict(format!(
                "relationship already exists for doctor {} and patient {}",
                relationship.doctor_id, relationship.patient_user_id
            )));
        }
        relationships.insert(relationship.id.clone(), relationship.clone());
        Ok(relationship)
    }

    async fn find_by_pair(
        &self,
        doctor_id: &str,
        patient_user_id: &str,
    ) -> CoreResult<Option<DoctorPatient>> {
        Ok(Self::read(&self.relationships)?
            .values()
            .find(|r| r.doctor_id == doctor_id && r.patient_user_id == patient_user_id)
            .cloned())
    }

    async fn exists_by_pair(&self, doctor_id: &str, patient_user_id: &str) -> CoreResult<bool> {
        Ok(Self::read(&self.relationships)?
            .values()
            .any(|r| r.doctor_id == doctor_id && r.patient_user_id == patient_user_id))
    }

    async fn find_by_doctor(
        &self,
        doctor_id: &str,
        status: Option<RelationshipStatus>,
        page: PageRequest,
    ) -> CoreResult<Page<DoctorPatient>> {
        let mut rows: Vec<DoctorPatient> = Self::read(&self.relationships)?
            .values()
            .filter(|r| r.doctor_id == doctor_id)
            .filter(|r| status.map_or(true, |s| r.status == s))
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.assigned_at.cmp(&a.assigned_at));
        Ok(Page::from_sorted(rows, page))
    }

    async fn count_by_doctor(&self, doctor_id: &str) -> CoreResult<u64> {
        Ok(Self::read(&self.relationships)?
            .values()
            .filter(|r| r.doctor_id == doctor_id)
            .count() as u64)
    }

    async fn count_by_doctor_and_status(
        &self,
        doctor_id: &str,
        status: RelationshipStatus,
    ) -> CoreResult<u64> {
        Ok(Self::read(&self.relationships)?
            .values()
            .filter(|r| r.doctor_id == doctor_id && r.status == status)
            .count() as u64)
    }

    async fn count_assigned_since(
        &self,
        doctor_id: &str,
        since: DateTime<Utc>,
    ) -> CoreResult<u64> {
        Ok(Self::read(&self.relationships)?
            .values()
            .filter(|r| r.doctor_id == doctor_id && r.assigned_at >= since)
            .count() as u64)
    }

    async fn save(&self, relationship: &DoctorPatient) -> CoreResult<()> {
        let mut relationships = Self::write(&self.relationships)?;
        relationships.insert(relationship.id.clone(), relationship.clone());
        Ok(())
    }
}

#[async_trait]
impl AppointmentStore for MemoryStore {
    async fn insert(&self, appointment: Appointment) -> CoreResult<Appointment> {
        let mut appointments = Self::write(&self.appointments)?;
        appointments.insert(appointment.id.clone(), appointment.clone());
        Ok(appointment)
    }

    async fn find_by_id(&self, id: &str) -> CoreResult<Option<Appointment>> {
        Ok(Self::read(&self.appointments)?.get(id).cloned())
    }

    async fn find_for_doctor(
        &self,
        doctor_id: &str,
        status: Option<AppointmentStatus>,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
        page: PageRequest,
    ) -> CoreResult<Page<Appointment>> {
        let mut rows: Vec<Appointment> = Self::read(&self.appointments)?
            .values()
            .filter(|a| a.doctor_id == doctor_id)
            .filter(|a| status.map_or(true, |s| a.status == s))
            .filter(|a| a.start_time >= from && a.start_time <= to)
            .cloned()
            .collect();
        rows.sort_by(|a, b| a.start_time.cmp(&b.start_time));
        Ok(Page::from_sorted(rows, page))
    }

    async fn find_schedulable_from(
        &self,
        doctor_id: &str,
        from: DateTime<Utc>,
    ) -> CoreResult<Vec<Appointment>> {
        let mut rows: Vec<Appointment> = Self::read(&self.appointments)?
            .values()
            .filter(|a| a.doctor_id == doctor_id && a.is_schedulable() && a.start_time >= from)
            .cloned()
            .collect();
        rows.sort_by(|a, b| a.start_time.cmp(&b.start_time));
        Ok(rows)
    }

    async fn find_in_window(
        &self,
        doctor_id: &str,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> CoreResult<Vec<Appointment>> {
        let mut rows: Vec<Appointment> = Self::read(&self.appointments)?
            .values()
            .filter(|a| a.doctor_id == doctor_id && a.start_time >= from && a.start_time <= to)
            .cloned()
            .collect();
        rows.sort_by(|a, b| a.start_time.cmp(&b.start_time));
        Ok(rows)
    }

    async fn find_by_pair(
        &self,
        doctor_id: &str,
        patient_user_id: &str,
    ) -> CoreResult<Vec<Appointment>> {
        let mut rows: Vec<Appointment> = Self::read(&self.appointments)?
            .values()
            .filter(|a| a.doctor_id == doctor_id && a.patient_user_id == patient_user_id)
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.start_time.cmp(&a.start_time));
        Ok(rows)
    }

    async fn find_conflicting(
        &self,
        doctor_id: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> CoreResult<Vec<Appointment>> {
        let mut rows: Vec<Appointment> = Self::read(&self.appointments)?
            .values()
            .filter(|a| {
                a.doctor_id == doctor_id && a.status.blocks_slot() && a.overlaps(start, end)
            })
            .cloned()
            .collect();
        rows.sort_by(|a, b| a.start_time.cmp(&b.start_time));
        Ok(rows)
    }

    async fn count_by_doctor(&self, doctor_id: &str) -> CoreResult<u64> {
        Ok(Self::read(&self.appointments)?
            .values()
            .filter(|a| a.doctor_id == doctor_id)
            .count() as u64)
    }

    async fn count_by_doctor_and_status(
        &self,
        doctor_id: &str,
        status: AppointmentStatus,
    ) -> CoreResult<u64> {
        Ok(Self::read(&self.appointments)?
            .values()
            .filter(|a| a.doctor_id == doctor_id && a.status == status)
            .count() as u64)
    }

    async fn count_in_window(
        &self,
        doctor_id: &str,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> CoreResult<u64> {
        Ok(Self::read(&self.appointments)?
            .values()
            .filter(|a| a.doctor_id == doctor_id && a.start_time >= from && a.start_time <= to)
            .count() as u64)
    }

    async fn count_with_status_in_window(
        &self,
        doctor_id: &str,
        status: AppointmentStatus,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> CoreResult<u64> {
        Ok(Self::read(&self.appointments)?
            .values()
            .filter(|a| {
                a.doctor_id == doctor_id
                    && a.status == status
                    && a.start_time >= from
                    && a.start_time <= to
            })
            .count() as u64)
    }

    async fn save(&self, appointment: &Appointment) -> CoreResult<()> {
        let mut appointments = Self::write(&self.appointments)?;
        appointments.insert(appointment.id.clone(), appointment.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::appointment::AppointmentType;
    use chrono::Duration;

    fn appointment(
        doctor_id: &str,
        start: DateTime<Utc>,
        minutes: u32,
        status: AppointmentStatus,
    ) -> Appointment {
        let mut appt = Appointment::new(
            doctor_id,
            "p-1",
            "John Smith",
            start,
            minutes,
            AppointmentType::Consultation,
            Utc::now(),
        );
        appt.status = status;
        appt
    }

    #[tokio::test]
    async fn test_relationship_pair_is_unique() {
        let store = MemoryStore::new();
        let now = Utc::now();
        RelationshipStore::insert(&store, DoctorPatient::new("d-1", "p-1", now))
            .await
            .unwrap();

        let duplicate =
            RelationshipStore::insert(&store, DoctorPatient::new("d-1", "p-1", now)).await;
        assert!(matches!(duplicate, Err(CoreError::Conflict(_))));

        // A different pair is fine.
        RelationshipStore::insert(&store, DoctorPatient::new("d-1", "p-2", now))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_relationships_page_newest_first() {
        let store = MemoryStore::new();
        let base = Utc::now();
        for i in 0..5 {
            let rel = DoctorPatient::new("d-1", format!("p-{i}"), base + Duration::days(i));
            RelationshipStore::insert(&store, rel).await.unwrap();
        }

        let page = store
            .find_by_doctor("d-1", None, PageRequest::new(0, 2))
            .await
            .unwrap();
        assert_eq!(page.total_items, 5);
        assert_eq!(page.total_pages, 3);
        assert_eq!(page.items.len(), 2);
        assert_eq!(page.items[0].patient_user_id, "p-4");
        assert_eq!(page.items[1].patient_user_id, "p-3");

        let last = store
            .find_by_doctor("d-1", None, PageRequest::new(2, 2))
            .await
            .unwrap();
        assert_eq!(last.items.len(), 1);
        assert_eq!(last.items[0].patient_user_id, "p-0");
    }

    #[tokio::test]
    async fn test_conflict_query_uses_half_open_windows() {
        let store = MemoryStore::new();
        let base = Utc::now();
        // Existing CONFIRMED appointment [10:00, 10:30).
        let existing = appointment("d-1", base, 30, AppointmentStatus::Confirmed);
        AppointmentStore::insert(&store, existing).await.unwrap();

        // [10:15, 10:45) overlaps.
        let hits = store
            .find_conflicting(
                "d-1",
                base + Duration::minutes(15),
                base + Duration::minutes(45),
            )
            .await
            .unwrap();
        assert_eq!(hits.len(), 1);

        // [10:30, 11:00) touches the boundary: no conflict.
        let none = store
            .find_conflicting(
                "d-1",
                base + Duration::minutes(30),
                base + Duration::minutes(60),
            )
            .await
            .unwrap();
        assert!(none.is_empty());
    }

    #[tokio::test]
    async fn test_conflict_query_ignores_non_blocking_statuses() {
        let store = MemoryStore::new();
        let base = Utc::now();
        let cancelled = appointment("d-1", base, 30, AppointmentStatus::Cancelled);
        AppointmentStore::insert(&store, cancelled).await.unwrap();

        let hits = store
            .find_conflicting("d-1", base, base + Duration::minutes(30))
            .await
            .unwrap();
        assert!(hits.is_empty());
    }

    #[tokio::test]
    async fn test_window_queries_are_inclusive_and_sorted() {
        let store = MemoryStore::new();
        let base = Utc::now();
        for (i, offset) in [0i64, 60, 120, 180].iter().enumerate() {
            let mut appt = appointment(
                "d-1",
                base + Duration::minutes(*offset),
                30,
                AppointmentStatus::Scheduled,
            );
            appt.patient_user_id = format!("p-{i}");
            AppointmentStore::insert(&store, appt).await.unwrap();
        }

        let rows = store
            .find_in_window("d-1", base, base + Duration::minutes(120))
            .await
            .unwrap();
        assert_eq!(rows.len(), 3);
        assert!(rows.windows(2).all(|w| w[0].start_time <= w[1].start_time));
    }
}
