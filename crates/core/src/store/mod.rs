//! Persistence contracts for each entity kind.
//!
//! The underlying document database is an external collaborator: these
//! traits promise per-document atomicity and the query capabilities the
//! services need (equality filters, inclusive datetime ranges, fixed sort
//! orders, pagination) and nothing more. Multi-document sequences are not
//! transactional; see DESIGN.md for the consistency policy.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::entities::{
    ActivationRequest, Appointment, AppointmentStatus, Doctor, DoctorPatient, RelationshipStatus,
};
use crate::entities::doctor::ActivationStatus;
use crate::CoreResult;

pub mod memory;

pub use memory::MemoryStore;

/// A 0-based page request. Sizes are clamped by the API layer against
/// `CoreConfig`; stores take the request as-is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u32,
    pub size: u32,
}

impl PageRequest {
    pub fn new(page: u32, size: u32) -> Self {
        Self { page, size }
    }

    pub fn offset(&self) -> usize {
        self.page as usize * self.size as usize
    }
}

/// One page of results plus the totals needed to render pagination.
#[derive(Debug, Clone)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page: u32,
    pub size: u32,
    pub total_items: u64,
    pub total_pages: u32,
}

impl<T> Page<T> {
    /// Page a fully sorted result set in memory.
    pub fn from_sorted(all: Vec<T>, request: PageRequest) -> Self {
        let total_items = all.len() as u64;
        let size = request.size.max(1);
        let total_pages = total_items.div_ceil(u64::from(size)) as u32;
        let items = all
            .into_iter()
            .skip(request.offset())
            .take(size as usize)
            .collect();
        Self {
            items,
            page: request.page,
            size,
            total_items,
            total_pages,
        }
    }

    /// Map the page's items, keeping the pagination envelope.
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            page: self.page,
            size: self.size,
            total_items: self.total_items,
            total_pages: self.total_pages,
        }
    }
}

/// Store for [`Doctor`] records.
#[async_trait]
pub trait DoctorStore: Send + Sync {
    async fn insert(&self, doctor: Doctor) -> CoreResult<Doctor>;
    async fn find_by_id(&self, id: &str) -> CoreResult<Option<Doctor>>;
    /// Lookup by the owning user-directory identity.
    async fn find_by_user_id(&self, user_id: &str) -> CoreResult<Option<Doctor>>;
    async fn find_by_activation_status(&self, status: ActivationStatus)
        -> CoreResult<Vec<Doctor>>;
    /// Upsert by id.
    async fn save(&self, doctor: &Doctor) -> CoreResult<()>;
}

/// Store for [`ActivationRequest`] records. At most one open request exists
/// per doctor; the per-doctor lookup is the uniqueness boundary.
#[async_trait]
pub trait ActivationRequestStore: Send + Sync {
    async fn insert(&self, request: ActivationRequest) -> CoreResult<ActivationRequest>;
    async fn find_by_doctor_id(&self, doctor_id: &str) -> CoreResult<Option<ActivationRequest>>;
    async fn count_pending(&self) -> CoreResult<u64>;
    async fn save(&self, request: &ActivationRequest) -> CoreResult<()>;
}

/// Store for [`DoctorPatient`] relationship rows.
#[async_trait]
pub trait RelationshipStore: Send + Sync {
    /// Insert a new relationship. Fails with `Conflict` if a row for the
    /// (doctor_id, patient_user_id) pair already exists.
    async fn insert(&self, relationship: DoctorPatient) -> CoreResult<DoctorPatient>;
    async fn find_by_pair(
        &self,
        doctor_id: &str,
        patient_user_id: &str,
    ) -> CoreResult<Option<DoctorPatient>>;
    async fn exists_by_pair(&self, doctor_id: &str, patient_user_id: &str) -> CoreResult<bool>;
    /// Relationships for a doctor, optionally filtered by status, newest
    /// assignment first.
    async fn find_by_doctor(
        &self,
        doctor_id: &str,
        status: Option<RelationshipStatus>,
        page: PageRequest,
    ) -> CoreResult<Page<DoctorPatient>>;
    async fn count_by_doctor(&self, doctor_id: &str) -> CoreResult<u64>;
    async fn count_by_doctor_and_status(
        &self,
        doctor_id: &str,
        status: RelationshipStatus,
    ) -> CoreResult<u64>;
    /// Relationships assigned at or after `since` (new-patients statistics).
    async fn count_assigned_since(
        &self,
        doctor_id: &str,
        since: DateTime<Utc>,
    ) -> CoreResult<u64>;
    async fn save(&self, relationship: &DoctorPatient) -> CoreResult<()>;
}

/// Store for [`Appointment`] records.
#[async_trait]
pub trait AppointmentStore: Send + Sync {
    async fn insert(&self, appointment: Appointment) -> CoreResult<Appointment>;
    async fn find_by_id(&self, id: &str) -> CoreResult<Option<Appointment>>;
    /// Appointments for a doctor within an inclusive start-time window,
    /// optionally filtered by status, start time ascending.
    async fn find_for_doctor(
        &self,
        doctor_id: &str,
        status: Option<AppointmentStatus>,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
        page: PageRequest,
    ) -> CoreResult<Page<Appointment>>;
    /// SCHEDULED/CONFIRMED appointments starting at or after `from`,
    /// ascending.
    async fn find_schedulable_from(
        &self,
        doctor_id: &str,
        from: DateTime<Utc>,
    ) -> CoreResult<Vec<Appointment>>;
    /// All appointments with a start time in [from, to], ascending.
    async fn find_in_window(
        &self,
        doctor_id: &str,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> CoreResult<Vec<Appointment>>;
    /// All appointments between the pair, start time descending.
    async fn find_by_pair(
        &self,
        doctor_id: &str,
        patient_user_id: &str,
    ) -> CoreResult<Vec<Appointment>>;
    /// Slot-blocking appointments (SCHEDULED/CONFIRMED/IN_PROGRESS) whose
    /// [start, end) window overlaps the given half-open window.
    async fn find_conflicting(
        &self,
        doctor_id: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> CoreResult<Vec<Appointment>>;
    async fn count_by_doctor(&self, doctor_id: &str) -> CoreResult<u64>;
    async fn count_by_doctor_and_status(
        &self,
        doctor_id: &str,
        status: AppointmentStatus,
    ) -> CoreResult<u64>;
    /// Count of appointments with a start time in [from, to].
    async fn count_in_window(
        &self,
        doctor_id: &str,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> CoreResult<u64>;
    /// As [`count_in_window`](Self::count_in_window), restricted to one status.
    async fn count_with_status_in_window(
        &self,
        doctor_id: &str,
        status: AppointmentStatus,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> CoreResult<u64>;
    async fn save(&self, appointment: &Appointment) -> CoreResult<()>;
}
