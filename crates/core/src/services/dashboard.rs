//! Dashboard aggregation for authenticated doctors.
//!
//! Pure read composition: statistics, the stitched patient list, and
//! appointment views for the doctor resolved from the caller's user id.
//! Patient demographics are fetched in batch from the user directory; a
//! patient missing from the directory drops that single row from the output
//! rather than failing the whole list.

use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveTime, Utc};
use std::sync::Arc;

use crate::config::UPCOMING_WINDOW_DAYS;
use crate::directory::UserDirectory;
use crate::entities::{
    Appointment, AppointmentStatus, AppointmentType, Doctor, RelationshipStatus,
};
use crate::store::{AppointmentStore, DoctorStore, Page, PageRequest, RelationshipStore};
use crate::{CoreError, CoreResult};

/// Headline numbers for the dashboard landing view.
#[derive(Debug, Clone, PartialEq)]
pub struct DashboardStatistics {
    pub doctor_id: String,
    pub total_patients: u64,
    pub active_patients: u64,
    pub total_appointments: u64,
    /// SCHEDULED/CONFIRMED appointments starting at or after now.
    pub upcoming_appointments: u64,
    pub today_appointments: u64,
    pub completed_today: u64,
    /// Today's appointments still awaiting their slot (SCHEDULED/CONFIRMED).
    pub pending_today: u64,
    /// Monday 00:00 of the current week through now.
    pub this_week_appointments: u64,
    pub completed_this_month: u64,
    /// Relationships assigned within the current calendar month.
    pub new_patients_this_month: u64,
    pub total_consultations: u64,
    pub average_rating: Option<f64>,
}

/// One row of the doctor's patient list: ledger data stitched with the
/// directory record and the next upcoming appointment.
#[derive(Debug, Clone)]
pub struct PatientSummary {
    pub relationship_id: String,
    pub user_id: String,
    pub first_name: String,
    pub last_name: String,
    pub full_name: String,
    pub email: String,
    pub phone_number: Option<String>,
    pub birth_date: Option<NaiveDate>,
    pub age: Option<u32>,
    pub gender: Option<String>,
    pub status: RelationshipStatus,
    pub first_consultation_date: Option<DateTime<Utc>>,
    pub last_consultation_date: Option<DateTime<Utc>>,
    pub total_consultations: u64,
    pub next_appointment_date: Option<DateTime<Utc>>,
    pub next_appointment_type: Option<AppointmentType>,
    pub assigned_at: DateTime<Utc>,
}

/// Patient counts keyed by relationship status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PatientCounts {
    pub active: u64,
    pub inactive: u64,
    pub total: u64,
}

/// Appointment counts keyed by status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AppointmentCounts {
    pub scheduled: u64,
    pub confirmed: u64,
    pub in_progress: u64,
    pub completed: u64,
    pub cancelled: u64,
    pub no_show: u64,
    pub total: u64,
}

/// Filters for the patient list endpoint.
#[derive(Debug, Clone)]
pub struct PatientListQuery {
    /// ACTIVE, INACTIVE, TERMINATED or ALL.
    pub status: String,
    /// Case-insensitive substring over first name, last name and email.
    pub search: Option<String>,
    pub page: PageRequest,
}

/// Filters for the appointment list endpoint.
#[derive(Debug, Clone)]
pub struct AppointmentListQuery {
    /// An appointment status or ALL.
    pub status: String,
    /// Calendar date (YYYY-MM-DD), inclusive. Defaults to today.
    pub from: Option<String>,
    /// Calendar date (YYYY-MM-DD), inclusive. Defaults to one year from today.
    pub to: Option<String>,
    pub page: PageRequest,
}

pub struct DashboardService {
    doctors: Arc<dyn DoctorStore>,
    relationships: Arc<dyn RelationshipStore>,
    appointments: Arc<dyn AppointmentStore>,
    directory: Arc<dyn UserDirectory>,
}

impl DashboardService {
    pub fn new(
        doctors: Arc<dyn DoctorStore>,
        relationships: Arc<dyn RelationshipStore>,
        appointments: Arc<dyn AppointmentStore>,
        directory: Arc<dyn UserDirectory>,
    ) -> Self {
        Self {
            doctors,
            relationships,
            appointments,
            directory,
        }
    }

    /// The doctor record owned by the calling identity.
    pub async fn doctor_for_user(&self, user_id: &str) -> CoreResult<Doctor> {
        self.doctors
            .find_by_user_id(user_id)
            .await?
            .ok_or_else(|| CoreError::NotFound(format!("doctor not found for user {user_id}")))
    }

    /// Dashboard statistics for the calling doctor.
    pub async fn statistics(&self, user_id: &str) -> CoreResult<DashboardStatistics> {
        self.statistics_at(user_id, Utc::now()).await
    }

    async fn statistics_at(&self, user_id: &str, now: DateTime<Utc>) -> CoreResult<DashboardStatistics> {
        let doctor = self.doctor_for_user(user_id).await?;
        tracing::info!(doctor_id = %doctor.id, "computing dashboard statistics");

        let (day_start, day_end) = day_bounds(now);
        let week_start = start_of_week(now);
        let month_start = start_of_month(now);

        let total_patients = self.relationships.count_by_doctor(&doctor.id).await?;
        let active_patients = self
            .relationships
            .count_by_doctor_and_status(&doctor.id, RelationshipStatus::Active)
            .await?;
        let total_appointments = self.appointments.count_by_doctor(&doctor.id).await?;
        let upcoming_appointments =
            self.appointments.find_schedulable_from(&doctor.id, now).await?.len() as u64;

        let today_appointments = self
            .appointments
            .count_in_window(&doctor.id, day_start, day_end)
            .await?;
        let completed_today = self
            .appointments
            .count_with_status_in_window(&doctor.id, AppointmentStatus::Completed, day_start, day_end)
            .await?;
        let pending_today = self
            .appointments
            .count_with_status_in_window(&doctor.id, AppointmentStatus::Scheduled, day_start, day_end)
            .await?
            + self
                .appointments
                .count_with_status_in_window(&doctor.id, AppointmentStatus::Confirmed, day_start, day_end)
                .await?;

        let this_week_appointments = self
            .appointments
            .count_in_window(&doctor.id, week_start, now)
            .await?;
        let completed_this_month = self
            .appointments
            .count_with_status_in_window(&doctor.id, AppointmentStatus::Completed, month_start, now)
            .await?;
        let new_patients_this_month = self
            .relationships
            .count_assigned_since(&doctor.id, month_start)
            .await?;

        Ok(DashboardStatistics {
            doctor_id: doctor.id,
            total_patients,
            active_patients,
            total_appointments,
            upcoming_appointments,
            today_appointments,
            completed_today,
            pending_today,
            this_week_appointments,
            completed_this_month,
            new_patients_this_month,
            total_consultations: doctor.total_consultations,
            average_rating: doctor.average_rating,
        })
    }

    /// The doctor's patient list, stitched with directory records.
    pub async fn patients(
        &self,
        user_id: &str,
        query: PatientListQuery,
    ) -> CoreResult<Page<PatientSummary>> {
        self.patients_at(user_id, query, Utc::now()).await
    }

    async fn patients_at(
        &self,
        user_id: &str,
        query: PatientListQuery,
        now: DateTime<Utc>,
    ) -> CoreResult<Page<PatientSummary>> {
        let doctor = self.doctor_for_user(user_id).await?;

        let status = parse_relationship_filter(&query.status)?;
        let relationships = self
            .relationships
            .find_by_doctor(&doctor.id, status, query.page)
            .await?;

        let ids: Vec<String> = relationships
            .items
            .iter()
            .map(|r| r.patient_user_id.clone())
            .collect();
        let users = self.directory.get_by_ids(&ids).await?;
        let users: std::collections::HashMap<&str, _> =
            users.iter().map(|u| (u.id.as_str(), u)).collect();

        let mut summaries = Vec::with_capacity(relationships.items.len());
        for relationship in &relationships.items {
            let Some(user) = users.get(relationship.patient_user_id.as_str()) else {
                tracing::warn!(
                    patient_user_id = %relationship.patient_user_id,
                    "patient missing from user directory, skipping row"
                );
                continue;
            };

            let next = self
                .next_appointment(&doctor.id, &relationship.patient_user_id, now)
                .await?;

            summaries.push(PatientSummary {
                relationship_id: relationship.id.clone(),
                user_id: user.id.clone(),
                first_name: user.first_name.clone(),
                last_name: user.last_name.clone(),
                full_name: user.full_name(),
                email: user.email.clone(),
                phone_number: user.phone_number.clone(),
                birth_date: user.birth_date,
                age: user.age(),
                gender: user.gender.clone(),
                status: relationship.status,
                first_consultation_date: relationship.first_consultation_date,
                last_consultation_date: relationship.last_consultation_date,
                total_consultations: relationship.total_consultations,
                next_appointment_date: next.as_ref().map(|a| a.start_time),
                next_appointment_type: next.as_ref().map(|a| a.appointment_type),
                assigned_at: relationship.assigned_at,
            });
        }

        if let Some(search) = query.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            let needle = search.to_lowercase();
            summaries.retain(|p| {
                p.first_name.to_lowercase().contains(&needle)
                    || p.last_name.to_lowercase().contains(&needle)
                    || p.email.to_lowercase().contains(&needle)
            });
        }

        tracing::info!(doctor_id = %doctor.id, count = summaries.len(), "patient list built");
        // Totals describe the unsearched relationship page: the search term
        // filters rows after the stitch, as the list endpoint always has.
        Ok(Page {
            items: summaries,
            page: relationships.page,
            size: relationships.size,
            total_items: relationships.total_items,
            total_pages: relationships.total_pages,
        })
    }

    /// The doctor's appointments within a calendar-date window.
    pub async fn appointments(
        &self,
        user_id: &str,
        query: AppointmentListQuery,
    ) -> CoreResult<Page<Appointment>> {
        self.appointments_at(user_id, query, Utc::now()).await
    }

    async fn appointments_at(
        &self,
        user_id: &str,
        query: AppointmentListQuery,
        now: DateTime<Utc>,
    ) -> CoreResult<Page<Appointment>> {
        let doctor = self.doctor_for_user(user_id).await?;

        let status = parse_appointment_filter(&query.status)?;
        let today = now.date_naive();
        let from = match query.from.as_deref() {
            Some(s) => parse_calendar_date(s)?,
            None => today,
        };
        let to = match query.to.as_deref() {
            Some(s) => parse_calendar_date(s)?,
            None => today + Duration::days(365),
        };
        if to < from {
            return Err(CoreError::InvalidArgument(format!(
                "date window end {to} precedes start {from}"
            )));
        }

        let from_dt = from.and_time(NaiveTime::MIN).and_utc();
        let (_, to_dt) = day_bounds(to.and_time(NaiveTime::MIN).and_utc());

        self.appointments
            .find_for_doctor(&doctor.id, status, from_dt, to_dt, query.page)
            .await
    }

    /// Convenience view: schedulable appointments in the next 7 days.
    pub async fn upcoming(&self, user_id: &str) -> CoreResult<Vec<Appointment>> {
        self.upcoming_at(user_id, Utc::now()).await
    }

    async fn upcoming_at(&self, user_id: &str, now: DateTime<Utc>) -> CoreResult<Vec<Appointment>> {
        let doctor = self.doctor_for_user(user_id).await?;
        let horizon = now + Duration::days(UPCOMING_WINDOW_DAYS);
        let mut upcoming = self.appointments.find_schedulable_from(&doctor.id, now).await?;
        upcoming.retain(|a| a.start_time <= horizon);
        Ok(upcoming)
    }

    /// Convenience view: all of today's appointments, start ascending.
    pub async fn today(&self, user_id: &str) -> CoreResult<Vec<Appointment>> {
        self.today_at(user_id, Utc::now()).await
    }

    async fn today_at(&self, user_id: &str, now: DateTime<Utc>) -> CoreResult<Vec<Appointment>> {
        let doctor = self.doctor_for_user(user_id).await?;
        let (day_start, day_end) = day_bounds(now);
        self.appointments.find_in_window(&doctor.id, day_start, day_end).await
    }

    /// Patient counts by relationship status.
    pub async fn patient_counts(&self, user_id: &str) -> CoreResult<PatientCounts> {
        let doctor = self.doctor_for_user(user_id).await?;
        let active = self
            .relationships
            .count_by_doctor_and_status(&doctor.id, RelationshipStatus::Active)
            .await?;
        let inactive = self
            .relationships
            .count_by_doctor_and_status(&doctor.id, RelationshipStatus::Inactive)
            .await?;
        let total = self.relationships.count_by_doctor(&doctor.id).await?;
        Ok(PatientCounts {
            active,
            inactive,
            total,
        })
    }

    /// Appointment counts by status.
    pub async fn appointment_counts(&self, user_id: &str) -> CoreResult<AppointmentCounts> {
        let doctor = self.doctor_for_user(user_id).await?;
        let mut counts = AppointmentCounts {
            scheduled: 0,
            confirmed: 0,
            in_progress: 0,
            completed: 0,
            cancelled: 0,
            no_show: 0,
            total: self.appointments.count_by_doctor(&doctor.id).await?,
        };
        for status in AppointmentStatus::ALL {
            let count = self
                .appointments
                .count_by_doctor_and_status(&doctor.id, status)
                .await?;
            match status {
                AppointmentStatus::Scheduled => counts.scheduled = count,
                AppointmentStatus::Confirmed => counts.confirmed = count,
                AppointmentStatus::InProgress => counts.in_progress = count,
                AppointmentStatus::Completed => counts.completed = count,
                AppointmentStatus::Cancelled => counts.cancelled = count,
                AppointmentStatus::NoShow => counts.no_show = count,
            }
        }
        Ok(counts)
    }

    /// Earliest future SCHEDULED/CONFIRMED appointment for the pair.
    async fn next_appointment(
        &self,
        doctor_id: &str,
        patient_user_id: &str,
        now: DateTime<Utc>,
    ) -> CoreResult<Option<Appointment>> {
        let history = self.appointments.find_by_pair(doctor_id, patient_user_id).await?;
        Ok(history
            .into_iter()
            .filter(|a| a.is_schedulable() && a.start_time > now)
            .min_by_key(|a| a.start_time))
    }
}

/// `ALL` lifts the status filter; anything else must parse.
fn parse_relationship_filter(status: &str) -> CoreResult<Option<RelationshipStatus>> {
    if status.trim().eq_ignore_ascii_case("ALL") {
        return Ok(None);
    }
    status.parse().map(Some)
}

fn parse_appointment_filter(status: &str) -> CoreResult<Option<AppointmentStatus>> {
    if status.trim().eq_ignore_ascii_case("ALL") {
        return Ok(None);
    }
    status.parse().map(Some)
}

fn parse_calendar_date(s: &str) -> CoreResult<NaiveDate> {
    NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
        .map_err(|_| CoreError::InvalidArgument(format!("invalid date (expected YYYY-MM-DD): {s}")))
}

/// Inclusive bounds of the calendar day containing `t`.
fn day_bounds(t: DateTime<Utc>) -> (DateTime<Utc>, DateTime<Utc>) {
    let start = t.date_naive().and_time(NaiveTime::MIN).and_utc();
    (start, start + Duration::days(1) - Duration::nanoseconds(1))
}

/// Monday 00:00 of the week containing `t`.
fn start_of_week(t: DateTime<Utc>) -> DateTime<Utc> {
    let date = t.date_naive();
    let monday = date - Duration::days(i64::from(date.weekday().num_days_from_monday()));
    monday.and_time(NaiveTime::MIN).and_utc()
}

/// First day 00:00 of the month containing `t`.
fn start_of_month(t: DateTime<Utc>) -> DateTime<Utc> {
    let date = t.date_naive();
    let first = date - Duration::days(i64::from(date.day0()));
    first.and_time(NaiveTime::MIN).and_utc()
}
