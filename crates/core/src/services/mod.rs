//! Domain services.
//!
//! Each service orchestrates one workflow across the stores and the
//! external collaborators; entities own their own state transitions.

pub mod activation;
pub mod appointments;
pub mod assignment;
pub mod dashboard;

pub use activation::{ActivationService, PendingDoctor, ProcessActivation};
pub use appointments::{AppointmentService, ScheduleAppointment};
pub use assignment::AssignmentService;
pub use dashboard::{
    AppointmentCounts, AppointmentListQuery, DashboardService, DashboardStatistics, PatientCounts,
    PatientListQuery, PatientSummary,
};
