//! Persisted entity types and their business methods.
//!
//! Entities own their state transitions; services orchestrate across
//! entities and the stores. No API concerns here.

pub mod activation;
pub mod appointment;
pub mod doctor;
pub mod relationship;

pub use activation::ActivationRequest;
pub use appointment::{
    Appointment, AppointmentStatus, AppointmentType, ConsultationOutcome, PaymentStatus,
};
pub use doctor::{ActivationAction, ActivationStatus, Doctor};
pub use relationship::{DoctorPatient, RelationshipStatus};
