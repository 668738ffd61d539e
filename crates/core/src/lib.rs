//! # DDS Core
//!
//! Core business logic for the doctor dashboard service:
//!
//! - Doctor activation workflow (admin approval of registrations)
//! - Doctor↔patient assignment ledger with usage counters
//! - Appointment lifecycle state machine with conflict detection
//! - Dashboard aggregation (statistics, patient and appointment views)
//!
//! Persistence, the user directory and the notification transport are
//! external collaborators reached through the ports in [`store`],
//! [`directory`] and [`notify`].
//!
//! **No API concerns**: authentication, HTTP servers and DTO shapes belong
//! in `api-rest` and `api-shared`.

pub mod config;
pub mod directory;
pub mod entities;
pub mod error;
pub mod notify;
pub mod services;
pub mod store;

pub use config::CoreConfig;
pub use error::{CoreError, CoreResult};
