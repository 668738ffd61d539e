//! # API Shared
//!
//! Shared utilities for the DDS API surface.
//!
//! Contains:
//! - Caller identity extraction from gateway-validated headers (`auth`)
//! - The health check service (`health`)
//!
//! Authentication itself is owned by the platform gateway; this crate only
//! reads the identity the gateway has already validated.

pub mod auth;
pub mod health;

pub use auth::{CallerIdentity, Role};
pub use health::{HealthRes, HealthService};
