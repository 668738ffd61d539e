//! Core runtime configuration.
//!
//! Configuration is resolved once at process startup and passed into
//! services, so request handling never reads process-wide environment
//! variables. Defaults match the platform's existing API contracts.

use crate::{CoreError, CoreResult};

/// Default page size when a list request omits `size`.
pub const DEFAULT_PAGE_SIZE: u32 = 20;
/// Hard ceiling on requested page sizes.
pub const MAX_PAGE_SIZE: u32 = 100;
/// Minimum notice, in hours, for cancelling an appointment.
pub const CANCELLATION_NOTICE_HOURS: i64 = 24;
/// Length of the "upcoming appointments" convenience window, in days.
pub const UPCOMING_WINDOW_DAYS: i64 = 7;
/// Appointment duration applied when a booking omits one.
pub const DEFAULT_APPOINTMENT_DURATION_MINUTES: u32 = 30;

/// Core configuration resolved at startup.
#[derive(Clone, Debug)]
pub struct CoreConfig {
    user_directory_base_url: String,
    default_page_size: u32,
    max_page_size: u32,
}

impl CoreConfig {
    /// Create a new `CoreConfig`.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::InvalidArgument` if the directory base URL is
    /// empty or the page size bounds are zero or inverted.
    pub fn new(
        user_directory_base_url: String,
        default_page_size: u32,
        max_page_size: u32,
    ) -> CoreResult<Self> {
        if user_directory_base_url.trim().is_empty() {
            return Err(CoreError::InvalidArgument(
                "user directory base URL cannot be empty".into(),
            ));
        }
        if default_page_size == 0 || max_page_size == 0 {
            return Err(CoreError::InvalidArgument(
                "page sizes must be greater than zero".into(),
            ));
        }
        if default_page_size > max_page_size {
            return Err(CoreError::InvalidArgument(format!(
                "default page size {default_page_size} exceeds maximum {max_page_size}"
            )));
        }

        Ok(Self {
            user_directory_base_url: user_directory_base_url.trim_end_matches('/').to_string(),
            default_page_size,
            max_page_size,
        })
    }

    /// Configuration with the stock page-size bounds.
    pub fn with_defaults(user_directory_base_url: String) -> CoreResult<Self> {
        Self::new(user_directory_base_url, DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE)
    }

    pub fn user_directory_base_url(&self) -> &str {
        &self.user_directory_base_url
    }

    pub fn default_page_size(&self) -> u32 {
        self.default_page_size
    }

    pub fn max_page_size(&self) -> u32 {
        self.max_page_size
    }
}

/// Parse a page-size override from an optional environment value.
///
/// `None` or an empty/whitespace value yields `default`.
pub fn page_size_from_env_value(value: Option<String>, default: u32) -> CoreResult<u32> {
    let value = value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
    match value {
        None => Ok(default),
        Some(v) => v.parse::<u32>().map_err(|_| {
            CoreError::InvalidArgument(format!("invalid page size value: {v}"))
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_empty_directory_url() {
        let result = CoreConfig::with_defaults("  ".into());
        assert!(matches!(result, Err(CoreError::InvalidArgument(_))));
    }

    #[test]
    fn test_rejects_inverted_page_bounds() {
        let result = CoreConfig::new("http://users".into(), 50, 10);
        assert!(matches!(result, Err(CoreError::InvalidArgument(_))));
    }

    #[test]
    fn test_trims_trailing_slash_from_base_url() {
        let cfg = CoreConfig::with_defaults("http://users/".into()).unwrap();
        assert_eq!(cfg.user_directory_base_url(), "http://users");
    }

    #[test]
    fn test_page_size_from_env_value() {
        assert_eq!(page_size_from_env_value(None, 20).unwrap(), 20);
        assert_eq!(page_size_from_env_value(Some(" ".into()), 20).unwrap(), 20);
        assert_eq!(page_size_from_env_value(Some("50".into()), 20).unwrap(), 50);
        assert!(page_size_from_env_value(Some("abc".into()), 20).is_err());
    }
}
