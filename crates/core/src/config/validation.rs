use crate::errors::{WardenError, WardenResult};

/// Trait for configuration validation
pub trait ConfigValidator {
    fn validate(&self) -> WardenResult<()>;
}

/// General validation utilities
pub struct ValidationUtils;

impl ValidationUtils {
    /// Validate that a port number is usable for listening
    pub fn validate_port(port: u16) -> WardenResult<()> {
        if port == 0 {
            return Err(WardenError::settings("port cannot be 0"));
        }
        Ok(())
    }

    /// Validate that a millisecond duration lies within `min..=max`
    pub fn validate_millis(value: u64, field_name: &str, min: u64, max: u64) -> WardenResult<()> {
        if value < min || value > max {
            return Err(WardenError::settings(format!(
                "{field_name} must be between {min} and {max} ms, got {value}"
            )));
        }
        Ok(())
    }

    /// Validate that a count is positive and bounded
    pub fn validate_count(count: usize, field_name: &str, max: usize) -> WardenResult<()> {
        if count == 0 {
            return Err(WardenError::settings(format!(
                "{field_name} must be greater than 0"
            )));
        }
        if count > max {
            return Err(WardenError::settings(format!(
                "{field_name} must be less than or equal to {max}"
            )));
        }
        Ok(())
    }

    /// Validate that a path-like string is not empty
    pub fn validate_not_empty(value: &str, field_name: &str) -> WardenResult<()> {
        if value.trim().is_empty() {
            return Err(WardenError::settings(format!(
                "{field_name} cannot be empty"
            )));
        }
        Ok(())
    }
}
