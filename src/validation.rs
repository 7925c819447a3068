//! Argument validation utilities shared by the engine and the IPC layer.

use crate::types::{Error, ProcessId, ResourceId, Result};

/// Validate that an operation count is positive.
pub fn validate_positive(n: u32, field: &str) -> Result<()> {
    if n == 0 {
        return Err(Error::invalid_argument(format!(
            "{} must be positive",
            field
        )));
    }
    Ok(())
}

/// Parse a process label, rejecting empty or delimiter-bearing strings.
pub fn parse_process_id(s: &str) -> Result<ProcessId> {
    ProcessId::from_string(s.to_string()).map_err(|e| Error::invalid_argument(e.to_string()))
}

/// Parse a resource label, rejecting empty or delimiter-bearing strings.
pub fn parse_resource_id(s: &str) -> Result<ResourceId> {
    ResourceId::from_string(s.to_string()).map_err(|e| Error::invalid_argument(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_positive() {
        assert!(validate_positive(1, "count").is_ok());
        let err = validate_positive(0, "count").unwrap_err();
        assert!(matches!(err, Error::InvalidArgument(_)));
        assert!(err.to_string().contains("count must be positive"));
    }

    #[test]
    fn test_parse_ids() {
        assert_eq!(parse_process_id("P1").unwrap().as_str(), "P1");
        assert!(matches!(parse_process_id(""), Err(Error::InvalidArgument(_))));
        assert!(matches!(parse_resource_id("a|b"), Err(Error::InvalidArgument(_))));
    }
}
