//! Field projection
//!
//! Strips reserved keys — relationship placeholders and nested payloads
//! slated for separate child processing — from a fetched record before
//! its remaining fields are applied to a persisted entity. Pure
//! transform; unknown extra fields pass through and are rejected later
//! by the persistence collaborator's own validation.

use mantle_connector::record::FetchedRecord;

/// Return a copy of `record` with every reserved key removed.
pub fn project(record: &FetchedRecord, reserved: &[String]) -> FetchedRecord {
    let mut projected = record.clone();
    for key in reserved {
        projected.remove(key);
    }
    projected
}

#[cfg(test)]
mod tests {
    use super::*;
    use mantle_connector::record::FieldSet;

    #[test]
    fn test_strips_reserved_keys() {
        let record = FieldSet::new()
            .with("ems_ref", "d1")
            .with("name", "App1")
            .with_ref("middleware_server", "ems_ref", "s1");

        let projected = project(&record, &["middleware_server".to_string()]);

        assert!(!projected.has("middleware_server"));
        assert_eq!(projected.get_str("ems_ref"), Some("d1"));
        assert_eq!(projected.get_str("name"), Some("App1"));

        // Pure transform: the input record is untouched.
        assert!(record.has("middleware_server"));
    }

    #[test]
    fn test_unknown_fields_pass_through() {
        let record = FieldSet::new().with("ems_ref", "d1").with("extra", "kept");
        let projected = project(&record, &[]);
        assert_eq!(projected.get_str("extra"), Some("kept"));
    }
}
