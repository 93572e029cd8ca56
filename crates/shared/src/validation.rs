//! Common validation utilities.

use lazy_static::lazy_static;
use regex::Regex;
use validator::ValidationError;

/// Maximum number of missing parts that can be reported on one unit.
pub const MAX_MISSING_PARTS: usize = 50;

/// Maximum number of photo references attached to one report.
pub const MAX_PHOTO_REFERENCES: usize = 20;

/// Maximum length of a single photo reference (opaque blob key or URL).
const MAX_PHOTO_REFERENCE_LEN: usize = 512;

/// Maximum length of a single part name.
const MAX_PART_NAME_LEN: usize = 100;

lazy_static! {
    /// Barcodes are printed on labels: alphanumerics plus `-`, `_`, `.` and `/`.
    static ref BARCODE_PATTERN: Regex =
        Regex::new(r"^[A-Za-z0-9][A-Za-z0-9._/-]{2,63}$").unwrap();

    /// Location and bin codes are short upper-case identifiers.
    static ref CODE_PATTERN: Regex = Regex::new(r"^[A-Z0-9][A-Z0-9_-]{0,31}$").unwrap();
}

/// Trims surrounding whitespace that scanners commonly append.
pub fn normalize_barcode(raw: &str) -> String {
    raw.trim().to_string()
}

/// Validates a unit barcode (3-64 characters, label-safe alphabet).
pub fn validate_barcode(barcode: &str) -> Result<(), ValidationError> {
    if BARCODE_PATTERN.is_match(barcode) {
        Ok(())
    } else {
        let mut err = ValidationError::new("barcode_format");
        err.message = Some(
            "Barcode must be 3-64 characters of letters, digits, '-', '_', '.' or '/'".into(),
        );
        Err(err)
    }
}

/// Validates a location or bin code (1-32 upper-case characters).
pub fn validate_code(code: &str) -> Result<(), ValidationError> {
    if CODE_PATTERN.is_match(code) {
        Ok(())
    } else {
        let mut err = ValidationError::new("code_format");
        err.message =
            Some("Code must be 1-32 upper-case letters, digits, '-' or '_'".into());
        Err(err)
    }
}

/// Validates the list of missing part names on a parts-missing flag.
pub fn validate_part_names(parts: &[String]) -> Result<(), ValidationError> {
    if parts.len() > MAX_MISSING_PARTS {
        let mut err = ValidationError::new("parts_count");
        err.message = Some(format!("At most {} missing parts can be listed", MAX_MISSING_PARTS).into());
        return Err(err);
    }
    if parts
        .iter()
        .any(|p| p.trim().is_empty() || p.len() > MAX_PART_NAME_LEN)
    {
        let mut err = ValidationError::new("part_name");
        err.message = Some("Part names must be 1-100 characters".into());
        return Err(err);
    }
    Ok(())
}

/// Validates opaque photo references attached to damage or QC reports.
pub fn validate_photo_refs(photos: &[String]) -> Result<(), ValidationError> {
    if photos.len() > MAX_PHOTO_REFERENCES {
        let mut err = ValidationError::new("photos_count");
        err.message = Some(format!("At most {} photos can be attached", MAX_PHOTO_REFERENCES).into());
        return Err(err);
    }
    if photos
        .iter()
        .any(|p| p.trim().is_empty() || p.len() > MAX_PHOTO_REFERENCE_LEN)
    {
        let mut err = ValidationError::new("photo_reference");
        err.message = Some("Photo references must be 1-512 characters".into());
        return Err(err);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_barcode() {
        assert!(validate_barcode("BIKE-001").is_ok());
        assert!(validate_barcode("grn/2024/0042").is_ok());
        assert!(validate_barcode("A1.b2_c3").is_ok());
        assert!(validate_barcode("AB").is_err());
        assert!(validate_barcode("-BIKE").is_err());
        assert!(validate_barcode("BIKE 001").is_err());
        assert!(validate_barcode(&"X".repeat(65)).is_err());
    }

    #[test]
    fn test_validate_barcode_error_message() {
        let err = validate_barcode("").unwrap_err();
        assert!(err.message.unwrap().to_string().contains("3-64"));
    }

    #[test]
    fn test_normalize_barcode_trims_scanner_noise() {
        assert_eq!(normalize_barcode("  BIKE-001\n"), "BIKE-001");
        assert_eq!(normalize_barcode("BIKE-001"), "BIKE-001");
    }

    #[test]
    fn test_validate_code() {
        assert!(validate_code("WH1").is_ok());
        assert!(validate_code("IN-A_01").is_ok());
        assert!(validate_code("wh1").is_err());
        assert!(validate_code("").is_err());
        assert!(validate_code(&"A".repeat(33)).is_err());
    }

    #[test]
    fn test_validate_part_names() {
        assert!(validate_part_names(&[]).is_ok());
        assert!(validate_part_names(&["Rear derailleur".to_string()]).is_ok());
        assert!(validate_part_names(&["  ".to_string()]).is_err());
        assert!(validate_part_names(&["x".repeat(101)]).is_err());

        let too_many: Vec<String> = (0..=MAX_MISSING_PARTS).map(|i| format!("part {i}")).collect();
        assert!(validate_part_names(&too_many).is_err());
    }

    #[test]
    fn test_validate_generated_part_names() {
        use fake::{faker::lorem::en::Words, Fake};

        let parts: Vec<String> = Words(1..8).fake();
        assert!(validate_part_names(&parts).is_ok());
    }

    #[test]
    fn test_validate_photo_refs() {
        assert!(validate_photo_refs(&["photos/abc.jpg".to_string()]).is_ok());
        assert!(validate_photo_refs(&["".to_string()]).is_err());
        let too_many: Vec<String> = (0..=MAX_PHOTO_REFERENCES).map(|i| format!("p{i}")).collect();
        assert!(validate_photo_refs(&too_many).is_err());
    }
}
