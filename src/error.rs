//! # Error Handling
//!
//! This module defines the centralized error type for the archive
//! configuration engine. It uses the `thiserror` library to build an `Error`
//! enum covering every failure mode of a configure or analyze operation.
//!
//! ## Key Components
//!
//! - **`Error`**: The main enum. Each variant carries enough context (entry
//!   path, archive name, parser message) to tell the user which archive and
//!   which entry failed.
//!
//! - **`Result<T>`**: A type alias for `std::result::Result<T, Error>`.
//!
//! Every variant is fatal to the single archive operation in progress. The
//! engine does not retry or partially recover: an aborted transform leaves
//! no published target behind, only temporary files that are removed when
//! they go out of scope.

use thiserror::Error;

/// Main error type for broker archive operations
#[derive(Error, Debug)]
pub enum Error {
    /// The container could not be parsed as a zip archive.
    #[error("Corrupt archive {archive}: {message}")]
    CorruptArchive { archive: String, message: String },

    /// The configuration descriptor is not well-formed XML, or a
    /// `ConfigurableProperty` element lacks its `uri` attribute.
    #[error("Malformed descriptor {path}: {message}")]
    MalformedDescriptor { path: String, message: String },

    /// A path was written twice to the same archive.
    #[error("Duplicate archive entry: {path}")]
    DuplicateEntry { path: String },

    /// The zip writer rejected an entry or could not finish the container.
    #[error("Failed to write archive: {message}")]
    ArchiveWrite { message: String },

    /// Nested archives are contained deeper than the configured limit.
    #[error("Nested archive recursion limit ({limit}) exceeded at {path}")]
    RecursionLimitExceeded { path: String, limit: usize },

    /// The operation cannot proceed with the configuration it was given,
    /// e.g. a required descriptor is missing.
    #[error("Configuration error: {message}{}", hint.as_ref().map(|h| format!("\n  hint: {}", h)).unwrap_or_default())]
    ConfigurationError {
        message: String,
        /// Optional hint for how to fix the configuration issue
        hint: Option<String>,
    },

    /// An error occurred while parsing the `.bar-configure.yaml` file.
    #[error("Configuration parsing error: {message}")]
    ConfigParse { message: String },

    /// An I/O error, wrapped from `std::io::Error`.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A YAML parsing error, wrapped from `serde_yaml::Error`.
    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// A glob pattern error, wrapped from `glob::PatternError`.
    #[error("Glob pattern error: {0}")]
    Glob(#[from] glob::PatternError),
}

/// A convenient type alias for `Result<T, Error>`.
pub type Result<T> = std::result::Result<T, Error>;

/// Conversion for the writing side. Read failures carry the archive name
/// and are mapped to `CorruptArchive` where they occur.
impl From<zip::result::ZipError> for Error {
    fn from(err: zip::result::ZipError) -> Self {
        match err {
            zip::result::ZipError::Io(io) => Error::Io(io),
            other => Error::ArchiveWrite {
                message: other.to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_corrupt_archive() {
        let error = Error::CorruptArchive {
            archive: "service.bar".to_string(),
            message: "invalid Zip archive".to_string(),
        };
        let display = format!("{}", error);
        assert!(display.contains("Corrupt archive"));
        assert!(display.contains("service.bar"));
    }

    #[test]
    fn test_error_display_malformed_descriptor() {
        let error = Error::MalformedDescriptor {
            path: "META-INF/broker.xml".to_string(),
            message: "unclosed tag".to_string(),
        };
        let display = format!("{}", error);
        assert!(display.contains("Malformed descriptor"));
        assert!(display.contains("META-INF/broker.xml"));
        assert!(display.contains("unclosed tag"));
    }

    #[test]
    fn test_error_display_duplicate_entry() {
        let error = Error::DuplicateEntry {
            path: "a/b.txt".to_string(),
        };
        assert_eq!(format!("{}", error), "Duplicate archive entry: a/b.txt");
    }

    #[test]
    fn test_error_display_recursion_limit() {
        let error = Error::RecursionLimitExceeded {
            path: "x.libzip".to_string(),
            limit: 4,
        };
        let display = format!("{}", error);
        assert!(display.contains("recursion limit (4)"));
        assert!(display.contains("x.libzip"));
    }

    #[test]
    fn test_error_display_configuration_with_hint() {
        let error = Error::ConfigurationError {
            message: "No broker archive configuration XML found".to_string(),
            hint: Some("Check that the archive contains META-INF/broker.xml".to_string()),
        };
        let display = format!("{}", error);
        assert!(display.contains("Configuration error"));
        assert!(display.contains("hint:"));
    }

    #[test]
    fn test_error_from_io_error() {
        let io_error = std::io::Error::new(std::io::ErrorKind::NotFound, "File not found");
        let error: Error = io_error.into();
        let display = format!("{}", error);
        assert!(display.contains("I/O error"));
        assert!(display.contains("File not found"));
    }

    #[test]
    fn test_error_from_zip_error_is_write_failure() {
        let error: Error = zip::result::ZipError::FileNotFound.into();
        assert!(matches!(error, Error::ArchiveWrite { .. }));
        assert!(format!("{}", error).starts_with("Failed to write archive"));

        let io_error = std::io::Error::new(std::io::ErrorKind::Other, "disk full");
        let error: Error = zip::result::ZipError::Io(io_error).into();
        assert!(matches!(error, Error::Io(_)));
    }

    #[test]
    fn test_error_from_yaml_error() {
        let yaml_error = serde_yaml::from_str::<serde_yaml::Value>("invalid: [unclosed").unwrap_err();
        let error: Error = yaml_error.into();
        assert!(format!("{}", error).contains("YAML parsing error"));
    }
}
