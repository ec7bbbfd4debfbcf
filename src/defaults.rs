//! Default values for bar-configure.
//!
//! This module provides centralized default values used across the engine
//! and the commands, ensuring consistency and avoiding duplication.

/// Entry path of the configuration descriptor inside a broker archive
pub const DESCRIPTOR_PATH: &str = "META-INF/broker.xml";

/// Suffixes of entries that are themselves archives and get repacked
pub const NESTED_ARCHIVE_SUFFIXES: [&str; 2] = [".libzip", ".appzip"];

/// How deep nested archives may be contained in one another
pub const MAX_NESTING_DEPTH: usize = 16;

/// File extension of broker archives
pub const BROKER_ARCHIVE_EXTENSION: &str = "bar";

/// Project configuration file looked up in the working directory
pub const CONFIG_FILE: &str = ".bar-configure.yaml";

/// Directory configured archives are written to when none is given
pub const OUTPUT_DIR: &str = "target";

/// File name of a configured archive: `<name>-<version>-<classifier>.bar`.
///
/// Empty parts are left out, so an unclassified archive without a version
/// becomes `<name>.bar`.
pub fn configured_file_name(name: &str, version: &str, classifier: &str) -> String {
    let basename = [name, version, classifier]
        .iter()
        .filter(|part| !part.is_empty())
        .copied()
        .collect::<Vec<_>>()
        .join("-");
    format!("{}.{}", basename, BROKER_ARCHIVE_EXTENSION)
}
