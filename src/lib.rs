//! # Broker Archive Configuration Library
//!
//! This library configures and analyzes broker archives: zip containers
//! that carry a descriptor (`META-INF/broker.xml`) declaring configurable
//! properties, and that may embed further archives (`.libzip`, `.appzip`)
//! with descriptors of their own. It is used by the `bar-configure`
//! command-line tool but has no dependency on it.
//!
//! ## Quick Example
//!
//! ```
//! use bar_configure::archive::ArchiveWriter;
//! use bar_configure::descriptor::OverrideSlot;
//! use bar_configure::overrides::{resolve_for_classifier, Overrides};
//! use bar_configure::repack::Repacker;
//! use bar_configure::archive::ArchiveModel;
//!
//! let mut writer = ArchiveWriter::in_memory();
//! writer
//!     .add_file(
//!         "META-INF/broker.xml",
//!         br#"<Broker><ConfigurableProperty uri="flow#queue"/></Broker>"#,
//!     )
//!     .unwrap();
//! let source = writer.into_bytes().unwrap();
//!
//! let raw: Overrides = vec![("dev:flow#queue", "DEV.IN")].into_iter().collect();
//! let overrides = resolve_for_classifier(&raw, "dev");
//!
//! let repacker = Repacker::new();
//! let configured = repacker.transform_bytes("app.bar", source, &overrides).unwrap();
//!
//! let mut model = ArchiveModel::from_bytes("app-dev.bar", configured).unwrap();
//! let properties = repacker.resolve(&mut model).unwrap();
//! assert_eq!(
//!     properties.slot("flow#queue"),
//!     OverrideSlot::Overridden("DEV.IN".to_string())
//! );
//! ```
//!
//! ## Core Concepts
//!
//! - **Archives (`archive`)**: ordered read access to a zip container and a
//!   writer that keeps entry paths unique and directories before children.
//! - **Descriptor (`descriptor`)**: reads the declared properties into a
//!   `PropertySet` and patches override values into the XML.
//! - **Overrides (`overrides`)**: ordered override maps and the
//!   `classifier:key` scoping rules.
//! - **Repacking (`repack`)**: rewrites an archive with overrides applied,
//!   recursing into nested archives.
//! - **Analysis (`analysis`)**: compares declared and desired properties
//!   and sorts every key into inherited, overridden, overridable or missing.
//! - **Configurator (`configurator`)**: file-based entry points used by the
//!   commands, including publish-on-success writing of targets.

pub mod analysis;
pub mod archive;
pub mod config;
pub mod configurator;
pub mod defaults;
pub mod descriptor;
pub mod error;
pub mod output;
pub mod overrides;
pub mod repack;
pub mod sources;

#[cfg(test)]
mod overrides_proptest;
