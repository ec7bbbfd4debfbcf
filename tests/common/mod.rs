//! Shared test utilities for E2E tests.
//!
//! This module provides fixtures that build broker archives on disk and a
//! few helpers for inspecting the archives the binary writes.
//!
//! ## Usage
//!
//! ```rust,ignore
//! mod common;
//! use common::prelude::*;
//!
//! #[test]
//! fn test_example() {
//!     let fixture = TestFixture::new()
//!         .with_archive("app.bar", &BarBuilder::new().descriptor(descriptors::ORDERS));
//!     // ... test code
//! }
//! ```

use assert_fs::prelude::*;
use std::path::{Path, PathBuf};

use bar_configure::archive::{ArchiveModel, ArchiveWriter};
use bar_configure::descriptor::{self, PropertySet};
use bar_configure::repack::Repacker;

/// Re-export commonly used test dependencies for convenience.
pub mod prelude {
    pub use assert_cmd::cargo::cargo_bin_cmd;
    pub use assert_fs::prelude::*;
    #[allow(unused_imports)]
    pub use assert_fs::TempDir;
    pub use predicates::prelude::*;

    #[allow(unused_imports)]
    pub use super::descriptors;
    #[allow(unused_imports)]
    pub use super::{read_descriptor, resolve_file};
    pub use super::{BarBuilder, TestFixture};
}

/// Descriptor documents used across tests.
#[allow(dead_code)]
pub mod descriptors {
    /// Two declared properties, one with a baked-in value.
    pub const ORDERS: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<Broker>
  <CompiledMessageFlow name="orders">
    <ConfigurableProperty uri="orders#queue"/>
    <ConfigurableProperty uri="orders#timeout" override="30"/>
  </CompiledMessageFlow>
</Broker>
"#;

    /// Descriptor of a nested library.
    pub const LIBRARY: &str = r#"<Broker><ConfigurableProperty uri="lib#url"/></Broker>"#;

    /// Not XML at all.
    pub const MALFORMED: &str = "<Broker><ConfigurableProperty uri=";
}

/// Builds a broker archive in memory.
#[derive(Default)]
pub struct BarBuilder {
    entries: Vec<(String, Vec<u8>)>,
}

#[allow(dead_code)]
impl BarBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `META-INF/broker.xml` with the given content.
    pub fn descriptor(self, xml: &str) -> Self {
        self.file("META-INF/broker.xml", xml.as_bytes())
    }

    /// Add a plain file.
    pub fn file(mut self, path: &str, content: &[u8]) -> Self {
        self.entries.push((path.to_string(), content.to_vec()));
        self
    }

    /// Embed another archive under `path` (e.g. `lib/common.libzip`).
    pub fn nested(self, path: &str, archive: &BarBuilder) -> Self {
        let bytes = archive.build();
        self.file(path, &bytes)
    }

    /// Produce the zip bytes.
    pub fn build(&self) -> Vec<u8> {
        let mut writer = ArchiveWriter::in_memory();
        for (path, content) in &self.entries {
            writer
                .ensure_parent_directories(path)
                .expect("Failed to add parent directories");
            writer
                .add_file(path, content)
                .expect("Failed to add archive entry");
        }
        writer.into_bytes().expect("Failed to finish archive")
    }
}

/// A temporary project directory.
pub struct TestFixture {
    temp_dir: assert_fs::TempDir,
}

#[allow(dead_code)]
impl TestFixture {
    /// Create a new test fixture with an empty temporary directory.
    pub fn new() -> Self {
        Self {
            temp_dir: assert_fs::TempDir::new().expect("Failed to create temp directory"),
        }
    }

    /// Add a `.bar-configure.yaml` configuration file with the given content.
    pub fn with_config(self, content: &str) -> Self {
        self.temp_dir
            .child(".bar-configure.yaml")
            .write_str(content)
            .expect("Failed to write config file");
        self
    }

    /// Write a broker archive at `path`.
    pub fn with_archive(self, path: &str, archive: &BarBuilder) -> Self {
        self.temp_dir
            .child(path)
            .write_binary(&archive.build())
            .expect("Failed to write archive");
        self
    }

    /// Add a file with the given path and content.
    pub fn with_file(self, path: &str, content: &str) -> Self {
        self.temp_dir
            .child(path)
            .write_str(content)
            .expect("Failed to write file");
        self
    }

    /// Get the path to the temporary directory.
    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Create a child path in the temp directory.
    pub fn child(&self, path: &str) -> assert_fs::fixture::ChildPath {
        self.temp_dir.child(path)
    }

    /// Absolute path of a file in the fixture.
    pub fn join(&self, path: &str) -> PathBuf {
        self.temp_dir.path().join(path)
    }
}

impl Default for TestFixture {
    fn default() -> Self {
        Self::new()
    }
}

/// Read the top-level descriptor of an archive file.
#[allow(dead_code)]
pub fn read_descriptor(path: &Path) -> PropertySet {
    let bytes = std::fs::read(path).expect("Failed to read archive");
    let mut model = ArchiveModel::from_bytes(path.display().to_string(), bytes)
        .expect("Failed to open archive");
    let entry = model
        .find("META-INF/broker.xml")
        .expect("Failed to list entries")
        .expect("Archive has no descriptor");
    let content = model.read_content(&entry).expect("Failed to read descriptor");
    descriptor::extract(&content, "META-INF/broker.xml").expect("Malformed descriptor")
}

/// Resolve all properties of an archive file, nested archives included.
#[allow(dead_code)]
pub fn resolve_file(path: &Path) -> PropertySet {
    let bytes = std::fs::read(path).expect("Failed to read archive");
    let mut model = ArchiveModel::from_bytes(path.display().to_string(), bytes)
        .expect("Failed to open archive");
    Repacker::new()
        .resolve(&mut model)
        .expect("Failed to resolve archive")
}
