//! Archive repacking
//!
//! The repacker copies a broker archive entry by entry into a new
//! container, patching the descriptor on the way and descending into nested
//! archives (`.libzip`, `.appzip`) so that their descriptors are patched
//! with the same overrides.
//!
//! ## Process
//!
//! For each non-directory entry of the source, in container order:
//!
//! 1.  **Directories**: Emit directory entries for every ancestor that has
//!     not been written yet, parents first. Directory entries of the source
//!     itself are not copied; they are re-synthesized here.
//! 2.  **Duplicates**: Skip the entry if its path was already written. The
//!     first occurrence wins. Names the central directory repeats verbatim
//!     already reach this loop as their first record.
//! 3.  **Nested archives**: Extract to a temporary file, repack recursively
//!     into a second temporary file, and emit the result at the original
//!     path. Both temporary files are removed when the frame returns.
//! 4.  **Descriptor**: Patch and emit.
//! 5.  **Anything else**: Copy unchanged.
//!
//! Any failure aborts the whole transform.

use std::fs::File;
use std::io::{Cursor, Read, Seek, SeekFrom, Write};

use log::{debug, info};

use crate::archive::{ArchiveEntry, ArchiveModel, ArchiveWriter};
use crate::defaults;
use crate::descriptor::{self, PropertySet};
use crate::error::{Error, Result};
use crate::overrides::Overrides;

/// Repacks broker archives and resolves the properties they declare.
#[derive(Debug, Clone)]
pub struct Repacker {
    descriptor_path: String,
    nested_suffixes: Vec<String>,
    max_depth: usize,
    require_descriptor: bool,
}

impl Default for Repacker {
    fn default() -> Self {
        Self {
            descriptor_path: defaults::DESCRIPTOR_PATH.to_string(),
            nested_suffixes: defaults::NESTED_ARCHIVE_SUFFIXES
                .iter()
                .map(|s| s.to_string())
                .collect(),
            max_depth: defaults::MAX_NESTING_DEPTH,
            require_descriptor: false,
        }
    }
}

impl Repacker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a different descriptor entry path
    pub fn with_descriptor_path(mut self, path: impl Into<String>) -> Self {
        self.descriptor_path = crate::archive::normalize_path(&path.into());
        self
    }

    /// Replace the set of suffixes that mark nested archives
    pub fn with_nested_suffixes<I, S>(mut self, suffixes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.nested_suffixes = suffixes.into_iter().map(Into::into).collect();
        self
    }

    /// Limit how deep nested archives may be contained in one another
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Fail a transform whose top-level archive has no descriptor
    pub fn require_descriptor(mut self, required: bool) -> Self {
        self.require_descriptor = required;
        self
    }

    pub fn descriptor_path(&self) -> &str {
        &self.descriptor_path
    }

    /// Whether an entry path names a nested archive
    pub fn is_nested_archive(&self, path: &str) -> bool {
        self.nested_suffixes
            .iter()
            .any(|suffix| path.ends_with(suffix.as_str()))
    }

    /// Repack `source` into `target`, applying `overrides` to every
    /// descriptor found at any nesting level.
    pub fn transform<R, W>(
        &self,
        source: &mut ArchiveModel<R>,
        overrides: &Overrides,
        target: W,
    ) -> Result<W>
    where
        R: Read + Seek,
        W: Write + Seek,
    {
        let mut writer = ArchiveWriter::new(target);
        let found = self.repack(source, overrides, &mut writer, 0)?;
        if !found && self.require_descriptor {
            return Err(Error::ConfigurationError {
                message: format!("No broker archive configuration XML found in {}", source.name()),
                hint: Some(format!(
                    "Expected a descriptor at {}",
                    self.descriptor_path
                )),
            });
        }
        writer.finish()
    }

    /// Repack an in-memory archive and return the new container bytes
    pub fn transform_bytes(&self, name: &str, source: Vec<u8>, overrides: &Overrides) -> Result<Vec<u8>> {
        let mut model = ArchiveModel::from_bytes(name, source)?;
        let target = self.transform(&mut model, overrides, Cursor::new(Vec::new()))?;
        Ok(target.into_inner())
    }

    fn repack<R, W>(
        &self,
        source: &mut ArchiveModel<R>,
        overrides: &Overrides,
        writer: &mut ArchiveWriter<W>,
        depth: usize,
    ) -> Result<bool>
    where
        R: Read + Seek,
        W: Write + Seek,
    {
        let mut found_descriptor = false;

        for entry in source.entries()? {
            if entry.is_directory {
                continue;
            }

            writer.ensure_parent_directories(&entry.path)?;

            if writer.contains(&entry.path) {
                debug!("Skipping duplicate entry {} in {}", entry.path, source.name());
                continue;
            }

            if self.is_nested_archive(&entry.path) {
                let mut repacked = self.repack_nested(source, &entry, overrides, depth + 1)?;
                writer.add_file_from(&entry.path, &mut repacked)?;
            } else if entry.path == self.descriptor_path {
                let content = source.read_content(&entry)?;
                let patched = descriptor::patch(&content, overrides, &entry.path)?;
                writer.add_file(&entry.path, &patched)?;
                found_descriptor = true;
            } else {
                let content = source.read_content(&entry)?;
                writer.add_file(&entry.path, &content)?;
            }
        }

        Ok(found_descriptor)
    }

    fn repack_nested<R>(
        &self,
        source: &mut ArchiveModel<R>,
        entry: &ArchiveEntry,
        overrides: &Overrides,
        depth: usize,
    ) -> Result<File>
    where
        R: Read + Seek,
    {
        let mut nested = self.open_nested(source, entry, depth)?;
        info!("Repacking nested archive {}", nested.name());

        let mut writer = ArchiveWriter::new(tempfile::tempfile()?);
        self.repack(&mut nested, overrides, &mut writer, depth)?;
        let mut repacked = writer.finish()?;
        repacked.seek(SeekFrom::Start(0))?;
        Ok(repacked)
    }

    /// Extract a nested archive entry into an anonymous temporary file and
    /// open it. The file is deleted when the returned model is dropped.
    fn open_nested<R>(
        &self,
        source: &mut ArchiveModel<R>,
        entry: &ArchiveEntry,
        depth: usize,
    ) -> Result<ArchiveModel<File>>
    where
        R: Read + Seek,
    {
        let name = format!("{}!/{}", source.name(), entry.path);
        if depth > self.max_depth {
            return Err(Error::RecursionLimitExceeded {
                path: name,
                limit: self.max_depth,
            });
        }

        let mut extracted = tempfile::tempfile()?;
        source.copy_content(entry, &mut extracted)?;
        extracted.seek(SeekFrom::Start(0))?;
        ArchiveModel::open(name, extracted)
    }

    /// Collect the properties declared anywhere in `source`.
    ///
    /// Nested archives are merged in entry order and the archive's own
    /// descriptor is merged last, so the outermost declaration of a `uri`
    /// wins. An archive without a descriptor contributes nothing.
    pub fn resolve<R>(&self, source: &mut ArchiveModel<R>) -> Result<PropertySet>
    where
        R: Read + Seek,
    {
        info!("Resolving properties for {}", source.name());
        self.resolve_at_depth(source, 0)
    }

    fn resolve_at_depth<R>(&self, source: &mut ArchiveModel<R>, depth: usize) -> Result<PropertySet>
    where
        R: Read + Seek,
    {
        let mut properties = PropertySet::new();
        let mut own: Option<PropertySet> = None;

        for entry in source.entries()? {
            if entry.is_directory {
                continue;
            }
            if self.is_nested_archive(&entry.path) {
                let mut nested = self.open_nested(source, &entry, depth + 1)?;
                properties.merge(self.resolve_at_depth(&mut nested, depth + 1)?);
            } else if entry.path == self.descriptor_path && own.is_none() {
                let content = source.read_content(&entry)?;
                own = Some(descriptor::extract(&content, &entry.path)?);
            }
        }

        if let Some(own) = own {
            properties.merge(own);
        }
        Ok(properties)
    }
}
