//! Zip-structured broker archive model
//!
//! A broker archive is an ordinary zip container. [`ArchiveModel`] gives
//! ordered, restartable access to the entries of an existing container and
//! [`ArchiveWriter`] builds a new one while enforcing that every path is
//! written at most once and that every file is preceded by the directory
//! entries of its ancestors.
//!
//! Paths are normalized to slash-separated form without a leading `/` and
//! without a trailing `/`; whether an entry is a directory is tracked on the
//! entry itself. Directory entries get their trailing `/` back when written.
//!
//! A container that lists the same name twice is read first-occurrence-wins:
//! the name appears once and carries the data of its first record.

mod central_directory;

use std::collections::{HashMap, HashSet};
use std::io::{self, Cursor, Read, Seek, SeekFrom, Write};

use log::debug;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use crate::error::{Error, Result};

/// Metadata of one entry in an [`ArchiveModel`], in container order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveEntry {
    /// Normalized slash-separated path
    pub path: String,
    /// Whether the container marks this entry as a directory
    pub is_directory: bool,
    index: usize,
    raw_name: String,
}

/// An entry to be appended to an [`ArchiveWriter`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteEntry {
    Directory(String),
    File(String, Vec<u8>),
}

/// Normalize an entry name to the slash-separated form used for lookups.
///
/// Backslashes become `/`, leading `./` and `/` are removed, empty segments
/// are collapsed and a trailing `/` is dropped.
pub fn normalize_path(name: &str) -> String {
    let replaced = name.replace('\\', "/");
    let mut trimmed = replaced.as_str();
    loop {
        if let Some(rest) = trimmed.strip_prefix("./") {
            trimmed = rest;
        } else if let Some(rest) = trimmed.strip_prefix('/') {
            trimmed = rest;
        } else {
            break;
        }
    }
    trimmed
        .split('/')
        .filter(|segment| !segment.is_empty())
        .collect::<Vec<_>>()
        .join("/")
}

/// Every ancestor directory of `path`, outermost first.
///
/// `a/b/file.txt` yields `a` then `a/b`.
pub fn ancestors(path: &str) -> Vec<&str> {
    path.match_indices('/')
        .map(|(idx, _)| &path[..idx])
        .filter(|dir| !dir.is_empty())
        .collect()
}

/// Read access to a zip-structured container.
pub struct ArchiveModel<R> {
    name: String,
    archive: ZipArchive<R>,
    // first-record content of names listed more than once
    shadowed: HashMap<String, Vec<u8>>,
}

impl<R: Read + Seek> ArchiveModel<R> {
    /// Open a container, failing with `CorruptArchive` if it is not a zip.
    ///
    /// `name` is only used in log and error messages.
    pub fn open(name: impl Into<String>, mut reader: R) -> Result<Self> {
        let name = name.into();
        let shadowed =
            central_directory::shadowed_entries(&mut reader).map_err(|e| unreadable(&name, e))?;
        reader.seek(SeekFrom::Start(0))?;
        let archive = ZipArchive::new(reader).map_err(|e| corrupt(&name, e))?;
        debug!("Opened archive {} with {} entries", name, archive.len());
        Ok(Self {
            name,
            archive,
            shadowed,
        })
    }

    /// Display name given when the archive was opened
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Number of entries in the container, including directory markers
    pub fn len(&self) -> usize {
        self.archive.len()
    }

    /// Whether the container has no entries at all
    pub fn is_empty(&self) -> bool {
        self.archive.len() == 0
    }

    /// List the entries in container order.
    ///
    /// The central directory is re-scanned on every call, so the listing
    /// can be taken as many times as needed.
    pub fn entries(&mut self) -> Result<Vec<ArchiveEntry>> {
        let mut entries = Vec::with_capacity(self.archive.len());
        for index in 0..self.archive.len() {
            let file = self
                .archive
                .by_index_raw(index)
                .map_err(|e| corrupt(&self.name, e))?;
            let raw_name = file.name().to_string();
            let is_directory = file.is_dir() || raw_name.ends_with('/');
            let path = normalize_path(&raw_name);
            if path.is_empty() {
                continue;
            }
            entries.push(ArchiveEntry {
                path,
                is_directory,
                index,
                raw_name,
            });
        }
        Ok(entries)
    }

    /// Look up an entry by its normalized path
    pub fn find(&mut self, path: &str) -> Result<Option<ArchiveEntry>> {
        let wanted = normalize_path(path);
        Ok(self.entries()?.into_iter().find(|entry| entry.path == wanted))
    }

    /// Read the full content of an entry.
    pub fn read_content(&mut self, entry: &ArchiveEntry) -> Result<Vec<u8>> {
        let mut content = Vec::new();
        self.copy_content(entry, &mut content)?;
        Ok(content)
    }

    /// Stream the content of an entry into `out`, returning the byte count.
    pub fn copy_content<W: Write + ?Sized>(
        &mut self,
        entry: &ArchiveEntry,
        out: &mut W,
    ) -> Result<u64> {
        if let Some(content) = self.shadowed.get(&entry.raw_name) {
            out.write_all(content)?;
            return Ok(content.len() as u64);
        }
        let mut file = self
            .archive
            .by_index(entry.index)
            .map_err(|e| corrupt(&self.name, e))?;
        let copied = io::copy(&mut file, out)?;
        Ok(copied)
    }
}

impl ArchiveModel<Cursor<Vec<u8>>> {
    /// Open a container held entirely in memory
    pub fn from_bytes(name: impl Into<String>, bytes: Vec<u8>) -> Result<Self> {
        Self::open(name, Cursor::new(bytes))
    }
}

/// Map a failed raw read: damaged data is corruption, anything else is I/O.
fn unreadable(archive: &str, err: io::Error) -> Error {
    match err.kind() {
        io::ErrorKind::InvalidData | io::ErrorKind::UnexpectedEof => Error::CorruptArchive {
            archive: archive.to_string(),
            message: err.to_string(),
        },
        _ => Error::Io(err),
    }
}

fn corrupt(archive: &str, err: zip::result::ZipError) -> Error {
    match err {
        zip::result::ZipError::Io(io) => Error::Io(io),
        other => Error::CorruptArchive {
            archive: archive.to_string(),
            message: other.to_string(),
        },
    }
}

/// Builds a new container, one entry at a time.
///
/// Files and directories share one namespace: once a path has been written,
/// writing it again in either form fails with `DuplicateEntry`. A directory
/// the writer synthesized on its own may still be added explicitly once; it
/// is not written a second time.
pub struct ArchiveWriter<W: Write + Seek> {
    zip: ZipWriter<W>,
    written: HashSet<String>,
    // synthesized directories not yet added explicitly
    synthesized: HashSet<String>,
    options: SimpleFileOptions,
}

impl<W: Write + Seek> ArchiveWriter<W> {
    /// Start a new container on top of `inner`
    pub fn new(inner: W) -> Self {
        Self {
            zip: ZipWriter::new(inner),
            written: HashSet::new(),
            synthesized: HashSet::new(),
            options: SimpleFileOptions::default().compression_method(CompressionMethod::Deflated),
        }
    }

    /// Whether `path` has already been written
    pub fn contains(&self, path: &str) -> bool {
        self.written.contains(&normalize_path(path))
    }

    /// Number of entries written so far
    pub fn len(&self) -> usize {
        self.written.len()
    }

    /// Whether nothing has been written yet
    pub fn is_empty(&self) -> bool {
        self.written.is_empty()
    }

    fn claim(&mut self, path: &str) -> Result<String> {
        let path = normalize_path(path);
        if path.is_empty() || !self.written.insert(path.clone()) {
            return Err(Error::DuplicateEntry { path });
        }
        Ok(path)
    }

    fn emit_directory(&mut self, path: &str) -> Result<()> {
        debug!("Adding directory {}/", path);
        self.zip.add_directory(format!("{}/", path), self.options)?;
        Ok(())
    }

    /// Append a directory entry. The trailing `/` is added here.
    pub fn add_directory(&mut self, path: &str) -> Result<()> {
        if self.synthesized.remove(&normalize_path(path)) {
            return Ok(());
        }
        let path = self.claim(path)?;
        self.emit_directory(&path)
    }

    /// Emit directory entries for every ancestor of `path` that has not
    /// been written yet, parents before children.
    pub fn ensure_parent_directories(&mut self, path: &str) -> Result<()> {
        let path = normalize_path(path);
        for dir in ancestors(&path) {
            if !self.written.contains(dir) {
                let dir = self.claim(dir)?;
                self.emit_directory(&dir)?;
                self.synthesized.insert(dir);
            }
        }
        Ok(())
    }

    /// Append a file entry with the given content.
    pub fn add_file(&mut self, path: &str, content: &[u8]) -> Result<()> {
        let mut reader = content;
        self.add_file_from(path, &mut reader)
    }

    /// Append a file entry, streaming its content from `reader`.
    pub fn add_file_from<Rd: Read + ?Sized>(&mut self, path: &str, reader: &mut Rd) -> Result<()> {
        let path = self.claim(path)?;
        debug!("Adding resource {}", path);
        self.zip.start_file(path.as_str(), self.options)?;
        io::copy(reader, &mut self.zip)?;
        Ok(())
    }

    /// Append entries in the order given.
    ///
    /// Missing ancestor directories of each file are synthesized first.
    pub fn write<I>(&mut self, entries: I) -> Result<()>
    where
        I: IntoIterator<Item = WriteEntry>,
    {
        for entry in entries {
            match entry {
                WriteEntry::Directory(path) => {
                    self.ensure_parent_directories(&path)?;
                    self.add_directory(&path)?;
                }
                WriteEntry::File(path, content) => {
                    self.ensure_parent_directories(&path)?;
                    self.add_file(&path, &content)?;
                }
            }
        }
        Ok(())
    }

    /// Write the central directory and hand back the underlying writer
    pub fn finish(self) -> Result<W> {
        Ok(self.zip.finish()?)
    }
}

impl ArchiveWriter<Cursor<Vec<u8>>> {
    /// A writer backed by an in-memory buffer
    pub fn in_memory() -> Self {
        Self::new(Cursor::new(Vec::new()))
    }

    /// Finish and return the container bytes
    pub fn into_bytes(self) -> Result<Vec<u8>> {
        Ok(self.finish()?.into_inner())
    }
}
