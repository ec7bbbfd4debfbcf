//! Locating broker archives on disk
//!
//! Analysis sources are given as plain files, directories (searched
//! recursively for `*.bar`) or glob patterns. The order of the inputs is
//! kept, since later archives win when declarations are merged; matches of
//! one directory or pattern are sorted so the result is deterministic.

use std::path::{Path, PathBuf};

use log::warn;
use walkdir::WalkDir;

use crate::defaults::BROKER_ARCHIVE_EXTENSION;
use crate::error::{Error, Result};

fn is_glob(input: &str) -> bool {
    input.contains(['*', '?', '['])
}

fn is_broker_archive(path: &Path) -> bool {
    path.extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case(BROKER_ARCHIVE_EXTENSION))
}

/// Expand files, directories and glob patterns into archive paths.
///
/// Relative inputs are resolved against `base_dir`. A path that appears
/// more than once is kept at its first position.
pub fn collect_archives<S: AsRef<str>>(inputs: &[S], base_dir: &Path) -> Result<Vec<PathBuf>> {
    let mut archives: Vec<PathBuf> = Vec::new();
    let mut push = |path: PathBuf| {
        if !archives.contains(&path) {
            archives.push(path);
        }
    };

    for input in inputs {
        let input = input.as_ref();
        if is_glob(input) {
            let pattern = base_dir.join(input);
            let mut matches = glob::glob(&pattern.to_string_lossy())?
                .filter_map(|entry| match entry {
                    Ok(path) => Some(path),
                    Err(e) => {
                        warn!("Skipping unreadable path: {}", e);
                        None
                    }
                })
                .filter(|path| path.is_file())
                .collect::<Vec<_>>();
            if matches.is_empty() {
                warn!("Pattern '{}' matched no archives", input);
            }
            matches.sort();
            matches.into_iter().for_each(&mut push);
            continue;
        }

        let path = base_dir.join(input);
        if path.is_dir() {
            let mut found = WalkDir::new(&path)
                .into_iter()
                .filter_map(|entry| entry.ok())
                .filter(|entry| entry.file_type().is_file() && is_broker_archive(entry.path()))
                .map(|entry| entry.into_path())
                .collect::<Vec<_>>();
            found.sort();
            found.into_iter().for_each(&mut push);
        } else if path.is_file() {
            push(path);
        } else {
            return Err(Error::ConfigurationError {
                message: format!("Broker archive not found: {}", path.display()),
                hint: None,
            });
        }
    }

    Ok(archives)
}
