//! Configuring broker archives on disk
//!
//! [`BarConfigurator`] is the seam between the commands and the engine. The
//! commands are handed a [`DefaultConfigurator`] explicitly; there is no
//! registry of implementations.
//!
//! Configured archives are first written to a temporary file next to the
//! target and only renamed into place once the whole archive was written,
//! so a failed transform never leaves a half-written target behind.

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use log::{info, warn};
use rayon::prelude::*;
use tempfile::NamedTempFile;

use crate::archive::ArchiveModel;
use crate::descriptor::PropertySet;
use crate::error::{Error, Result};
use crate::overrides::Overrides;
use crate::repack::Repacker;

/// Configure and inspect broker archives stored as files
pub trait BarConfigurator {
    /// Write a copy of `source` to `target` with `overrides` applied.
    fn configure(&self, source: &Path, target: &Path, overrides: &Overrides) -> Result<()>;

    /// Collect the properties declared anywhere in `source`.
    fn resolve_properties(&self, source: &Path) -> Result<PropertySet>;
}

/// The configurator backed by [`Repacker`]
#[derive(Debug, Clone, Default)]
pub struct DefaultConfigurator {
    repacker: Repacker,
}

impl DefaultConfigurator {
    pub fn new(repacker: Repacker) -> Self {
        Self { repacker }
    }
}

fn open_archive(path: &Path) -> Result<ArchiveModel<BufReader<File>>> {
    let file = File::open(path).map_err(|e| {
        Error::Io(std::io::Error::new(
            e.kind(),
            format!("Failed to open archive '{}': {}", path.display(), e),
        ))
    })?;
    ArchiveModel::open(path.display().to_string(), BufReader::new(file))
}

impl BarConfigurator for DefaultConfigurator {
    fn configure(&self, source: &Path, target: &Path, overrides: &Overrides) -> Result<()> {
        info!("Configuring source artifact : {}", source.display());
        let mut model = open_archive(source)?;

        let target_dir = match target.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        std::fs::create_dir_all(&target_dir)?;

        let mut staged = NamedTempFile::new_in(&target_dir)?;
        self.repacker
            .transform(&mut model, overrides, staged.as_file_mut())?;
        staged.as_file().sync_all()?;
        staged.persist(target).map_err(|e| Error::Io(e.error))?;

        info!("Wrote configured archive {}", target.display());
        Ok(())
    }

    fn resolve_properties(&self, source: &Path) -> Result<PropertySet> {
        info!("Resolving {}", source.display());
        let mut model = open_archive(source)?;
        self.repacker.resolve(&mut model)
    }
}

/// One archive to configure
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigureJob {
    pub source: PathBuf,
    pub target: PathBuf,
    /// Overrides already resolved for the job's classifier
    pub overrides: Overrides,
}

/// Configure independent archives in parallel.
///
/// Each job runs its own transform with its own temporary storage; results
/// come back in job order.
pub fn configure_all<C>(configurator: &C, jobs: &[ConfigureJob]) -> Vec<Result<()>>
where
    C: BarConfigurator + Sync,
{
    if jobs.is_empty() {
        warn!("No broker archives to configure.");
    }
    jobs.par_iter()
        .map(|job| configurator.configure(&job.source, &job.target, &job.overrides))
        .collect()
}

/// Resolve and merge the properties of several archives, later archives
/// winning on conflicts.
pub fn resolve_all<C>(configurator: &C, sources: &[PathBuf]) -> Result<PropertySet>
where
    C: BarConfigurator + Sync,
{
    let sets = sources
        .par_iter()
        .map(|source| configurator.resolve_properties(source))
        .collect::<Result<Vec<_>>>()?;
    Ok(crate::analysis::merge(sets))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archive::ArchiveWriter;
    use crate::descriptor::OverrideSlot;
    use tempfile::TempDir;

    fn write_archive(dir: &Path, name: &str, files: &[(&str, &[u8])]) -> PathBuf {
        let mut writer = ArchiveWriter::in_memory();
        for (path, content) in files {
            writer.add_file(path, content).unwrap();
        }
        let path = dir.join(name);
        std::fs::write(&path, writer.into_bytes().unwrap()).unwrap();
        path
    }

    fn descriptor(uri: &str) -> String {
        format!(r#"<Broker><ConfigurableProperty uri="{}"/></Broker>"#, uri)
    }

    #[test]
    fn test_configure_writes_target() {
        let temp = TempDir::new().unwrap();
        let xml = descriptor("q");
        let source = write_archive(temp.path(), "in.bar", &[("META-INF/broker.xml", xml.as_bytes())]);
        let target = temp.path().join("out").join("in-dev.bar");

        let configurator = DefaultConfigurator::default();
        let overrides: Overrides = vec![("q", "DEV.Q")].into_iter().collect();
        configurator.configure(&source, &target, &overrides).unwrap();

        let props = configurator.resolve_properties(&target).unwrap();
        assert_eq!(props.slot("q"), OverrideSlot::Overridden("DEV.Q".into()));
    }

    #[test]
    fn test_failed_configure_leaves_no_target() {
        let temp = TempDir::new().unwrap();
        let source = write_archive(temp.path(), "bad.bar", &[("META-INF/broker.xml", b"<Broker>")]);
        let target = temp.path().join("bad-dev.bar");

        let overrides: Overrides = vec![("q", "1")].into_iter().collect();
        let result = DefaultConfigurator::default().configure(&source, &target, &overrides);
        assert!(result.is_err());
        assert!(!target.exists());

        let leftovers = std::fs::read_dir(temp.path()).unwrap().count();
        assert_eq!(leftovers, 1, "only the source archive should remain");
    }

    #[test]
    fn test_configure_missing_source() {
        let temp = TempDir::new().unwrap();
        let result = DefaultConfigurator::default().configure(
            &temp.path().join("nope.bar"),
            &temp.path().join("out.bar"),
            &Overrides::new(),
        );
        assert!(matches!(result, Err(Error::Io(_))));
    }

    #[test]
    fn test_configure_all_and_resolve_all() {
        let temp = TempDir::new().unwrap();
        let first_xml = descriptor("shared");
        let second_xml =
            r#"<Broker><ConfigurableProperty uri="shared" override="2"/></Broker>"#.to_string();
        let first = write_archive(temp.path(), "a.bar", &[("META-INF/broker.xml", first_xml.as_bytes())]);
        let second = write_archive(temp.path(), "b.bar", &[("META-INF/broker.xml", second_xml.as_bytes())]);

        let jobs = vec![
            ConfigureJob {
                source: first.clone(),
                target: temp.path().join("a-dev.bar"),
                overrides: Overrides::new(),
            },
            ConfigureJob {
                source: second.clone(),
                target: temp.path().join("b-dev.bar"),
                overrides: Overrides::new(),
            },
        ];
        let configurator = DefaultConfigurator::default();
        let results = configure_all(&configurator, &jobs);
        assert!(results.iter().all(|r| r.is_ok()));

        let merged = resolve_all(&configurator, &[first.clone(), second.clone()]).unwrap();
        assert_eq!(merged.slot("shared"), OverrideSlot::Overridden("2".into()));
        let merged = resolve_all(&configurator, &[second, first]).unwrap();
        assert_eq!(merged.slot("shared"), OverrideSlot::Declared);
    }
}
