//! # Project Configuration
//!
//! This module defines the `.bar-configure.yaml` file that describes which
//! broker archives a project configures and with which properties.
//!
//! ```yaml
//! name: orders-service
//! version: 1.4.0
//! output_dir: target
//!
//! # Applied to every configured archive. Keys may be scoped to
//! # classifiers with the `dev,stage:key` syntax.
//! properties:
//!   "dev,stage:orders#queue": DEV.ORDERS.IN
//!   "orders#timeout": 30
//!
//! artifacts:
//!   - source: dist/orders.bar
//!     classifier: dev
//!     properties:          # layered on top of the global properties
//!       "orders#trace": true
//!
//! # Archives whose declarations are analyzed. Directories are searched
//! # for *.bar files; glob patterns are expanded.
//! dependencies:
//!   - lib/*.bar
//! ```
//!
//! Property values may be written as YAML strings, numbers or booleans; they
//! are all handled as strings.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::defaults;
use crate::error::{Error, Result};
use crate::overrides::{resolve_for_classifier, Overrides};

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawConfig {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    version: Option<String>,
    #[serde(default)]
    output_dir: Option<PathBuf>,
    #[serde(default)]
    properties: serde_yaml::Mapping,
    #[serde(default)]
    artifacts: Vec<RawArtifact>,
    #[serde(default)]
    dependencies: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawArtifact {
    source: PathBuf,
    #[serde(default)]
    classifier: Option<String>,
    #[serde(default)]
    target: Option<PathBuf>,
    #[serde(default)]
    properties: serde_yaml::Mapping,
}

/// A parsed `.bar-configure.yaml`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProjectConfig {
    /// Base name of configured archives
    pub name: Option<String>,
    pub version: Option<String>,
    /// Where configured archives are written
    pub output_dir: Option<PathBuf>,
    /// Overrides applied to every archive, in declaration order
    pub properties: Overrides,
    pub artifacts: Vec<ArtifactConfig>,
    /// Sources for analysis: files, directories or glob patterns
    pub dependencies: Vec<String>,
}

/// One archive to configure
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactConfig {
    pub source: PathBuf,
    pub classifier: Option<String>,
    /// Explicit target path; derived from name/version/classifier if absent
    pub target: Option<PathBuf>,
    pub properties: Overrides,
}

impl ArtifactConfig {
    /// Global properties, then this artifact's properties, then properties
    /// given on the command line, resolved for the artifact's classifier.
    pub fn effective_overrides(&self, global: &Overrides, command_line: &Overrides) -> Overrides {
        let mut raw = global.clone();
        raw.layer(&self.properties);
        raw.layer(command_line);
        resolve_for_classifier(&raw, self.classifier.as_deref().unwrap_or(""))
    }

    /// Where the configured archive is written.
    ///
    /// Without an explicit target the file is named after the project
    /// (falling back to the source file stem), version and classifier.
    pub fn target_path(&self, config: &ProjectConfig, output_dir: &Path) -> PathBuf {
        if let Some(target) = &self.target {
            return target.clone();
        }
        let stem = self
            .source
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "archive".to_string());
        let name = config.name.clone().unwrap_or(stem);
        let file_name = defaults::configured_file_name(
            &name,
            config.version.as_deref().unwrap_or(""),
            self.classifier.as_deref().unwrap_or(""),
        );
        output_dir.join(file_name)
    }
}

fn scalar_to_string(key: &str, value: &serde_yaml::Value) -> Result<String> {
    match value {
        serde_yaml::Value::String(s) => Ok(s.clone()),
        serde_yaml::Value::Number(n) => Ok(n.to_string()),
        serde_yaml::Value::Bool(b) => Ok(b.to_string()),
        serde_yaml::Value::Null => Ok(String::new()),
        _ => Err(Error::ConfigParse {
            message: format!("property '{}' must have a scalar value", key),
        }),
    }
}

/// Convert a YAML mapping into ordered overrides
fn mapping_to_overrides(mapping: &serde_yaml::Mapping) -> Result<Overrides> {
    let mut overrides = Overrides::new();
    for (key, value) in mapping {
        let key = match key {
            serde_yaml::Value::String(s) => s.clone(),
            other => scalar_to_string("<key>", other)?,
        };
        let value = scalar_to_string(&key, value)?;
        overrides.insert(key, value);
    }
    Ok(overrides)
}

/// Parse a YAML configuration string
pub fn parse(yaml_content: &str) -> Result<ProjectConfig> {
    if yaml_content.trim().is_empty() {
        return Ok(ProjectConfig::default());
    }
    let raw: RawConfig = serde_yaml::from_str(yaml_content)?;

    let artifacts = raw
        .artifacts
        .into_iter()
        .map(|artifact| {
            Ok(ArtifactConfig {
                source: artifact.source,
                classifier: artifact.classifier.filter(|c| !c.trim().is_empty()),
                target: artifact.target,
                properties: mapping_to_overrides(&artifact.properties)?,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(ProjectConfig {
        name: raw.name,
        version: raw.version,
        output_dir: raw.output_dir,
        properties: mapping_to_overrides(&raw.properties)?,
        artifacts,
        dependencies: raw.dependencies,
    })
}

/// Load a configuration file
pub fn from_file<P: AsRef<Path>>(path: P) -> Result<ProjectConfig> {
    let content = std::fs::read_to_string(path).map_err(Error::Io)?;
    parse(&content)
}
