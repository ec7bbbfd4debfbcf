//! Configure command implementation
//!
//! Writes a configured copy of each broker archive. Archives come either
//! from the `artifacts` list of `.bar-configure.yaml` or from `--source`.
//! For every archive the global properties, the archive's own properties
//! and `-D` flags are layered in that order and resolved for the archive's
//! classifier before the descriptor is patched.

use std::path::PathBuf;
use std::time::Instant;

use anyhow::Result;
use clap::Args;
use log::{error, info, warn};

use bar_configure::config::ArtifactConfig;
use bar_configure::configurator::{configure_all, ConfigureJob, DefaultConfigurator};
use bar_configure::defaults;
use bar_configure::overrides::parse_assignment;
use bar_configure::repack::Repacker;

use super::{command_line_overrides, load_config};

/// Arguments for the configure command
#[derive(Args, Debug)]
pub struct ConfigureArgs {
    /// Path to the .bar-configure.yaml configuration file
    #[arg(short, long, value_name = "FILE", env = "BAR_CONFIGURE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Configure this archive instead of the artifacts listed in the config
    #[arg(short, long, value_name = "FILE")]
    pub source: Option<PathBuf>,

    /// Classifier of the archive given with --source
    #[arg(long, value_name = "NAME", requires = "source")]
    pub classifier: Option<String>,

    /// Target file for the archive given with --source
    #[arg(short, long, value_name = "FILE", requires = "source")]
    pub output: Option<PathBuf>,

    /// Directory for configured archives (overrides `output_dir`)
    #[arg(long, value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// Override a property; scope it with `dev,stage:key=value`
    #[arg(short = 'D', long = "property", value_name = "KEY=VALUE", value_parser = parse_assignment)]
    pub properties: Vec<(String, String)>,

    /// Fail if an archive has no META-INF/broker.xml
    #[arg(long)]
    pub require_descriptor: bool,

    /// Maximum nesting depth of .libzip/.appzip archives
    #[arg(long, value_name = "N", default_value_t = defaults::MAX_NESTING_DEPTH)]
    pub max_depth: usize,
}

/// Execute the configure command
pub fn execute(args: ConfigureArgs) -> Result<()> {
    let start_time = Instant::now();
    let (project, base_dir) = load_config(args.config.as_deref())?;
    let command_line = command_line_overrides(&args.properties);

    let output_dir = args
        .output_dir
        .clone()
        .or_else(|| project.output_dir.as_ref().map(|dir| base_dir.join(dir)))
        .unwrap_or_else(|| base_dir.join(defaults::OUTPUT_DIR));

    let artifacts: Vec<ArtifactConfig> = match &args.source {
        Some(source) => vec![ArtifactConfig {
            source: source.clone(),
            classifier: args.classifier.clone(),
            target: args.output.clone(),
            properties: Default::default(),
        }],
        None => project
            .artifacts
            .iter()
            .map(|artifact| ArtifactConfig {
                source: base_dir.join(&artifact.source),
                target: artifact.target.as_ref().map(|t| base_dir.join(t)),
                ..artifact.clone()
            })
            .collect(),
    };

    if artifacts.is_empty() {
        info!("No broker artifact dependencies declared.");
        return Ok(());
    }

    if project.properties.is_empty()
        && command_line.is_empty()
        && artifacts.iter().all(|a| a.properties.is_empty())
    {
        warn!("No properties found in configuration, no changes will be made to the broker archives.");
    }

    let jobs: Vec<ConfigureJob> = artifacts
        .iter()
        .map(|artifact| ConfigureJob {
            source: artifact.source.clone(),
            target: artifact.target_path(&project, &output_dir),
            overrides: artifact.effective_overrides(&project.properties, &command_line),
        })
        .collect();

    let repacker = Repacker::new()
        .require_descriptor(args.require_descriptor)
        .with_max_depth(args.max_depth);
    let configurator = DefaultConfigurator::new(repacker);
    let results = configure_all(&configurator, &jobs);

    let mut failures = 0;
    for (job, result) in jobs.iter().zip(results) {
        match result {
            Ok(()) => println!("Configured {} -> {}", job.source.display(), job.target.display()),
            Err(e) => {
                failures += 1;
                error!("Failed to configure {}: {}", job.source.display(), e);
            }
        }
    }

    if failures > 0 {
        anyhow::bail!("{} of {} archive(s) failed to configure", failures, jobs.len());
    }

    info!(
        "Configured {} archive(s) in {:.2?}",
        jobs.len(),
        start_time.elapsed()
    );
    Ok(())
}
