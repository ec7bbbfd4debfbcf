//! # Analyze Command Implementation
//!
//! This module implements the `analyze` subcommand, which compares the
//! properties declared by a set of broker archives with the properties the
//! project overrides.
//!
//! ## Functionality
//!
//! - **Sources**: archives, directories or glob patterns given on the command
//!   line, or the `dependencies` of `.bar-configure.yaml`. When several
//!   archives declare the same property, the later archive wins.
//! - **Categories**: inherited, overridden, overridable and missing. All four
//!   are shown unless `--mode` selects some of them.
//! - **Exit Codes**: with `--fail-on-missing`, exits non-zero when a property
//!   is overridden but declared by no archive.
//!
//! This command is read-only.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use log::warn;

use bar_configure::analysis::{DiffCategory, DiffReport};
use bar_configure::configurator::{resolve_all, DefaultConfigurator};
use bar_configure::output::{render_json, render_text, OutputConfig};
use bar_configure::overrides::{parse_assignment, resolve_for_classifier};
use bar_configure::sources::collect_archives;

use super::{command_line_overrides, load_config};

/// Compare declared archive properties with configured overrides
#[derive(Args, Debug)]
pub struct AnalyzeArgs {
    /// Archives, directories or glob patterns to analyze.
    ///
    /// Defaults to the `dependencies` listed in the configuration file.
    #[arg(value_name = "ARCHIVE")]
    pub sources: Vec<String>,

    /// Path to the .bar-configure.yaml configuration file
    #[arg(short, long, value_name = "FILE", env = "BAR_CONFIGURE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Category to report (inherited, overridden, overridable, missing); repeatable
    #[arg(short, long = "mode", value_name = "CATEGORY")]
    pub modes: Vec<DiffCategory>,

    /// Resolve classifier-scoped properties for this classifier
    #[arg(long, value_name = "NAME")]
    pub classifier: Option<String>,

    /// Override a property; scope it with `dev,stage:key=value`
    #[arg(short = 'D', long = "property", value_name = "KEY=VALUE", value_parser = parse_assignment)]
    pub properties: Vec<(String, String)>,

    /// Output format
    #[arg(long, value_name = "FORMAT", default_value = "text", value_parser = ["text", "json"])]
    pub format: String,

    /// Exit with an error when a property is overridden but not declared
    #[arg(long)]
    pub fail_on_missing: bool,
}

/// Execute the `analyze` command.
pub fn execute(args: AnalyzeArgs, output: &OutputConfig) -> Result<()> {
    let (project, base_dir) = load_config(args.config.as_deref())?;

    let archives = if args.sources.is_empty() {
        collect_archives(&project.dependencies, &base_dir)?
    } else {
        let cwd = std::env::current_dir().context("Failed to get current directory")?;
        collect_archives(&args.sources, &cwd)?
    };

    if archives.is_empty() {
        anyhow::bail!(
            "No broker archives to analyze\n  hint: pass archive paths or list them under `dependencies` in the configuration file"
        );
    }

    let configurator = DefaultConfigurator::default();
    let declared = resolve_all(&configurator, &archives)?;

    let mut desired = project.properties.clone();
    desired.layer(&command_line_overrides(&args.properties));
    if let Some(classifier) = &args.classifier {
        desired = resolve_for_classifier(&desired, classifier);
    }

    let report = DiffReport::build(&declared, &desired);
    for (key, _) in &report.missing {
        warn!("{} defined to be overridden but not declared in generic bar.", key);
    }

    let categories: Vec<DiffCategory> = if args.modes.is_empty() {
        DiffCategory::ALL.to_vec()
    } else {
        args.modes.clone()
    };

    let rendered = match args.format.as_str() {
        "json" => render_json(&report, &categories)?,
        _ => render_text(output, &report, &categories),
    };
    println!("{}", rendered.trim_end());

    if args.fail_on_missing && !report.missing.is_empty() {
        anyhow::bail!(
            "{} propert(ies) defined to be overridden but not declared",
            report.missing.len()
        );
    }

    Ok(())
}
