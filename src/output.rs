//! # Output Configuration and Report Rendering
//!
//! This module controls CLI output appearance and renders analysis reports.
//!
//! ## Respecting User Preferences
//!
//! The module respects the following environment variables and flags:
//! - `--color=never|always|auto` - CLI flag for color control
//! - `NO_COLOR` - Disables colors when set (per https://no-color.org/)
//! - `CLICOLOR=0` - Disables colors
//! - `CLICOLOR_FORCE=1` - Forces colors even in non-TTY
//! - `TERM=dumb` - Disables colors for dumb terminals
//!
//! ## Report Layout
//!
//! Each category is printed under its own heading:
//!
//! ```text
//!          ----- Overridden properties -----
//! orders#queue = DEV.Q
//! ```
//!
//! Inherited and overridden rows show `key = value`, overridable rows only
//! the key, and missing rows say which key is overridden but undeclared.

use std::env;

use console::style;
use serde::Serialize;

use crate::analysis::{DiffCategory, DiffReport};

/// Output configuration for controlling colors.
#[derive(Debug, Clone)]
pub struct OutputConfig {
    /// Whether colors should be used in output.
    pub use_color: bool,
}

impl OutputConfig {
    /// Create an output configuration from environment and CLI flag.
    ///
    /// # Arguments
    /// * `color_flag` - The value of the --color CLI flag: "always", "never", or "auto"
    ///
    /// In auto mode, colors are disabled if:
    /// - `NO_COLOR` environment variable is set (any value, including empty)
    /// - `CLICOLOR=0` is set
    /// - `TERM=dumb` is set
    /// - stdout is not a TTY (unless `CLICOLOR_FORCE=1`)
    pub fn from_env_and_flag(color_flag: &str) -> Self {
        let use_color = match color_flag.to_lowercase().as_str() {
            "always" => true,
            "never" => false,
            _ => Self::detect_color_support(),
        };

        Self { use_color }
    }

    /// Detect whether color output is supported based on environment.
    fn detect_color_support() -> bool {
        if env::var_os("NO_COLOR").is_some() {
            return false;
        }

        if env::var("CLICOLOR").is_ok_and(|v| v == "0") {
            return false;
        }

        if env::var("CLICOLOR_FORCE").is_ok_and(|v| v != "0" && !v.is_empty()) {
            return true;
        }

        if env::var("TERM").is_ok_and(|v| v == "dumb") {
            return false;
        }

        console::Term::stdout().features().colors_supported()
    }

    /// Create a configuration with colors always disabled.
    pub fn plain() -> Self {
        Self { use_color: false }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self::from_env_and_flag("auto")
    }
}

fn heading(config: &OutputConfig, category: DiffCategory) -> String {
    let text = format!("\t\t ----- {} -----", category.heading());
    if config.use_color {
        style(text).bold().to_string()
    } else {
        text
    }
}

fn row(config: &OutputConfig, category: DiffCategory, key: &str, value: &str) -> String {
    match category {
        DiffCategory::Inherited | DiffCategory::Overridden => format!("{} = {}", key, value),
        DiffCategory::Overridable => key.to_string(),
        DiffCategory::Missing => {
            let line = format!(
                "{} defined to be overridden but not declared in generic bar.",
                key
            );
            if config.use_color {
                style(line).yellow().to_string()
            } else {
                line
            }
        }
    }
}

/// Render the selected categories as text.
///
/// Empty categories are rendered as a heading followed by `(none)`.
pub fn render_text(config: &OutputConfig, report: &DiffReport, categories: &[DiffCategory]) -> String {
    let mut out = String::new();
    for (index, category) in categories.iter().enumerate() {
        if index > 0 {
            out.push('\n');
        }
        out.push_str(&heading(config, *category));
        out.push('\n');
        let rows = report.category(*category);
        if rows.is_empty() {
            out.push_str("(none)\n");
        }
        for (key, value) in rows {
            out.push_str(&row(config, *category, key, value));
            out.push('\n');
        }
    }
    out
}

#[derive(Serialize)]
struct JsonRow<'a> {
    key: &'a str,
    #[serde(skip_serializing_if = "is_empty")]
    value: &'a str,
}

fn is_empty(value: &&str) -> bool {
    value.is_empty()
}

/// Render the selected categories as a JSON object keyed by category.
pub fn render_json(report: &DiffReport, categories: &[DiffCategory]) -> serde_json::Result<String> {
    let mut object = serde_json::Map::new();
    for category in categories {
        let rows: Vec<JsonRow<'_>> = report
            .category(*category)
            .iter()
            .map(|(key, value)| JsonRow { key, value })
            .collect();
        object.insert(category.as_str().to_string(), serde_json::to_value(rows)?);
    }
    serde_json::to_string_pretty(&serde_json::Value::Object(object))
}
