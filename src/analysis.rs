//! Declared-vs-desired property analysis
//!
//! The analyzer answers four questions about a set of source archives and
//! the overrides a project wants to apply to them:
//!
//! - **Inherited**: declared with a value baked into the archive and not
//!   overridden by the project.
//! - **Overridden**: declared and overridden by the project.
//! - **Overridable**: declared without a value and not overridden, i.e. a
//!   knob nobody has set yet.
//! - **Missing**: overridden by the project but declared by no archive,
//!   which usually means a typo or a stale override.

use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use crate::descriptor::{OverrideSlot, PropertySet};
use crate::overrides::Overrides;

/// One of the four analysis categories
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DiffCategory {
    Inherited,
    Overridden,
    Overridable,
    Missing,
}

impl DiffCategory {
    /// All categories, in report order
    pub const ALL: [DiffCategory; 4] = [
        DiffCategory::Inherited,
        DiffCategory::Overridden,
        DiffCategory::Overridable,
        DiffCategory::Missing,
    ];

    /// Heading shown above the category in reports
    pub fn heading(&self) -> &'static str {
        match self {
            DiffCategory::Inherited => "Inherited properties",
            DiffCategory::Overridden => "Overridden properties",
            DiffCategory::Overridable => "Overridable properties",
            DiffCategory::Missing => "Missing properties",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DiffCategory::Inherited => "inherited",
            DiffCategory::Overridden => "overridden",
            DiffCategory::Overridable => "overridable",
            DiffCategory::Missing => "missing",
        }
    }
}

impl fmt::Display for DiffCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DiffCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        DiffCategory::ALL
            .into_iter()
            .find(|category| category.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| {
                format!(
                    "unknown category '{}' (expected inherited, overridden, overridable or missing)",
                    s
                )
            })
    }
}

/// Merge the property sets of several archives.
///
/// Sets are merged key by key in iteration order; when two archives
/// declare the same `uri`, the later archive wins.
pub fn merge<I>(sources: I) -> PropertySet
where
    I: IntoIterator<Item = PropertySet>,
{
    let mut merged = PropertySet::new();
    for source in sources {
        merged.merge(source);
    }
    merged
}

/// Keys of `declared` and `desired`, split by where they appear
struct Partition<'a> {
    common: Vec<(&'a str, &'a str)>,
    declared_only: Vec<(&'a str, &'a OverrideSlot)>,
    desired_only: Vec<(&'a str, &'a str)>,
}

impl<'a> Partition<'a> {
    fn new(declared: &'a PropertySet, desired: &'a Overrides) -> Self {
        let mut common = Vec::new();
        let mut desired_only = Vec::new();
        for (key, value) in desired.iter() {
            if declared.contains(key) {
                common.push((key, value));
            } else {
                desired_only.push((key, value));
            }
        }
        let declared_only = declared
            .iter()
            .filter(|(key, _)| !desired.contains_key(key))
            .collect();

        Self {
            common,
            declared_only,
            desired_only,
        }
    }

    fn report(&self, mode: DiffCategory) -> Vec<(String, String)> {
        let mut rows: Vec<(String, String)> = match mode {
            DiffCategory::Missing => to_rows(&self.desired_only),
            DiffCategory::Overridden => to_rows(&self.common),
            DiffCategory::Inherited => self
                .declared_only
                .iter()
                .filter_map(|(key, slot)| slot.value().map(|v| (key.to_string(), v.to_string())))
                .collect(),
            DiffCategory::Overridable => self
                .declared_only
                .iter()
                .filter(|(_, slot)| matches!(slot, OverrideSlot::Declared))
                .map(|(key, _)| (key.to_string(), String::new()))
                .collect(),
        };
        rows.sort_by(|a, b| a.0.cmp(&b.0));
        rows
    }
}

fn to_rows(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

/// Report the keys that fall into `mode`, sorted by key.
///
/// Values are the desired value for `Missing` and `Overridden`, the baked-in
/// value for `Inherited` and empty for `Overridable`.
pub fn analyze(declared: &PropertySet, desired: &Overrides, mode: DiffCategory) -> Vec<(String, String)> {
    Partition::new(declared, desired).report(mode)
}

/// All four categories computed from one partition
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DiffReport {
    pub inherited: Vec<(String, String)>,
    pub overridden: Vec<(String, String)>,
    pub overridable: Vec<(String, String)>,
    pub missing: Vec<(String, String)>,
}

impl DiffReport {
    pub fn build(declared: &PropertySet, desired: &Overrides) -> Self {
        let partition = Partition::new(declared, desired);
        Self {
            inherited: partition.report(DiffCategory::Inherited),
            overridden: partition.report(DiffCategory::Overridden),
            overridable: partition.report(DiffCategory::Overridable),
            missing: partition.report(DiffCategory::Missing),
        }
    }

    /// Rows of one category
    pub fn category(&self, mode: DiffCategory) -> &[(String, String)] {
        match mode {
            DiffCategory::Inherited => &self.inherited,
            DiffCategory::Overridden => &self.overridden,
            DiffCategory::Overridable => &self.overridable,
            DiffCategory::Missing => &self.missing,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn declared() -> PropertySet {
        vec![
            ("a", OverrideSlot::Declared),
            ("b", OverrideSlot::Overridden("x".to_string())),
        ]
        .into_iter()
        .collect()
    }

    fn desired() -> Overrides {
        vec![("b", "y"), ("c", "z")].into_iter().collect()
    }

    fn keys(rows: Vec<(String, String)>) -> Vec<String> {
        rows.into_iter().map(|(k, _)| k).collect()
    }

    #[test]
    fn test_missing() {
        let rows = analyze(&declared(), &desired(), DiffCategory::Missing);
        assert_eq!(rows, vec![("c".to_string(), "z".to_string())]);
    }

    #[test]
    fn test_overridden_reports_desired_value() {
        let rows = analyze(&declared(), &desired(), DiffCategory::Overridden);
        assert_eq!(rows, vec![("b".to_string(), "y".to_string())]);
    }

    #[test]
    fn test_inherited_excludes_common_keys() {
        assert!(analyze(&declared(), &desired(), DiffCategory::Inherited).is_empty());
    }

    #[test]
    fn test_overridable() {
        assert_eq!(
            keys(analyze(&declared(), &desired(), DiffCategory::Overridable)),
            vec!["a"]
        );
    }

    #[test]
    fn test_inherited_with_empty_desired() {
        let rows = analyze(&declared(), &Overrides::new(), DiffCategory::Inherited);
        assert_eq!(rows, vec![("b".to_string(), "x".to_string())]);
    }

    #[test]
    fn test_inherited_includes_empty_baked_value() {
        let declared: PropertySet = vec![("e", OverrideSlot::Overridden(String::new()))]
            .into_iter()
            .collect();
        let rows = analyze(&declared, &Overrides::new(), DiffCategory::Inherited);
        assert_eq!(rows, vec![("e".to_string(), String::new())]);
        assert!(analyze(&declared, &Overrides::new(), DiffCategory::Overridable).is_empty());
    }

    #[test]
    fn test_overridden_ignores_value_equality() {
        let desired: Overrides = vec![("b", "x")].into_iter().collect();
        assert_eq!(
            keys(analyze(&declared(), &desired, DiffCategory::Overridden)),
            vec!["b"]
        );
    }

    #[test]
    fn test_merge_last_source_wins() {
        let first: PropertySet = vec![("k", OverrideSlot::Overridden("1".into()))]
            .into_iter()
            .collect();
        let second: PropertySet = vec![("k", OverrideSlot::Declared), ("j", OverrideSlot::Declared)]
            .into_iter()
            .collect();
        let merged = merge(vec![first.clone(), second.clone()]);
        assert_eq!(merged.slot("k"), OverrideSlot::Declared);
        assert_eq!(merged.len(), 2);

        let reversed = merge(vec![second, first]);
        assert_eq!(reversed.slot("k"), OverrideSlot::Overridden("1".into()));
    }

    #[test]
    fn test_report_sorted_by_key() {
        let desired: Overrides = vec![("z", "1"), ("m", "2"), ("a", "3")].into_iter().collect();
        assert_eq!(
            keys(analyze(&PropertySet::new(), &desired, DiffCategory::Missing)),
            vec!["a", "m", "z"]
        );
    }

    #[test]
    fn test_diff_report_matches_analyze() {
        let report = DiffReport::build(&declared(), &desired());
        for mode in DiffCategory::ALL {
            assert_eq!(
                report.category(mode),
                analyze(&declared(), &desired(), mode).as_slice()
            );
        }
    }

    #[test]
    fn test_category_from_str() {
        assert_eq!("MISSING".parse::<DiffCategory>().unwrap(), DiffCategory::Missing);
        assert_eq!(
            " overridable ".parse::<DiffCategory>().unwrap(),
            DiffCategory::Overridable
        );
        assert!("bogus".parse::<DiffCategory>().is_err());
    }
}
