//! Property overrides and classifier scoping
//!
//! Overrides arrive as a flat, ordered `key -> value` map. A key may be
//! scoped to one or more classifiers with the `scope1,scope2:key` syntax, in
//! which case it only applies when the archive being configured carries one
//! of those classifiers (compared case-insensitively).
//!
//! ## Precedence
//!
//! When an unscoped key and a matching scoped key name the same property,
//! the scoped value wins no matter where it appears. Between entries of the
//! same kind the later one in declaration order wins.

use log::warn;
use serde::Serialize;

/// An insertion-ordered `String -> String` map.
///
/// Inserting an existing key replaces its value and keeps its position.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Overrides {
    entries: Vec<(String, String)>,
}

impl Overrides {
    /// Create an empty map
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a value, returning the previous one
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) -> Option<String> {
        let key = key.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some((_, existing)) => Some(std::mem::replace(existing, value)),
            None => {
                self.entries.push((key, value));
                None
            }
        }
    }

    /// Look up a value by key
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate in declaration order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Keys in declaration order
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    /// Layer `other` on top of this map (values from `other` win)
    pub fn layer(&mut self, other: &Overrides) {
        for (key, value) in other.iter() {
            self.insert(key, value);
        }
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Overrides {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        let mut overrides = Overrides::new();
        for (key, value) in iter {
            overrides.insert(key, value);
        }
        overrides
    }
}

/// A raw override key, split into its classifier scope and property key
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OverrideKey<'a> {
    /// A bare key that applies to every classifier
    Unscoped(&'a str),
    /// `scope1,scope2:key`
    Scoped { scopes: Vec<&'a str>, key: &'a str },
}

impl<'a> OverrideKey<'a> {
    /// Split a raw key on its first `:`.
    ///
    /// Scope tokens are trimmed and empty tokens are dropped.
    pub fn parse(raw: &'a str) -> Self {
        match raw.split_once(':') {
            None => OverrideKey::Unscoped(raw),
            Some((scope_list, key)) => OverrideKey::Scoped {
                scopes: scope_list
                    .split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .collect(),
                key,
            },
        }
    }

    /// The property key the override targets
    pub fn key(&self) -> &'a str {
        match self {
            OverrideKey::Unscoped(key) => key,
            OverrideKey::Scoped { key, .. } => key,
        }
    }

    /// Whether this key applies to an archive with the given classifier
    pub fn applies_to(&self, classifier: &str) -> bool {
        match self {
            OverrideKey::Unscoped(_) => true,
            OverrideKey::Scoped { scopes, .. } => {
                scopes.iter().any(|scope| scope.eq_ignore_ascii_case(classifier))
            }
        }
    }
}

/// Compute the overrides that apply to an archive with `classifier`.
///
/// Unscoped keys are copied through, matching scoped keys are copied under
/// their property key and non-matching scoped keys are dropped. An empty
/// classifier matches no scope.
pub fn resolve_for_classifier(raw: &Overrides, classifier: &str) -> Overrides {
    let mut resolved = Overrides::new();

    for (raw_key, value) in raw.iter() {
        if let OverrideKey::Unscoped(key) = OverrideKey::parse(raw_key) {
            resolved.insert(key, value);
        }
    }

    for (raw_key, value) in raw.iter() {
        let parsed = OverrideKey::parse(raw_key);
        if matches!(parsed, OverrideKey::Unscoped(_)) || !parsed.applies_to(classifier) {
            continue;
        }
        if parsed.key().is_empty() {
            warn!("Ignoring scoped override '{}' with an empty property key", raw_key);
            continue;
        }
        resolved.insert(parsed.key(), value);
    }

    resolved
}

/// Parse a `key=value` pair as given on the command line.
///
/// Only the first `=` separates; the value may itself contain `=`.
pub fn parse_assignment(pair: &str) -> Result<(String, String), String> {
    match pair.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => {
            Ok((key.trim().to_string(), value.to_string()))
        }
        _ => Err(format!("expected KEY=VALUE, got '{}'", pair)),
    }
}
