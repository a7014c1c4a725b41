// crates/sp-fleet-core/src/core/target.rs
// ============================================================================
// Module: SP Fleet Targets
// Description: Logical test-target identities and the configured catalog.
// Purpose: Provide strongly typed target names with stable domain derivation.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! A [`Target`] is one logical test service provider. Targets form a fixed,
//! configuration-defined set held by a [`TargetCatalog`]; they are never
//! discovered from the compute provider. The catalog also carries the tag key
//! and discovery filters used to map provider instances back to targets.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::collections::BTreeSet;
use std::fmt;

use serde::Deserialize;
use serde::Serialize;

use crate::core::instance::InstanceFilter;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default provider tag whose value names the target an instance serves.
pub const DEFAULT_TARGET_TAG: &str = "test_ref";

// ============================================================================
// SECTION: Target Name
// ============================================================================

/// Symbolic target name (for example `diafine6`).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TargetName(String);

impl TargetName {
    /// Creates a new target name.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Returns the name as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TargetName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<&str> for TargetName {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for TargetName {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

// ============================================================================
// SECTION: Target
// ============================================================================

/// Logical identity for one test endpoint.
///
/// # Invariants
/// - Immutable for the process lifetime.
/// - `domain()` is always `{name}.{domain_suffix}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Target {
    /// Unique symbolic name.
    pub name: TargetName,
    /// DNS zone suffix the target's record lives in.
    pub domain_suffix: String,
}

impl Target {
    /// Creates a target in the given domain suffix.
    #[must_use]
    pub fn new(name: impl Into<TargetName>, domain_suffix: impl Into<String>) -> Self {
        let suffix: String = domain_suffix.into();
        Self {
            name: name.into(),
            domain_suffix: suffix.trim_end_matches('.').to_string(),
        }
    }

    /// Returns the fully qualified domain name (without trailing dot).
    #[must_use]
    pub fn domain(&self) -> String {
        format!("{}.{}", self.name, self.domain_suffix)
    }

    /// Returns the canonical HTTPS URL for the target.
    #[must_use]
    pub fn url(&self) -> String {
        format!("https://{}", self.domain())
    }
}

// ============================================================================
// SECTION: Target Catalog
// ============================================================================

/// Configured set of targets plus the rules for locating their instances.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetCatalog {
    /// Targets keyed by name.
    targets: BTreeMap<TargetName, Target>,
    /// Provider tag key whose value names a target.
    tag_key: String,
    /// Discovery filters passed to the compute provider.
    filters: Vec<InstanceFilter>,
}

impl TargetCatalog {
    /// Builds a catalog from targets, a tag key and discovery filters.
    #[must_use]
    pub fn new(
        targets: impl IntoIterator<Item = Target>,
        tag_key: impl Into<String>,
        filters: Vec<InstanceFilter>,
    ) -> Self {
        let targets = targets.into_iter().map(|target| (target.name.clone(), target)).collect();
        Self {
            targets,
            tag_key: tag_key.into(),
            filters,
        }
    }

    /// Builds a catalog from bare names sharing one domain suffix.
    #[must_use]
    pub fn from_names<I, N>(names: I, domain_suffix: &str, filters: Vec<InstanceFilter>) -> Self
    where
        I: IntoIterator<Item = N>,
        N: Into<TargetName>,
    {
        Self::new(
            names.into_iter().map(|name| Target::new(name, domain_suffix)),
            DEFAULT_TARGET_TAG,
            filters,
        )
    }

    /// Returns the target with the given name, if configured.
    #[must_use]
    pub fn get(&self, name: &TargetName) -> Option<&Target> {
        self.targets.get(name)
    }

    /// Returns true when the name is a configured target.
    #[must_use]
    pub fn contains(&self, name: &TargetName) -> bool {
        self.targets.contains_key(name)
    }

    /// Iterates targets in name order.
    pub fn iter(&self) -> impl Iterator<Item = &Target> {
        self.targets.values()
    }

    /// Returns every configured target name.
    #[must_use]
    pub fn names(&self) -> BTreeSet<TargetName> {
        self.targets.keys().cloned().collect()
    }

    /// Returns the number of configured targets.
    #[must_use]
    pub fn len(&self) -> usize {
        self.targets.len()
    }

    /// Returns true when no targets are configured.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }

    /// Returns the provider tag key naming targets.
    #[must_use]
    pub fn tag_key(&self) -> &str {
        &self.tag_key
    }

    /// Returns the discovery filters.
    #[must_use]
    pub fn filters(&self) -> &[InstanceFilter] {
        &self.filters
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn domain_strips_trailing_dot_from_suffix() {
        let target = Target::new("diafine6", "sandbox.example.edu.");
        assert_eq!(target.domain(), "diafine6.sandbox.example.edu");
        assert_eq!(target.url(), "https://diafine6.sandbox.example.edu");
    }

    #[test]
    fn catalog_from_names_uses_default_tag() {
        let catalog = TargetCatalog::from_names(["b", "a"], "zone.test", Vec::new());
        assert_eq!(catalog.tag_key(), DEFAULT_TARGET_TAG);
        let names: Vec<_> = catalog.iter().map(|t| t.name.as_str().to_string()).collect();
        assert_eq!(names, vec!["a".to_string(), "b".to_string()]);
        assert!(catalog.contains(&TargetName::new("a")));
        assert!(!catalog.contains(&TargetName::new("c")));
    }
}
