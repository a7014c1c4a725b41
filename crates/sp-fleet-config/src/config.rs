// crates/sp-fleet-config/src/config.rs
// ============================================================================
// Module: SP Fleet Configuration
// Description: Configuration loading and validation for the SP fleet.
// Purpose: Provide strict, fail-closed profile parsing with hard limits.
// Dependencies: sp-fleet-core, serde, thiserror, toml
// ============================================================================

//! ## Overview
//! Configuration is loaded from a TOML file with strict size and path limits.
//! The file holds one table per environment under `[profiles.<name>]`; the
//! CLI selects one (default `base`). Every profile is validated on load so a
//! typo in an unused profile is still caught.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::collections::BTreeSet;
use std::env;
use std::fs;
use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;
use serde::Serialize;
use sp_fleet_core::DEFAULT_MARGIN_POLLS;
use sp_fleet_core::DEFAULT_POLL_DIVISOR;
use sp_fleet_core::DEFAULT_RECORD_TTL_SECS;
use sp_fleet_core::DEFAULT_TARGET_TAG;
use sp_fleet_core::FileAuditSink;
use sp_fleet_core::FleetOptions;
use sp_fleet_core::HostedZone;
use sp_fleet_core::InstanceFilter;
use sp_fleet_core::LifecycleTimeouts;
use sp_fleet_core::NoopAuditSink;
use sp_fleet_core::PropagationPolicy;
use sp_fleet_core::SessionPolicy;
use sp_fleet_core::SharedAuditSink;
use sp_fleet_core::StderrAuditSink;
use sp_fleet_core::Target;
use sp_fleet_core::TargetCatalog;
use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default configuration filename when no path is specified.
pub const DEFAULT_CONFIG_NAME: &str = "sp-fleet.toml";
/// Environment variable used to override the config path.
pub const CONFIG_ENV_VAR: &str = "SP_FLEET_CONFIG";
/// Profile selected when none is given.
pub const DEFAULT_PROFILE: &str = "base";
/// Maximum configuration file size in bytes.
pub(crate) const MAX_CONFIG_FILE_SIZE: usize = 1024 * 1024;
/// Maximum length of a single path component.
pub(crate) const MAX_PATH_COMPONENT_LENGTH: usize = 255;
/// Maximum total path length.
pub(crate) const MAX_TOTAL_PATH_LENGTH: usize = 4096;
/// Maximum number of targets per profile.
pub(crate) const MAX_TARGETS: usize = 256;
/// Maximum length of a DNS label.
pub(crate) const MAX_LABEL_LENGTH: usize = 63;
/// Maximum number of discovery filters.
pub(crate) const MAX_FILTERS: usize = 32;
/// Maximum TTL accepted for the zone and for written records.
pub(crate) const MAX_TTL_SECONDS: u64 = 86_400;
/// Maximum lifecycle or change waiter bound.
pub(crate) const MAX_WAIT_SECONDS: u64 = 3_600;
/// Maximum poll divisor.
pub(crate) const MAX_POLL_DIVISOR: u32 = 1_000;
/// Maximum extra propagation polls.
pub(crate) const MAX_MARGIN_POLLS: u32 = 100;
/// Default lifecycle waiter bound.
pub(crate) const DEFAULT_WAIT_SECONDS: u64 = 600;

// ============================================================================
// SECTION: Configuration Types
// ============================================================================

/// Root of `sp-fleet.toml`.
#[derive(Debug, Clone, Deserialize)]
pub struct SpFleetConfig {
    /// Profiles keyed by name.
    #[serde(default)]
    pub profiles: BTreeMap<String, ProfileConfig>,
    /// Path the configuration was loaded from (not serialized).
    #[serde(skip)]
    pub source: Option<PathBuf>,
}

impl SpFleetConfig {
    /// Loads configuration from disk using the default resolution rules.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when loading or validation fails.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let resolved = resolve_path(path)?;
        validate_path(&resolved)?;
        let bytes = fs::read(&resolved)
            .map_err(|err| ConfigError::Io(format!("{}: {err}", resolved.display())))?;
        if bytes.len() > MAX_CONFIG_FILE_SIZE {
            return Err(ConfigError::Invalid("config file exceeds size limit".to_string()));
        }
        let content = std::str::from_utf8(&bytes)
            .map_err(|_| ConfigError::Invalid("config file must be utf-8".to_string()))?;
        let mut config = Self::from_toml_str(content)?;
        config.source = Some(resolved);
        Ok(config)
    }

    /// Parses and validates configuration from TOML text.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when parsing or validation fails.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self =
            toml::from_str(content).map_err(|err| ConfigError::Parse(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validates every profile.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when configuration is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.profiles.is_empty() {
            return Err(ConfigError::Invalid("at least one profile must be defined".to_string()));
        }
        for (name, profile) in &self.profiles {
            validate_label("profile name", name)?;
            profile
                .validate()
                .map_err(|err| ConfigError::Invalid(format!("profiles.{name}: {}", err.detail())))?;
        }
        Ok(())
    }

    /// Returns the named profile.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] when the profile does not exist.
    pub fn profile(&self, name: &str) -> Result<&ProfileConfig, ConfigError> {
        self.profiles.get(name).ok_or_else(|| {
            let known = self.profiles.keys().cloned().collect::<Vec<_>>().join(", ");
            ConfigError::Invalid(format!("unknown profile {name} (known: {known})"))
        })
    }
}

/// One environment's settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProfileConfig {
    /// Target names; each must match an instance tag value.
    pub targets: Vec<String>,
    /// Authoritative zone settings.
    pub hosted_zone: HostedZoneConfig,
    /// Instance discovery settings.
    #[serde(default)]
    pub discovery: DiscoveryConfig,
    /// Propagation polling settings.
    #[serde(default)]
    pub propagation: PropagationConfig,
    /// Lifecycle waiter bounds.
    #[serde(default)]
    pub lifecycle: LifecycleConfig,
    /// Session setup/teardown flags.
    #[serde(default)]
    pub session: SessionConfig,
    /// AWS client settings.
    #[serde(default)]
    pub aws: AwsConfig,
    /// Audit sink selection.
    #[serde(default)]
    pub audit: AuditConfig,
}

impl ProfileConfig {
    /// Validates the profile.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.targets.is_empty() {
            return Err(ConfigError::Invalid("targets must be non-empty".to_string()));
        }
        if self.targets.len() > MAX_TARGETS {
            return Err(ConfigError::Invalid("too many targets".to_string()));
        }
        let mut seen = BTreeSet::new();
        for target in &self.targets {
            validate_label("target", target)?;
            if !seen.insert(target.as_str()) {
                return Err(ConfigError::Invalid(format!("duplicate target {target}")));
            }
        }
        self.hosted_zone.validate()?;
        self.discovery.validate()?;
        self.propagation.validate()?;
        self.lifecycle.validate()?;
        self.aws.validate()?;
        self.audit.validate()?;
        Ok(())
    }

    /// Builds the target catalog.
    #[must_use]
    pub fn catalog(&self) -> TargetCatalog {
        TargetCatalog::new(
            self.targets.iter().map(|name| Target::new(name.as_str(), self.hosted_zone.name.as_str())),
            self.discovery.tag_key.clone(),
            self.discovery
                .filters
                .iter()
                .map(|filter| InstanceFilter::new(filter.name.clone(), filter.values.iter().cloned()))
                .collect(),
        )
    }

    /// Builds the hosted zone.
    #[must_use]
    pub fn hosted_zone(&self) -> HostedZone {
        HostedZone {
            name: self.hosted_zone.name.trim_end_matches('.').to_string(),
            id: self.hosted_zone.id.clone(),
            record_ttl: self.hosted_zone.record_ttl_seconds,
            change_timeout: Duration::from_secs(self.hosted_zone.change_timeout_seconds),
        }
    }

    /// Builds the propagation policy from the zone TTL.
    #[must_use]
    pub const fn propagation_policy(&self) -> PropagationPolicy {
        PropagationPolicy {
            ttl: Duration::from_secs(self.hosted_zone.ttl_seconds),
            poll_divisor: self.propagation.poll_divisor,
            margin_polls: self.propagation.margin_polls,
        }
    }

    /// Builds lifecycle waiter bounds.
    #[must_use]
    pub const fn lifecycle_timeouts(&self) -> LifecycleTimeouts {
        LifecycleTimeouts {
            start: Duration::from_secs(self.lifecycle.start_timeout_seconds),
            stop: Duration::from_secs(self.lifecycle.stop_timeout_seconds),
        }
    }

    /// Builds the session policy.
    #[must_use]
    pub const fn session_policy(&self) -> SessionPolicy {
        SessionPolicy {
            start_all_upfront: !self.session.skip_start,
            stop_on_finish: !self.session.skip_stop,
        }
    }

    /// Builds facade options; a CLI dry-run flag can only turn dry run on.
    #[must_use]
    pub fn fleet_options(&self, dry_run_override: bool) -> FleetOptions {
        FleetOptions {
            zone: self.hosted_zone(),
            lifecycle: self.lifecycle_timeouts(),
            propagation: self.propagation_policy(),
            dry_run: dry_run_override || self.session.dry_run,
        }
    }

    /// Opens the configured audit sink.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] when the audit file cannot be opened.
    pub fn audit_sink(&self) -> Result<SharedAuditSink, ConfigError> {
        match self.audit.sink {
            AuditSinkKind::Stderr => Ok(Arc::new(StderrAuditSink)),
            AuditSinkKind::None => Ok(Arc::new(NoopAuditSink)),
            AuditSinkKind::File => {
                let path = self.audit.path.as_deref().ok_or_else(|| {
                    ConfigError::Invalid("audit.path is required for the file sink".to_string())
                })?;
                let sink = FileAuditSink::new(Path::new(path))
                    .map_err(|err| ConfigError::Io(format!("{path}: {err}")))?;
                Ok(Arc::new(sink))
            }
        }
    }
}

/// Authoritative zone settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HostedZoneConfig {
    /// Zone name; targets live at `<target>.<name>`.
    pub name: String,
    /// Provider zone id.
    pub id: String,
    /// Zone TTL used only to size propagation waits.
    #[serde(default = "default_ttl_seconds")]
    pub ttl_seconds: u64,
    /// TTL written on upserted records.
    #[serde(default = "default_ttl_seconds")]
    pub record_ttl_seconds: u64,
    /// Bound for the change-applied waiter.
    #[serde(default = "default_wait_seconds")]
    pub change_timeout_seconds: u64,
}

impl HostedZoneConfig {
    /// Validates zone settings.
    fn validate(&self) -> Result<(), ConfigError> {
        let name = self.name.trim().trim_end_matches('.');
        if name.is_empty() {
            return Err(ConfigError::Invalid("hosted_zone.name must be non-empty".to_string()));
        }
        for label in name.split('.') {
            validate_label("hosted_zone.name label", label)?;
        }
        validate_zone_id(&self.id)?;
        validate_range("hosted_zone.ttl_seconds", self.ttl_seconds, MAX_TTL_SECONDS)?;
        validate_range("hosted_zone.record_ttl_seconds", self.record_ttl_seconds, MAX_TTL_SECONDS)?;
        validate_range(
            "hosted_zone.change_timeout_seconds",
            self.change_timeout_seconds,
            MAX_WAIT_SECONDS,
        )
    }
}

/// Instance discovery settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DiscoveryConfig {
    /// Tag key whose value names a target.
    #[serde(default = "default_tag_key")]
    pub tag_key: String,
    /// Provider-side filters applied to the listing.
    #[serde(default)]
    pub filters: Vec<FilterConfig>,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            tag_key: default_tag_key(),
            filters: Vec::new(),
        }
    }
}

impl DiscoveryConfig {
    /// Validates discovery settings.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.tag_key.trim().is_empty() {
            return Err(ConfigError::Invalid("discovery.tag_key must be non-empty".to_string()));
        }
        if self.filters.len() > MAX_FILTERS {
            return Err(ConfigError::Invalid("too many discovery filters".to_string()));
        }
        for filter in &self.filters {
            if filter.name.trim().is_empty() {
                return Err(ConfigError::Invalid("discovery filter name must be set".to_string()));
            }
            if filter.values.is_empty() {
                return Err(ConfigError::Invalid(format!(
                    "discovery filter {} must list at least one value",
                    filter.name
                )));
            }
        }
        Ok(())
    }
}

/// One provider-side listing filter.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct FilterConfig {
    /// Provider filter name (for example `instance-state-name`).
    pub name: String,
    /// Accepted values.
    pub values: Vec<String>,
}

/// Propagation polling settings.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PropagationConfig {
    /// Divisor applied to the zone TTL for the poll interval.
    #[serde(default = "default_poll_divisor")]
    pub poll_divisor: u32,
    /// Extra intervals allowed past the TTL.
    #[serde(default = "default_margin_polls")]
    pub margin_polls: u32,
}

impl Default for PropagationConfig {
    fn default() -> Self {
        Self {
            poll_divisor: DEFAULT_POLL_DIVISOR,
            margin_polls: DEFAULT_MARGIN_POLLS,
        }
    }
}

impl PropagationConfig {
    /// Validates polling settings.
    fn validate(self) -> Result<(), ConfigError> {
        if self.poll_divisor == 0 || self.poll_divisor > MAX_POLL_DIVISOR {
            return Err(ConfigError::Invalid(format!(
                "propagation.poll_divisor must be between 1 and {MAX_POLL_DIVISOR}"
            )));
        }
        if self.margin_polls > MAX_MARGIN_POLLS {
            return Err(ConfigError::Invalid(format!(
                "propagation.margin_polls must be at most {MAX_MARGIN_POLLS}"
            )));
        }
        Ok(())
    }
}

/// Lifecycle waiter bounds.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LifecycleConfig {
    /// Bound for the instance-running waiter.
    #[serde(default = "default_wait_seconds")]
    pub start_timeout_seconds: u64,
    /// Bound for the instance-stopped waiter.
    #[serde(default = "default_wait_seconds")]
    pub stop_timeout_seconds: u64,
}

impl Default for LifecycleConfig {
    fn default() -> Self {
        Self {
            start_timeout_seconds: DEFAULT_WAIT_SECONDS,
            stop_timeout_seconds: DEFAULT_WAIT_SECONDS,
        }
    }
}

impl LifecycleConfig {
    /// Validates waiter bounds.
    fn validate(self) -> Result<(), ConfigError> {
        validate_range("lifecycle.start_timeout_seconds", self.start_timeout_seconds, MAX_WAIT_SECONDS)?;
        validate_range("lifecycle.stop_timeout_seconds", self.stop_timeout_seconds, MAX_WAIT_SECONDS)
    }
}

/// Session setup/teardown flags.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SessionConfig {
    /// Start targets on demand instead of up front.
    #[serde(default)]
    pub skip_start: bool,
    /// Leave targets running when the session ends.
    #[serde(default)]
    pub skip_stop: bool,
    /// Run every operation in dry-run mode.
    #[serde(default)]
    pub dry_run: bool,
}

/// AWS client settings.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AwsConfig {
    /// Region override (defaults to the environment).
    #[serde(default)]
    pub region: Option<String>,
    /// Endpoint override for compatible services.
    #[serde(default)]
    pub endpoint: Option<String>,
}

impl AwsConfig {
    /// Validates client settings.
    fn validate(&self) -> Result<(), ConfigError> {
        if let Some(region) = &self.region
            && region.trim().is_empty()
        {
            return Err(ConfigError::Invalid("aws.region must be non-empty when set".to_string()));
        }
        if let Some(endpoint) = &self.endpoint {
            let trimmed = endpoint.trim();
            if !(trimmed.starts_with("https://") || trimmed.starts_with("http://")) {
                return Err(ConfigError::Invalid(
                    "aws.endpoint must include http:// or https://".to_string(),
                ));
            }
        }
        Ok(())
    }
}

/// Audit sink kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditSinkKind {
    /// JSON lines on stderr.
    #[default]
    Stderr,
    /// JSON lines appended to a file.
    File,
    /// Discard events.
    None,
}

/// Audit sink selection.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AuditConfig {
    /// Sink kind.
    #[serde(default)]
    pub sink: AuditSinkKind,
    /// Audit log path for the file sink.
    #[serde(default)]
    pub path: Option<String>,
}

impl AuditConfig {
    /// Validates audit settings.
    fn validate(&self) -> Result<(), ConfigError> {
        match (&self.sink, &self.path) {
            (AuditSinkKind::File, None) => {
                Err(ConfigError::Invalid("audit.path is required for the file sink".to_string()))
            }
            (_, Some(path)) => validate_path_string("audit.path", path),
            _ => Ok(()),
        }
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// I/O failure while reading configuration.
    #[error("config io error: {0}")]
    Io(String),
    /// TOML parsing error.
    #[error("config parse error: {0}")]
    Parse(String),
    /// Invalid configuration data.
    #[error("invalid config: {0}")]
    Invalid(String),
}

impl ConfigError {
    /// Returns the message without the category prefix.
    fn detail(&self) -> &str {
        match self {
            Self::Io(detail) | Self::Parse(detail) | Self::Invalid(detail) => detail,
        }
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Resolves the config path from CLI or environment defaults.
fn resolve_path(path: Option<&Path>) -> Result<PathBuf, ConfigError> {
    if let Some(path) = path {
        return Ok(path.to_path_buf());
    }
    if let Ok(env_path) = env::var(CONFIG_ENV_VAR) {
        if env_path.len() > MAX_TOTAL_PATH_LENGTH {
            return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
        }
        return Ok(PathBuf::from(env_path));
    }
    Ok(PathBuf::from(DEFAULT_CONFIG_NAME))
}

/// Validates the resolved path against length limits.
fn validate_path(path: &Path) -> Result<(), ConfigError> {
    let text = path.to_string_lossy();
    if text.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
    }
    for component in path.components() {
        let value = component.as_os_str().to_string_lossy();
        if value.len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(ConfigError::Invalid("config path component too long".to_string()));
        }
    }
    Ok(())
}

/// Validates a path string against length constraints.
fn validate_path_string(field: &str, value: &str) -> Result<(), ConfigError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ConfigError::Invalid(format!("{field} must be non-empty")));
    }
    if trimmed.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(ConfigError::Invalid(format!("{field} exceeds max length")));
    }
    for component in Path::new(trimmed).components() {
        if component.as_os_str().len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(ConfigError::Invalid(format!("{field} path component too long")));
        }
    }
    Ok(())
}

/// Validates a DNS-style label: ASCII alphanumerics, `-` and `_`, no edge hyphens.
fn validate_label(field: &str, value: &str) -> Result<(), ConfigError> {
    let valid = !value.is_empty()
        && value.len() <= MAX_LABEL_LENGTH
        && value.chars().all(|ch| ch.is_ascii_alphanumeric() || ch == '-' || ch == '_')
        && !value.starts_with('-')
        && !value.ends_with('-');
    if valid {
        Ok(())
    } else {
        Err(ConfigError::Invalid(format!("{field} '{value}' is not a valid DNS label")))
    }
}

/// Validates a hosted zone id, with or without the `/hostedzone/` prefix.
fn validate_zone_id(value: &str) -> Result<(), ConfigError> {
    let bare = value.strip_prefix("/hostedzone/").unwrap_or(value);
    let valid = !bare.is_empty()
        && bare.len() <= 32
        && bare.chars().all(|ch| ch.is_ascii_uppercase() || ch.is_ascii_digit());
    if valid {
        Ok(())
    } else {
        Err(ConfigError::Invalid(format!("hosted_zone.id '{value}' is not a valid zone id")))
    }
}

/// Validates `1..=max`.
fn validate_range(field: &str, value: u64, max: u64) -> Result<(), ConfigError> {
    if value == 0 || value > max {
        return Err(ConfigError::Invalid(format!("{field} must be between 1 and {max}")));
    }
    Ok(())
}

/// Default TTL in seconds.
const fn default_ttl_seconds() -> u64 {
    DEFAULT_RECORD_TTL_SECS
}

/// Default waiter bound in seconds.
const fn default_wait_seconds() -> u64 {
    DEFAULT_WAIT_SECONDS
}

/// Default discovery tag key.
fn default_tag_key() -> String {
    DEFAULT_TARGET_TAG.to_string()
}

/// Default poll divisor.
const fn default_poll_divisor() -> u32 {
    DEFAULT_POLL_DIVISOR
}

/// Default margin polls.
const fn default_margin_polls() -> u32 {
    DEFAULT_MARGIN_POLLS
}

// ============================================================================
// SECTION: Tests
// ============================================================================
