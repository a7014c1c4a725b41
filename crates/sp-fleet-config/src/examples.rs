// crates/sp-fleet-config/src/examples.rs
// ============================================================================
// Module: Config Examples
// Description: Canonical example configuration payload.
// Purpose: Deterministic starting point for new environments.
// Dependencies: std
// ============================================================================

//! ## Overview
//! Canonical `sp-fleet.toml` with a `base` profile and a dry-run `ci`
//! profile. Kept loadable; the config tests parse it.

/// Returns a canonical example `sp-fleet.toml` configuration.
#[must_use]
pub fn config_toml_example() -> String {
    String::from(
        r#"[profiles.base]
targets = ["diafine6", "shibsp", "wordpress"]

[profiles.base.hosted_zone]
name = "sp.example.com"
id = "Z0123456789ABCDEFGHIJ"
# Only sizes propagation waits; records are written with record_ttl_seconds.
ttl_seconds = 60
record_ttl_seconds = 60
change_timeout_seconds = 600

[profiles.base.discovery]
tag_key = "test_ref"

[[profiles.base.discovery.filters]]
name = "tag-key"
values = ["test_ref"]

[[profiles.base.discovery.filters]]
name = "instance-state-name"
values = ["pending", "running", "stopping", "stopped"]

[profiles.base.propagation]
poll_divisor = 10
margin_polls = 1

[profiles.base.lifecycle]
start_timeout_seconds = 600
stop_timeout_seconds = 600

[profiles.base.session]
skip_start = false
skip_stop = false
dry_run = false

[profiles.base.aws]
region = "us-west-2"
# endpoint = "http://localhost:4566"

[profiles.base.audit]
sink = "stderr"

[profiles.ci]
targets = ["diafine6"]

[profiles.ci.hosted_zone]
name = "sp.example.com"
id = "/hostedzone/Z0123456789ABCDEFGHIJ"

[profiles.ci.session]
skip_stop = true
dry_run = true

[profiles.ci.audit]
sink = "file"
path = "sp-fleet-audit.log"
"#,
    )
}
