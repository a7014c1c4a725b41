// crates/sp-fleet-providers/tests/providers.rs
// ============================================================================
// Module: Provider Construction Tests
// Description: Builds AWS-backed providers against a local endpoint.
// Purpose: Ensure sessions load offline and providers share one session.
// Dependencies: sp-fleet-core, sp-fleet-providers
// ============================================================================

//! Provider construction without real AWS access.

#![allow(
    clippy::panic,
    clippy::print_stdout,
    clippy::print_stderr,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    clippy::dbg_macro,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    reason = "Test-only output and panic-based assertions are permitted."
)]

use std::sync::Arc;

use sp_fleet_core::AddressResolver;
use sp_fleet_providers::AwsSession;
use sp_fleet_providers::AwsSettings;
use sp_fleet_providers::Ec2Compute;
use sp_fleet_providers::Route53Zone;
use sp_fleet_providers::SystemResolver;

fn offline_settings() -> AwsSettings {
    AwsSettings {
        region: Some("us-east-1".to_string()),
        endpoint: Some("http://127.0.0.1:9".to_string()),
    }
}

#[test]
fn session_applies_region_override() {
    let session = AwsSession::load(&offline_settings()).unwrap();
    assert_eq!(session.config().region().map(|region| region.as_ref()), Some("us-east-1"));
}

#[test]
fn providers_share_one_session() {
    let session = Arc::new(AwsSession::load(&offline_settings()).unwrap());
    let _compute = Ec2Compute::new(Arc::clone(&session));
    let _zone = Route53Zone::new(Arc::clone(&session));
    assert_eq!(Arc::strong_count(&session), 3);
}

#[test]
fn system_resolver_answers_localhost() {
    let answer = SystemResolver.resolve_ipv4("localhost").unwrap_or(None);
    assert!(answer.is_none_or(|addr| addr.is_loopback()));
}
