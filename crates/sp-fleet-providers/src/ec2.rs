// crates/sp-fleet-providers/src/ec2.rs
// ============================================================================
// Module: EC2 Compute Provider
// Description: ComputeProvider backed by the AWS EC2 API.
// Purpose: Discover, start, stop, and await the target instances.
// Dependencies: aws-sdk-ec2, aws-smithy-runtime-api, sp-fleet-core
// ============================================================================

//! ## Overview
//! Instances are discovered with a paginated `DescribeInstances` call using
//! the configured filters. Start and stop requests are batched and forward
//! the dry-run flag; EC2 answers a permitted dry run with the
//! `DryRunOperation` error code, which the lifecycle controller recognizes.
//! Waits use the SDK's `instance_running` and `instance_stopped` waiters.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use aws_sdk_ec2::Client;
use aws_sdk_ec2::client::Waiters;
use aws_sdk_ec2::types::Filter;
use aws_sdk_ec2::types::Instance;
use aws_smithy_runtime_api::client::waiters::error::WaiterError;
use sp_fleet_core::ComputeProvider;
use sp_fleet_core::InstanceFilter;
use sp_fleet_core::InstanceId;
use sp_fleet_core::InstanceState;
use sp_fleet_core::ProviderError;
use sp_fleet_core::ProviderInstance;
use sp_fleet_core::WaitError;

use crate::session::AwsSession;
use crate::session::provider_error;

// ============================================================================
// SECTION: Provider
// ============================================================================

/// EC2-backed compute provider.
pub struct Ec2Compute {
    /// EC2 client.
    client: Client,
    /// Session driving SDK calls.
    session: Arc<AwsSession>,
}

impl Ec2Compute {
    /// Creates a provider from a loaded session.
    #[must_use]
    pub fn new(session: Arc<AwsSession>) -> Self {
        let client = Client::new(session.config());
        Self {
            client,
            session,
        }
    }
}

impl ComputeProvider for Ec2Compute {
    fn describe_instances(
        &self,
        filters: &[InstanceFilter],
    ) -> Result<Vec<ProviderInstance>, ProviderError> {
        let client = self.client.clone();
        let filters = sdk_filters(filters);
        self.session.block_on(async move {
            let mut pages =
                client.describe_instances().set_filters(Some(filters)).into_paginator().send();
            let mut instances = Vec::new();
            while let Some(page) = pages.next().await {
                let page = page.map_err(|err| provider_error(&err))?;
                for reservation in page.reservations() {
                    instances.extend(reservation.instances().iter().map(provider_instance));
                }
            }
            Ok(instances)
        })
    }

    fn start_instances(&self, ids: &[InstanceId], dry_run: bool) -> Result<(), ProviderError> {
        let client = self.client.clone();
        let ids = id_strings(ids);
        self.session.block_on(async move {
            client
                .start_instances()
                .set_instance_ids(Some(ids))
                .dry_run(dry_run)
                .send()
                .await
                .map_err(|err| provider_error(&err))?;
            Ok(())
        })
    }

    fn stop_instances(&self, ids: &[InstanceId], dry_run: bool) -> Result<(), ProviderError> {
        let client = self.client.clone();
        let ids = id_strings(ids);
        self.session.block_on(async move {
            client
                .stop_instances()
                .set_instance_ids(Some(ids))
                .dry_run(dry_run)
                .send()
                .await
                .map_err(|err| provider_error(&err))?;
            Ok(())
        })
    }

    fn wait_for_state(
        &self,
        ids: &[InstanceId],
        state: InstanceState,
        timeout: Duration,
    ) -> Result<(), WaitError> {
        let client = self.client.clone();
        let ids = id_strings(ids);
        let outcome = self.session.block_on(async move {
            let result = match state {
                InstanceState::Running => client
                    .wait_until_instance_running()
                    .set_instance_ids(Some(ids))
                    .wait(timeout)
                    .await
                    .map(drop)
                    .map_err(|err| wait_outcome(&err)),
                InstanceState::Stopped => client
                    .wait_until_instance_stopped()
                    .set_instance_ids(Some(ids))
                    .wait(timeout)
                    .await
                    .map(drop)
                    .map_err(|err| wait_outcome(&err)),
                other => Err(WaitOutcome::Failed(ProviderError::new(format!(
                    "no waiter for instance state {other}"
                )))),
            };
            Ok(result)
        })?;
        outcome.map_err(|outcome| match outcome {
            WaitOutcome::ExceededMaxWait => WaitError::TimedOut {
                waited: timeout,
            },
            WaitOutcome::Failed(err) => WaitError::Provider(err),
        })
    }
}

// ============================================================================
// SECTION: Conversions
// ============================================================================

/// Waiter failure reduced to what the fleet distinguishes.
enum WaitOutcome {
    /// The waiter ran out of time.
    ExceededMaxWait,
    /// The waiter failed for any other reason.
    Failed(ProviderError),
}

/// Classifies a waiter error.
fn wait_outcome<O, E>(err: &WaiterError<O, E>) -> WaitOutcome
where
    WaiterError<O, E>: std::error::Error,
{
    if matches!(err, WaiterError::ExceededMaxWait(_)) {
        WaitOutcome::ExceededMaxWait
    } else {
        WaitOutcome::Failed(ProviderError::new(err.to_string()))
    }
}

/// Converts discovery filters into SDK filters.
fn sdk_filters(filters: &[InstanceFilter]) -> Vec<Filter> {
    filters
        .iter()
        .map(|filter| {
            Filter::builder().name(&filter.name).set_values(Some(filter.values.clone())).build()
        })
        .collect()
}

/// Returns instance ids as owned strings.
fn id_strings(ids: &[InstanceId]) -> Vec<String> {
    ids.iter().map(|id| id.as_str().to_string()).collect()
}

/// Flattens an SDK instance description.
fn provider_instance(instance: &Instance) -> ProviderInstance {
    let tags = instance
        .tags()
        .iter()
        .filter_map(|tag| {
            Some((tag.key()?.to_string(), tag.value().unwrap_or_default().to_string()))
        })
        .collect::<BTreeMap<_, _>>();
    ProviderInstance {
        instance_id: InstanceId::new(instance.instance_id().unwrap_or_default()),
        state: instance
            .state()
            .and_then(|state| state.name())
            .map(|name| name.as_str().to_string())
            .unwrap_or_default(),
        public_ip: instance.public_ip_address().map(str::to_string),
        tags,
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use aws_sdk_ec2::types::InstanceState as SdkInstanceState;
    use aws_sdk_ec2::types::InstanceStateName;
    use aws_sdk_ec2::types::Tag;

    use super::*;

    #[test]
    fn instance_is_flattened_with_tags_and_address() {
        let instance = Instance::builder()
            .instance_id("i-0abc")
            .state(SdkInstanceState::builder().name(InstanceStateName::Running).build())
            .public_ip_address("203.0.113.7")
            .tags(Tag::builder().key("test_ref").value("diafine6").build())
            .tags(Tag::builder().key("Name").value("sp diafine6").build())
            .build();
        let flat = provider_instance(&instance);
        assert_eq!(flat.instance_id.as_str(), "i-0abc");
        assert_eq!(flat.state, "running");
        assert_eq!(flat.public_ip.as_deref(), Some("203.0.113.7"));
        assert_eq!(flat.tag("test_ref"), Some("diafine6"));
        assert_eq!(flat.tags.len(), 2);
    }

    #[test]
    fn stopped_instance_has_no_address() {
        let instance = Instance::builder()
            .instance_id("i-0def")
            .state(SdkInstanceState::builder().name(InstanceStateName::Stopped).build())
            .build();
        let flat = provider_instance(&instance);
        assert_eq!(flat.state, "stopped");
        assert_eq!(flat.public_ip, None);
        assert!(flat.tags.is_empty());
    }

    #[test]
    fn filters_keep_names_and_values() {
        let filters = sdk_filters(&[InstanceFilter::new(
            "instance-state-name",
            ["running", "stopped"],
        )]);
        assert_eq!(filters.len(), 1);
        assert_eq!(filters[0].name(), Some("instance-state-name"));
        assert_eq!(filters[0].values(), ["running".to_string(), "stopped".to_string()]);
    }
}
