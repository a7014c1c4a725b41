// crates/sp-fleet-providers/src/route53.rs
// ============================================================================
// Module: Route53 DNS Provider
// Description: DnsProvider backed by the AWS Route53 API.
// Purpose: List zone records, submit upsert batches, and await change sync.
// Dependencies: aws-sdk-route53, aws-smithy-runtime-api, sp-fleet-core
// ============================================================================

//! ## Overview
//! Record listing follows Route53's `(next_record_name, next_record_type)`
//! continuation until the response is no longer truncated. Upserts are
//! submitted as one `ChangeResourceRecordSets` batch and confirmed with the
//! `resource_record_sets_changed` waiter, which resolves once the change is
//! `INSYNC` on every authoritative server.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;
use std::time::Duration;

use aws_sdk_route53::Client;
use aws_sdk_route53::client::Waiters;
use aws_sdk_route53::types::Change;
use aws_sdk_route53::types::ChangeAction;
use aws_sdk_route53::types::ChangeBatch as SdkChangeBatch;
use aws_sdk_route53::types::ResourceRecord;
use aws_sdk_route53::types::ResourceRecordSet;
use aws_sdk_route53::types::RrType;
use aws_smithy_runtime_api::client::waiters::error::WaiterError;
use sp_fleet_core::ChangeBatch;
use sp_fleet_core::ChangeId;
use sp_fleet_core::DnsProvider;
use sp_fleet_core::DnsRecord;
use sp_fleet_core::ProviderError;
use sp_fleet_core::RecordChange;
use sp_fleet_core::RecordType;
use sp_fleet_core::WaitError;

use crate::session::AwsSession;
use crate::session::provider_error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Comment attached to every submitted change batch.
const CHANGE_COMMENT: &str = "sp-fleet target address update";

// ============================================================================
// SECTION: Provider
// ============================================================================

/// Route53-backed DNS provider.
pub struct Route53Zone {
    /// Route53 client.
    client: Client,
    /// Session driving SDK calls.
    session: Arc<AwsSession>,
}

impl Route53Zone {
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

impl DnsProvider for Route53Zone {
    fn list_records(&self, zone_id: &str) -> Result<Vec<DnsRecord>, ProviderError> {
        let client = self.client.clone();
        let zone_id = zone_id.to_string();
        self.session.block_on(async move {
            let mut records = Vec::new();
            let mut next_name: Option<String> = None;
            let mut next_type: Option<RrType> = None;
            loop {
                let page = client
                    .list_resource_record_sets()
                    .hosted_zone_id(&zone_id)
                    .set_start_record_name(next_name.take())
                    .set_start_record_type(next_type.take())
                    .send()
                    .await
                    .map_err(|err| provider_error(&err))?;
                records.extend(page.resource_record_sets().iter().map(dns_record));
                if !page.is_truncated() {
                    break;
                }
                next_name = page.next_record_name().map(str::to_string);
                next_type = page.next_record_type().cloned();
                if next_name.is_none() {
                    break;
                }
            }
            Ok(records)
        })
    }

    fn submit_changes(
        &self,
        zone_id: &str,
        batch: &ChangeBatch,
    ) -> Result<ChangeId, ProviderError> {
        let client = self.client.clone();
        let zone_id = zone_id.to_string();
        let batch = sdk_change_batch(batch)?;
        self.session.block_on(async move {
            let output = client
                .change_resource_record_sets()
                .hosted_zone_id(zone_id)
                .change_batch(batch)
                .send()
                .await
                .map_err(|err| provider_error(&err))?;
            let info = output
                .change_info()
                .ok_or_else(|| ProviderError::new("change response carried no change info"))?;
            Ok(ChangeId::new(info.id()))
        })
    }

    fn wait_for_change(&self, change_id: &ChangeId, timeout: Duration) -> Result<(), WaitError> {
        let client = self.client.clone();
        let id = change_id.as_str().to_string();
        let outcome = self.session.block_on(async move {
            let result = client.wait_until_resource_record_sets_changed().id(id).wait(timeout).await;
            Ok(result.map(drop).map_err(|err| match err {
                WaiterError::ExceededMaxWait(_) => None,
                other => Some(ProviderError::new(other.to_string())),
            }))
        })?;
        outcome.map_err(|err| match err {
            None => WaitError::TimedOut {
                waited: timeout,
            },
            Some(err) => WaitError::Provider(err),
        })
    }
}

// ============================================================================
// SECTION: Conversions
// ============================================================================

/// Flattens an SDK record set.
fn dns_record(set: &ResourceRecordSet) -> DnsRecord {
    DnsRecord {
        name: set.name().to_string(),
        record_type: RecordType::parse(set.r#type().as_str()),
        ttl: set.ttl().and_then(|ttl| u64::try_from(ttl).ok()),
        values: set.resource_records().iter().map(|record| record.value().to_string()).collect(),
    }
}

/// Builds the SDK upsert for one record change.
fn sdk_change(change: &RecordChange) -> Result<Change, ProviderError> {
    let ttl = i64::try_from(change.ttl)
        .map_err(|_| ProviderError::new(format!("record ttl {} out of range", change.ttl)))?;
    let value = ResourceRecord::builder()
        .value(change.address.to_string())
        .build()
        .map_err(|err| ProviderError::new(err.to_string()))?;
    let set = ResourceRecordSet::builder()
        .name(&change.name)
        .r#type(RrType::A)
        .ttl(ttl)
        .resource_records(value)
        .build()
        .map_err(|err| ProviderError::new(err.to_string()))?;
    Change::builder()
        .action(ChangeAction::Upsert)
        .resource_record_set(set)
        .build()
        .map_err(|err| ProviderError::new(err.to_string()))
}

/// Builds the SDK change batch for a set of upserts.
fn sdk_change_batch(batch: &ChangeBatch) -> Result<SdkChangeBatch, ProviderError> {
    let changes = batch.changes.iter().map(sdk_change).collect::<Result<Vec<_>, _>>()?;
    SdkChangeBatch::builder()
        .comment(CHANGE_COMMENT)
        .set_changes(Some(changes))
        .build()
        .map_err(|err| ProviderError::new(err.to_string()))
}

// ============================================================================
// SECTION: Tests
// ============================================================================
