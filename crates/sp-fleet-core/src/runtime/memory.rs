// crates/sp-fleet-core/src/runtime/memory.rs
// ============================================================================
// Module: In-Memory Providers
// Description: Deterministic compute, DNS, resolver, and clock fakes.
// Purpose: Exercise the fleet runtime without cloud accounts or real time.
// Dependencies: crate::{core, interfaces}
// ============================================================================

//! ## Overview
//! Each fake is a cheap-to-clone handle over shared state, so a test can hand
//! one clone to a [`crate::Fleet`] and keep another to seed state and inspect
//! the calls the runtime made.
//!
//! [`InMemoryCompute`] mimics the provider's dry-run acknowledgement and
//! assigns a fresh public address from a queue on every start, as a real
//! provider does for instances without a fixed address.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::collections::VecDeque;
use std::net::Ipv4Addr;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::MutexGuard;
use std::time::Duration;

use crate::core::ChangeBatch;
use crate::core::ChangeId;
use crate::core::DEFAULT_TARGET_TAG;
use crate::core::DnsRecord;
use crate::core::InstanceFilter;
use crate::core::InstanceId;
use crate::core::InstanceState;
use crate::core::ProviderInstance;
use crate::core::normalize_record_name;
use crate::interfaces::AddressResolver;
use crate::interfaces::Clock;
use crate::interfaces::ComputeProvider;
use crate::interfaces::DnsProvider;
use crate::interfaces::ProviderError;
use crate::interfaces::ResolveError;
use crate::interfaces::WaitError;
use crate::runtime::lifecycle::DRY_RUN_OPERATION_CODE;

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Locks shared state, mapping poisoning to a provider error.
fn lock<T>(state: &Mutex<T>) -> Result<MutexGuard<'_, T>, ProviderError> {
    state.lock().map_err(|_| ProviderError::new("in-memory provider lock poisoned"))
}

/// Builds the provider's dry-run acknowledgement.
fn dry_run_acknowledgement() -> ProviderError {
    ProviderError::with_code(
        DRY_RUN_OPERATION_CODE,
        "Request would have succeeded, but DryRun flag is set.",
    )
}

// ============================================================================
// SECTION: Compute
// ============================================================================

/// Call recorded by [`InMemoryCompute`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ComputeCall {
    /// Instance listing.
    Describe,
    /// Batched start request.
    Start {
        /// Requested instances.
        ids: Vec<InstanceId>,
        /// Dry-run flag.
        dry_run: bool,
    },
    /// Batched stop request.
    Stop {
        /// Requested instances.
        ids: Vec<InstanceId>,
        /// Dry-run flag.
        dry_run: bool,
    },
    /// Waiter invocation.
    Wait {
        /// Instances waited on.
        ids: Vec<InstanceId>,
        /// Desired state.
        state: InstanceState,
    },
}

/// Compute operation that can be made to fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ComputeOperation {
    /// Instance listing.
    Describe,
    /// Start requests.
    Start,
    /// Stop requests.
    Stop,
}

/// Simulated instance.
#[derive(Debug, Clone)]
struct SimInstance {
    /// Power state.
    state: InstanceState,
    /// Public address while running.
    public_ip: Option<Ipv4Addr>,
    /// Provider tags.
    tags: BTreeMap<String, String>,
}

/// Shared compute state.
#[derive(Debug, Default)]
struct ComputeState {
    /// Instances keyed by id.
    instances: BTreeMap<InstanceId, SimInstance>,
    /// Addresses handed out on start, in order.
    address_pool: VecDeque<Ipv4Addr>,
    /// Recorded calls.
    calls: Vec<ComputeCall>,
    /// Injected failures.
    failures: BTreeMap<ComputeOperation, ProviderError>,
    /// When set, transitions stop at pending/stopping and waiters time out.
    stalled: bool,
}

/// In-memory compute provider.
#[derive(Debug, Clone, Default)]
pub struct InMemoryCompute {
    /// Shared state.
    state: Arc<Mutex<ComputeState>>,
}

impl InMemoryCompute {
    /// Creates an empty provider.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an instance tagged with the default target tag.
    pub fn add_target_instance(
        &self,
        id: &str,
        target: &str,
        state: InstanceState,
        public_ip: Option<Ipv4Addr>,
    ) {
        let tags = BTreeMap::from([(DEFAULT_TARGET_TAG.to_string(), target.to_string())]);
        self.add_instance(id, tags, state, public_ip);
    }

    /// Adds an instance with arbitrary tags.
    pub fn add_instance(
        &self,
        id: &str,
        tags: BTreeMap<String, String>,
        state: InstanceState,
        public_ip: Option<Ipv4Addr>,
    ) {
        if let Ok(mut guard) = lock(&self.state) {
            guard.instances.insert(
                InstanceId::new(id),
                SimInstance {
                    state,
                    public_ip,
                    tags,
                },
            );
        }
    }

    /// Queues addresses assigned to instances as they start.
    pub fn queue_addresses(&self, addresses: impl IntoIterator<Item = Ipv4Addr>) {
        if let Ok(mut guard) = lock(&self.state) {
            guard.address_pool.extend(addresses);
        }
    }

    /// Makes every subsequent call of `operation` fail with `error`.
    pub fn fail(&self, operation: ComputeOperation, error: ProviderError) {
        if let Ok(mut guard) = lock(&self.state) {
            guard.failures.insert(operation, error);
        }
    }

    /// Freezes transitions so waiters time out.
    pub fn stall_transitions(&self, stalled: bool) {
        if let Ok(mut guard) = lock(&self.state) {
            guard.stalled = stalled;
        }
    }

    /// Returns every recorded call in order.
    #[must_use]
    pub fn calls(&self) -> Vec<ComputeCall> {
        lock(&self.state).map(|guard| guard.calls.clone()).unwrap_or_default()
    }

    /// Returns the non-dry-run start requests.
    #[must_use]
    pub fn start_requests(&self) -> Vec<Vec<InstanceId>> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                ComputeCall::Start {
                    ids,
                    dry_run: false,
                } => Some(ids),
                _ => None,
            })
            .collect()
    }

    /// Returns the non-dry-run stop requests.
    #[must_use]
    pub fn stop_requests(&self) -> Vec<Vec<InstanceId>> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                ComputeCall::Stop {
                    ids,
                    dry_run: false,
                } => Some(ids),
                _ => None,
            })
            .collect()
    }

    /// Returns the number of waiter invocations.
    #[must_use]
    pub fn wait_count(&self) -> usize {
        self.calls().iter().filter(|call| matches!(call, ComputeCall::Wait { .. })).count()
    }

    /// Returns an instance's current state.
    #[must_use]
    pub fn state_of(&self, id: &str) -> Option<InstanceState> {
        lock(&self.state)
            .ok()
            .and_then(|guard| guard.instances.get(&InstanceId::new(id)).map(|sim| sim.state))
    }

    /// Returns an instance's current public address.
    #[must_use]
    pub fn public_ip_of(&self, id: &str) -> Option<Ipv4Addr> {
        lock(&self.state)
            .ok()
            .and_then(|guard| guard.instances.get(&InstanceId::new(id)).and_then(|sim| sim.public_ip))
    }

    /// Records a mutating call and applies failure injection.
    fn begin(
        guard: &mut ComputeState,
        operation: ComputeOperation,
        ids: &[InstanceId],
        dry_run: bool,
    ) -> Result<(), ProviderError> {
        guard.calls.push(match operation {
            ComputeOperation::Start => ComputeCall::Start {
                ids: ids.to_vec(),
                dry_run,
            },
            ComputeOperation::Stop => ComputeCall::Stop {
                ids: ids.to_vec(),
                dry_run,
            },
            ComputeOperation::Describe => ComputeCall::Describe,
        });
        if let Some(error) = guard.failures.get(&operation) {
            return Err(error.clone());
        }
        if let Some(missing) = ids.iter().find(|id| !guard.instances.contains_key(*id)) {
            return Err(ProviderError::with_code(
                "InvalidInstanceID.NotFound",
                format!("The instance ID '{missing}' does not exist"),
            ));
        }
        if dry_run {
            return Err(dry_run_acknowledgement());
        }
        Ok(())
    }
}

impl ComputeProvider for InMemoryCompute {
    fn describe_instances(
        &self,
        filters: &[InstanceFilter],
    ) -> Result<Vec<ProviderInstance>, ProviderError> {
        let mut guard = lock(&self.state)?;
        guard.calls.push(ComputeCall::Describe);
        if let Some(error) = guard.failures.get(&ComputeOperation::Describe) {
            return Err(error.clone());
        }
        Ok(guard
            .instances
            .iter()
            .filter(|(_, sim)| filters.iter().all(|filter| matches_filter(sim, filter)))
            .map(|(id, sim)| ProviderInstance {
                instance_id: id.clone(),
                state: sim.state.as_str().to_string(),
                public_ip: sim.public_ip.map(|ip| ip.to_string()),
                tags: sim.tags.clone(),
            })
            .collect())
    }

    fn start_instances(&self, ids: &[InstanceId], dry_run: bool) -> Result<(), ProviderError> {
        let mut guard = lock(&self.state)?;
        Self::begin(&mut guard, ComputeOperation::Start, ids, dry_run)?;
        let state = &mut *guard;
        for id in ids {
            let Some(sim) = state.instances.get_mut(id) else {
                continue;
            };
            if sim.state == InstanceState::Running {
                continue;
            }
            if state.stalled {
                sim.state = InstanceState::Pending;
            } else {
                sim.state = InstanceState::Running;
                sim.public_ip = state.address_pool.pop_front().or(sim.public_ip);
            }
        }
        Ok(())
    }

    fn stop_instances(&self, ids: &[InstanceId], dry_run: bool) -> Result<(), ProviderError> {
        let mut guard = lock(&self.state)?;
        Self::begin(&mut guard, ComputeOperation::Stop, ids, dry_run)?;
        let stalled = guard.stalled;
        for id in ids {
            if let Some(sim) = guard.instances.get_mut(id) {
                if stalled {
                    sim.state = InstanceState::Stopping;
                } else {
                    sim.state = InstanceState::Stopped;
                    sim.public_ip = None;
                }
            }
        }
        Ok(())
    }

    fn wait_for_state(
        &self,
        ids: &[InstanceId],
        state: InstanceState,
        timeout: Duration,
    ) -> Result<(), WaitError> {
        let mut guard = lock(&self.state)?;
        guard.calls.push(ComputeCall::Wait {
            ids: ids.to_vec(),
            state,
        });
        let reached = ids
            .iter()
            .all(|id| guard.instances.get(id).is_some_and(|sim| sim.state == state));
        if reached {
            Ok(())
        } else {
            Err(WaitError::TimedOut {
                waited: timeout,
            })
        }
    }
}

/// Applies the subset of provider filters the fake understands.
fn matches_filter(sim: &SimInstance, filter: &InstanceFilter) -> bool {
    if filter.name == "instance-state-name" {
        return filter.values.iter().any(|value| value == sim.state.as_str());
    }
    if let Some(key) = filter.name.strip_prefix("tag:") {
        return sim.tags.get(key).is_some_and(|value| filter.values.contains(value));
    }
    if filter.name == "tag-key" {
        return filter.values.iter().any(|key| sim.tags.contains_key(key));
    }
    true
}

// ============================================================================
// SECTION: DNS Zone
// ============================================================================

/// Shared zone state.
#[derive(Debug, Default)]
struct ZoneState {
    /// Records in the zone.
    records: Vec<DnsRecord>,
    /// Submitted batches with their ids.
    submissions: Vec<(ChangeId, ChangeBatch)>,
    /// Number of listing calls.
    list_calls: usize,
    /// Injected submission failure.
    submit_failure: Option<ProviderError>,
    /// When set, change waiters time out.
    stalled: bool,
}

/// In-memory authoritative DNS zone.
#[derive(Debug, Clone, Default)]
pub struct InMemoryDnsZone {
    /// Shared state.
    state: Arc<Mutex<ZoneState>>,
}

impl InMemoryDnsZone {
    /// Creates an empty zone.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces a record by name and type.
    pub fn put_record(&self, record: DnsRecord) {
        if let Ok(mut guard) = lock(&self.state) {
            upsert(&mut guard.records, record);
        }
    }

    /// Makes every subsequent submission fail with `error`.
    pub fn fail_submissions(&self, error: ProviderError) {
        if let Ok(mut guard) = lock(&self.state) {
            guard.submit_failure = Some(error);
        }
    }

    /// Makes change waiters time out.
    pub fn stall_changes(&self, stalled: bool) {
        if let Ok(mut guard) = lock(&self.state) {
            guard.stalled = stalled;
        }
    }

    /// Returns the zone's records.
    #[must_use]
    pub fn records(&self) -> Vec<DnsRecord> {
        lock(&self.state).map(|guard| guard.records.clone()).unwrap_or_default()
    }

    /// Returns the first A value for a domain.
    #[must_use]
    pub fn address_of(&self, domain: &str) -> Option<Ipv4Addr> {
        self.records()
            .iter()
            .find(|record| record.is_a_record_for(domain))
            .and_then(DnsRecord::first_value)
            .and_then(|value| value.parse().ok())
    }

    /// Returns every submitted batch.
    #[must_use]
    pub fn submissions(&self) -> Vec<ChangeBatch> {
        lock(&self.state)
            .map(|guard| guard.submissions.iter().map(|(_, batch)| batch.clone()).collect())
            .unwrap_or_default()
    }

    /// Returns the number of listing calls.
    #[must_use]
    pub fn list_calls(&self) -> usize {
        lock(&self.state).map(|guard| guard.list_calls).unwrap_or_default()
    }
}

/// Replaces the matching record or appends a new one.
fn upsert(records: &mut Vec<DnsRecord>, record: DnsRecord) {
    let name = normalize_record_name(&record.name);
    match records.iter_mut().find(|existing| {
        existing.record_type == record.record_type && normalize_record_name(&existing.name) == name
    }) {
        Some(existing) => *existing = record,
        None => records.push(record),
    }
}

impl DnsProvider for InMemoryDnsZone {
    fn list_records(&self, _zone_id: &str) -> Result<Vec<DnsRecord>, ProviderError> {
        let mut guard = lock(&self.state)?;
        guard.list_calls += 1;
        Ok(guard.records.clone())
    }

    fn submit_changes(
        &self,
        _zone_id: &str,
        batch: &ChangeBatch,
    ) -> Result<ChangeId, ProviderError> {
        let mut guard = lock(&self.state)?;
        if let Some(error) = &guard.submit_failure {
            return Err(error.clone());
        }
        for change in &batch.changes {
            upsert(&mut guard.records, change.to_record());
        }
        let change_id = ChangeId::new(format!("C{:04}", guard.submissions.len() + 1));
        guard.submissions.push((change_id.clone(), batch.clone()));
        Ok(change_id)
    }

    fn wait_for_change(&self, change_id: &ChangeId, timeout: Duration) -> Result<(), WaitError> {
        let guard = lock(&self.state)?;
        if !guard.submissions.iter().any(|(id, _)| id == change_id) {
            return Err(WaitError::Provider(ProviderError::with_code(
                "NoSuchChange",
                format!("A change with the specified change ID does not exist: {change_id}"),
            )));
        }
        if guard.stalled {
            return Err(WaitError::TimedOut {
                waited: timeout,
            });
        }
        Ok(())
    }
}

// ============================================================================
// SECTION: Resolver
// ============================================================================

/// Scripted resolver answer.
pub type ScriptedAnswer = Result<Option<Ipv4Addr>, String>;

/// Shared resolver state.
#[derive(Debug, Default)]
struct ResolverState {
    /// Pending answers per normalized domain; the last one repeats.
    scripts: BTreeMap<String, VecDeque<ScriptedAnswer>>,
    /// Zone consulted for domains without a script.
    zone: Option<InMemoryDnsZone>,
    /// Domains resolved, in order.
    lookups: Vec<String>,
}

/// Resolver that replays scripted answers or reads an in-memory zone.
#[derive(Debug, Clone, Default)]
pub struct ScriptedResolver {
    /// Shared state.
    state: Arc<Mutex<ResolverState>>,
}

impl ScriptedResolver {
    /// Creates a resolver with no scripts.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a resolver that answers from the zone when unscripted.
    #[must_use]
    pub fn backed_by(zone: InMemoryDnsZone) -> Self {
        let resolver = Self::default();
        if let Ok(mut guard) = lock(&resolver.state) {
            guard.zone = Some(zone);
        }
        resolver
    }

    /// Scripts a sequence of answers for a domain; the last one repeats.
    pub fn script(&self, domain: &str, answers: impl IntoIterator<Item = ScriptedAnswer>) {
        if let Ok(mut guard) = lock(&self.state) {
            guard.scripts.insert(normalize_record_name(domain), answers.into_iter().collect());
        }
    }

    /// Scripts a single repeating answer for a domain.
    pub fn answer(&self, domain: &str, address: Option<Ipv4Addr>) {
        self.script(domain, [Ok(address)]);
    }

    /// Returns every domain looked up, in order.
    #[must_use]
    pub fn lookups(&self) -> Vec<String> {
        lock(&self.state).map(|guard| guard.lookups.clone()).unwrap_or_default()
    }
}

impl AddressResolver for ScriptedResolver {
    fn resolve_ipv4(&self, domain: &str) -> Result<Option<Ipv4Addr>, ResolveError> {
        let to_resolve_error = |message: String| ResolveError {
            domain: domain.to_string(),
            message,
        };
        let mut guard =
            self.state.lock().map_err(|_| to_resolve_error("resolver lock poisoned".to_string()))?;
        let key = normalize_record_name(domain);
        guard.lookups.push(key.clone());
        if let Some(script) = guard.scripts.get_mut(&key) {
            let answer = if script.len() > 1 { script.pop_front() } else { script.front().cloned() };
            if let Some(answer) = answer {
                return answer.map_err(to_resolve_error);
            }
        }
        match &guard.zone {
            Some(zone) => Ok(zone.address_of(domain)),
            None => Err(to_resolve_error("NXDOMAIN".to_string())),
        }
    }
}

// ============================================================================
// SECTION: Clock
// ============================================================================

/// Shared clock state.
#[derive(Debug, Default)]
struct ClockState {
    /// Current time since origin.
    now: Duration,
    /// Sleeps requested, in order.
    sleeps: Vec<Duration>,
}

/// Clock whose `sleep` advances time instantly.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    /// Shared state.
    state: Arc<Mutex<ClockState>>,
}

impl ManualClock {
    /// Creates a clock at time zero.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Advances time without recording a sleep.
    pub fn advance(&self, duration: Duration) {
        if let Ok(mut guard) = self.state.lock() {
            guard.now = guard.now.saturating_add(duration);
        }
    }

    /// Returns every sleep requested, in order.
    #[must_use]
    pub fn sleeps(&self) -> Vec<Duration> {
        self.state.lock().map(|guard| guard.sleeps.clone()).unwrap_or_default()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Duration {
        self.state.lock().map(|guard| guard.now).unwrap_or_default()
    }

    fn sleep(&self, duration: Duration) {
        if let Ok(mut guard) = self.state.lock() {
            guard.now = guard.now.saturating_add(duration);
            guard.sleeps.push(duration);
        }
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
