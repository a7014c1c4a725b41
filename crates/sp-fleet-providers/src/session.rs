// crates/sp-fleet-providers/src/session.rs
// ============================================================================
// Module: AWS Session
// Description: Shared SDK configuration and blocking runtime for providers.
// Purpose: Run async AWS SDK calls behind the blocking provider interfaces.
// Dependencies: aws-config, aws-sdk-ec2, tokio
// ============================================================================

//! ## Overview
//! The SDK is async while the fleet interfaces are blocking. An
//! [`AwsSession`] owns a Tokio runtime and drives each SDK call to
//! completion. When the caller already runs inside a multi-thread runtime the
//! call is driven on that runtime through `block_in_place`; inside a
//! current-thread runtime a helper thread with its own runtime is used.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::future::Future;
use std::sync::Arc;

use aws_config::BehaviorVersion;
use aws_config::Region;
use aws_config::SdkConfig;
use aws_sdk_ec2::error::DisplayErrorContext;
use aws_sdk_ec2::error::ProvideErrorMetadata;
use sp_fleet_core::ProviderError;
use thiserror::Error;
use tokio::runtime::Handle;
use tokio::runtime::Runtime;
use tokio::runtime::RuntimeFlavor;

// ============================================================================
// SECTION: Settings
// ============================================================================

/// Overrides applied on top of the default AWS credential and region chain.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AwsSettings {
    /// Region override.
    pub region: Option<String>,
    /// Endpoint override (local emulators).
    pub endpoint: Option<String>,
}

/// Failure while building an AWS session.
#[derive(Debug, Error)]
pub enum SessionError {
    /// The Tokio runtime could not be created.
    #[error("aws session runtime error: {0}")]
    Runtime(String),
}

// ============================================================================
// SECTION: Runtime Helpers
// ============================================================================

/// Blocks on an SDK future using a compatible runtime.
fn block_on_with_runtime<F, T>(runtime: &Runtime, future: F) -> Result<T, ProviderError>
where
    F: Future<Output = Result<T, ProviderError>> + Send + 'static,
    T: Send + 'static,
{
    if let Ok(handle) = Handle::try_current() {
        if matches!(handle.runtime_flavor(), RuntimeFlavor::MultiThread) {
            return tokio::task::block_in_place(|| handle.block_on(future));
        }
        let (tx, rx) = std::sync::mpsc::sync_channel(1);
        std::thread::spawn(move || {
            let result = Runtime::new()
                .map_err(|err| ProviderError::new(err.to_string()))
                .and_then(|runtime| runtime.block_on(future));
            let _ = tx.send(result);
        });
        return rx
            .recv()
            .unwrap_or_else(|_| Err(ProviderError::new("aws call thread join failed")));
    }

    runtime.block_on(future)
}

/// Converts an SDK error into a provider error, keeping the service code.
pub(crate) fn provider_error<E>(err: &E) -> ProviderError
where
    E: ProvideErrorMetadata + std::error::Error,
{
    let message = err.message().map_or_else(
        || DisplayErrorContext(err).to_string(),
        str::to_string,
    );
    match err.code() {
        Some(code) => ProviderError::with_code(code, message),
        None => ProviderError::new(message),
    }
}

// ============================================================================
// SECTION: Session
// ============================================================================

/// Loaded AWS configuration plus the runtime that drives SDK calls.
pub struct AwsSession {
    /// Shared SDK configuration.
    config: SdkConfig,
    /// Tokio runtime for blocking SDK operations.
    runtime: Option<Arc<Runtime>>,
}

impl Drop for AwsSession {
    fn drop(&mut self) {
        if let Some(runtime) = self.runtime.take() {
            let _ = std::thread::spawn(move || drop(runtime));
        }
    }
}

impl AwsSession {
    /// Loads credentials and region from the default chain with overrides.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError`] when the runtime cannot be created.
    pub fn load(settings: &AwsSettings) -> Result<Self, SessionError> {
        let runtime = Runtime::new().map_err(|err| SessionError::Runtime(err.to_string()))?;
        let region = settings.region.clone();
        let endpoint = settings.endpoint.clone();
        let config = block_on_with_runtime(&runtime, async {
            let mut loader = aws_config::defaults(BehaviorVersion::latest());
            if let Some(region) = region {
                loader = loader.region(Region::new(region));
            }
            if let Some(endpoint) = endpoint {
                loader = loader.endpoint_url(endpoint);
            }
            Ok(loader.load().await)
        })
        .map_err(|err| SessionError::Runtime(err.to_string()))?;
        Ok(Self {
            config,
            runtime: Some(Arc::new(runtime)),
        })
    }

    /// Returns the shared SDK configuration.
    #[must_use]
    pub const fn config(&self) -> &SdkConfig {
        &self.config
    }

    /// Drives an SDK future to completion.
    pub(crate) fn block_on<F, T>(&self, future: F) -> Result<T, ProviderError>
    where
        F: Future<Output = Result<T, ProviderError>> + Send + 'static,
        T: Send + 'static,
    {
        let runtime = self
            .runtime
            .as_ref()
            .map(AsRef::as_ref)
            .ok_or_else(|| ProviderError::new("aws session runtime closed"))?;
        block_on_with_runtime(runtime, future)
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, reason = "Test-only assertions.")]

    use super::*;

    #[test]
    fn block_on_runs_outside_any_runtime() {
        let runtime = Runtime::new().unwrap();
        let value = block_on_with_runtime(&runtime, async { Ok(7_u32) }).unwrap();
        assert_eq!(value, 7);
    }

    #[test]
    fn block_on_from_current_thread_runtime_uses_helper_thread() {
        let outer = tokio::runtime::Builder::new_current_thread().build().unwrap();
        let runtime = Runtime::new().unwrap();
        let value = outer.block_on(async {
            block_on_with_runtime(&runtime, async { Ok::<_, ProviderError>("done") })
        });
        assert_eq!(value.unwrap(), "done");
        std::thread::spawn(move || drop(runtime)).join().unwrap();
    }

    #[test]
    fn errors_propagate_unchanged() {
        let runtime = Runtime::new().unwrap();
        let err = block_on_with_runtime::<_, ()>(&runtime, async {
            Err(ProviderError::with_code("Throttling", "slow down"))
        })
        .unwrap_err();
        assert_eq!(err.code.as_deref(), Some("Throttling"));
    }
}
