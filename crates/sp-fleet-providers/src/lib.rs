// crates/sp-fleet-providers/src/lib.rs
// ============================================================================
// Module: SP Fleet Providers
// Description: AWS-backed compute and DNS providers plus the system resolver.
// Purpose: Bind the core interfaces to EC2, Route53, and live resolution.
// Dependencies: aws-config, aws-sdk-ec2, aws-sdk-route53, sp-fleet-core, tokio
// ============================================================================

//! ## Overview
//! Providers expose the blocking core interfaces over the async AWS SDK. One
//! [`AwsSession`] owns a Tokio runtime and the shared SDK configuration; the
//! EC2 and Route53 providers borrow both from it.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod ec2;
pub mod resolver;
pub mod route53;
pub mod session;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use ec2::Ec2Compute;
pub use resolver::SystemResolver;
pub use route53::Route53Zone;
pub use session::AwsSession;
pub use session::AwsSettings;
pub use session::SessionError;
