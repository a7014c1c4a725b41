// crates/sp-fleet-providers/src/resolver.rs
// ============================================================================
// Module: System Resolver
// Description: AddressResolver backed by the host's resolver configuration.
// Purpose: Observe the same answers the end-to-end tests will observe.
// Dependencies: sp-fleet-core, std::net
// ============================================================================

//! ## Overview
//! Lookups go through the platform resolver (`getaddrinfo`), so cached answers
//! in the host's recursive resolvers are visible exactly as the tests will see
//! them. Only the first IPv4 answer is reported.

use std::net::IpAddr;
use std::net::Ipv4Addr;
use std::net::ToSocketAddrs;

use sp_fleet_core::AddressResolver;
use sp_fleet_core::ResolveError;

/// Resolver using the host's name resolution.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemResolver;

impl AddressResolver for SystemResolver {
    fn resolve_ipv4(&self, domain: &str) -> Result<Option<Ipv4Addr>, ResolveError> {
        let host = domain.trim_end_matches('.');
        let addrs = (host, 0_u16).to_socket_addrs().map_err(|err| ResolveError {
            domain: domain.to_string(),
            message: err.to_string(),
        })?;
        Ok(addrs.map(|addr| addr.ip()).find_map(|ip| match ip {
            IpAddr::V4(v4) => Some(v4),
            IpAddr::V6(_) => None,
        }))
    }
}
