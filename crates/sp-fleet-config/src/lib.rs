// crates/sp-fleet-config/src/lib.rs
// ============================================================================
// Module: SP Fleet Config Library
// Description: Profile-based config model, validation, and examples.
// Purpose: Single source of truth for sp-fleet.toml semantics.
// Dependencies: sp-fleet-core, serde, toml
// ============================================================================

//! ## Overview
//! `sp-fleet-config` loads `sp-fleet.toml`, selects a named profile, and
//! converts it into the core runtime types. Validation fails closed: a
//! profile that would produce an unusable fleet is rejected at load time.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod config;
pub mod examples;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use config::*;
pub use examples::config_toml_example;
