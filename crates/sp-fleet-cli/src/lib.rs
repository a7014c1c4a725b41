// crates/sp-fleet-cli/src/lib.rs
// ============================================================================
// Module: SP Fleet CLI Library
// Description: Shared helpers for the sp-fleet command-line interface.
// Purpose: Provide the message catalog to the CLI binary and tests.
// Dependencies: Standard library.
// ============================================================================

//! ## Overview
//! This library houses the CLI message catalog. The binary entry point
//! (`src/main.rs`) routes every user-facing string through [`t!`](crate::t) so output
//! stays consistent across commands.

// ============================================================================
// SECTION: Modules
// ============================================================================

/// Message catalog and formatting helpers.
pub mod messages;
