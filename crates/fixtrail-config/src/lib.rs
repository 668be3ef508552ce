// crates/fixtrail-config/src/lib.rs
// ============================================================================
// Module: fixtrail Config Library
// Description: Canonical config model and validation.
// Purpose: Single source of truth for fixtrail.toml semantics.
// Dependencies: fixtrail-core, fixtrail-store-sqlite, serde, toml
// ============================================================================

//! ## Overview
//! `fixtrail-config` defines the configuration model for the fixtrail agent:
//! collector endpoint and device identity, sample store location, sampling
//! cadence, upload scheduling, and event output. Loading is strict and fails
//! closed on any invalid value.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod config;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use config::*;
