// crates/fixtrail-store-sqlite/src/lib.rs
// ============================================================================
// Module: SQLite Sample Store
// Description: Durable SampleStore backend using SQLite WAL.
// Purpose: Keep buffered fixes across process restarts and crashes.
// Dependencies: fixtrail-core, rusqlite
// ============================================================================

//! ## Overview
//! This crate provides a SQLite-backed [`SampleStore`] implementation. Every
//! append is its own committed transaction with `synchronous = full`, so a
//! fix that was acknowledged to the sampler survives a crash; a write that
//! was interrupted before commit leaves no trace.
//!
//! [`SampleStore`]: fixtrail_core::SampleStore

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod store;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use store::SqliteSampleStore;
pub use store::SqliteStoreConfig;
pub use store::SqliteStoreError;
pub use store::SqliteStoreMode;
pub use store::SqliteSyncMode;
