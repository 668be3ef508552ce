// crates/fixtrail-core/src/runtime/store.rs
// ============================================================================
// Module: fixtrail In-Memory Store
// Description: Simple in-memory sample store for tests and examples.
// Purpose: Provide a deterministic store implementation without external deps.
// Dependencies: crate::model, crate::interfaces
// ============================================================================

//! ## Overview
//! This module provides a simple in-memory implementation of [`SampleStore`]
//! for tests and local demos. It is not durable and not intended for
//! production use.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;
use std::sync::Mutex;

use crate::interfaces::SampleStore;
use crate::interfaces::StoreError;
use crate::model::Fix;
use crate::model::FixId;
use crate::model::StoredFix;
use crate::model::sort_newest_first;

// ============================================================================
// SECTION: In-Memory Store
// ============================================================================

/// Mutable state behind the store mutex.
#[derive(Debug, Default)]
struct Inner {
    /// Last assigned identifier.
    last_id: i64,
    /// Stored fixes in insertion order.
    fixes: Vec<StoredFix>,
}

/// In-memory sample store for tests and examples.
#[derive(Debug, Default, Clone)]
pub struct InMemorySampleStore {
    /// Store state protected by a mutex.
    inner: Arc<Mutex<Inner>>,
}

impl InMemorySampleStore {
    /// Creates an empty in-memory store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Locks the store state.
    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Inner>, StoreError> {
        self.inner.lock().map_err(|_| StoreError::Store("sample store mutex poisoned".to_string()))
    }
}

impl SampleStore for InMemorySampleStore {
    fn append(&self, fix: &Fix) -> Result<FixId, StoreError> {
        fix.validate().map_err(|err| StoreError::Invalid(err.to_string()))?;
        let mut guard = self.lock()?;
        guard.last_id = guard
            .last_id
            .checked_add(1)
            .ok_or_else(|| StoreError::Store("fix id overflow".to_string()))?;
        let id = FixId::new(guard.last_id);
        guard.fixes.push(StoredFix {
            id,
            fix: *fix,
        });
        drop(guard);
        Ok(id)
    }

    fn read_all(&self) -> Result<Vec<StoredFix>, StoreError> {
        let mut fixes = self.lock()?.fixes.clone();
        sort_newest_first(&mut fixes);
        Ok(fixes)
    }

    fn count(&self) -> Result<u64, StoreError> {
        let len = self.lock()?.fixes.len();
        u64::try_from(len).map_err(|_| StoreError::Store("fix count overflow".to_string()))
    }

    fn clear(&self) -> Result<u64, StoreError> {
        let removed = std::mem::take(&mut self.lock()?.fixes);
        u64::try_from(removed.len()).map_err(|_| StoreError::Store("fix count overflow".to_string()))
    }

    fn clear_through(&self, last: FixId) -> Result<u64, StoreError> {
        let mut guard = self.lock()?;
        let before = guard.fixes.len();
        guard.fixes.retain(|stored| stored.id > last);
        let removed = before - guard.fixes.len();
        drop(guard);
        u64::try_from(removed).map_err(|_| StoreError::Store("fix count overflow".to_string()))
    }
}
