// Copyright (C) 2023, Ava Labs, Inc. All rights reserved.
// See the file LICENSE.md for licensing terms.

//! An in-memory [`OrderedStore`], primarily for testing.

use std::collections::BTreeMap;
use std::ops::Bound;

use crate::batch::PendingBatch;
use crate::{OrderedStore, StoreError};

/// A `BTreeMap` base plus the pending batch overlay. Never fails.
#[derive(Debug, Default)]
pub struct MemStore {
    base: BTreeMap<Box<[u8]>, Vec<u8>>,
    pending: PendingBatch,
}

impl MemStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl OrderedStore for MemStore {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, StoreError> {
        if let Some(value) = self.pending.get(key) {
            return Ok(Some(value.clone()));
        }
        Ok(self.base.get(key).cloned())
    }

    fn get_lt(&self, key: &[u8]) -> Result<Option<(Box<[u8]>, Vec<u8>)>, StoreError> {
        let pending = self.pending.predecessor(key);
        let base = self
            .base
            .range::<[u8], _>((Bound::Unbounded, Bound::Excluded(key)))
            .next_back();

        Ok(match (pending, base) {
            (None, None) => None,
            (Some((k, v)), None) => Some((k.into(), v.clone())),
            (None, Some((k, v))) => Some((k.clone(), v.clone())),
            (Some((pk, pv)), Some((bk, bv))) => {
                // The pending side shadows the base on equal keys.
                if pk >= bk.as_ref() {
                    Some((pk.into(), pv.clone()))
                } else {
                    Some((bk.clone(), bv.clone()))
                }
            }
        })
    }

    fn set(&mut self, key: &[u8], value: &[u8]) -> Result<(), StoreError> {
        self.pending.insert(key, value);
        Ok(())
    }

    fn commit(&mut self) -> Result<(), StoreError> {
        self.base.extend(self.pending.take());
        Ok(())
    }

    fn discard(&mut self) {
        self.pending.clear();
    }
}
