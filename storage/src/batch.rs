// Copyright (C) 2023, Ava Labs, Inc. All rights reserved.
// See the file LICENSE.md for licensing terms.

use std::collections::BTreeMap;
use std::ops::Bound;

/// The write set buffered between commits, layered over a base store.
///
/// Reads that miss here fall through to the base; the predecessor scan must
/// be merged with the base's own scan by the caller, the pending side winning
/// ties.
#[derive(Debug, Default)]
pub(crate) struct PendingBatch(BTreeMap<Box<[u8]>, Vec<u8>>);

impl PendingBatch {
    pub(crate) fn get(&self, key: &[u8]) -> Option<&Vec<u8>> {
        self.0.get(key)
    }

    /// The greatest buffered key strictly less than `key`.
    pub(crate) fn predecessor(&self, key: &[u8]) -> Option<(&[u8], &Vec<u8>)> {
        self.0
            .range::<[u8], _>((Bound::Unbounded, Bound::Excluded(key)))
            .next_back()
            .map(|(k, v)| (k.as_ref(), v))
    }

    pub(crate) fn insert(&mut self, key: &[u8], value: &[u8]) {
        self.0.insert(key.into(), value.to_vec());
    }

    /// Take the whole write set, leaving the batch empty.
    pub(crate) fn take(&mut self) -> BTreeMap<Box<[u8]>, Vec<u8>> {
        std::mem::take(&mut self.0)
    }

    pub(crate) fn clear(&mut self) {
        self.0.clear();
    }
}
