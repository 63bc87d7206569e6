// Copyright (C) 2023, Ava Labs, Inc. All rights reserved.
// See the file LICENSE.md for licensing terms.

//! An [`OrderedStore`] persisted through sled.
//!
//! Writes are buffered in the pending overlay and applied in one
//! [`sled::Batch`] at commit time, so a crash between commits never exposes a
//! partially applied batch. Predecessor reads merge the overlay's scan with
//! sled's, the overlay winning ties.

use std::path::Path;

use crate::batch::PendingBatch;
use crate::{OrderedStore, StoreError};

/// A sled tree plus the pending batch overlay.
#[derive(Debug)]
pub struct FileBacked {
    tree: sled::Db,
    pending: PendingBatch,
}

impl FileBacked {
    /// Open (or create) a database at `path`.
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        Ok(Self {
            tree: sled::open(path)?,
            pending: PendingBatch::default(),
        })
    }

    /// Flush dirty buffers to disk. Also happens on drop.
    pub fn flush(&self) -> Result<(), StoreError> {
        self.tree.flush()?;
        Ok(())
    }
}

impl OrderedStore for FileBacked {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, StoreError> {
        if let Some(value) = self.pending.get(key) {
            return Ok(Some(value.clone()));
        }
        Ok(self.tree.get(key)?.map(|v| v.to_vec()))
    }

    fn get_lt(&self, key: &[u8]) -> Result<Option<(Box<[u8]>, Vec<u8>)>, StoreError> {
        let pending = self.pending.predecessor(key);
        let base = self.tree.get_lt(key)?;

        Ok(match (pending, base) {
            (None, None) => None,
            (Some((k, v)), None) => Some((k.into(), v.clone())),
            (None, Some((k, v))) => Some((k.as_ref().into(), v.to_vec())),
            (Some((pk, pv)), Some((bk, bv))) => {
                // The pending side shadows the base on equal keys.
                if pk >= bk.as_ref() {
                    Some((pk.into(), pv.clone()))
                } else {
                    Some((bk.as_ref().into(), bv.to_vec()))
                }
            }
        })
    }

    fn set(&mut self, key: &[u8], value: &[u8]) -> Result<(), StoreError> {
        self.pending.insert(key, value);
        Ok(())
    }

    fn commit(&mut self) -> Result<(), StoreError> {
        let mut batch = sled::Batch::default();
        for (key, value) in self.pending.take() {
            batch.insert(key.into_vec(), value);
        }
        self.tree.apply_batch(batch)?;
        Ok(())
    }

    fn discard(&mut self) {
        self.pending.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn committed_writes_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();

        let mut store = FileBacked::new(dir.path()).unwrap();
        store.set(b"k", b"v").unwrap();
        store.commit().unwrap();
        store.flush().unwrap();
        drop(store);

        let store = FileBacked::new(dir.path()).unwrap();
        assert_eq!(store.get(b"k").unwrap().as_deref(), Some(&b"v"[..]));
    }

    #[test]
    fn discarded_writes_are_not_applied() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = FileBacked::new(dir.path()).unwrap();

        store.set(b"k", b"v").unwrap();
        store.discard();
        store.commit().unwrap();

        assert_eq!(store.get(b"k").unwrap(), None);
    }

    #[test]
    fn get_lt_merges_overlay_and_disk() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = FileBacked::new(dir.path()).unwrap();

        store.set(b"a", b"1").unwrap();
        store.commit().unwrap();
        store.set(b"ab", b"2").unwrap();

        let (key, value) = store.get_lt(b"b").unwrap().unwrap();
        assert_eq!((key.as_ref(), value.as_slice()), (&b"ab"[..], &b"2"[..]));

        let (key, value) = store.get_lt(b"ab").unwrap().unwrap();
        assert_eq!((key.as_ref(), value.as_slice()), (&b"a"[..], &b"1"[..]));
    }
}
