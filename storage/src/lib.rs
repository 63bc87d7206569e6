// Copyright (C) 2023, Ava Labs, Inc. All rights reserved.
// See the file LICENSE.md for licensing terms.
#![warn(missing_debug_implementations, rust_2018_idioms, missing_docs)]
#![forbid(unsafe_code)]

//! # imt-storage: ordered byte-keyed persistence with an atomic write batch
//!
//! The tree engine consumes its storage through the [`OrderedStore`]
//! capability: point reads, predecessor reads, buffered writes, and an
//! atomic commit of everything buffered since the last commit.
//!
//! Reads always consult the pending batch before the base store, so a caller
//! can run a whole multi-write operation inside
//! [`OrderedStore::exec_atomic`] and observe its own in-flight writes.
//!
//! Two implementations are provided: [`MemStore`] keeps everything in memory
//! and backs the test suite; [`FileBacked`] persists through sled.

mod batch;
pub mod filebacked;
pub mod memory;

pub use filebacked::FileBacked;
pub use memory::MemStore;

use std::fmt::Debug;
use thiserror::Error;

/// Errors surfaced by a store implementation.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StoreError {
    /// An I/O failure in the backing medium.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A failure reported by the sled backend.
    #[error("backend error: {0}")]
    Backend(#[from] sled::Error),
}

/// Ordered byte-keyed storage with an atomic write batch.
///
/// Keys are compared lexicographically. [`OrderedStore::set`] buffers into a
/// pending batch; [`OrderedStore::get`] and [`OrderedStore::get_lt`] read
/// through that batch before the base store, and [`OrderedStore::commit`]
/// applies the batch atomically.
pub trait OrderedStore: Debug {
    /// The value stored under `key`, or `None` if the key is absent.
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, StoreError>;

    /// The greatest stored key strictly less than `key`, with its value, or
    /// `None` when no such key exists.
    fn get_lt(&self, key: &[u8]) -> Result<Option<(Box<[u8]>, Vec<u8>)>, StoreError>;

    /// Buffer a write of `value` under `key`. Overwrites are idempotent.
    fn set(&mut self, key: &[u8], value: &[u8]) -> Result<(), StoreError>;

    /// Atomically apply every write buffered since the last commit.
    fn commit(&mut self) -> Result<(), StoreError>;

    /// Drop every write buffered since the last commit.
    fn discard(&mut self);

    /// Run `op`, committing the batch if it succeeds and discarding it if it
    /// fails. Reads inside `op` observe the writes it has already buffered.
    fn exec_atomic<T, E, F>(&mut self, op: F) -> Result<T, E>
    where
        Self: Sized,
        E: From<StoreError>,
        F: FnOnce(&mut Self) -> Result<T, E>,
    {
        match op(self) {
            Ok(value) => {
                self.commit()?;
                Ok(value)
            }
            Err(e) => {
                self.discard();
                Err(e)
            }
        }
    }
}
