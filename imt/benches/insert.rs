// Copyright (C) 2023, Ava Labs, Inc. All rights reserved.
// See the file LICENSE.md for licensing terms.

use criterion::{criterion_group, criterion_main, BatchSize, Criterion};
use imt::storage::MemStore;
use imt::{Sha256Hasher, Tree};
use num_bigint::BigUint;

const KEYS_PER_RUN: u64 = 64;

fn insert(c: &mut Criterion) {
    let mut group = c.benchmark_group("insert");
    for leaf_level in [8u8, 16, 32] {
        group.bench_function(format!("level_{leaf_level}"), |b| {
            b.iter_batched(
                || Tree::new(MemStore::new(), 32, leaf_level, Sha256Hasher).unwrap(),
                |mut tree| {
                    for key in 1..=KEYS_PER_RUN {
                        tree.set(&BigUint::from(key), &BigUint::from(key)).unwrap();
                    }
                    tree
                },
                BatchSize::SmallInput,
            );
        });
    }
    group.finish();
}

criterion_group!(benches, insert);
criterion_main!(benches);
