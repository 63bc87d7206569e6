// Copyright (C) 2023, Ava Labs, Inc. All rights reserved.
// See the file LICENSE.md for licensing terms.

use std::error::Error;
use std::time::Instant;

use imt::storage::FileBacked;
use imt::{Sha256Hasher, Tree};
use num_bigint::BigUint;
use rand::Rng;

/// cargo run --release --example insert
fn main() -> Result<(), Box<dyn Error>> {
    const TOTAL_INSERTS: u32 = 1_000;

    env_logger::init();

    let dir = tempfile::tempdir()?;
    let store = FileBacked::new(dir.path())?;
    let mut tree = Tree::new(store, 32, 16, Sha256Hasher)?;

    let mut rng = rand::rng();
    let start = Instant::now();
    for _ in 0..TOTAL_INSERTS {
        let key = BigUint::from(rng.random_range(1..u64::MAX));
        let value = BigUint::from(rng.random::<u64>());

        let proof = tree.set(&key, &value)?;
        assert!(proof.is_valid(&tree)?);
    }
    let duration = start.elapsed();

    println!(
        "Inserted {TOTAL_INSERTS} keys in {duration:?}; size {}, root {:064x}",
        tree.size()?,
        tree.root()?
    );
    Ok(())
}
