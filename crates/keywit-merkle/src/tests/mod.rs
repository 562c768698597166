//! Tests for the Merkle map crate.


use keywit_types::Hash;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::map::Map;

/// Deterministic pseudorandom label stream.
fn labels(seed: u64, n: usize) -> Vec<Hash> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..n).map(|_| rng.random::<[u8; 32]>()).collect()
}

/// Value derived from a label so every entry is distinct.
fn val_for(label: &Hash) -> Vec<u8> {
    let mut v = b"val-".to_vec();
    v.extend_from_slice(&label[..4]);
    v
}

/// Map holding `labels` in the given order.
fn map_with(labels: &[Hash]) -> Map {
    let mut map = Map::new();
    for l in labels {
        map.put(l, val_for(l)).unwrap();
    }
    map
}

/// Label with only the given bit positions set (MSB-first).
fn label_with_bits(bits: &[usize]) -> Hash {
    let mut l = [0u8; 32];
    for &b in bits {
        l[b / 8] |= 0x80 >> (b % 8);
    }
    l
}
