//! Hashing helpers for tests: keys with a chosen hash and a hasher that passes it through.

use std::hash::{BuildHasher, Hash, Hasher};

/// A key whose hash is fixed up front, to force collisions deliberately. Equality only looks at
/// `value`.
#[derive(Debug, Clone)]
pub struct ManualHash<T: Eq> {
    hash: u64,
    value: T,
}

impl<T: Eq> ManualHash<T> {
    pub const fn new(hash: u64, value: T) -> ManualHash<T> {
        ManualHash {
            hash,
            value,
        }
    }

    pub fn value(self) -> T {
        self.value
    }
}

impl<T: Eq> Hash for ManualHash<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.hash.hash(state);
    }
}

impl<T: Eq> PartialEq for ManualHash<T> {
    fn eq(&self, other: &Self) -> bool {
        self.value == other.value
    }
}

impl<T: Eq> Eq for ManualHash<T> {}

/// Folds the written bytes into a single word, so that a `u64` written once hashes to itself.
#[derive(Debug)]
pub struct BadHasher {
    state: u64,
}

impl Hasher for BadHasher {
    fn finish(&self) -> u64 {
        self.state
    }

    fn write(&mut self, bytes: &[u8]) {
        for (offset, byte) in bytes.iter().enumerate() {
            self.state ^= (*byte as u64) << ((offset % 8) * 8);
        }
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct BadHasherBuilder;

impl BuildHasher for BadHasherBuilder {
    type Hasher = BadHasher;

    fn build_hasher(&self) -> Self::Hasher {
        BadHasher {
            state: 0
        }
    }
}
