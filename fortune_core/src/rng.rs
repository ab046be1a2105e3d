use std::sync::atomic::{AtomicU64, Ordering};

use hmac::{Hmac, Mac};
use rand::{rngs::OsRng, Rng};
use sha2::{Digest, Sha256};

pub type HmacSha256 = Hmac<Sha256>;

/// Source of uniformly distributed sector indices.
///
/// Implementations must return every value in `0..n` with probability exactly
/// `1/n`. Callers guarantee `n > 0`.
pub trait RandomSource: Send + Sync {
    fn uniform_index(&self, n: usize) -> usize;
}

/// Operating-system CSPRNG. Used for every production claim.
#[derive(Debug, Default, Clone, Copy)]
pub struct OsRandom;

impl RandomSource for OsRandom {
    fn uniform_index(&self, n: usize) -> usize {
        OsRng.gen_range(0..n)
    }
}

/// Reproducible stream: HMAC-SHA256(key, "label:counter") -> u64, with
/// rejection sampling so the modulo stays unbiased.
pub struct SeededRandom {
    key: Vec<u8>,
    label: String,
    counter: AtomicU64,
}

impl SeededRandom {
    pub fn new(key: impl AsRef<[u8]>, label: impl Into<String>) -> Self {
        Self {
            key: key.as_ref().to_vec(),
            label: label.into(),
            counter: AtomicU64::new(0),
        }
    }

    /// Public fingerprint of the key, safe to log.
    pub fn key_hash_hex(&self) -> String {
        hex::encode(Sha256::digest(&self.key))
    }

    fn next_u64(&self) -> u64 {
        let nonce = self.counter.fetch_add(1, Ordering::Relaxed);
        let mut mac = HmacSha256::new_from_slice(&self.key).expect("HMAC key");
        mac.update(format!("{}:{}", self.label, nonce).as_bytes());
        let bytes = mac.finalize().into_bytes();
        let mut head = [0u8; 8];
        head.copy_from_slice(&bytes[..8]);
        u64::from_be_bytes(head)
    }
}

impl RandomSource for SeededRandom {
    fn uniform_index(&self, n: usize) -> usize {
        let n = n as u64;
        // largest multiple of n that fits; draws above it are discarded
        let zone = u64::MAX - (u64::MAX % n);
        loop {
            let v = self.next_u64();
            if v < zone {
                return (v % n) as usize;
            }
        }
    }
}

/// Picks one element of `items` through `rng`, or `None` when empty.
pub fn choose<'a, T>(rng: &dyn RandomSource, items: &'a [T]) -> Option<&'a T> {
    if items.is_empty() {
        return None;
    }
    items.get(rng.uniform_index(items.len()))
}
