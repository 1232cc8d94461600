//! Seeded key hashing.
//!
//! Every container draws one 64-bit seed from the operating system's
//! entropy source at construction and keys all hashing with it, so slot
//! placement cannot be forced by crafted keys. The seed never changes for
//! the lifetime of the container; splits and rehashes reuse it verbatim.
//!
//! The mixer folds written words into an accumulator and finishes with an
//! xxh3-style avalanche cascade, giving roughly 50% flip probability on
//! every output bit for a one-bit input change. The probing layers above
//! carve the output into independent bit ranges and rely on that
//! diffusion; nothing here claims cryptographic strength.

use core::hash::Hash;
use core::hash::Hasher;

use rand::TryRngCore;
use rand::rngs::OsRng;

// xxh3 constants: secret[8..16] ^ secret[16..24], and prime_MX2.
const K0: u64 = 0x1cad_21f7_2c81_017c ^ 0xdb97_9083_e96d_d4de;
const K1: u64 = 0x9fb2_1c65_1e98_df25;

/// Hash seed fixed at container construction.
#[derive(Clone, Copy)]
pub(crate) struct Seed(u64);

impl Seed {
    /// Draws a fresh seed from the OS entropy source.
    pub(crate) fn random() -> Seed {
        Seed(OsRng.try_next_u64().expect("failed to draw a hash seed from the OS"))
    }

    /// Hashes `key` under this seed.
    #[inline]
    pub(crate) fn hash<K: Hash + ?Sized>(self, key: &K) -> u64 {
        let mut mixer = MixHasher::new(self.0);
        key.hash(&mut mixer);
        mixer.finish()
    }
}

/// Word-folding hasher finished by an avalanche cascade.
///
/// A lone `write_u64` reproduces the scalar xxh3 shape exactly: the
/// accumulator ends up holding the word rotated by 32 bits and the
/// cascade adds the total written length.
struct MixHasher {
    acc: u64,
    len: u64,
    seed: u64,
}

impl MixHasher {
    #[inline(always)]
    fn new(seed: u64) -> Self {
        MixHasher { acc: 0, len: 0, seed }
    }

    #[inline(always)]
    fn fold(&mut self, word: u64, bytes: u64) {
        self.acc = self.acc.wrapping_mul(K1) ^ word.rotate_left(32);
        self.len += bytes;
    }
}

impl Hasher for MixHasher {
    #[inline]
    fn write(&mut self, bytes: &[u8]) {
        let mut chunks = bytes.chunks_exact(8);
        for chunk in &mut chunks {
            let word = u64::from_le_bytes(chunk.try_into().expect("8-byte chunk"));
            self.fold(word, 8);
        }
        let tail = chunks.remainder();
        if !tail.is_empty() {
            // Zero-padded tail; the length folded into the cascade keeps
            // "ab" and "ab\0" distinct.
            let mut word = [0u8; 8];
            word[..tail.len()].copy_from_slice(tail);
            self.fold(u64::from_le_bytes(word), tail.len() as u64);
        }
    }

    #[inline(always)]
    fn write_u8(&mut self, v: u8) {
        self.fold(u64::from(v), 1);
    }

    #[inline(always)]
    fn write_u16(&mut self, v: u16) {
        self.fold(u64::from(v), 2);
    }

    #[inline(always)]
    fn write_u32(&mut self, v: u32) {
        // Doubling the word keeps it invariant under the fold's rotation,
        // matching the scalar 32-bit shape.
        self.fold(u64::from(v) | u64::from(v) << 32, 4);
    }

    #[inline(always)]
    fn write_u64(&mut self, v: u64) {
        self.fold(v, 8);
    }

    #[inline(always)]
    fn write_u128(&mut self, v: u128) {
        self.fold(v as u64, 8);
        self.fold((v >> 64) as u64, 8);
    }

    #[inline(always)]
    fn write_usize(&mut self, v: usize) {
        self.fold(v as u64, size_of::<usize>() as u64);
    }

    #[inline]
    fn finish(&self) -> u64 {
        let mut h = K0.wrapping_sub(self.seed) ^ self.acc;
        h ^= h.rotate_left(49) ^ h.rotate_left(24);
        h = h.wrapping_mul(K1);
        h ^= (h >> 35).wrapping_add(self.len);
        h = h.wrapping_mul(K1);
        h ^= h >> 28;
        h
    }
}
