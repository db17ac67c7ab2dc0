//! Keyed running checksum over arbitrary byte sequences.
//!
//! The payload is consumed as little-endian `u64` words; each word is
//! multiplied by the next output of a ChaCha8 generator seeded with the
//! checksum key and added to a wrapping accumulator. Partial words are
//! carried across [`update`](ChecksumCalculator::update) calls, so the
//! result depends only on the seed and the byte sequence, never on how
//! the sequence was chunked.
//!
//! Not cryptographically secure: it detects corruption, not tampering.

use rand_chacha::rand_core::{RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// Bytes per checksum word.
pub const WORD_SIZE: usize = 8;

/// Streaming checksum accumulator.
///
/// # Examples
///
/// ```
/// use reel_format::{checksum, ChecksumCalculator};
///
/// let mut calc = ChecksumCalculator::new(7);
/// calc.update(b"hello ");
/// calc.update(b"world");
/// assert_eq!(calc.finalize(), checksum(7, b"hello world"));
/// ```
#[derive(Clone, Debug)]
pub struct ChecksumCalculator {
    accumulator: u64,
    generator: ChaCha8Rng,
    pending: [u8; WORD_SIZE],
    pending_len: usize,
    consumed: u64,
}

impl ChecksumCalculator {
    /// Start a checksum keyed by `seed`.
    pub fn new(seed: u64) -> Self {
        Self {
            accumulator: 0,
            generator: ChaCha8Rng::seed_from_u64(seed),
            pending: [0; WORD_SIZE],
            pending_len: 0,
            consumed: 0,
        }
    }

    /// Feed the next chunk of the byte sequence.
    pub fn update(&mut self, mut bytes: &[u8]) {
        self.consumed += bytes.len() as u64;

        // Complete a word left over from the previous call first.
        if self.pending_len > 0 {
            let take = (WORD_SIZE - self.pending_len).min(bytes.len());
            self.pending[self.pending_len..self.pending_len + take]
                .copy_from_slice(&bytes[..take]);
            self.pending_len += take;
            bytes = &bytes[take..];
            if self.pending_len < WORD_SIZE {
                return;
            }
            self.absorb(u64::from_le_bytes(self.pending));
            self.pending_len = 0;
        }

        let mut words = bytes.chunks_exact(WORD_SIZE);
        for chunk in &mut words {
            let mut word = [0u8; WORD_SIZE];
            word.copy_from_slice(chunk);
            self.absorb(u64::from_le_bytes(word));
        }

        let tail = words.remainder();
        self.pending[..tail.len()].copy_from_slice(tail);
        self.pending_len = tail.len();
    }

    /// Flush a trailing partial word (zero-padded) and return the checksum.
    pub fn finalize(mut self) -> u64 {
        if self.pending_len > 0 {
            self.pending[self.pending_len..].fill(0);
            self.absorb(u64::from_le_bytes(self.pending));
        }
        self.accumulator
    }

    /// Total bytes fed so far.
    pub fn bytes_consumed(&self) -> u64 {
        self.consumed
    }

    fn absorb(&mut self, word: u64) {
        // Odd weights are invertible mod 2^64, so any single-word change
        // always moves the sum.
        let weight = self.generator.next_u64() | 1;
        self.accumulator = self.accumulator.wrapping_add(word.wrapping_mul(weight));
    }
}

/// One-shot checksum of `bytes` keyed by `seed`.
pub fn checksum(seed: u64, bytes: &[u8]) -> u64 {
    let mut calc = ChecksumCalculator::new(seed);
    calc.update(bytes);
    calc.finalize()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn chunked(seed: u64, bytes: &[u8], cuts: &[usize]) -> u64 {
        let mut calc = ChecksumCalculator::new(seed);
        let mut rest = bytes;
        for &cut in cuts {
            let at = cut.min(rest.len());
            let (head, tail) = rest.split_at(at);
            calc.update(head);
            rest = tail;
        }
        calc.update(rest);
        calc.finalize()
    }

    proptest! {
        #[test]
        fn chunking_does_not_change_checksum(
            seed in any::<u64>(),
            bytes in prop::collection::vec(any::<u8>(), 0..256),
            cuts in prop::collection::vec(0usize..24, 0..16),
        ) {
            prop_assert_eq!(checksum(seed, &bytes), chunked(seed, &bytes, &cuts));
        }

        #[test]
        fn single_byte_flip_changes_checksum(
            seed in any::<u64>(),
            bytes in prop::collection::vec(any::<u8>(), 1..256),
            index in any::<prop::sample::Index>(),
            flip in 1u8..=255,
        ) {
            let mut corrupted = bytes.clone();
            let i = index.index(corrupted.len());
            corrupted[i] ^= flip;
            prop_assert_ne!(checksum(seed, &bytes), checksum(seed, &corrupted));
        }
    }

    #[test]
    fn byte_at_a_time_matches_one_shot() {
        let data: Vec<u8> = (0..=200u8).collect();
        let mut calc = ChecksumCalculator::new(99);
        for b in &data {
            calc.update(std::slice::from_ref(b));
        }
        assert_eq!(calc.bytes_consumed(), data.len() as u64);
        assert_eq!(calc.finalize(), checksum(99, &data));
    }

    #[test]
    fn seed_keys_the_checksum() {
        let data = b"frame records";
        assert_ne!(checksum(1, data), checksum(2, data));
    }

    #[test]
    fn empty_input_is_zero() {
        assert_eq!(checksum(1234, &[]), 0);
    }

    #[test]
    fn word_order_matters() {
        let a = [1u8, 0, 0, 0, 0, 0, 0, 0, 2, 0, 0, 0, 0, 0, 0, 0];
        let b = [2u8, 0, 0, 0, 0, 0, 0, 0, 1, 0, 0, 0, 0, 0, 0, 0];
        assert_ne!(checksum(5, &a), checksum(5, &b));
    }
}
