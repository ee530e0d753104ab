//! Probabilistic membership filter over InputHashes
//!
//! The registry builds the filter and the client only queries it, so the bit
//! layout is a shared contract:
//!
//! - `h1 = u64_le(hash[0..8])`, `h2 = u64_le(hash[8..16]) | 1`
//! - probe `i` sets bit `(h1 + i * h2) mod num_bits` (wrapping arithmetic)
//! - bits are stored LSB-first within each byte
//!
//! `contains` never returns `false` for an inserted hash.

pub mod snapshot;

pub use snapshot::{BloomManager, BloomSnapshot};

use crate::error::BloomLoadError;
use crate::hash::InputHash;

/// Immutable-by-convention bloom filter
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BloomFilter {
    num_bits: u64,
    num_hashes: u32,
    bits: Vec<u8>,
}

impl BloomFilter {
    /// Build a filter from its raw parts, checking the bit layout
    pub fn from_parts(
        num_bits: u64,
        num_hashes: u32,
        bits: Vec<u8>,
    ) -> Result<Self, BloomLoadError> {
        if num_bits == 0 {
            return Err(BloomLoadError::InvalidBits("num_bits is zero".to_string()));
        }
        if num_hashes == 0 {
            return Err(BloomLoadError::InvalidBits("num_hashes is zero".to_string()));
        }

        let expected_len = byte_len(num_bits);
        if bits.len() as u64 != expected_len {
            return Err(BloomLoadError::InvalidBits(format!(
                "expected {} bytes for {} bits, found {}",
                expected_len,
                num_bits,
                bits.len()
            )));
        }

        // Padding bits in the last byte must be clear
        let used = (num_bits % 8) as u32;
        if used != 0 {
            let last = bits[bits.len() - 1];
            if last >> used != 0 {
                return Err(BloomLoadError::InvalidBits(
                    "padding bits past num_bits are set".to_string(),
                ));
            }
        }

        Ok(Self {
            num_bits,
            num_hashes,
            bits,
        })
    }

    /// Empty filter with explicit geometry
    pub fn empty(num_bits: u64, num_hashes: u32) -> Self {
        Self {
            num_bits: num_bits.max(1),
            num_hashes: num_hashes.max(1),
            bits: vec![0; byte_len(num_bits.max(1)) as usize],
        }
    }

    /// Empty filter sized for `capacity` items at false-positive rate `fp_rate`
    pub fn with_rate(capacity: usize, fp_rate: f64) -> Self {
        let n = capacity.max(1) as f64;
        let p = fp_rate.clamp(f64::MIN_POSITIVE, 0.5);
        let ln2 = std::f64::consts::LN_2;

        let m = (-(n * p.ln()) / (ln2 * ln2)).ceil().max(1.0);
        let k = ((m / n) * ln2).round().max(1.0);

        Self::empty(m as u64, k as u32)
    }

    pub fn num_bits(&self) -> u64 {
        self.num_bits
    }

    pub fn num_hashes(&self) -> u32 {
        self.num_hashes
    }

    pub fn bits(&self) -> &[u8] {
        &self.bits
    }

    /// Record a hash. Used by whoever builds filters, and by tests.
    pub fn insert(&mut self, hash: &InputHash) {
        for bit in self.probes(hash) {
            self.bits[(bit / 8) as usize] |= 1 << (bit % 8);
        }
    }

    /// `false` means definitely absent; `true` means possibly present
    pub fn contains(&self, hash: &InputHash) -> bool {
        self.probes(hash)
            .all(|bit| self.bits[(bit / 8) as usize] & (1 << (bit % 8)) != 0)
    }

    /// Fraction of bits set, for diagnostics
    pub fn fill_ratio(&self) -> f64 {
        let set: u64 = self.bits.iter().map(|b| b.count_ones() as u64).sum();
        set as f64 / self.num_bits as f64
    }

    fn probes(&self, hash: &InputHash) -> impl Iterator<Item = u64> {
        let bytes = hash.as_bytes();
        let h1 = u64::from_le_bytes(first_eight(&bytes[0..8]));
        let h2 = u64::from_le_bytes(first_eight(&bytes[8..16])) | 1;
        let num_bits = self.num_bits;

        (0..self.num_hashes as u64).map(move |i| h1.wrapping_add(i.wrapping_mul(h2)) % num_bits)
    }
}

fn byte_len(num_bits: u64) -> u64 {
    num_bits.div_ceil(8)
}

fn first_eight(slice: &[u8]) -> [u8; 8] {
    let mut out = [0u8; 8];
    out.copy_from_slice(&slice[..8]);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use sha2::{Digest, Sha256};

    fn hash_of(i: u32) -> InputHash {
        InputHash::from_digest(Sha256::digest(i.to_le_bytes()).into())
    }

    #[test]
    fn no_false_negatives() {
        let mut filter = BloomFilter::with_rate(1000, 0.01);
        for i in 0..1000 {
            filter.insert(&hash_of(i));
        }
        for i in 0..1000 {
            assert!(filter.contains(&hash_of(i)), "false negative for {}", i);
        }
    }

    #[test]
    fn false_positive_rate_is_bounded() {
        let mut filter = BloomFilter::with_rate(1000, 0.01);
        for i in 0..1000 {
            filter.insert(&hash_of(i));
        }
        let false_positives = (1000..11_000).filter(|i| filter.contains(&hash_of(*i))).count();
        // 1% target over 10k probes; allow generous slack
        assert!(false_positives < 300, "{} false positives", false_positives);
    }

    #[test]
    fn empty_filter_contains_nothing() {
        let filter = BloomFilter::with_rate(10, 0.01);
        assert!(!filter.contains(&hash_of(1)));
        assert_eq!(filter.fill_ratio(), 0.0);
    }

    #[test]
    fn with_rate_geometry() {
        let filter = BloomFilter::with_rate(1000, 0.01);
        // m = ceil(1000 * ln(100) / ln2^2) = 9586, k = round(9.586 * ln2) = 7
        assert_eq!(filter.num_bits(), 9586);
        assert_eq!(filter.num_hashes(), 7);
        assert_eq!(filter.bits().len(), 1199);
    }

    #[test]
    fn from_parts_rejects_bad_layouts() {
        assert!(matches!(
            BloomFilter::from_parts(0, 3, vec![]),
            Err(BloomLoadError::InvalidBits(_))
        ));
        assert!(matches!(
            BloomFilter::from_parts(16, 0, vec![0, 0]),
            Err(BloomLoadError::InvalidBits(_))
        ));
        assert!(matches!(
            BloomFilter::from_parts(16, 3, vec![0]),
            Err(BloomLoadError::InvalidBits(_))
        ));
        // 12 bits: top nibble of the second byte is padding
        assert!(matches!(
            BloomFilter::from_parts(12, 3, vec![0, 0xF0]),
            Err(BloomLoadError::InvalidBits(_))
        ));
        assert!(BloomFilter::from_parts(12, 3, vec![0xFF, 0x0F]).is_ok());
    }

    #[test]
    fn from_parts_preserves_membership() {
        let mut filter = BloomFilter::with_rate(50, 0.01);
        filter.insert(&hash_of(7));
        let rebuilt =
            BloomFilter::from_parts(filter.num_bits(), filter.num_hashes(), filter.bits().to_vec())
                .unwrap();
        assert!(rebuilt.contains(&hash_of(7)));
    }
}
