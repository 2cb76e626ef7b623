// The integer hash in this file was ported from minimap2 by Heng Li.

// minimap2 MIT License
//
// Copyright (c) 2018-     Dana-Farber Cancer Institute
//               2017-2018 Broad Institute, Inc.
//
// Permission is hereby granted, free of charge, to any person obtaining
// a copy of this software and associated documentation files (the
// "Software"), to deal in the Software without restriction, including
// without limitation the rights to use, copy, modify, merge, publish,
// distribute, sublicense, and/or sell copies of the Software, and to
// permit persons to whom the Software is furnished to do so, subject to
// the following conditions:
//
// The above copyright notice and this permission notice shall be
// included in all copies or substantial portions of the Software.
//
// THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND,
// EXPRESS OR IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF
// MERCHANTABILITY, FITNESS FOR A PARTICULAR PURPOSE AND
// NONINFRINGEMENT. IN NO EVENT SHALL THE AUTHORS OR COPYRIGHT HOLDERS
// BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER LIABILITY, WHETHER IN AN
// ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING FROM, OUT OF OR IN
// CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN THE
// SOFTWARE.

//! Hashing of canonical k-mer encodings into the bit arrays of a presence table.
//!
//! Each table is addressed by its own `(seed, modulus)` pair. The seed is mixed into
//! the k-mer before Thomas Wang's hash so every table sees an independent hash function.

pub type ItemHash = u64;

/// Thomas Wang's integer hash function.
// Ported from minimap2 and following Rust implementation by Anicet Ebou.
// https://gist.github.com/lh3/974ced188be2f90422cc#file-inthash-c
// https://aebou.rbind.io/post/a-rust-glimpse-at-thomas-wang-integer-hash-function
// Further reading: https://gist.github.com/badboy/6267743
#[inline]
pub fn tw_hash64(kmer: ItemHash) -> ItemHash {
    let mut hash = kmer;

    hash = (!hash).wrapping_add(hash << 21); // key = (key << 21) - key - 1
    hash = hash ^ (hash >> 24);

    hash = hash.wrapping_add(hash << 3).wrapping_add(hash << 8); // key * 265
    hash = hash ^ (hash >> 14);

    hash = hash.wrapping_add(hash << 2).wrapping_add(hash << 4); // key * 21
    hash = hash ^ (hash >> 28);

    hash = hash.wrapping_add(hash << 31);

    hash
}

/// Seed of the hash function used by table `table_idx`.
///
/// Seeds are the SplitMix64 sequence, so they are distinct per table and
/// reproducible without being stored alongside the table.
pub fn table_seed(table_idx: usize) -> u64 {
    let mut z = (table_idx as u64 + 1).wrapping_mul(0x9E37_79B9_7F4A_7C15);
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

/// One hash function per table.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TableHash {
    pub seed: u64,
    pub modulus: u64,
}

impl TableHash {
    pub fn new(table_idx: usize, modulus: u64) -> Self {
        TableHash {
            seed: table_seed(table_idx),
            modulus,
        }
    }

    /// Bit position of `kmer` within this table.
    #[inline]
    pub fn bucket(&self, kmer: u64) -> u64 {
        tw_hash64(kmer ^ self.seed) % self.modulus
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Inverse of Thomas Wang's integer hash function.
    // https://aebou.rbind.io/post/a-rust-glimpse-at-thomas-wang-integer-hash-function
    fn tw_hash64i(hashed_key: u64) -> u64 {
        let mut key = hashed_key;

        // Invert h_key = h_key.wrapping_add(h_key << 31)
        let mut tmp: u64 = key.wrapping_sub(key << 31);
        key = key.wrapping_sub(tmp << 31);

        // Invert h_key = h_key ^ h_key >> 28;
        tmp = key ^ key >> 28;
        key ^= tmp >> 28;

        // Invert h_key = h_key.wrapping_add(h_key << 2).wrapping_add(h_key << 4)
        key = key.wrapping_mul(14933078535860113213u64);

        // Invert h_key = h_key ^ h_key >> 14;
        tmp = key ^ key >> 14;
        tmp = key ^ tmp >> 14;
        tmp = key ^ tmp >> 14;
        key ^= tmp >> 14;

        // Invert h_key = h_key.wrapping_add(h_key << 3).wrapping_add(h_key << 8)
        key = key.wrapping_mul(15244667743933553977u64);

        // Invert h_key = h_key ^ h_key >> 24
        tmp = key ^ key >> 24;
        key ^= tmp >> 24;

        // Invert h_key = (!h_key).wrapping_add(h_key << 21)
        tmp = !key;
        tmp = !(key.wrapping_sub(tmp << 21));
        tmp = !(key.wrapping_sub(tmp << 21));
        key = !(key.wrapping_sub(tmp << 21));

        key
    }

    #[test]
    fn test_hashing() {
        assert_eq!(tw_hash64i(tw_hash64(0)), 0);
        assert_eq!(tw_hash64i(tw_hash64(u64::MAX)), u64::MAX);
        assert_eq!(tw_hash64i(tw_hash64(27)), 27);
        assert_eq!(tw_hash64i(tw_hash64(108)), 108);
        assert_eq!(tw_hash64i(tw_hash64(177)), 177);
    }

    #[test]
    fn test_known_hashes() {
        // ACGT = 27, CGTA = 108, GTAC = 177
        assert_eq!(tw_hash64(27), 12564563040126408309);
        assert_eq!(tw_hash64(108), 13364770925836396135);
        assert_eq!(tw_hash64(177), 8958356766268387398);
    }

    #[test]
    fn test_table_seeds_distinct() {
        let seeds: Vec<u64> = (0..64).map(table_seed).collect();
        for i in 0..seeds.len() {
            for j in i + 1..seeds.len() {
                assert_ne!(seeds[i], seeds[j]);
            }
        }

        // seeds must be stable across runs since they are not persisted
        assert_eq!(table_seed(0), table_seed(0));
        assert_eq!(TableHash::new(3, 101).seed, table_seed(3));
    }

    #[test]
    fn test_bucket_in_range() {
        let hash = TableHash::new(0, 101);
        for kmer in 0..1000 {
            assert!(hash.bucket(kmer) < 101);
        }
    }

    #[test]
    fn test_tables_hash_independently() {
        // with a shared seed every table would map k-mers to identical buckets
        let h0 = TableHash::new(0, 1_000_003);
        let h1 = TableHash::new(1, 1_000_003);
        let same = (0..1000u64).filter(|&kmer| h0.bucket(kmer) == h1.bucket(kmer)).count();
        assert!(same < 10);
    }
}
