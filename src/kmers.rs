//! Canonical k-mer iteration over nucleotide sequences.
//!
//! Each window of length k is encoded with 2 bits per base (A=0, C=1, G=2, T/U=3) and
//! the smaller of the forward and reverse complement encodings is emitted, so a sequence
//! and its reverse complement produce the same k-mers. Windows containing any other
//! character are skipped.

// Rolling forward/reverse encoding modified from the fmh_seeds method by Jim Shaw in skani.

use crate::error::{Error, Result};
use crate::hashing::ItemHash;
use crate::table_params::MAX_KMER_LENGTH;

const AMBIGUOUS: u8 = 0xFF;

const NT_TO_BITS: [u8; 256] = {
    let mut table = [AMBIGUOUS; 256];

    table[b'A' as usize] = 0;
    table[b'C' as usize] = 1;
    table[b'G' as usize] = 2;
    table[b'T' as usize] = 3;
    table[b'U' as usize] = 3;
    table[b'a' as usize] = 0;
    table[b'c' as usize] = 1;
    table[b'g' as usize] = 2;
    table[b't' as usize] = 3;
    table[b'u' as usize] = 3;

    table
};

/// Lazy iterator over the canonical k-mers of a sequence.
///
/// Cloning the iterator or calling [`CanonicalKmers::restart`] replays the sequence
/// from its first window.
#[derive(Clone, Debug)]
pub struct CanonicalKmers<'a> {
    seq: &'a [u8],
    k: usize,
    pos: usize,
    run_len: usize,
    fwd_kmer: ItemHash,
    rev_kmer: ItemHash,
    fwd_mask: ItemHash,
    rev_shift_dist: usize,
}

/// Iterate over the canonical k-mers of `seq`.
pub fn canonical_kmers(seq: &[u8], k: u8) -> Result<CanonicalKmers<'_>> {
    if !(1..=MAX_KMER_LENGTH).contains(&k) {
        return Err(Error::InvalidParameter(format!(
            "k-mer length must be in the range [1, {}], got {}",
            MAX_KMER_LENGTH, k
        )));
    }

    let k = k as usize;
    if seq.len() < k {
        return Err(Error::InvalidSequence(format!(
            "sequence of length {} is shorter than k = {}",
            seq.len(),
            k
        )));
    }

    Ok(CanonicalKmers {
        seq,
        k,
        pos: 0,
        run_len: 0,
        fwd_kmer: 0,
        rev_kmer: 0,
        fwd_mask: ItemHash::MAX >> (std::mem::size_of::<ItemHash>() * 8 - 2 * k),
        rev_shift_dist: 2 * (k - 1),
    })
}

impl CanonicalKmers<'_> {
    /// Rewind to the start of the sequence.
    pub fn restart(&mut self) {
        self.pos = 0;
        self.run_len = 0;
        self.fwd_kmer = 0;
        self.rev_kmer = 0;
    }
}

impl Iterator for CanonicalKmers<'_> {
    type Item = ItemHash;

    fn next(&mut self) -> Option<ItemHash> {
        while self.pos < self.seq.len() {
            let nuc = NT_TO_BITS[self.seq[self.pos] as usize];
            self.pos += 1;

            if nuc == AMBIGUOUS {
                self.run_len = 0;
                self.fwd_kmer = 0;
                self.rev_kmer = 0;
                continue;
            }

            let nuc_f = nuc as ItemHash;
            self.fwd_kmer = ((self.fwd_kmer << 2) | nuc_f) & self.fwd_mask;

            let nuc_r = 3 - nuc_f;
            self.rev_kmer = (self.rev_kmer >> 2) | (nuc_r << self.rev_shift_dist);

            self.run_len += 1;
            if self.run_len >= self.k {
                return Some(self.fwd_kmer.min(self.rev_kmer));
            }
        }

        None
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let pending = self.run_len.min(self.k - 1);
        let upper = (self.seq.len() - self.pos + pending).saturating_sub(self.k - 1);
        (0, Some(upper))
    }
}
