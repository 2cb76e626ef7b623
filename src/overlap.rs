//! This module implements counting of overlap k-mers: the distinct k-mers of a
//! sequence dataset that are also present in a reference presence table.
//!
//! It provides functionality to:
//! - Deduplicate the k-mers of the dataset with a freshly allocated presence table.
//! - Test each new k-mer against the read-only reference table.
//! - Sample a growth curve of (unique, overlap) counts at 100 evenly spaced checkpoints.
//!
//! The main entry point is the `count_overlap` function, which streams a FASTA/FASTQ file.

use std::path::Path;

use log::{debug, info, warn};
use num_format::{Locale, ToFormattedString};

use crate::error::{Error, Result};
use crate::hashbits::Hashbits;
use crate::io_utils::open_fastx;
use crate::kmers::canonical_kmers;
use crate::progress::progress_bar;
use crate::table_params::TableParams;

/// Number of samples in the growth curve.
pub const CURVE_POINTS: usize = 100;

/// Cumulative counts at one checkpoint of the growth curve.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CurvePoint {
    pub unique: u64,
    pub overlap: u64,
}

/// Final counts of an overlap run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OverlapResult {
    pub n_unique: u64,
    pub n_overlap: u64,
    pub n_records: u64,
    pub n_skipped: u64,
    /// Always holds exactly `CURVE_POINTS` points.
    pub curve: Vec<CurvePoint>,
}

/// Number of records that must be processed before checkpoint `j` (1-based) is taken.
fn checkpoint_boundary(j: u64, total_records: u64) -> u64 {
    j.saturating_mul(total_records).div_ceil(CURVE_POINTS as u64)
}

/// Streaming overlap counter over the records of one dataset.
pub struct OverlapCounter<'a> {
    reference: &'a Hashbits,
    work: Hashbits,
    total_records: u64,
    n_unique: u64,
    n_overlap: u64,
    n_records: u64,
    n_skipped: u64,
    curve: Vec<CurvePoint>,
}

impl<'a> OverlapCounter<'a> {
    /// Create a counter expecting `total_records` records. The work table is allocated
    /// only after `work_params` are validated against the reference table.
    pub fn new(reference: &'a Hashbits, work_params: &TableParams, total_records: u64) -> Result<Self> {
        work_params.validate()?;
        work_params.check_compatibility(reference.ksize())?;

        let mut counter = OverlapCounter {
            reference,
            work: Hashbits::new(work_params)?,
            total_records,
            n_unique: 0,
            n_overlap: 0,
            n_records: 0,
            n_skipped: 0,
            curve: Vec::with_capacity(CURVE_POINTS),
        };

        // an empty dataset reaches every checkpoint before the first record
        counter.record_checkpoints();

        Ok(counter)
    }

    /// Count the k-mers of one record. A record without any valid k-mer is skipped and
    /// reported as `InvalidSequence`, but still counts towards the curve checkpoints.
    pub fn process_seq(&mut self, seq: &[u8]) -> Result<()> {
        let result = self.count_kmers(seq);

        self.n_records += 1;
        if result.is_err() {
            self.n_skipped += 1;
        }
        self.record_checkpoints();

        result
    }

    fn count_kmers(&mut self, seq: &[u8]) -> Result<()> {
        let mut n_windows = 0;
        for kmer in canonical_kmers(seq, self.work.ksize())? {
            n_windows += 1;

            // insert() reports whether the k-mer was absent from the work table
            if self.work.insert(kmer) {
                self.n_unique += 1;
                if self.reference.contains(kmer) {
                    self.n_overlap += 1;
                }
            }
        }

        if n_windows == 0 {
            return Err(Error::InvalidSequence(
                "no k-mer free of ambiguous bases".to_string(),
            ));
        }

        Ok(())
    }

    fn record_checkpoints(&mut self) {
        while self.curve.len() < CURVE_POINTS
            && checkpoint_boundary(self.curve.len() as u64 + 1, self.total_records) <= self.n_records
        {
            self.curve.push(CurvePoint {
                unique: self.n_unique,
                overlap: self.n_overlap,
            });
        }
    }

    pub fn n_unique(&self) -> u64 {
        self.n_unique
    }

    pub fn n_overlap(&self) -> u64 {
        self.n_overlap
    }

    pub fn work_table(&self) -> &Hashbits {
        &self.work
    }

    /// Finalize the counts. Checkpoints never reached (the input held fewer records
    /// than expected) repeat the last sampled point.
    pub fn finish(self) -> OverlapResult {
        let mut curve = self.curve;
        let last = curve.last().copied().unwrap_or_default();
        curve.resize(CURVE_POINTS, last);

        OverlapResult {
            n_unique: self.n_unique,
            n_overlap: self.n_overlap,
            n_records: self.n_records,
            n_skipped: self.n_skipped,
            curve,
        }
    }
}

/// Count the records in a sequence file.
pub fn count_records(seq_file: &Path) -> Result<u64> {
    let Some(mut fastx_reader) = open_fastx(seq_file)? else {
        return Ok(0);
    };

    let mut n_records = 0;
    while let Some(rec) = fastx_reader.next() {
        rec?;
        n_records += 1;
    }

    Ok(n_records)
}

/// Count the k-mers of `seq_file` that are also present in `reference`.
pub fn count_overlap(seq_file: &Path, reference: &Hashbits, work_params: &TableParams) -> Result<OverlapResult> {
    work_params.validate()?;
    work_params.check_compatibility(reference.ksize())?;

    let total_records = count_records(seq_file)?;
    info!(
        "Counting overlap k-mers across {} records.",
        total_records.to_formatted_string(&Locale::en)
    );

    let mut counter = OverlapCounter::new(reference, work_params, total_records)?;

    if let Some(mut fastx_reader) = open_fastx(seq_file)? {
        let progress_bar = progress_bar(total_records, "records");
        while let Some(rec) = fastx_reader.next() {
            let record = rec?;
            if let Err(err) = counter.process_seq(&record.seq()) {
                debug!(
                    "Skipping record {}: {}",
                    String::from_utf8_lossy(record.id()),
                    err
                );
            }
            progress_bar.inc(1);
        }
        progress_bar.finish();
    }

    counter.work_table().report_false_positive_rate("dataset2");

    let result = counter.finish();
    if result.n_skipped > 0 {
        warn!(
            "Skipped {} of {} records without a valid k-mer.",
            result.n_skipped.to_formatted_string(&Locale::en),
            result.n_records.to_formatted_string(&Locale::en)
        );
    }

    Ok(result)
}
