//! This module provides the `Hashbits` k-mer presence table: a Bloom filter built
//! from several independent bit arrays that share one k-mer length. A k-mer is
//! reported as present only if its bit is set in every table, so lookups can return
//! false positives but never false negatives.
//!
//! Tables can be saved to and loaded from a compact binary layout:
//!
//! ```text
//! "KOVL" | version: u8 | type: u8 | ksize: u32 | n_tables: u8 | table_size: u64 | bit arrays
//! ```
//!
//! All integers are little-endian and each bit array holds `ceil(table_size / 8)` bytes.
//! The layout is not compatible with khmer's `.pt` files.

use std::fmt;
use std::collections::TryReserveError;
use std::fs::File;
use std::io::{BufReader, BufWriter, ErrorKind, Read, Write};
use std::path::Path;

use byteorder::{LittleEndian as LE, ReadBytesExt, WriteBytesExt};
use log::{debug, info, warn};

use crate::error::{Error, Result};
use crate::hashing::{ItemHash, TableHash};
use crate::io_utils::open_fastx;
use crate::kmers::canonical_kmers;
use crate::table_params::TableParams;

pub const SAVED_SIGNATURE: &[u8; 4] = b"KOVL";
pub const SAVED_FORMAT_VERSION: u8 = 1;
pub const SAVED_HASHBITS: u8 = 2;

/// Tables with a higher false positive rate than this are reported as too small.
pub const MAX_FALSE_POSITIVE_RATE: f64 = 0.15;

/// Bytes preceding the bit arrays in a saved table.
pub const HEADER_LEN: usize = 19;

pub struct Hashbits {
    params: TableParams,
    hashes: Vec<TableHash>,
    tables: Vec<Vec<u8>>,
    occupied: Vec<u64>,
}

impl Hashbits {
    /// Allocate an empty presence table.
    pub fn new(params: &TableParams) -> Result<Self> {
        params.validate()?;

        let table_bytes = usize::try_from(params.table_size().div_ceil(8)).map_err(|_| {
            Error::InvalidParameter(format!("table size {} is too large", params.table_size()))
        })?;

        let mut tables = Vec::with_capacity(params.n_tables() as usize);
        for _ in 0..params.n_tables() {
            let mut table = allocate_table(table_bytes).map_err(|_| {
                Error::InvalidParameter(format!(
                    "unable to allocate {} tables of {} bits",
                    params.n_tables(),
                    params.table_size()
                ))
            })?;
            table.resize(table_bytes, 0);
            tables.push(table);
        }

        Ok(Hashbits::from_tables(params.clone(), tables))
    }

    fn from_tables(params: TableParams, tables: Vec<Vec<u8>>) -> Self {
        let hashes = (0..tables.len())
            .map(|idx| TableHash::new(idx, params.table_size()))
            .collect();

        let occupied = tables
            .iter()
            .map(|table| table.iter().map(|b| b.count_ones() as u64).sum())
            .collect();

        Hashbits {
            params,
            hashes,
            tables,
            occupied,
        }
    }

    pub fn params(&self) -> &TableParams {
        &self.params
    }

    pub fn ksize(&self) -> u8 {
        self.params.k()
    }

    pub fn n_tables(&self) -> u8 {
        self.params.n_tables()
    }

    pub fn table_size(&self) -> u64 {
        self.params.table_size()
    }

    /// Number of set bits in the first table.
    pub fn n_occupied(&self) -> u64 {
        self.occupied[0]
    }

    /// Probability that a k-mer never inserted is reported as present.
    pub fn false_positive_rate(&self) -> f64 {
        let table_size = self.table_size() as f64;
        self.occupied
            .iter()
            .map(|&occupied| occupied as f64 / table_size)
            .product()
    }

    /// Log the false positive rate of the table, warning if it is too high to be useful.
    pub fn report_false_positive_rate(&self, label: &str) {
        let fp_rate = self.false_positive_rate();
        info!("False positive rate of {} presence table: {:.3}", label, fp_rate);

        if fp_rate > MAX_FALSE_POSITIVE_RATE {
            warn!(
                "The {} presence table is too small (false positive rate {:.3} > {}); \
                 increase --tablesize or --max-memory-usage.",
                label, fp_rate, MAX_FALSE_POSITIVE_RATE
            );
        }
    }

    /// Set the bits of `kmer` in every table. Returns true if any bit was previously unset.
    pub fn insert(&mut self, kmer: ItemHash) -> bool {
        let mut is_new = false;
        for ((hash, table), occupied) in self
            .hashes
            .iter()
            .zip(self.tables.iter_mut())
            .zip(self.occupied.iter_mut())
        {
            let bin = hash.bucket(kmer);
            let byte = &mut table[(bin / 8) as usize];
            let mask = 1u8 << (bin % 8);
            if *byte & mask == 0 {
                *byte |= mask;
                *occupied += 1;
                is_new = true;
            }
        }

        is_new
    }

    /// True if the bits of `kmer` are set in every table.
    #[inline]
    pub fn contains(&self, kmer: ItemHash) -> bool {
        self.hashes.iter().zip(self.tables.iter()).all(|(hash, table)| {
            let bin = hash.bucket(kmer);
            table[(bin / 8) as usize] & (1u8 << (bin % 8)) != 0
        })
    }

    /// Insert every canonical k-mer of `seq`, returning the number of windows inserted.
    pub fn consume_seq(&mut self, seq: &[u8]) -> Result<u64> {
        let mut n_kmers = 0;
        for kmer in canonical_kmers(seq, self.ksize())? {
            self.insert(kmer);
            n_kmers += 1;
        }

        Ok(n_kmers)
    }

    /// Insert the k-mers of every record in a FASTA/FASTQ file, returning the number of
    /// windows inserted. Records without a valid k-mer are skipped.
    pub fn consume_seq_file(&mut self, seq_file: &Path) -> Result<u64> {
        let Some(mut fastx_reader) = open_fastx(seq_file)? else {
            return Ok(0);
        };

        let mut n_kmers = 0;
        while let Some(rec) = fastx_reader.next() {
            let record = rec?;
            match self.consume_seq(&record.seq()) {
                Ok(n) => n_kmers += n,
                Err(Error::InvalidSequence(msg)) => {
                    debug!("Skipping record {}: {}", String::from_utf8_lossy(record.id()), msg);
                }
                Err(err) => return Err(err),
            }
        }

        Ok(n_kmers)
    }

    pub fn write_to<W: Write>(&self, writer: &mut W) -> std::io::Result<()> {
        writer.write_all(SAVED_SIGNATURE)?;
        writer.write_u8(SAVED_FORMAT_VERSION)?;
        writer.write_u8(SAVED_HASHBITS)?;
        writer.write_u32::<LE>(self.ksize() as u32)?;
        writer.write_u8(self.n_tables())?;
        writer.write_u64::<LE>(self.table_size())?;
        for table in &self.tables {
            writer.write_all(table)?;
        }

        Ok(())
    }

    /// Serialize the table to bytes readable by [`Hashbits::load`].
    pub fn save(&self) -> Vec<u8> {
        let table_bytes: usize = self.tables.iter().map(Vec::len).sum();
        let mut bytes = Vec::with_capacity(HEADER_LEN + table_bytes);
        self.write_to(&mut bytes)
            .expect("Writing to a Vec cannot fail.");

        bytes
    }

    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        let mut writer = BufWriter::new(File::create(path)?);
        self.write_to(&mut writer)?;
        writer.flush()?;

        Ok(())
    }

    /// Deserialize a table written by [`Hashbits::save`].
    pub fn load(bytes: &[u8]) -> Result<Self> {
        let mut reader = bytes;
        Hashbits::read_from(&mut reader)
    }

    /// Read a saved table from `reader`, which must hold nothing past the last bit array.
    /// Each bit array is read directly into its own table.
    pub fn read_from<R: Read>(reader: &mut R) -> Result<Self> {
        let mut signature = [0u8; 4];
        reader.read_exact(&mut signature).map_err(truncated)?;
        if &signature != SAVED_SIGNATURE {
            return Err(Error::CorruptData(format!(
                "unrecognized file signature {:?}",
                String::from_utf8_lossy(&signature)
            )));
        }

        let version = reader.read_u8().map_err(truncated)?;
        if version != SAVED_FORMAT_VERSION {
            return Err(Error::CorruptData(format!(
                "unsupported file format version {} (expected {})",
                version, SAVED_FORMAT_VERSION
            )));
        }

        let table_type = reader.read_u8().map_err(truncated)?;
        if table_type != SAVED_HASHBITS {
            return Err(Error::CorruptData(format!(
                "file holds table type {}, not a presence table",
                table_type
            )));
        }

        let ksize = reader.read_u32::<LE>().map_err(truncated)?;
        let n_tables = reader.read_u8().map_err(truncated)?;
        let table_size = reader.read_u64::<LE>().map_err(truncated)?;

        let ksize = u8::try_from(ksize)
            .map_err(|_| Error::CorruptData(format!("invalid k-mer length {}", ksize)))?;
        let params = TableParams::new(ksize, table_size, n_tables)
            .map_err(|e| Error::CorruptData(e.to_string()))?;

        let table_bytes = usize::try_from(table_size.div_ceil(8))
            .map_err(|_| Error::CorruptData(format!("table size {} is too large", table_size)))?;

        // bits past the end of a table are never addressed
        let tail_bits = (table_size % 8) as u32;

        let mut tables = Vec::with_capacity(n_tables as usize);
        for idx in 0..n_tables {
            let mut table = allocate_table(table_bytes).map_err(|_| {
                Error::CorruptData(format!("table size {} is too large", table_size))
            })?;

            // grows only as data arrives, so a short file fails before the full table is touched
            reader
                .by_ref()
                .take(table_bytes as u64)
                .read_to_end(&mut table)?;
            if table.len() != table_bytes {
                return Err(Error::CorruptData(format!(
                    "table {} holds {} of {} bytes",
                    idx,
                    table.len(),
                    table_bytes
                )));
            }

            if tail_bits != 0 {
                if let Some(last) = table.last_mut() {
                    *last &= (1u8 << tail_bits) - 1;
                }
            }
            tables.push(table);
        }

        let mut trailing = [0u8; 1];
        if reader.read(&mut trailing)? != 0 {
            return Err(Error::CorruptData(
                "unexpected data after the last table".to_string(),
            ));
        }

        Ok(Hashbits::from_tables(params, tables))
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let mut reader = BufReader::new(File::open(path)?);
        Hashbits::read_from(&mut reader)
    }
}

impl fmt::Debug for Hashbits {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Hashbits")
            .field("params", &self.params)
            .field("occupied", &self.occupied)
            .finish()
    }
}

/// Empty table with room for `n_bytes` bytes, failing instead of aborting when memory is short.
fn allocate_table(n_bytes: usize) -> std::result::Result<Vec<u8>, TryReserveError> {
    let mut table = Vec::new();
    table.try_reserve_exact(n_bytes)?;
    Ok(table)
}

fn truncated(err: std::io::Error) -> Error {
    if err.kind() == ErrorKind::UnexpectedEof {
        Error::CorruptData("truncated header".to_string())
    } else {
        Error::Io(err)
    }
}
