//! This module defines the `TableParams` struct, which encapsulates the parameters
//! required to allocate a k-mer presence table: the k-mer length shared by all
//! tables, the number of bits in each table, and the number of tables. Parameters
//! are validated on construction and passed explicitly to every component that
//! needs them.

use crate::error::{Error, Result};

/// Longest k-mer that fits a 2-bit encoding in a `u64`.
pub const MAX_KMER_LENGTH: u8 = 32;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TableParams {
    kmer_length: u8,
    table_size: u64,
    n_tables: u8,
}

impl Default for TableParams {
    fn default() -> Self {
        TableParams {
            kmer_length: 32,
            table_size: 1_000_000,
            n_tables: 4,
        }
    }
}

impl TableParams {
    pub fn new(kmer_length: u8, table_size: u64, n_tables: u8) -> Result<Self> {
        let params = TableParams {
            kmer_length,
            table_size,
            n_tables,
        };
        params.validate()?;

        Ok(params)
    }

    /// Size each table so that all tables together use at most `max_memory` bytes.
    pub fn from_max_memory(kmer_length: u8, max_memory: u64, n_tables: u8) -> Result<Self> {
        if n_tables == 0 {
            return Err(Error::InvalidParameter(
                "number of tables must be positive".to_string(),
            ));
        }

        let table_size = max_memory.saturating_mul(8) / n_tables as u64;
        TableParams::new(kmer_length, table_size, n_tables)
    }

    pub fn k(&self) -> u8 {
        self.kmer_length
    }

    pub fn table_size(&self) -> u64 {
        self.table_size
    }

    pub fn n_tables(&self) -> u8 {
        self.n_tables
    }

    /// Bytes required to hold the bit arrays of all tables.
    pub fn estimated_memory(&self) -> u64 {
        self.table_size.div_ceil(8) * self.n_tables as u64
    }

    pub fn validate(&self) -> Result<()> {
        if !(1..=MAX_KMER_LENGTH).contains(&self.kmer_length) {
            return Err(Error::InvalidParameter(format!(
                "k-mer length must be in the range [1, {}], got {}",
                MAX_KMER_LENGTH, self.kmer_length
            )));
        }

        if self.table_size == 0 {
            return Err(Error::InvalidParameter(
                "table size must be positive".to_string(),
            ));
        }

        if self.n_tables == 0 {
            return Err(Error::InvalidParameter(
                "number of tables must be positive".to_string(),
            ));
        }

        Ok(())
    }

    /// Check that a table with k-mer length `table_k` can be used alongside these parameters.
    pub fn check_compatibility(&self, table_k: u8) -> Result<()> {
        if self.kmer_length != table_k {
            return Err(Error::ConfigMismatch {
                table: table_k,
                requested: self.kmer_length,
            });
        }

        Ok(())
    }
}
