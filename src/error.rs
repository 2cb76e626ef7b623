//! Error types shared by the presence table, k-mer iteration and overlap counting.

use needletail::errors::ParseError;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("corrupt presence table: {0}")]
    CorruptData(String),

    #[error("invalid sequence: {0}")]
    InvalidSequence(String),

    #[error("presence table has k = {table}, but k = {requested} was requested")]
    ConfigMismatch { table: u8, requested: u8 },

    #[error("I/O failure: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse sequence file: {0}")]
    Parse(#[from] ParseError),
}

pub type Result<T> = std::result::Result<T, Error>;
