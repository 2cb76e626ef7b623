//! Command-line interface definition for the koverlap application.
//!
//! This file defines the `Cli` struct using the `clap` crate. The `build` command creates a
//! k-mer presence table from sequence files, and the `overlap` command counts the k-mers a
//! sequence file shares with a previously built table. Custom value parsers validate k-mer
//! lengths, table counts and sizes given in scientific notation (e.g. `1e6`).
//! The CLI output is styled using the `anstyle` crate for improved readability.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::error::Result;
use crate::table_params::{MAX_KMER_LENGTH, TableParams};

const DEFAULT_K: u8 = 32;
const DEFAULT_N_TABLES: u8 = 4;
const DEFAULT_TABLE_SIZE: &str = "1e6";

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
#[command(styles=get_styles())]
#[command(disable_help_subcommand = true)]
#[command(arg_required_else_help = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Only report warnings and errors
    #[arg(short, long, global = true, default_value_t = false)]
    pub quiet: bool,

    /// Also write log messages to this file
    #[arg(long, global = true, value_parser = clap::value_parser!(PathBuf))]
    pub log: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Command {
    /// Build a k-mer presence table from sequence files
    Build(BuildArgs),

    /// Count the overlap k-mers shared by a presence table and a sequence file
    #[command(after_help = "The increase of overlap k-mers as the number of sequences in the second \
        dataset increases is written to <REPORT>.curve.")]
    Overlap(OverlapArgs),
}

#[derive(Args)]
pub struct TableArgs {
    /// Number of tables in the presence table
    #[arg(short = 'N', long = "n_tables", help_heading = "Presence table parameters", default_value_t = DEFAULT_N_TABLES, value_parser = validate_n_tables)]
    pub n_tables: u8,

    /// Number of bits in each table
    #[arg(short = 'x', long = "tablesize", help_heading = "Presence table parameters", default_value = DEFAULT_TABLE_SIZE, value_parser = validate_size)]
    pub table_size: u64,

    /// Upper bound on memory used by the tables in bytes; overrides --tablesize
    #[arg(short = 'M', long, help_heading = "Presence table parameters", value_parser = validate_size)]
    pub max_memory_usage: Option<u64>,
}

impl TableArgs {
    pub fn to_params(&self, kmer_length: u8) -> Result<TableParams> {
        match self.max_memory_usage {
            Some(max_memory) => TableParams::from_max_memory(kmer_length, max_memory, self.n_tables),
            None => TableParams::new(kmer_length, self.table_size, self.n_tables),
        }
    }
}

#[derive(Args)]
pub struct BuildArgs {
    /// Sequence files (FASTA/FASTQ, optionally gzipped) to load
    #[arg(required = true, value_parser = clap::value_parser!(PathBuf))]
    pub seq_files: Vec<PathBuf>,

    /// Output presence table file
    #[arg(short = 'o', long, help_heading = "Output", value_parser = clap::value_parser!(PathBuf))]
    pub output: PathBuf,

    /// Length of k-mers to use
    #[arg(short, long, help_heading = "Presence table parameters", default_value_t = DEFAULT_K, value_parser = validate_kmer_length)]
    pub ksize: u8,

    #[command(flatten)]
    pub table: TableArgs,

    /// Continue past missing or empty inputs and overwrite the output file if it exists
    #[arg(short, long, default_value_t = false)]
    pub force: bool,
}

#[derive(Args)]
pub struct OverlapArgs {
    /// Input k-mer presence table file (dataset 1)
    #[arg(value_parser = clap::value_parser!(PathBuf))]
    pub ptfile: PathBuf,

    /// Input sequence file (dataset 2)
    #[arg(value_parser = clap::value_parser!(PathBuf))]
    pub seq_file: PathBuf,

    /// Output report file
    #[arg(value_parser = clap::value_parser!(PathBuf))]
    pub report: PathBuf,

    /// Length of k-mers; must match the presence table (default: taken from the table)
    #[arg(short, long, help_heading = "Presence table parameters", value_parser = validate_kmer_length)]
    pub ksize: Option<u8>,

    #[command(flatten)]
    pub table: TableArgs,

    /// Use the CSV format for the curve output, including column headers
    #[arg(long, help_heading = "Output", default_value_t = false)]
    pub csv: bool,

    /// Continue past missing or empty inputs and overwrite output files if they exist
    #[arg(short, long, default_value_t = false)]
    pub force: bool,
}

fn validate_kmer_length(k: &str) -> std::result::Result<u8, String> {
    let k: u8 = k
        .parse()
        .map_err(|_| format!("`{k}` isn't a valid k-mer length"))?;

    if !(1..=MAX_KMER_LENGTH).contains(&k) {
        return Err(format!("k-mer length must be in the range [1, {MAX_KMER_LENGTH}]"));
    }

    Ok(k)
}

fn validate_n_tables(n_tables: &str) -> std::result::Result<u8, String> {
    let n_tables: u8 = n_tables
        .parse()
        .map_err(|_| format!("`{n_tables}` isn't a valid number of tables"))?;

    if n_tables == 0 {
        return Err("Number of tables must be in the range [1, 255]".to_string());
    }

    Ok(n_tables)
}

/// Parse a positive size, accepting scientific notation such as `1e6`.
fn validate_size(size: &str) -> std::result::Result<u64, String> {
    let value: f64 = size
        .parse()
        .map_err(|_| format!("`{size}` isn't a valid size"))?;

    if !value.is_finite() || value < 1.0 || value >= u64::MAX as f64 {
        return Err(format!("`{size}` must be a positive number"));
    }

    Ok(value as u64)
}

fn get_styles() -> clap::builder::Styles {
    clap::builder::Styles::styled()
        .usage(
            anstyle::Style::new()
                .bold()
                .fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::White))),
        )
        .header(
            anstyle::Style::new()
                .bold()
                .fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::White))),
        )
        .literal(
            anstyle::Style::new().fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::Green))),
        )
        .invalid(
            anstyle::Style::new()
                .bold()
                .fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::Red))),
        )
        .error(
            anstyle::Style::new()
                .bold()
                .fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::Red))),
        )
        .valid(
            anstyle::Style::new()
                .bold()
                .underline()
                .fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::Green))),
        )
        .placeholder(
            anstyle::Style::new().fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::White))),
        )
}
