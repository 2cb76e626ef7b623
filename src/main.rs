
//! Main entry point for the koverlap application.
//!
//! This file handles command-line parsing, logging setup, input validation, and orchestrates
//! the two commands: building a k-mer presence table from sequence files, and counting the
//! overlap k-mers shared by a presence table and a second sequence dataset. The overlap
//! summary is written to the report file and the growth curve to `<report>.curve`.

use std::env;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::time::Instant;

use anyhow::{Context, Result};
use clap::Parser;
use log::info;
use num_format::{Locale, ToFormattedString};

use crate::cli::{BuildArgs, Cli, Command, OverlapArgs};
use crate::hashbits::Hashbits;
use crate::io_utils::{check_input_file, check_output_file, curve_path};
use crate::logging::setup_logger;
use crate::overlap::count_overlap;
use crate::progress::file_progress_bar;
use crate::report::{write_curve, write_summary, CurveFormat};
use crate::table_params::TableParams;

mod cli;
pub mod error;
pub mod hashbits;
pub mod hashing;
pub mod io_utils;
pub mod kmers;
pub mod logging;
pub mod overlap;
pub mod progress;
pub mod report;
pub mod table_params;

/// Common initialization required by all commands.
fn init() {
    const VERSION: &str = env!("CARGO_PKG_VERSION");
    info!("{} v{}", env!("CARGO_PKG_NAME"), VERSION);
    info!("{}", env::args().collect::<Vec<String>>().join(" "));
}

/// Report the parameters of the presence table about to be allocated.
fn report_on_config(params: &TableParams) {
    info!("k-mer length: {}", params.k());
    info!("Number of tables: {}", params.n_tables());
    info!("Table size: {}", params.table_size().to_formatted_string(&Locale::en));
    info!(
        "Estimated memory usage: {} bytes",
        params.estimated_memory().to_formatted_string(&Locale::en)
    );
}

/// Build a presence table from sequence files and save it.
fn build(args: &BuildArgs) -> Result<()> {
    for seq_file in &args.seq_files {
        check_input_file(seq_file, args.force)?;
    }
    check_output_file(&args.output, args.force)?;

    let params = args.table.to_params(args.ksize)?;
    report_on_config(&params);

    let mut table = Hashbits::new(&params)?;

    info!("Loading k-mers from {} sequence files:", args.seq_files.len());
    let progress_bar = file_progress_bar(args.seq_files.len() as u64);
    let mut n_kmers = 0;
    for seq_file in &args.seq_files {
        progress_bar.set_message(seq_file.display().to_string());
        n_kmers += table
            .consume_seq_file(seq_file)
            .with_context(|| format!("Failed to load k-mers from {}", seq_file.display()))?;
        progress_bar.inc(1);
    }
    progress_bar.finish();

    info!("Inserted {} k-mers.", n_kmers.to_formatted_string(&Locale::en));
    table.report_false_positive_rate("dataset1");

    table
        .save_to_file(&args.output)
        .with_context(|| format!("Failed to write presence table to {}", args.output.display()))?;
    info!("Wrote presence table to: {}", args.output.display());

    Ok(())
}

/// Count the overlap k-mers of a presence table and a sequence file, and write the report and curve.
fn overlap(args: &OverlapArgs) -> Result<()> {
    let curve_file = curve_path(&args.report);

    check_input_file(&args.ptfile, args.force)?;
    check_input_file(&args.seq_file, args.force)?;
    check_output_file(&args.report, args.force)?;
    check_output_file(&curve_file, args.force)?;

    info!("Loading k-mer presence table from {}", args.ptfile.display());
    let reference = Hashbits::from_file(&args.ptfile)
        .with_context(|| format!("Failed to load presence table {}", args.ptfile.display()))?;
    info!(
        "Presence table has k = {} and {} tables of {} bits.",
        reference.ksize(),
        reference.n_tables(),
        reference.table_size().to_formatted_string(&Locale::en)
    );
    reference.report_false_positive_rate("dataset1");

    // an explicit --ksize must agree with the loaded table
    let params = args.table.to_params(args.ksize.unwrap_or(reference.ksize()))?;
    report_on_config(&params);

    let result = count_overlap(&args.seq_file, &reference, &params)
        .with_context(|| format!("Failed to count overlap k-mers in {}", args.seq_file.display()))?;

    info!("# of unique k-mers in dataset2: {}", result.n_unique.to_formatted_string(&Locale::en));
    info!("# of overlap unique k-mers: {}", result.n_overlap.to_formatted_string(&Locale::en));

    // outputs are only created once counting has succeeded
    let mut report_writer = BufWriter::new(File::create(&args.report)?);
    write_summary(&mut report_writer, &args.ptfile, &args.seq_file, &result)?;
    report_writer.flush()?;

    let format = if args.csv { CurveFormat::Csv } else { CurveFormat::Plain };
    let mut curve_writer = BufWriter::new(File::create(&curve_file)?);
    write_curve(&mut curve_writer, &result.curve, format)?;
    curve_writer.flush()?;

    info!("Wrote to: {}", args.report.display());

    Ok(())
}

fn run(command: &Command) -> Result<()> {
    match command {
        Command::Build(args) => build(args),
        Command::Overlap(args) => overlap(args),
    }
}

fn main() -> Result<()> {
    let start = Instant::now();

    let args = Cli::parse();

    setup_logger(args.quiet, args.log.as_deref())?;

    init();

    run(&args.command)?;

    info!("Elapsed time (sec): {:.2}", start.elapsed().as_secs_f32());
    info!("Done.");

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use std::fs::{read_to_string, write};
    use std::path::Path;
    use tempfile::tempdir;

    fn run_args(args: &[&str]) -> Result<()> {
        let cli = Cli::try_parse_from(std::iter::once("koverlap").chain(args.iter().copied()))?;
        run(&cli.command)
    }

    fn path_str(path: &Path) -> &str {
        path.to_str().unwrap()
    }

    #[test]
    fn test_build_then_overlap() -> Result<()> {
        let temp_dir = tempdir()?;
        let reference_fa = temp_dir.path().join("reference.fa");
        let dataset_fa = temp_dir.path().join("dataset2.fa");
        let ptfile = temp_dir.path().join("reference.pt");
        let report = temp_dir.path().join("report.txt");

        write(&reference_fa, ">ref\nACGTACGT\n")?;
        write(&dataset_fa, ">seq1\nACGTACGTAC\n>seq2\nGGGGGG\n")?;

        run_args(&["build", "-k", "4", "-x", "10007", "-o", path_str(&ptfile), path_str(&reference_fa)])?;
        assert_eq!(Hashbits::from_file(&ptfile)?.ksize(), 4);

        run_args(&["overlap", "-x", "10007", path_str(&ptfile), path_str(&dataset_fa), path_str(&report)])?;

        let expected = format!(
            "dataset1(pt file): {}\ndataset2: {}\n\n# of unique k-mers in dataset2: 4\n# of overlap unique k-mers: 3\n\n",
            ptfile.display(),
            dataset_fa.display()
        );
        assert_eq!(read_to_string(&report)?, expected);

        let curve = read_to_string(curve_path(&report))?;
        let lines: Vec<&str> = curve.lines().collect();
        assert_eq!(lines.len(), 100);
        assert_eq!(lines[0], "3 3");
        assert_eq!(lines[49], "3 3");
        assert_eq!(lines[50], "4 3");
        assert_eq!(lines[99], "4 3");

        // existing outputs are kept unless --force is given
        assert!(run_args(&["overlap", path_str(&ptfile), path_str(&dataset_fa), path_str(&report)]).is_err());

        run_args(&["overlap", "--csv", "-f", path_str(&ptfile), path_str(&dataset_fa), path_str(&report)])?;
        let curve = read_to_string(curve_path(&report))?;
        let lines: Vec<&str> = curve.lines().collect();
        assert_eq!(lines.len(), 101);
        assert_eq!(lines[0], "input_seq,overlap_kmer");
        assert_eq!(lines[100], "4,3");

        Ok(())
    }

    #[test]
    fn test_overlap_ksize_mismatch() -> Result<()> {
        let temp_dir = tempdir()?;
        let reference_fa = temp_dir.path().join("reference.fa");
        let ptfile = temp_dir.path().join("reference.pt");
        let report = temp_dir.path().join("report.txt");

        write(&reference_fa, ">ref\nACGTACGT\n")?;
        run_args(&["build", "-k", "4", "-x", "1000", "-o", path_str(&ptfile), path_str(&reference_fa)])?;

        let err = run_args(&["overlap", "-k", "5", path_str(&ptfile), path_str(&reference_fa), path_str(&report)])
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<Error>(),
            Some(Error::ConfigMismatch { table: 4, requested: 5 })
        ));

        // no partial report is written
        assert!(!report.exists());
        assert!(!curve_path(&report).exists());

        Ok(())
    }

    #[test]
    fn test_overlap_corrupt_table() -> Result<()> {
        let temp_dir = tempdir()?;
        let ptfile = temp_dir.path().join("bogus.pt");
        let dataset_fa = temp_dir.path().join("dataset2.fa");
        let report = temp_dir.path().join("report.txt");

        write(&ptfile, "not a presence table")?;
        write(&dataset_fa, ">seq1\nACGTACGTAC\n")?;

        let err = run_args(&["overlap", path_str(&ptfile), path_str(&dataset_fa), path_str(&report)])
            .unwrap_err();
        assert!(matches!(err.downcast_ref::<Error>(), Some(Error::CorruptData(_))));
        assert!(!report.exists());

        Ok(())
    }

    #[test]
    fn test_missing_input() -> Result<()> {
        let temp_dir = tempdir()?;
        let ptfile = temp_dir.path().join("reference.pt");

        let result = run_args(&[
            "build",
            "-o",
            path_str(&ptfile),
            path_str(&temp_dir.path().join("missing.fa")),
        ]);
        assert!(result.is_err());
        assert!(!ptfile.exists());

        Ok(())
    }
}
