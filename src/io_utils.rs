//! Checks on input and output files performed before any work begins, and opening of
//! sequence files.

use std::ffi::OsString;
use std::fs::File;
use std::path::{Path, PathBuf};

use anyhow::{bail, Result};
use log::warn;
use needletail::errors::ParseErrorKind;
use needletail::{parse_fastx_reader, FastxReader};

/// Verify that an input file exists and is not empty. With `force`, problems are only reported.
pub fn check_input_file(path: &Path, force: bool) -> Result<()> {
    let problem = match std::fs::metadata(path) {
        Err(_) => format!("Input file {} does not exist.", path.display()),
        Ok(metadata) if metadata.is_file() && metadata.len() == 0 => {
            format!("Input file {} is empty.", path.display())
        }
        Ok(_) => return Ok(()),
    };

    if !force {
        bail!("{} Use --force to continue anyway.", problem);
    }

    warn!("{} Continuing because --force was given.", problem);
    Ok(())
}

/// Refuse to overwrite an existing output file unless `force` is set.
pub fn check_output_file(path: &Path, force: bool) -> Result<()> {
    if path.exists() {
        if !force {
            bail!("Output file {} already exists. Use --force to overwrite it.", path.display());
        }

        warn!("Overwriting existing output file {}.", path.display());
    }

    Ok(())
}

/// Path of the growth curve written alongside a report.
pub fn curve_path(report: &Path) -> PathBuf {
    let mut path = OsString::from(report.as_os_str());
    path.push(".curve");
    PathBuf::from(path)
}

/// Open a FASTA/FASTQ file, optionally compressed. Returns `None` if the file holds no
/// data, including a compressed file that decompresses to nothing.
pub fn open_fastx(seq_file: &Path) -> crate::error::Result<Option<Box<dyn FastxReader>>> {
    let reader = File::open(seq_file)?;
    match parse_fastx_reader(reader) {
        Ok(fastx_reader) => Ok(Some(fastx_reader)),
        Err(err) if err.kind == ParseErrorKind::EmptyFile => Ok(None),
        Err(err) => Err(err.into()),
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::error::Error;
    use std::fs::write;
    use tempfile::tempdir;

    /// A single gzip member with no content.
    pub(crate) const EMPTY_GZIP: [u8; 20] = [
        0x1f, 0x8b, 0x08, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x03, 0x03, 0x00, 0x00, 0x00, 0x00,
        0x00, 0x00, 0x00, 0x00, 0x00,
    ];

    #[test]
    fn test_open_fastx() -> Result<()> {
        let temp_dir = tempdir()?;
        let reads = temp_dir.path().join("reads.fa");
        let empty = temp_dir.path().join("empty.fa");
        let empty_gz = temp_dir.path().join("empty.fa.gz");
        let bogus = temp_dir.path().join("bogus.fa");
        write(&reads, ">seq1\nACGT\n")?;
        write(&empty, "")?;
        write(&empty_gz, EMPTY_GZIP)?;
        write(&bogus, "not a sequence file")?;

        let mut fastx_reader = open_fastx(&reads)?.unwrap();
        let record = fastx_reader.next().unwrap()?;
        assert_eq!(record.seq().to_vec(), b"ACGT".to_vec());

        assert!(open_fastx(&empty)?.is_none());
        assert!(open_fastx(&empty_gz)?.is_none());

        assert!(matches!(open_fastx(&bogus), Err(Error::Parse(_))));
        assert!(matches!(
            open_fastx(&temp_dir.path().join("missing.fa")),
            Err(Error::Io(_))
        ));

        Ok(())
    }

    #[test]
    fn test_check_input_file() -> Result<()> {
        let temp_dir = tempdir()?;
        let present = temp_dir.path().join("reads.fa");
        let empty = temp_dir.path().join("empty.fa");
        let missing = temp_dir.path().join("missing.fa");
        write(&present, ">seq1\nACGT\n")?;
        write(&empty, "")?;

        assert!(check_input_file(&present, false).is_ok());
        assert!(check_input_file(&empty, false).is_err());
        assert!(check_input_file(&missing, false).is_err());

        assert!(check_input_file(&empty, true).is_ok());
        assert!(check_input_file(&missing, true).is_ok());

        Ok(())
    }

    #[test]
    fn test_check_output_file() -> Result<()> {
        let temp_dir = tempdir()?;
        let report = temp_dir.path().join("report.txt");

        assert!(check_output_file(&report, false).is_ok());

        write(&report, "old report")?;
        assert!(check_output_file(&report, false).is_err());
        assert!(check_output_file(&report, true).is_ok());

        Ok(())
    }

    #[test]
    fn test_curve_path() {
        assert_eq!(curve_path(Path::new("out/report.txt")), PathBuf::from("out/report.txt.curve"));
        assert_eq!(curve_path(Path::new("report")), PathBuf::from("report.curve"));
    }
}
