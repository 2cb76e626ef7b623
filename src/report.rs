//! Writers for the overlap summary report and the growth curve.

use std::io::Write;
use std::path::Path;

use itertools::Itertools;

use crate::overlap::{CurvePoint, OverlapResult};

/// Layout of the growth curve file.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CurveFormat {
    /// Whitespace separated columns without a header.
    Plain,
    /// Comma separated columns with a header row.
    Csv,
}

impl CurveFormat {
    fn separator(&self) -> &'static str {
        match self {
            CurveFormat::Plain => " ",
            CurveFormat::Csv => ",",
        }
    }
}

/// Write the human readable summary of an overlap run.
pub fn write_summary<W: Write>(
    writer: &mut W,
    ptfile: &Path,
    seq_file: &Path,
    result: &OverlapResult,
) -> std::io::Result<()> {
    writeln!(writer, "dataset1(pt file): {}", ptfile.display())?;
    writeln!(writer, "dataset2: {}", seq_file.display())?;
    writeln!(writer)?;
    writeln!(writer, "# of unique k-mers in dataset2: {}", result.n_unique)?;
    writeln!(writer, "# of overlap unique k-mers: {}", result.n_overlap)?;
    writeln!(writer)?;

    Ok(())
}

/// Write one line per curve point: cumulative unique k-mers, then cumulative overlap k-mers.
pub fn write_curve<W: Write>(
    writer: &mut W,
    curve: &[CurvePoint],
    format: CurveFormat,
) -> std::io::Result<()> {
    let separator = format.separator();

    if format == CurveFormat::Csv {
        writeln!(writer, "{}", ["input_seq", "overlap_kmer"].iter().join(separator))?;
    }

    for point in curve {
        writeln!(writer, "{}", [point.unique, point.overlap].iter().join(separator))?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::overlap::CURVE_POINTS;
    use std::path::PathBuf;

    fn result() -> OverlapResult {
        let curve = (0..CURVE_POINTS as u64)
            .map(|i| CurvePoint {
                unique: 10 * (i + 1),
                overlap: i + 1,
            })
            .collect();

        OverlapResult {
            n_unique: 1000,
            n_overlap: 100,
            n_records: 250,
            n_skipped: 0,
            curve,
        }
    }

    #[test]
    fn test_write_summary() {
        let mut out = Vec::new();
        write_summary(
            &mut out,
            &PathBuf::from("ref.pt"),
            &PathBuf::from("reads.fa"),
            &result(),
        )
        .unwrap();

        let expected = "dataset1(pt file): ref.pt\n\
                        dataset2: reads.fa\n\
                        \n\
                        # of unique k-mers in dataset2: 1000\n\
                        # of overlap unique k-mers: 100\n\
                        \n";
        assert_eq!(String::from_utf8(out).unwrap(), expected);
    }

    #[test]
    fn test_write_curve_plain() {
        let mut out = Vec::new();
        write_curve(&mut out, &result().curve, CurveFormat::Plain).unwrap();

        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), CURVE_POINTS);
        assert_eq!(lines[0], "10 1");
        assert_eq!(lines[99], "1000 100");
    }

    #[test]
    fn test_write_curve_csv() {
        let mut out = Vec::new();
        write_curve(&mut out, &result().curve, CurveFormat::Csv).unwrap();

        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), CURVE_POINTS + 1);
        assert_eq!(lines[0], "input_seq,overlap_kmer");
        assert_eq!(lines[1], "10,1");
        assert_eq!(lines[100], "1000,100");
    }
}
