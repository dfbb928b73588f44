//! Fixed-step signal tracks.
//!
//! A fixed-step track is a complete per-base numeric array: each chromosome
//! run starts with a `fixedStep chrom=<chrom> start=1 step=1` header and then
//! carries exactly one value per base, with no gaps permitted. The [`Writer`]
//! turns sorted interval records into such a track, emitting the interval's
//! severity group for covered bases and zero everywhere else. The text output
//! is consumed by the external signal-indexing tool.

use std::collections::HashMap;
use std::io::Write;
use std::io::{self};
use std::num::ParseIntError;
use std::path::Path;
use std::str::FromStr;

use crate::interval::Record;

/// The value carried by bases no interval covers.
const BACKGROUND: u8 = 0;

/// An error related to writing a signal track.
#[derive(Debug)]
pub enum Error {
    /// An I/O error.
    Io(io::Error),

    /// A record arrived out of order within its chromosome.
    UnsortedRecord {
        /// The chromosome of the offending record.
        chromosome: String,

        /// The start of the offending record.
        start: u64,

        /// The start of the record that preceded it.
        previous: u64,
    },
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::Io(err) => write!(f, "i/o error: {err}"),
            Error::UnsortedRecord {
                chromosome,
                start,
                previous,
            } => write!(
                f,
                "unsorted record at {chromosome}:{start}: starts before the previous record at \
                 {chromosome}:{previous}"
            ),
        }
    }
}

impl std::error::Error for Error {}

/// An error associated with parsing a chromosome-sizes file.
#[derive(Debug)]
pub enum SizesParseError {
    /// An incorrect number of fields in a line.
    IncorrectNumberOfFields(usize, String),

    /// An invalid chromosome length.
    InvalidLength(ParseIntError, String),
}

impl std::fmt::Display for SizesParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SizesParseError::IncorrectNumberOfFields(n, line) => write!(
                f,
                "invalid number of fields in sizes line: expected 2 fields, found {n} \
                 fields\n\nline: {line}"
            ),
            SizesParseError::InvalidLength(err, line) => {
                write!(f, "invalid chromosome length: {err}\n\nline: {line}")
            }
        }
    }
}

impl std::error::Error for SizesParseError {}

/// A chromosome-sizes table: one (name, length) pair per chromosome.
///
/// The table is primarily the contract of the external indexing tools; the
/// signal writer uses it to pad each chromosome run out to the end of the
/// contig.
#[derive(Clone, Debug, Default)]
pub struct ChromSizes {
    /// The name-to-length mapping.
    sizes: HashMap<String, u64>,
}

impl ChromSizes {
    /// Loads a sizes table from a file on disk.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, io::Error> {
        let contents = std::fs::read_to_string(path)?;
        contents
            .parse()
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, format!("{e}")))
    }

    /// Returns the length of a chromosome, if known.
    pub fn get(&self, chromosome: &str) -> Option<u64> {
        self.sizes.get(chromosome).copied()
    }
}

impl FromStr for ChromSizes {
    type Err = SizesParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut sizes = HashMap::new();

        for line in s.lines().filter(|line| !line.is_empty()) {
            let fields = line.split_whitespace().collect::<Vec<_>>();
            let (name, length) = match fields.as_slice() {
                [name, length] => (*name, *length),
                more => {
                    return Err(SizesParseError::IncorrectNumberOfFields(
                        more.len(),
                        line.to_string(),
                    ));
                }
            };

            let length = length
                .parse::<u64>()
                .map_err(|e| SizesParseError::InvalidLength(e, line.to_string()))?;
            sizes.insert(name.to_string(), length);
        }

        Ok(Self { sizes })
    }
}

/// The position of the writer within the track.
#[derive(Debug)]
enum State {
    /// No chromosome run has been opened yet.
    NoChrom,

    /// Inside a chromosome run.
    InChrom {
        /// The chromosome of the current run.
        chromosome: String,

        /// The next base to be emitted.
        position: u64,

        /// The start of the most recent record, for order checking.
        last_start: u64,
    },
}

/// A fixed-step signal track writer.
///
/// Records must be fed sorted by (chromosome, start): all of a chromosome's
/// records together, ascending within the chromosome — exactly the order the
/// [merger](crate::merge) produces. Each new chromosome opens a new
/// `fixedStep` run.
#[derive(Debug)]
pub struct Writer<W>
where
    W: Write,
{
    /// The destination of the track text.
    inner: W,

    /// Contig lengths used to pad each run to the end of its chromosome.
    sizes: Option<ChromSizes>,

    /// The current state of the run.
    state: State,
}

impl<W> Writer<W>
where
    W: Write,
{
    /// Creates a signal track writer.
    ///
    /// Without a sizes table, each chromosome run ends at the last covered
    /// base; see [`Writer::with_sizes`] for complete-contig runs.
    pub fn new(inner: W) -> Self {
        Self {
            inner,
            sizes: None,
            state: State::NoChrom,
        }
    }

    /// Creates a signal track writer that pads every chromosome run with
    /// zeroes out to the end of the contig.
    pub fn with_sizes(inner: W, sizes: ChromSizes) -> Self {
        Self {
            inner,
            sizes: Some(sizes),
            state: State::NoChrom,
        }
    }

    /// Writes the per-base values for one interval record.
    ///
    /// Bases strictly before the record's start carry the background value;
    /// bases within `[start, end)` carry the record's severity group. Bases
    /// already emitted (by an overlapping earlier record) are never
    /// rewritten.
    pub fn write_record(&mut self, record: &Record) -> Result<(), Error> {
        let same_chromosome = matches!(
            &self.state,
            State::InChrom { chromosome, .. } if chromosome == record.chromosome()
        );

        if !same_chromosome {
            self.close_run()?;
            self.open_run(record.chromosome())?;
        }

        let State::InChrom {
            chromosome,
            position,
            last_start,
        } = &mut self.state
        else {
            unreachable!("a run was just opened")
        };

        if record.start() < *last_start {
            return Err(Error::UnsortedRecord {
                chromosome: chromosome.clone(),
                start: record.start(),
                previous: *last_start,
            });
        }

        *last_start = record.start();

        while *position < record.start() {
            writeln!(self.inner, "{BACKGROUND}").map_err(Error::Io)?;
            *position += 1;
        }

        while *position < record.end() {
            writeln!(self.inner, "{}", record.group()).map_err(Error::Io)?;
            *position += 1;
        }

        Ok(())
    }

    /// Finishes the track, padding the final chromosome run, and returns the
    /// underlying writer.
    pub fn finish(mut self) -> Result<W, Error> {
        self.close_run()?;
        Ok(self.inner)
    }

    /// Opens a run for a chromosome: emits the fixed-step header and resets
    /// the running position to the first base.
    fn open_run(&mut self, chromosome: &str) -> Result<(), Error> {
        writeln!(self.inner, "fixedStep chrom={chromosome} start=1 step=1").map_err(Error::Io)?;

        self.state = State::InChrom {
            chromosome: chromosome.to_string(),
            position: 1,
            last_start: 0,
        };

        Ok(())
    }

    /// Closes the current run, if any, padding it out to the end of the
    /// contig when sizes are available.
    fn close_run(&mut self) -> Result<(), Error> {
        if let State::InChrom {
            chromosome,
            position,
            ..
        } = &mut self.state
        {
            if let Some(size) = self.sizes.as_ref().and_then(|sizes| sizes.get(chromosome)) {
                while *position < size {
                    writeln!(self.inner, "{BACKGROUND}").map_err(Error::Io)?;
                    *position += 1;
                }
            }
        }

        self.state = State::NoChrom;
        Ok(())
    }
}

#[cfg(test)]
pub mod tests {
    use super::*;

    /// Runs records through a writer and splits the output into lines.
    fn track(records: &[&str], sizes: Option<&str>) -> Vec<String> {
        let mut writer = match sizes {
            Some(sizes) => Writer::with_sizes(Vec::new(), sizes.parse().unwrap()),
            None => Writer::new(Vec::new()),
        };

        for line in records {
            writer.write_record(&line.parse().unwrap()).unwrap();
        }

        let out = writer.finish().unwrap();
        String::from_utf8(out)
            .unwrap()
            .lines()
            .map(|line| line.to_string())
            .collect()
    }

    #[test]
    fn test_single_interval_on_a_sized_contig() {
        // One interval covering [10, 15) with group 3 on a contig of length
        // 20 yields 19 values: bases 1-9 zero, 10-14 three, 15-19 zero.
        let lines = track(
            &["chr1\t10\t15\trs1\tdeletion\tACGTA\tA\t3\tintron_variant"],
            Some("chr1\t20"),
        );

        assert_eq!(lines[0], "fixedStep chrom=chr1 start=1 step=1");
        assert_eq!(lines.len(), 20);

        let values = &lines[1..];
        assert_eq!(values.len(), 19);
        assert!(values[..9].iter().all(|v| v == "0"));
        assert!(values[9..14].iter().all(|v| v == "3"));
        assert!(values[14..].iter().all(|v| v == "0"));
    }

    #[test]
    fn test_gaps_between_intervals_are_zero_filled() {
        let lines = track(
            &[
                "chr1\t2\t4\trs1\tdeletion\tAC\tA\t2\tsplice_region_variant",
                "chr1\t7\t8\trs2\tSNV\tA\tC\t5\tintergenic_variant",
            ],
            None,
        );

        assert_eq!(
            lines,
            vec![
                "fixedStep chrom=chr1 start=1 step=1",
                "0", // base 1
                "2", // base 2
                "2", // base 3
                "0", // base 4
                "0", // base 5
                "0", // base 6
                "5", // base 7
            ]
        );
    }

    #[test]
    fn test_each_chromosome_opens_a_new_run() {
        let lines = track(
            &[
                "chr1\t1\t2\trs1\tSNV\tA\tC\t1\tmissense_variant",
                "chr2\t1\t2\trs2\tSNV\tG\tT\t4\tregulatory_region_variant",
            ],
            Some("chr1\t3\nchr2\t3"),
        );

        assert_eq!(
            lines,
            vec![
                "fixedStep chrom=chr1 start=1 step=1",
                "1",
                "0",
                "fixedStep chrom=chr2 start=1 step=1",
                "4",
                "0",
            ]
        );
    }

    #[test]
    fn test_overlapping_intervals_never_rewrite_emitted_bases() {
        let lines = track(
            &[
                "chr1\t1\t4\trs1\tdeletion\tACG\tA\t1\tmissense_variant",
                "chr1\t2\t5\trs2\tdeletion\tCGT\tC\t5\tintergenic_variant",
            ],
            None,
        );

        // Bases 1-3 belong to the first record; the second record only
        // contributes base 4.
        assert_eq!(
            lines,
            vec![
                "fixedStep chrom=chr1 start=1 step=1",
                "1",
                "1",
                "1",
                "5",
            ]
        );
    }

    #[test]
    fn test_unsorted_records_are_an_error() {
        let mut writer = Writer::new(Vec::new());
        writer
            .write_record(
                &"chr1\t10\t11\trs1\tSNV\tA\tC\t3\tintron_variant"
                    .parse()
                    .unwrap(),
            )
            .unwrap();

        let err = writer
            .write_record(
                &"chr1\t5\t6\trs2\tSNV\tG\tT\t3\tintron_variant"
                    .parse()
                    .unwrap(),
            )
            .unwrap_err();

        assert_eq!(
            err.to_string(),
            "unsorted record at chr1:5: starts before the previous record at chr1:10"
        );
    }

    #[test]
    fn test_sizes_parsing() -> Result<(), Box<dyn std::error::Error>> {
        let sizes = "chr1\t248956422\nchr2\t242193529\n".parse::<ChromSizes>()?;
        assert_eq!(sizes.get("chr1"), Some(248956422));
        assert_eq!(sizes.get("chr2"), Some(242193529));
        assert_eq!(sizes.get("chrZ"), None);
        Ok(())
    }

    #[test]
    fn test_invalid_sizes_line() {
        let err = "chr1\t100\t200".parse::<ChromSizes>().unwrap_err();
        assert_eq!(
            err.to_string(),
            "invalid number of fields in sizes line: expected 2 fields, found 3 \
             fields\n\nline: chr1\t100\t200"
        );
    }
}
