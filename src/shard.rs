//! Per-chromosome interval file writers.
//!
//! Conversion fans interval records out into one file per chromosome, so that
//! each chromosome can be sorted, merged, and encoded as an independent unit
//! of work. The handle map is owned by the conversion driver and passed into
//! each write, rather than living in process-global state, and every handle
//! is flushed on all exit paths: explicitly via [`Writers::finish`], or as a
//! best effort on drop when a run aborts early.

use std::collections::HashMap;
use std::fs::File;
use std::io::BufWriter;
use std::io::Write as _;
use std::io::{self};
use std::path::Path;
use std::path::PathBuf;

use crate::interval;

/// The extension given to per-chromosome interval files.
const EXTENSION: &str = "bed";

/// A map of per-chromosome interval file writers.
#[derive(Debug)]
pub struct Writers {
    /// The directory the per-chromosome files are created in.
    directory: PathBuf,

    /// The open handles, one per chromosome seen so far.
    handles: HashMap<String, BufWriter<File>>,
}

impl Writers {
    /// Creates a writer map rooted at the given directory.
    ///
    /// The directory must already exist; files are created lazily as
    /// chromosomes are first seen.
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
            handles: HashMap::new(),
        }
    }

    /// Returns the path the given chromosome's intervals are written to.
    pub fn path_for(&self, chromosome: &str) -> PathBuf {
        self.directory.join(format!("{chromosome}.{EXTENSION}"))
    }

    /// Returns the chromosomes written so far.
    pub fn chromosomes(&self) -> impl Iterator<Item = &str> {
        self.handles.keys().map(|chromosome| chromosome.as_str())
    }

    /// Writes an interval record to its chromosome's file, creating the file
    /// on first use.
    pub fn write(&mut self, record: &interval::Record) -> io::Result<()> {
        let handle = self.handle(record.chromosome())?;
        writeln!(handle, "{record}")
    }

    /// Flushes and closes every handle.
    pub fn finish(mut self) -> io::Result<()> {
        for handle in self.handles.values_mut() {
            handle.flush()?;
        }

        self.handles.clear();
        Ok(())
    }

    /// Returns the handle for a chromosome, creating the backing file if this
    /// is the first record for it.
    fn handle(&mut self, chromosome: &str) -> io::Result<&mut BufWriter<File>> {
        if !self.handles.contains_key(chromosome) {
            let path = self.path_for(chromosome);
            let file = File::create(&path)?;
            self.handles
                .insert(chromosome.to_string(), BufWriter::new(file));
        }

        // The entry was just inserted if it was missing.
        Ok(self
            .handles
            .get_mut(chromosome)
            .unwrap_or_else(|| unreachable!("handle exists for chromosome")))
    }
}

impl Drop for Writers {
    fn drop(&mut self) {
        // Final flush errors surface through `finish`; on an abort path the
        // most that can be done is attempt the flush.
        for handle in self.handles.values_mut() {
            let _ = handle.flush();
        }
    }
}

/// Reads every interval record from a per-chromosome interval file.
pub fn read_records(path: impl AsRef<Path>) -> Result<Vec<interval::Record>, ReadError> {
    let contents = std::fs::read_to_string(path).map_err(ReadError::Io)?;

    contents
        .lines()
        .map(|line| {
            line.parse::<interval::Record>()
                .map_err(|e| ReadError::Record(e, line.to_string()))
        })
        .collect()
}

/// An error related to reading a per-chromosome interval file.
#[derive(Debug)]
pub enum ReadError {
    /// An I/O error.
    Io(io::Error),

    /// An invalid interval record.
    Record(interval::record::ParseError, String),
}

impl std::fmt::Display for ReadError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReadError::Io(err) => write!(f, "i/o error: {err}"),
            ReadError::Record(err, line) => {
                write!(f, "invalid interval record: {err}\n\nline: {line}")
            }
        }
    }
}

impl std::error::Error for ReadError {}

#[cfg(test)]
mod tests {
    use tempdir::TempDir;

    use super::*;

    #[test]
    fn test_records_fan_out_per_chromosome() -> Result<(), Box<dyn std::error::Error>> {
        let dir = TempDir::new("shard")?;
        let mut writers = Writers::new(dir.path());

        let records = [
            "1\t10\t11\trs1\tSNV\tA\tC\t3\tintron_variant",
            "2\t20\t21\trs2\tSNV\tG\tT\t1\tmissense_variant",
            "1\t30\t31\trs3\tSNV\tT\tA\t5\tintergenic_variant",
        ];

        for line in records {
            writers.write(&line.parse()?)?;
        }

        let chr1 = writers.path_for("1");
        let chr2 = writers.path_for("2");
        writers.finish()?;

        let chr1 = read_records(chr1)?;
        assert_eq!(chr1.len(), 2);
        assert_eq!(chr1[0].id(), "rs1");
        assert_eq!(chr1[1].id(), "rs3");

        let chr2 = read_records(chr2)?;
        assert_eq!(chr2.len(), 1);
        assert_eq!(chr2[0].id(), "rs2");

        Ok(())
    }

    #[test]
    fn test_read_error_reports_the_line() -> Result<(), Box<dyn std::error::Error>> {
        let dir = TempDir::new("shard")?;
        let path = dir.path().join("1.bed");
        std::fs::write(&path, "1\t10\t11\n")?;

        let err = read_records(&path).unwrap_err();
        assert_eq!(
            err.to_string(),
            "invalid interval record: invalid number of fields in interval record: \
             expected 9 fields, found 3 fields\n\nline: 1\t10\t11"
        );

        Ok(())
    }
}
