//! External tool capabilities.
//!
//! The pipeline leans on external programs for the work that should not be
//! done in-process: sorting interval files that can reach tens of millions of
//! records per chromosome, and encoding the final text precursors into
//! indexed binary tracks. These are modeled as capability traits so the rest
//! of the crate (and tests) can swap in an in-memory implementation.
//!
//! Tool failure is fatal to the unit of work being processed: a non-zero
//! exit is reported with the tool's name and status and propagated to the
//! caller, which owns any retry policy.

use std::io::{self};
use std::path::Path;
use std::process::Command;
use std::process::ExitStatus;

use crate::interval::Record;
use crate::shard;

/// The default memory ceiling handed to the external sort.
const DEFAULT_SORT_MEMORY: &str = "1G";

/// An error related to an external tool.
#[derive(Debug)]
pub enum Error {
    /// The tool could not be spawned.
    Io(String, io::Error),

    /// The tool exited with a non-zero status.
    Failed(String, ExitStatus),

    /// An in-memory implementation failed to read its input.
    Read(shard::ReadError),
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::Io(tool, err) => write!(f, "failed to run `{tool}`: {err}"),
            Error::Failed(tool, status) => {
                write!(f, "`{tool}` exited with a non-zero status: {status}")
            }
            Error::Read(err) => write!(f, "{err}"),
        }
    }
}

impl std::error::Error for Error {}

/// The capability to sort an interval file by (chromosome, start).
pub trait Sort {
    /// Sorts the interval file at `input`, writing the result to `output`.
    fn sort(&self, input: &Path, output: &Path) -> Result<(), Error>;
}

/// The capability to encode a text precursor into an indexed binary track.
pub trait Encode {
    /// Encodes `input` against the chromosome-sizes file at `sizes`, writing
    /// the binary track to `output`.
    fn encode(&self, input: &Path, sizes: &Path, output: &Path) -> Result<(), Error>;
}

/// Runs a prepared command, mapping spawn failures and non-zero exits.
fn run(command: &mut Command, tool: &str) -> Result<(), Error> {
    let status = command
        .status()
        .map_err(|e| Error::Io(tool.to_string(), e))?;

    if !status.success() {
        return Err(Error::Failed(tool.to_string(), status));
    }

    Ok(())
}

/// An external sort with a bounded memory ceiling.
///
/// Inputs can reach tens of millions of records per chromosome, so the sort
/// runs out of process with a fixed memory budget instead of loading
/// everything into the heap.
#[derive(Clone, Debug)]
pub struct ShellSort {
    /// The memory ceiling passed to `sort -S`.
    memory: String,
}

impl ShellSort {
    /// Creates an external sort with the given memory ceiling (in `sort -S`
    /// syntax, e.g. `"500M"`).
    pub fn new(memory: impl Into<String>) -> Self {
        Self {
            memory: memory.into(),
        }
    }
}

impl Default for ShellSort {
    fn default() -> Self {
        Self::new(DEFAULT_SORT_MEMORY)
    }
}

impl Sort for ShellSort {
    fn sort(&self, input: &Path, output: &Path) -> Result<(), Error> {
        run(
            Command::new("sort")
                .arg("-k1,1")
                .arg("-k2,2n")
                .arg("-S")
                .arg(&self.memory)
                .arg("-o")
                .arg(output)
                .arg(input),
            "sort",
        )
    }
}

/// An in-memory sort for tests and small inputs.
#[derive(Clone, Copy, Debug, Default)]
pub struct MemorySort;

impl Sort for MemorySort {
    fn sort(&self, input: &Path, output: &Path) -> Result<(), Error> {
        let mut records = shard::read_records(input).map_err(Error::Read)?;
        records.sort_by(|a: &Record, b: &Record| {
            (a.chromosome(), a.start(), a.end(), a.id()).cmp(&(
                b.chromosome(),
                b.start(),
                b.end(),
                b.id(),
            ))
        });

        let contents = records
            .iter()
            .map(|record| format!("{record}\n"))
            .collect::<String>();

        std::fs::write(output, contents).map_err(|e| Error::Io(String::from("memory-sort"), e))
    }
}

/// The `bedToBigBed` interval-indexing tool.
#[derive(Clone, Copy, Debug, Default)]
pub struct BedToBigBed;

impl Encode for BedToBigBed {
    fn encode(&self, input: &Path, sizes: &Path, output: &Path) -> Result<(), Error> {
        run(
            Command::new("bedToBigBed")
                .arg(input)
                .arg(sizes)
                .arg(output),
            "bedToBigBed",
        )
    }
}

/// The `wigToBigWig` signal-indexing tool.
#[derive(Clone, Copy, Debug, Default)]
pub struct WigToBigWig;

impl Encode for WigToBigWig {
    fn encode(&self, input: &Path, sizes: &Path, output: &Path) -> Result<(), Error> {
        run(
            Command::new("wigToBigWig")
                .arg(input)
                .arg(sizes)
                .arg(output),
            "wigToBigWig",
        )
    }
}
