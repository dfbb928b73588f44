//! Pipeline steps for building variant track precursors from annotated VCF.
//!
//! ```shell
//! cargo run --release --bin=vartrack --features=binaries -- \
//!     vcf-to-bed input.vcf.gz --ranks ranks.json --output shards/
//! ```
//!
//! Each subcommand is one single-node unit of work of the surrounding
//! pipeline: conversion, sorting, merging, signal generation, and encoding.
//! Units are independent per chromosome and per source, so the orchestration
//! layer can fan them out freely; the merge step is the only barrier.

use std::fs::File;
use std::io::BufWriter;
use std::io::Write as _;
use std::path::PathBuf;

use anyhow::Context;
use anyhow::Result;
use clap::Parser;
use clap::Subcommand;
use clap_verbosity_flag::Verbosity;
use tracing::info;
use tracing_log::AsTrace as _;
use tracing_subscriber::EnvFilter;
use vartrack::merge;
use vartrack::severity::RankTable;
use vartrack::shard;
use vartrack::signal;
use vartrack::tool::BedToBigBed;
use vartrack::tool::Encode as _;
use vartrack::tool::ShellSort;
use vartrack::tool::Sort as _;
use vartrack::tool::WigToBigWig;
use vartrack::Converter;
use vartrack::Reader;

#[derive(Parser)]
#[command(name = "vartrack", about = "Builds variant track precursors from annotated VCF")]
struct Args {
    /// The step to run.
    #[command(subcommand)]
    command: Command,

    #[command(flatten)]
    verbose: Verbosity,
}

#[derive(Subcommand)]
enum Command {
    /// Converts an annotated VCF into per-chromosome interval files.
    VcfToBed {
        /// The input VCF (`.vcf` or `.vcf.gz`).
        vcf: PathBuf,

        /// The consequence rank table (JSON).
        #[arg(short, long)]
        ranks: PathBuf,

        /// The directory per-chromosome interval files are written into.
        #[arg(short, long, default_value = ".")]
        output: PathBuf,
    },

    /// Sorts an interval file by (chromosome, start) with bounded memory.
    SortBed {
        /// The interval file to sort.
        bed: PathBuf,

        /// The sorted interval file to write.
        #[arg(short, long)]
        output: PathBuf,

        /// The memory ceiling handed to the external sort.
        #[arg(short, long, default_value = "1G")]
        memory: String,
    },

    /// Merges sorted interval files contributed by multiple sources.
    ///
    /// Priority follows argument order: on a collision, the earliest given
    /// file's labels win and duplicate identifiers in later files are
    /// dropped.
    MergeBed {
        /// The interval files to merge, highest priority first.
        #[arg(required = true)]
        beds: Vec<PathBuf>,

        /// The merged interval file to write.
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Converts a sorted interval file into a fixed-step signal track.
    BedToSignal {
        /// The sorted interval file.
        bed: PathBuf,

        /// The chromosome-sizes file used to pad each chromosome run.
        #[arg(short, long)]
        sizes: Option<PathBuf>,

        /// The signal track to write.
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Encodes a sorted interval file into a binary interval track.
    EncodeBed {
        /// The sorted interval file.
        bed: PathBuf,

        /// The chromosome-sizes file.
        #[arg(short, long)]
        sizes: PathBuf,

        /// The binary track to write.
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Encodes a fixed-step signal track into a binary signal track.
    EncodeSignal {
        /// The signal track text.
        wig: PathBuf,

        /// The chromosome-sizes file.
        #[arg(short, long)]
        sizes: PathBuf,

        /// The binary track to write.
        #[arg(short, long)]
        output: PathBuf,
    },
}

fn main() -> Result<()> {
    let args = Args::parse();

    match std::env::var("RUST_LOG") {
        Ok(_) => tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::from_default_env())
            .init(),
        Err(_) => tracing_subscriber::fmt()
            .with_max_level(args.verbose.log_level_filter().as_trace())
            .init(),
    };

    match args.command {
        Command::VcfToBed {
            vcf,
            ranks,
            output,
        } => vcf_to_bed(vcf, ranks, output),
        Command::SortBed {
            bed,
            output,
            memory,
        } => {
            ShellSort::new(memory)
                .sort(&bed, &output)
                .context("sorting interval file")?;
            Ok(())
        }
        Command::MergeBed { beds, output } => merge_bed(beds, output),
        Command::BedToSignal { bed, sizes, output } => bed_to_signal(bed, sizes, output),
        Command::EncodeBed { bed, sizes, output } => {
            BedToBigBed
                .encode(&bed, &sizes, &output)
                .context("encoding interval track")?;
            Ok(())
        }
        Command::EncodeSignal { wig, sizes, output } => {
            WigToBigWig
                .encode(&wig, &sizes, &output)
                .context("encoding signal track")?;
            Ok(())
        }
    }
}

/// Converts an annotated VCF into per-chromosome interval files.
fn vcf_to_bed(vcf: PathBuf, ranks: PathBuf, output: PathBuf) -> Result<()> {
    let table = RankTable::from_path(&ranks)
        .with_context(|| format!("loading rank table {}", ranks.display()))?;

    std::fs::create_dir_all(&output)
        .with_context(|| format!("creating output directory {}", output.display()))?;

    let mut reader =
        Reader::open(&vcf).with_context(|| format!("opening VCF {}", vcf.display()))?;
    let mut writers = shard::Writers::new(&output);

    Converter::new(table)
        .convert(&mut reader, |record| writers.write(record))
        .context("converting VCF records")?;

    let chromosomes = writers.chromosomes().count();
    writers.finish().context("closing interval files")?;
    info!("wrote interval files for {chromosomes} chromosomes");

    Ok(())
}

/// Merges sorted interval files across sources in priority order.
fn merge_bed(beds: Vec<PathBuf>, output: PathBuf) -> Result<()> {
    let merged = merge::merge_files(&beds).context("merging interval files")?;

    let mut out = BufWriter::new(
        File::create(&output)
            .with_context(|| format!("creating merged file {}", output.display()))?,
    );
    for record in &merged {
        writeln!(out, "{record}")?;
    }
    out.flush()?;

    info!("merged {} sources into {} records", beds.len(), merged.len());
    Ok(())
}

/// Converts a sorted interval file into a fixed-step signal track.
fn bed_to_signal(bed: PathBuf, sizes: Option<PathBuf>, output: PathBuf) -> Result<()> {
    let records = shard::read_records(&bed)
        .with_context(|| format!("reading interval file {}", bed.display()))?;

    let out = BufWriter::new(
        File::create(&output)
            .with_context(|| format!("creating signal track {}", output.display()))?,
    );

    let mut writer = match sizes {
        Some(sizes) => {
            let sizes = signal::ChromSizes::from_path(&sizes)
                .with_context(|| format!("loading chromosome sizes {}", sizes.display()))?;
            signal::Writer::with_sizes(out, sizes)
        }
        None => signal::Writer::new(out),
    };

    for record in &records {
        writer.write_record(record).context("writing signal track")?;
    }

    writer
        .finish()
        .context("finishing signal track")?
        .flush()?;

    Ok(())
}
