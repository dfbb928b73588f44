//! `vartrack` is a crate for converting annotated VCF variant calls into the
//! text precursors of indexed genome-browser tracks.
//!
//! The crate covers the transformation and merge logic of a variant track
//! pipeline:
//!
//! - Parsing VCF records (plain or gzip) and normalizing them into variant
//!   records, with well-formed-but-unusable records skipped and logged
//!   (see [`Reader`] and [`variant::record`]).
//! - Resolving each record's single most severe consequence term against a
//!   rank table loaded at startup (see [`consequence`] and [`severity`]).
//! - Building 0-based half-open [interval records](crate::interval::Record)
//!   and fanning them out into per-chromosome files (see [`Converter`] and
//!   [`shard`]).
//! - Merging interval records across sources with priority ordering (see
//!   [`merge`]).
//! - Writing fixed-step per-base signal tracks of severity groups (see
//!   [`signal`]).
//!
//! The surrounding pipeline concerns — sorting at scale and encoding the
//! final binary tracks — belong to external programs, reached through the
//! capability traits in [`tool`].
//!
//! A representative end-to-end flow:
//!
//! ```
//! use vartrack::Converter;
//! use vartrack::Reader;
//! use vartrack::severity::RankTable;
//! use vartrack::signal;
//!
//! let table = RankTable::from_json(r#"{"intron_variant": 26, "missense_variant": 12}"#)?;
//!
//! let data = b"1\t10175\trs3\tT\tC\t.\t.\tCSQ=C|intron_variant\n\
//!     1\t20008\trs17\tA\tG\t.\t.\tCSQ=G|missense_variant\n";
//! let mut reader = Reader::new(&data[..]);
//!
//! let records = Converter::new(table).collect(&mut reader)?;
//! assert_eq!(records.len(), 2);
//!
//! let mut writer = signal::Writer::new(Vec::new());
//! for record in &records {
//!     writer.write_record(record)?;
//! }
//!
//! let track = String::from_utf8(writer.finish()?)?;
//! assert!(track.starts_with("fixedStep chrom=1 start=1 step=1\n"));
//!
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]
#![warn(rust_2021_compatibility)]
#![warn(missing_debug_implementations)]
#![warn(clippy::missing_docs_in_private_items)]
#![warn(rustdoc::broken_intra_doc_links)]

pub mod consequence;
pub mod convert;
pub mod interval;
pub mod merge;
pub mod reader;
pub mod severity;
pub mod shard;
pub mod signal;
pub mod tool;
pub mod variant;

pub use convert::Converter;
pub use reader::Reader;
