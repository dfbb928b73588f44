//! Converting VCF records into interval records.
//!
//! The [`Converter`] drives the whole per-file transformation: it reads
//! variant records, resolves each record's most severe consequence against
//! the rank table, builds interval records, and streams them to a sink. Two
//! pieces of single-pass bookkeeping happen on the way out:
//!
//! - consecutive records at the same coordinates (the multi-allelic case
//!   split across adjacent records) are collapsed into one, their alt sets
//!   unioned and the most severe record's labels kept;
//! - a record reusing the identifier of the held record under a different
//!   variant kind is redundant and dropped.
//!
//! Skippable records are logged and dropped; an unknown consequence term
//! aborts the conversion with the offending coordinate and term.

use std::io::BufRead;
use std::io::{self};

use tracing::warn;

use crate::consequence;
use crate::interval;
use crate::reader;
use crate::reader::Reader;
use crate::severity::RankTable;
use crate::variant::record::Parsed;

/// An error related to conversion.
#[derive(Debug)]
pub enum Error {
    /// An error from the underlying reader.
    Reader(reader::Error),

    /// A consequence term could not be resolved against the rank table.
    ///
    /// This is a schema mismatch between the annotation run and the rank
    /// resource; it aborts the conversion rather than being skipped.
    Resolve {
        /// The chromosome of the offending record.
        chromosome: String,

        /// The 1-based position of the offending record.
        position: u64,

        /// The underlying resolution error.
        source: consequence::Error,
    },

    /// An error writing to the sink.
    Write(io::Error),
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::Reader(err) => write!(f, "{err}"),
            Error::Resolve {
                chromosome,
                position,
                source,
            } => write!(f, "{chromosome}:{position}: {source}"),
            Error::Write(err) => write!(f, "write error: {err}"),
        }
    }
}

impl std::error::Error for Error {}

/// An interval record held back in case the next record merges into it.
#[derive(Debug)]
struct Held {
    /// The record being held.
    record: interval::Record,

    /// The rank of the record's consequence, for takeover comparison.
    rank: u32,
}

/// A VCF-to-interval converter.
#[derive(Clone, Debug)]
pub struct Converter {
    /// The consequence rank table.
    table: RankTable,
}

impl Converter {
    /// Creates a converter over a rank table.
    pub fn new(table: RankTable) -> Self {
        Self { table }
    }

    /// Converts every record from the reader, streaming interval records to
    /// the sink in input order.
    ///
    /// The sink is typically [`shard::Writers::write`](crate::shard::Writers)
    /// or a collecting closure (see [`Converter::collect`]).
    pub fn convert<T, F>(&self, reader: &mut Reader<T>, mut sink: F) -> Result<(), Error>
    where
        T: BufRead,
        F: FnMut(&interval::Record) -> io::Result<()>,
    {
        let mut buffer = String::new();
        let mut held: Option<Held> = None;

        while let Some(parsed) = reader.read_record(&mut buffer).map_err(Error::Reader)? {
            let variant = match parsed {
                Parsed::Record(variant) => variant,
                Parsed::Skipped {
                    chromosome,
                    position,
                    reason,
                } => {
                    warn!("skipping record at {chromosome}:{position}: {reason}");
                    continue;
                }
            };

            let resolved = match variant.payload().resolve(reader.format(), &self.table) {
                Ok(resolved) => resolved,
                Err(consequence::Error::NoTerms) => {
                    warn!(
                        "skipping record at {}:{}: {}",
                        variant.chromosome(),
                        variant.position(),
                        consequence::Error::NoTerms
                    );
                    continue;
                }
                Err(source) => {
                    return Err(Error::Resolve {
                        chromosome: variant.chromosome().to_string(),
                        position: variant.position(),
                        source,
                    });
                }
            };

            let record = interval::Record::from_variant(&variant, &resolved);
            let rank = resolved.rank();

            held = match held.take() {
                None => Some(Held { record, rank }),
                Some(mut held) => {
                    if held.record.same_coordinates(&record)
                        && held.record.reference() == record.reference()
                    {
                        held.record
                            .union_alternatives(record.alternatives().iter().cloned());

                        if rank < held.rank {
                            held.record.adopt_labels(&record);
                            held.rank = rank;
                        }

                        Some(held)
                    } else if held.record.id() == record.id()
                        && held.record.kind() != record.kind()
                    {
                        // The same identifier under a different kind: the
                        // source merged distinct alterations under one id.
                        // The first record wins; the rest are redundant.
                        warn!(
                            "skipping record at {}:{}: redundant record for {}",
                            record.chromosome(),
                            variant.position(),
                            record.id()
                        );
                        Some(held)
                    } else {
                        sink(&held.record).map_err(Error::Write)?;
                        Some(Held { record, rank })
                    }
                }
            };
        }

        if let Some(held) = held {
            sink(&held.record).map_err(Error::Write)?;
        }

        Ok(())
    }

    /// Converts every record from the reader, collecting the interval
    /// records into a vector.
    ///
    /// # Examples
    ///
    /// ```
    /// use vartrack::Converter;
    /// use vartrack::Reader;
    /// use vartrack::severity::RankTable;
    ///
    /// let table = RankTable::from_json(r#"{"intron_variant": 26}"#)?;
    /// let data = b"1\t10175\trs3\tT\tC\t.\t.\tCSQ=C|intron_variant";
    ///
    /// let records = Converter::new(table).collect(&mut Reader::new(&data[..]))?;
    ///
    /// assert_eq!(records.len(), 1);
    /// assert_eq!(records[0].to_string(), "1\t10174\t10175\trs3\tSNV\tT\tC\t3\tintron_variant");
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn collect<T>(&self, reader: &mut Reader<T>) -> Result<Vec<interval::Record>, Error>
    where
        T: BufRead,
    {
        let mut records = Vec::new();
        self.convert(reader, |record| {
            records.push(record.clone());
            Ok(())
        })?;

        Ok(records)
    }
}
