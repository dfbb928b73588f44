//! A variant record parsed from one data line of VCF.

use std::num::ParseIntError;

use nonempty::NonEmpty;

use crate::consequence::Payload;

/// The delimiter between VCF columns.
const FIELD_DELIMITER: char = '\t';

/// The delimiter between merged identifiers within the ID column.
const ID_DELIMITER: char = ';';

/// The delimiter between alternative alleles within the ALT column.
const ALT_DELIMITER: char = ',';

/// The delimiter between entries within the INFO column.
const INFO_DELIMITER: char = ';';

/// The placeholder for a missing value.
const MISSING: &str = ".";

/// The INFO key holding the annotation payload.
const PAYLOAD_KEY: &str = "CSQ";

/// The number of mandatory VCF columns.
const NUM_MANDATORY_FIELDS: usize = 8;

/// The longest chromosome name the downstream track encoder accepts.
pub const MAX_CHROMOSOME_LEN: usize = 31;

/// An error associated with parsing a variant record.
///
/// Parse errors are structural problems with a line; records that are
/// well-formed but unusable are reported as a [`Skip`] instead.
#[derive(Debug)]
pub enum ParseError {
    /// An incorrect number of columns in the line.
    IncorrectNumberOfFields(usize),

    /// An invalid position.
    InvalidPosition(ParseIntError),

    /// A position of zero (positions are 1-based).
    ZeroPosition,

    /// A missing or empty reference allele.
    InvalidReference(String),
}

impl std::fmt::Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ParseError::IncorrectNumberOfFields(n) => write!(
                f,
                "invalid number of fields in variant record: expected at least \
                 {NUM_MANDATORY_FIELDS} fields, found {n} fields"
            ),
            ParseError::InvalidPosition(err) => write!(f, "invalid position: {err}"),
            ParseError::ZeroPosition => write!(f, "invalid position: positions are 1-based"),
            ParseError::InvalidReference(s) => write!(f, "invalid reference allele: \"{s}\""),
        }
    }
}

impl std::error::Error for ParseError {}

/// The reason a well-formed record was set aside rather than converted.
///
/// Skips are logged and the record is dropped; they never abort a run.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Skip {
    /// The record carried no identifier (or the `.` placeholder).
    MissingId,

    /// The record carried more than one identifier after splitting on the
    /// merge delimiter. Merged identifiers mean the record's history is
    /// ambiguous, so the whole record is dropped.
    MultipleIds(usize),

    /// The chromosome name is too long for the downstream track encoder.
    ChromosomeTooLong(usize),

    /// The record carried no alternative alleles.
    NoAlternateAlleles,

    /// The record carried no annotation payload.
    NoPayload,
}

impl std::fmt::Display for Skip {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Skip::MissingId => write!(f, "missing identifier"),
            Skip::MultipleIds(n) => write!(f, "expected one identifier, found {n}"),
            Skip::ChromosomeTooLong(n) => write!(
                f,
                "chromosome name of {n} bytes exceeds the maximum of {MAX_CHROMOSOME_LEN}"
            ),
            Skip::NoAlternateAlleles => write!(f, "no alternative alleles"),
            Skip::NoPayload => write!(f, "no annotation payload"),
        }
    }
}

/// The outcome of parsing one data line: either a usable record or a reason
/// it was skipped.
#[derive(Debug)]
pub enum Parsed {
    /// A usable variant record.
    Record(Record),

    /// A record that was set aside, with the location it occupied so the skip
    /// can be reported.
    Skipped {
        /// The chromosome of the skipped record.
        chromosome: String,

        /// The 1-based position of the skipped record.
        position: u64,

        /// The reason the record was skipped.
        reason: Skip,
    },
}

/// A variant record.
///
/// Records are immutable after parsing: a record is either converted into an
/// interval record or dropped.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Record {
    /// The chromosome name.
    chromosome: String,

    /// The 1-based position of the first reference base.
    position: u64,

    /// The identifier. Always exactly one after parsing.
    id: String,

    /// The reference allele.
    reference: String,

    /// The alternative alleles, in file order.
    alternatives: NonEmpty<String>,

    /// The raw annotation payload.
    payload: Payload,
}

impl Record {
    /// Parses one data line of VCF.
    ///
    /// # Examples
    ///
    /// ```
    /// use vartrack::variant::record::Parsed;
    /// use vartrack::variant::record::Record;
    ///
    /// let line = "1\t10175\trs1553116846\tT\tC\t.\t.\tCSQ=C|intron_variant||SNV";
    /// let record = match Record::parse(line)? {
    ///     Parsed::Record(record) => record,
    ///     Parsed::Skipped { .. } => unreachable!(),
    /// };
    ///
    /// assert_eq!(record.chromosome(), "1");
    /// assert_eq!(record.position(), 10175);
    /// assert_eq!(record.id(), "rs1553116846");
    /// assert_eq!(record.reference(), "T");
    /// assert_eq!(record.start(), 10174);
    /// assert_eq!(record.end(), 10175);
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn parse(line: &str) -> Result<Parsed, ParseError> {
        let fields = line.split(FIELD_DELIMITER).collect::<Vec<_>>();
        if fields.len() < NUM_MANDATORY_FIELDS {
            return Err(ParseError::IncorrectNumberOfFields(fields.len()));
        }

        let chromosome = fields[0].to_string();
        let position = fields[1]
            .parse::<u64>()
            .map_err(ParseError::InvalidPosition)?;
        if position == 0 {
            return Err(ParseError::ZeroPosition);
        }

        let skipped = |reason: Skip| {
            Ok(Parsed::Skipped {
                chromosome: chromosome.clone(),
                position,
                reason,
            })
        };

        let ids = fields[2]
            .split(ID_DELIMITER)
            .filter(|id| !id.is_empty() && *id != MISSING)
            .collect::<Vec<_>>();
        let id = match ids.as_slice() {
            [] => return skipped(Skip::MissingId),
            [id] => id.to_string(),
            more => return skipped(Skip::MultipleIds(more.len())),
        };

        if chromosome.len() > MAX_CHROMOSOME_LEN {
            return skipped(Skip::ChromosomeTooLong(chromosome.len()));
        }

        let reference = fields[3].to_string();
        if reference.is_empty() || reference == MISSING {
            return Err(ParseError::InvalidReference(reference));
        }

        let alternatives = NonEmpty::collect(
            fields[4]
                .split(ALT_DELIMITER)
                .filter(|alt| !alt.is_empty() && *alt != MISSING)
                .map(|alt| alt.to_string()),
        );
        let alternatives = match alternatives {
            Some(alternatives) => alternatives,
            None => return skipped(Skip::NoAlternateAlleles),
        };

        let payload = fields[7]
            .split(INFO_DELIMITER)
            .find_map(|entry| entry.strip_prefix(PAYLOAD_KEY).and_then(|rest| rest.strip_prefix('=')))
            .map(Payload::new);
        let payload = match payload {
            Some(payload) => payload,
            None => return skipped(Skip::NoPayload),
        };

        Ok(Parsed::Record(Record {
            chromosome,
            position,
            id,
            reference,
            alternatives,
            payload,
        }))
    }

    /// Returns the chromosome name.
    pub fn chromosome(&self) -> &str {
        &self.chromosome
    }

    /// Returns the 1-based position.
    pub fn position(&self) -> u64 {
        self.position
    }

    /// Returns the identifier.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Returns the reference allele.
    pub fn reference(&self) -> &str {
        &self.reference
    }

    /// Returns the alternative alleles.
    pub fn alternatives(&self) -> &NonEmpty<String> {
        &self.alternatives
    }

    /// Returns the annotation payload.
    pub fn payload(&self) -> &Payload {
        &self.payload
    }

    /// Returns the 0-based start of the record.
    ///
    /// For all valid records, `start == position - 1`.
    pub fn start(&self) -> u64 {
        self.position - 1
    }

    /// Returns the 0-based exclusive end of the record.
    ///
    /// For all valid records, `end - start` equals the length of the
    /// reference allele.
    pub fn end(&self) -> u64 {
        self.start() + self.reference.len() as u64
    }
}
