//! An interval record.
//!
//! An interval record is one line of the intermediate tab-delimited file that
//! sits between VCF conversion and the external track encoders:
//!
//! ```text
//! chrom  start  end  id  kind  ref  alt,alt  group  consequence
//! ```
//!
//! Coordinates are 0-based and half-open. The format is consumed by the
//! [merger](crate::merge) and the [signal writer](crate::signal), and — once
//! sorted — by the external interval-indexing tool.

use std::collections::BTreeSet;
use std::num::ParseIntError;
use std::str::FromStr;

use crate::consequence;
use crate::consequence::MostSevere;
use crate::severity::Group;
use crate::variant;
use crate::variant::Kind;
use crate::variant::record::MAX_CHROMOSOME_LEN;

/// The delimiter between columns.
pub const FIELD_DELIMITER: char = '\t';

/// The delimiter between alternative alleles within the alt column.
pub const ALT_DELIMITER: char = ',';

/// The number of columns in an interval record.
pub const NUM_FIELDS: usize = 9;

/// An error associated with parsing an interval record.
#[derive(Debug)]
pub enum ParseError {
    /// An incorrect number of columns.
    IncorrectNumberOfFields(usize),

    /// A chromosome name too long for the downstream track encoder.
    ChromosomeTooLong(usize),

    /// An invalid start coordinate.
    InvalidStart(ParseIntError),

    /// An invalid end coordinate.
    InvalidEnd(ParseIntError),

    /// An end that does not come strictly after the start.
    InvalidCoordinates(u64, u64),

    /// An invalid variant kind.
    InvalidKind(variant::kind::ParseError),

    /// An empty alternative allele column.
    NoAlternateAlleles,

    /// An invalid severity group.
    InvalidGroup(String),
}

impl std::fmt::Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ParseError::IncorrectNumberOfFields(n) => write!(
                f,
                "invalid number of fields in interval record: expected {NUM_FIELDS} fields, \
                 found {n} fields"
            ),
            ParseError::ChromosomeTooLong(n) => write!(
                f,
                "chromosome name of {n} bytes exceeds the maximum of {MAX_CHROMOSOME_LEN}"
            ),
            ParseError::InvalidStart(err) => write!(f, "invalid start: {err}"),
            ParseError::InvalidEnd(err) => write!(f, "invalid end: {err}"),
            ParseError::InvalidCoordinates(start, end) => write!(
                f,
                "invalid coordinates: end ({end}) must be strictly greater than start ({start})"
            ),
            ParseError::InvalidKind(err) => write!(f, "{err}"),
            ParseError::NoAlternateAlleles => write!(f, "no alternative alleles"),
            ParseError::InvalidGroup(s) => write!(f, "invalid severity group: \"{s}\""),
        }
    }
}

impl std::error::Error for ParseError {}

/// An interval record.
///
/// Invariants, enforced at construction: `end > start`, the chromosome name
/// fits the track-encoder limit, there is exactly one identifier, and the
/// alternative allele set is non-empty.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Record {
    /// The chromosome name.
    chromosome: String,

    /// The 0-based start.
    start: u64,

    /// The 0-based exclusive end.
    end: u64,

    /// The identifier.
    id: String,

    /// The variant kind.
    kind: Kind,

    /// The reference allele.
    reference: String,

    /// The alternative alleles. Kept sorted so emission order is
    /// deterministic within a run.
    alternatives: BTreeSet<String>,

    /// The severity group.
    group: Group,

    /// The most severe consequence term.
    consequence: String,
}

impl Record {
    /// Builds an interval record from a variant record and its resolved most
    /// severe consequence.
    ///
    /// The kind is classified from allele lengths, except that an explicit
    /// `sequence_alteration` variant class in the payload is preserved as-is
    /// rather than being relabeled.
    ///
    /// This is total for records that survived parsing: the upstream skips
    /// guarantee the chromosome fits and the reference is non-empty, so every
    /// invariant holds by construction.
    ///
    /// # Examples
    ///
    /// ```
    /// use vartrack::consequence::Format;
    /// use vartrack::interval;
    /// use vartrack::severity::RankTable;
    /// use vartrack::variant::Kind;
    /// use vartrack::variant::record::Parsed;
    /// use vartrack::variant::record::Record;
    ///
    /// let table = RankTable::from_json(r#"{"intron_variant": 26}"#)?;
    /// let variant = match Record::parse("1\t10175\trs3\tT\tC\t.\t.\tCSQ=C|intron_variant")? {
    ///     Parsed::Record(record) => record,
    ///     Parsed::Skipped { .. } => unreachable!(),
    /// };
    ///
    /// let resolved = variant.payload().resolve(&Format::default(), &table)?;
    /// let interval = interval::Record::from_variant(&variant, &resolved);
    ///
    /// assert_eq!(interval.chromosome(), "1");
    /// assert_eq!(interval.start(), 10174);
    /// assert_eq!(interval.end(), 10175);
    /// assert_eq!(interval.kind(), Kind::Snv);
    /// assert_eq!(interval.consequence(), "intron_variant");
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn from_variant(variant: &variant::Record, resolved: &MostSevere) -> Self {
        let kind = match resolved.class() {
            Some(consequence::SEQUENCE_ALTERATION) => Kind::SequenceAlteration,
            _ => Kind::classify(variant.reference(), variant.alternatives()),
        };

        Self {
            chromosome: variant.chromosome().to_string(),
            start: variant.start(),
            end: variant.end(),
            id: variant.id().to_string(),
            kind,
            reference: variant.reference().to_string(),
            alternatives: variant.alternatives().iter().cloned().collect(),
            group: resolved.group(),
            consequence: resolved.term().to_string(),
        }
    }

    /// Returns the chromosome name.
    pub fn chromosome(&self) -> &str {
        &self.chromosome
    }

    /// Returns the 0-based start.
    pub fn start(&self) -> u64 {
        self.start
    }

    /// Returns the 0-based exclusive end.
    pub fn end(&self) -> u64 {
        self.end
    }

    /// Returns the identifier.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Returns the variant kind.
    pub fn kind(&self) -> Kind {
        self.kind
    }

    /// Returns the reference allele.
    pub fn reference(&self) -> &str {
        &self.reference
    }

    /// Returns the alternative alleles.
    pub fn alternatives(&self) -> &BTreeSet<String> {
        &self.alternatives
    }

    /// Returns the severity group.
    pub fn group(&self) -> Group {
        self.group
    }

    /// Returns the most severe consequence term.
    pub fn consequence(&self) -> &str {
        &self.consequence
    }

    /// Returns whether two records occupy exactly the same coordinates.
    ///
    /// Exact equality of (chromosome, start, end) is the only merge
    /// compatibility there is: adjacent or partially overlapping records are
    /// never merged.
    pub fn same_coordinates(&self, other: &Record) -> bool {
        self.chromosome == other.chromosome && self.start == other.start && self.end == other.end
    }

    /// Adds the given alleles to the alternative allele set.
    ///
    /// Merging alt sets this way is commutative and idempotent.
    pub fn union_alternatives<I>(&mut self, alternatives: I)
    where
        I: IntoIterator<Item = String>,
    {
        self.alternatives.extend(alternatives);
    }

    /// Replaces the severity labels (kind, group, consequence) with those of
    /// `other`.
    ///
    /// Used when a same-coordinate record resolves to a strictly more severe
    /// consequence than the one currently held.
    pub(crate) fn adopt_labels(&mut self, other: &Record) {
        self.kind = other.kind;
        self.group = other.group;
        self.consequence = other.consequence.clone();
    }
}

impl FromStr for Record {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let fields = s.split(FIELD_DELIMITER).collect::<Vec<_>>();
        if fields.len() != NUM_FIELDS {
            return Err(ParseError::IncorrectNumberOfFields(fields.len()));
        }

        let chromosome = fields[0].to_string();
        if chromosome.len() > MAX_CHROMOSOME_LEN {
            return Err(ParseError::ChromosomeTooLong(chromosome.len()));
        }

        let start = fields[1].parse::<u64>().map_err(ParseError::InvalidStart)?;
        let end = fields[2].parse::<u64>().map_err(ParseError::InvalidEnd)?;
        if end <= start {
            return Err(ParseError::InvalidCoordinates(start, end));
        }

        let id = fields[3].to_string();
        let kind = fields[4].parse::<Kind>().map_err(ParseError::InvalidKind)?;
        let reference = fields[5].to_string();

        let alternatives = fields[6]
            .split(ALT_DELIMITER)
            .filter(|alt| !alt.is_empty())
            .map(|alt| alt.to_string())
            .collect::<BTreeSet<_>>();
        if alternatives.is_empty() {
            return Err(ParseError::NoAlternateAlleles);
        }

        let group = fields[7]
            .parse::<u8>()
            .ok()
            .and_then(Group::try_new)
            .ok_or_else(|| ParseError::InvalidGroup(fields[7].into()))?;

        let consequence = fields[8].to_string();

        Ok(Self {
            chromosome,
            start,
            end,
            id,
            kind,
            reference,
            alternatives,
            group,
            consequence,
        })
    }
}

impl std::fmt::Display for Record {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let alternatives = self
            .alternatives
            .iter()
            .cloned()
            .collect::<Vec<_>>()
            .join(ALT_DELIMITER.to_string().as_str());

        write!(
            f,
            "{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}",
            self.chromosome,
            self.start,
            self.end,
            self.id,
            self.kind,
            self.reference,
            alternatives,
            self.group,
            self.consequence
        )
    }
}

#[cfg(test)]
pub mod tests {
    use super::*;

    #[test]
    fn test_round_trip() -> Result<(), Box<dyn std::error::Error>> {
        let line = "1\t10174\t10175\trs3\tSNV\tT\tC,G\t3\tintron_variant";
        let record = line.parse::<Record>()?;

        assert_eq!(record.chromosome(), "1");
        assert_eq!(record.start(), 10174);
        assert_eq!(record.end(), 10175);
        assert_eq!(record.id(), "rs3");
        assert_eq!(record.kind(), Kind::Snv);
        assert_eq!(record.reference(), "T");
        assert_eq!(record.alternatives().len(), 2);
        assert_eq!(record.group().get(), 3);
        assert_eq!(record.consequence(), "intron_variant");

        assert_eq!(record.to_string(), line);

        Ok(())
    }

    #[test]
    fn test_alternatives_are_emitted_sorted() -> Result<(), Box<dyn std::error::Error>> {
        let record = "1\t10\t11\trs1\tSNV\tA\tT,C,G\t3\tintron_variant".parse::<Record>()?;
        assert_eq!(record.to_string(), "1\t10\t11\trs1\tSNV\tA\tC,G,T\t3\tintron_variant");
        Ok(())
    }

    #[test]
    fn test_union_is_commutative_and_idempotent() -> Result<(), Box<dyn std::error::Error>> {
        let a = "1\t10\t11\trs1\tSNV\tA\tC\t3\tintron_variant".parse::<Record>()?;
        let b = "1\t10\t11\trs1\tSNV\tA\tT\t3\tintron_variant".parse::<Record>()?;

        let mut a_then_b = a.clone();
        a_then_b.union_alternatives(b.alternatives().iter().cloned());

        let mut b_then_a = b.clone();
        b_then_a.union_alternatives(a.alternatives().iter().cloned());

        assert_eq!(a_then_b.alternatives(), b_then_a.alternatives());

        let before = a_then_b.alternatives().clone();
        a_then_b.union_alternatives(b.alternatives().iter().cloned());
        assert_eq!(a_then_b.alternatives(), &before);

        Ok(())
    }

    #[test]
    fn test_same_coordinates() -> Result<(), Box<dyn std::error::Error>> {
        let a = "1\t10\t15\trs1\tdeletion\tACGTA\tA\t3\tintron_variant".parse::<Record>()?;
        let b = "1\t10\t15\trs2\tdeletion\tACGTA\tG\t3\tintron_variant".parse::<Record>()?;
        let c = "1\t10\t16\trs3\tdeletion\tACGTAC\tA\t3\tintron_variant".parse::<Record>()?;

        assert!(a.same_coordinates(&b));
        assert!(!a.same_coordinates(&c));

        Ok(())
    }

    #[test]
    fn test_invalid_number_of_fields() {
        let err = "1\t10\t11".parse::<Record>().unwrap_err();
        assert_eq!(
            err.to_string(),
            "invalid number of fields in interval record: expected 9 fields, found 3 fields"
        );
    }

    #[test]
    fn test_invalid_coordinates() {
        let err = "1\t11\t11\trs1\tSNV\tA\tC\t3\tintron_variant"
            .parse::<Record>()
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "invalid coordinates: end (11) must be strictly greater than start (11)"
        );
    }

    #[test]
    fn test_chromosome_too_long() {
        let line = format!("{}\t10\t11\trs1\tSNV\tA\tC\t3\tintron_variant", "Q".repeat(32));
        let err = line.parse::<Record>().unwrap_err();
        assert_eq!(
            err.to_string(),
            "chromosome name of 32 bytes exceeds the maximum of 31"
        );
    }

    #[test]
    fn test_invalid_kind() {
        let err = "1\t10\t11\trs1\twibble\tA\tC\t3\tintron_variant"
            .parse::<Record>()
            .unwrap_err();
        assert_eq!(err.to_string(), "invalid variant kind: \"wibble\"");
    }

    #[test]
    fn test_invalid_group() {
        let err = "1\t10\t11\trs1\tSNV\tA\tC\t9\tintron_variant"
            .parse::<Record>()
            .unwrap_err();
        assert_eq!(err.to_string(), "invalid severity group: \"9\"");
    }
}
