//! Annotation payloads and most-severe-consequence resolution.
//!
//! The annotation tool writes its predictions into the `CSQ` INFO field as a
//! comma-separated list of per-allele blocks. Each block is pipe-delimited,
//! and the consequence field within a block may itself hold several
//! ampersand-joined consequence terms. A [`Payload`] wraps one such value and
//! can resolve the single most severe term across every block, using a
//! [`RankTable`](crate::severity::RankTable).

use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;

use crate::severity;
use crate::severity::Group;
use crate::severity::RankTable;

/// The delimiter between per-allele annotation blocks.
const BLOCK_DELIMITER: char = ',';

/// The delimiter between fields within a block.
const FIELD_DELIMITER: char = '|';

/// The delimiter between terms within the consequence field.
const TERM_DELIMITER: char = '&';

/// The default index of the consequence field within a block.
const DEFAULT_CONSEQUENCE_INDEX: usize = 1;

/// The default index of the variant-class field within a block.
const DEFAULT_VARIANT_CLASS_INDEX: usize = 21;

/// The variant-class label that is carried through to intervals verbatim.
pub(crate) const SEQUENCE_ALTERATION: &str = "sequence_alteration";

/// The pattern extracting the block layout from the `CSQ` meta line.
static FORMAT_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    // The description ends at the closing quote; the format string is the
    // last thing inside it.
    Regex::new(r#"##INFO=<ID=CSQ,.*Format: ([^">]+)"#).unwrap()
});

/// An error associated with resolving a payload.
#[derive(Debug)]
pub enum Error {
    /// A consequence term was not present in the rank table.
    ///
    /// This indicates a mismatch between the annotation run and the rank
    /// resource and is treated as fatal by callers.
    UnknownTerm(String),

    /// The payload contained no consequence terms at all.
    NoTerms,
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::UnknownTerm(term) => {
                write!(f, "consequence term not present in rank table: \"{term}\"")
            }
            Error::NoTerms => write!(f, "annotation payload contains no consequence terms"),
        }
    }
}

impl std::error::Error for Error {}

/// The layout of fields within an annotation block.
///
/// The annotation tool records the layout in the `Description` attribute of
/// the `CSQ` meta line. When no meta line is available, the indices default
/// to the layout the tool has shipped with for years: consequence second,
/// variant class twenty-second.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Format {
    /// The index of the consequence field.
    consequence: usize,

    /// The index of the variant-class field, when the annotation run included
    /// one.
    variant_class: Option<usize>,
}

impl Format {
    /// Attempts to extract a format from a `##INFO=<ID=CSQ,...>` meta line.
    ///
    /// [`None`] is returned if the line does not describe the `CSQ` field or
    /// does not carry a `Format:` string naming a `Consequence` field.
    ///
    /// # Examples
    ///
    /// ```
    /// use vartrack::consequence::Format;
    ///
    /// let line = r#"##INFO=<ID=CSQ,Number=.,Type=String,Description="Consequence annotations from Ensembl VEP. Format: Allele|Consequence|IMPACT|VARIANT_CLASS">"#;
    ///
    /// let format = Format::from_meta_line(line).unwrap();
    /// assert_eq!(format.consequence(), 1);
    /// assert_eq!(format.variant_class(), Some(3));
    /// ```
    pub fn from_meta_line(line: &str) -> Option<Self> {
        let captures = FORMAT_REGEX.captures(line)?;
        let fields = captures
            .get(1)
            .map(|m| m.as_str().split(FIELD_DELIMITER).collect::<Vec<_>>())?;

        let consequence = fields.iter().position(|f| *f == "Consequence")?;
        let variant_class = fields.iter().position(|f| *f == "VARIANT_CLASS");

        Some(Self {
            consequence,
            variant_class,
        })
    }

    /// Returns the index of the consequence field.
    pub fn consequence(&self) -> usize {
        self.consequence
    }

    /// Returns the index of the variant-class field, if any.
    pub fn variant_class(&self) -> Option<usize> {
        self.variant_class
    }
}

impl Default for Format {
    fn default() -> Self {
        Self {
            consequence: DEFAULT_CONSEQUENCE_INDEX,
            variant_class: Some(DEFAULT_VARIANT_CLASS_INDEX),
        }
    }
}

/// The outcome of resolving a payload: the single most severe consequence
/// across every block and term.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct MostSevere {
    /// The winning consequence term.
    term: String,

    /// The rank of the winning term.
    rank: u32,

    /// The severity group of the winning term.
    group: Group,

    /// The variant class declared by the block that supplied the winning
    /// term, when non-empty.
    class: Option<String>,
}

impl MostSevere {
    /// Returns the winning consequence term.
    pub fn term(&self) -> &str {
        &self.term
    }

    /// Returns the rank of the winning term.
    pub fn rank(&self) -> u32 {
        self.rank
    }

    /// Returns the severity group of the winning term.
    pub fn group(&self) -> Group {
        self.group
    }

    /// Returns the variant class declared alongside the winning term, if any.
    pub fn class(&self) -> Option<&str> {
        self.class.as_deref()
    }
}

/// A raw annotation payload: the value of the `CSQ` INFO field for a single
/// variant record.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Payload(String);

impl Payload {
    /// Creates a payload from the raw `CSQ` value.
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    /// Gets the raw value of the payload.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Resolves the single most severe consequence across the payload.
    ///
    /// Every comma-separated block and every ampersand-joined term within the
    /// consequence field is considered; the term with the strictly smallest
    /// rank wins, with ties going to the first term seen.
    ///
    /// # Errors
    ///
    /// A term absent from the rank table yields [`Error::UnknownTerm`]; the
    /// caller decides whether to abort, but a missing term is a schema
    /// mismatch, not a data-quality problem, so it should. A payload without
    /// any terms yields [`Error::NoTerms`].
    ///
    /// # Examples
    ///
    /// ```
    /// use vartrack::consequence::Format;
    /// use vartrack::consequence::Payload;
    /// use vartrack::severity::RankTable;
    ///
    /// let table = RankTable::from_json(r#"{"missense_variant": 12, "intron_variant": 26}"#)?;
    /// let payload = Payload::new("T|intron_variant&missense_variant|MODIFIER|SNV");
    ///
    /// let resolved = payload.resolve(&Format::from_meta_line(
    ///     r#"##INFO=<ID=CSQ,Description="Format: Allele|Consequence|IMPACT|VARIANT_CLASS">"#,
    /// ).unwrap(), &table)?;
    ///
    /// assert_eq!(resolved.term(), "missense_variant");
    /// assert_eq!(resolved.rank(), 12);
    /// assert_eq!(resolved.group().get(), 1);
    /// assert_eq!(resolved.class(), Some("SNV"));
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn resolve(&self, format: &Format, table: &RankTable) -> Result<MostSevere, Error> {
        let mut best: Option<(String, u32, severity::Group, Option<String>)> = None;

        for block in self.0.split(BLOCK_DELIMITER) {
            let fields = block.split(FIELD_DELIMITER).collect::<Vec<_>>();

            let terms = match fields.get(format.consequence()) {
                Some(value) if !value.is_empty() => *value,
                _ => continue,
            };

            let class = format
                .variant_class()
                .and_then(|i| fields.get(i))
                .filter(|value| !value.is_empty())
                .map(|value| value.to_string());

            for term in terms.split(TERM_DELIMITER) {
                if term.is_empty() {
                    continue;
                }

                let entry = table
                    .get(term)
                    .ok_or_else(|| Error::UnknownTerm(term.into()))?;

                let strictly_better = match &best {
                    Some((_, rank, _, _)) => entry.rank() < *rank,
                    None => true,
                };

                if strictly_better {
                    best = Some((term.into(), entry.rank(), entry.group(), class.clone()));
                }
            }
        }

        best.map(|(term, rank, group, class)| MostSevere {
            term,
            rank,
            group,
            class,
        })
        .ok_or(Error::NoTerms)
    }
}

impl FromStr for Payload {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::new(s))
    }
}

impl std::fmt::Display for Payload {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
pub mod tests {
    use super::*;

    /// A small table covering the terms used in this module's tests.
    fn table() -> RankTable {
        RankTable::from_json(
            r#"{
                "stop_gained": 4,
                "missense_variant": 12,
                "splice_region_variant": 13,
                "intron_variant": 26,
                "upstream_gene_variant": 29
            }"#,
        )
        .unwrap()
    }

    #[test]
    fn test_resolution_is_order_independent() -> Result<(), Box<dyn std::error::Error>> {
        let format = Format::default();
        let table = table();

        // The winner must be the smaller rank regardless of which order the
        // terms arrive in.
        let forward = Payload::new("T|splice_region_variant&missense_variant")
            .resolve(&format, &table)?;
        let backward = Payload::new("T|missense_variant&splice_region_variant")
            .resolve(&format, &table)?;

        assert_eq!(forward.term(), "missense_variant");
        assert_eq!(backward.term(), "missense_variant");

        Ok(())
    }

    #[test]
    fn test_resolution_spans_every_block() -> Result<(), Box<dyn std::error::Error>> {
        let resolved = Payload::new("T|intron_variant,C|upstream_gene_variant,T|stop_gained")
            .resolve(&Format::default(), &table())?;

        assert_eq!(resolved.term(), "stop_gained");
        assert_eq!(resolved.rank(), 4);
        assert_eq!(resolved.group().get(), 1);

        Ok(())
    }

    #[test]
    fn test_ties_go_to_the_first_term_seen() -> Result<(), Box<dyn std::error::Error>> {
        let table = RankTable::from_json(r#"{"intron_variant": 26, "upstream_gene_variant": 26}"#)?;

        let resolved = Payload::new("T|intron_variant&upstream_gene_variant")
            .resolve(&Format::default(), &table)?;
        assert_eq!(resolved.term(), "intron_variant");

        Ok(())
    }

    #[test]
    fn test_unknown_term_is_an_error() {
        let err = Payload::new("T|warp_drive_variant")
            .resolve(&Format::default(), &table())
            .unwrap_err();

        assert_eq!(
            err.to_string(),
            "consequence term not present in rank table: \"warp_drive_variant\""
        );
    }

    #[test]
    fn test_payload_without_terms_is_an_error() {
        let err = Payload::new("T|")
            .resolve(&Format::default(), &table())
            .unwrap_err();

        assert_eq!(
            err.to_string(),
            "annotation payload contains no consequence terms"
        );
    }

    #[test]
    fn test_class_comes_from_the_winning_block() -> Result<(), Box<dyn std::error::Error>> {
        let format = Format::from_meta_line(
            r#"##INFO=<ID=CSQ,Description="Format: Allele|Consequence|VARIANT_CLASS">"#,
        )
        .unwrap();

        let resolved = Payload::new("T|intron_variant|SNV,TA|stop_gained|sequence_alteration")
            .resolve(&format, &table())?;

        assert_eq!(resolved.term(), "stop_gained");
        assert_eq!(resolved.class(), Some("sequence_alteration"));

        Ok(())
    }

    #[test]
    fn test_format_discovery_defaults() {
        let format = Format::default();
        assert_eq!(format.consequence(), 1);
        assert_eq!(format.variant_class(), Some(21));
    }

    #[test]
    fn test_format_discovery_ignores_other_meta_lines() {
        assert!(Format::from_meta_line("##fileformat=VCFv4.2").is_none());
        assert!(
            Format::from_meta_line(r#"##INFO=<ID=DP,Number=1,Description="Total depth">"#)
                .is_none()
        );
    }
}
