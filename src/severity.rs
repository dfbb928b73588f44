//! Consequence severity ranks and groups.
//!
//! Every consequence term carries two measures of impact:
//!
//! - a **rank**, loaded from an external JSON resource, where a smaller rank
//!   means a more severe consequence, and
//! - a **group**, a coarse bucket from 1 (highest impact) to 5 (lowest
//!   impact) used as the numeric value in signal tracks.
//!
//! Ranks vary between annotation tool releases and are therefore read from a
//! file at startup. Groups are a stable presentation-level bucketing and ship
//! with the crate.

use std::collections::HashMap;
use std::io;
use std::path::Path;

use serde::Deserialize;

/// The highest-impact severity group.
pub const HIGHEST_IMPACT_GROUP: u8 = 1;

/// The lowest-impact severity group.
pub const LOWEST_IMPACT_GROUP: u8 = 5;

/// The built-in mapping from consequence term to severity group.
///
/// Terms ranked by the external resource but absent from this table fall into
/// the lowest-impact group.
const GROUPS: [(&str, u8); 45] = [
    ("frameshift_variant", 1),
    ("inframe_deletion", 1),
    ("inframe_insertion", 1),
    ("missense_variant", 1),
    ("protein_altering_variant", 1),
    ("start_lost", 1),
    ("stop_gained", 1),
    ("stop_lost", 1),
    ("splice_acceptor_variant", 2),
    ("splice_donor_5th_base_variant", 2),
    ("splice_donor_region_variant", 2),
    ("splice_donor_variant", 2),
    ("splice_polypyrimidine_tract_variant", 2),
    ("splice_region_variant", 2),
    ("3_prime_UTR_variant", 3),
    ("5_prime_UTR_variant", 3),
    ("coding_sequence_variant", 3),
    ("incomplete_terminal_codon_variant", 3),
    ("intron_variant", 3),
    ("mature_miRNA_variant", 3),
    ("NMD_transcript_variant", 3),
    ("non_coding_transcript_exon_variant", 3),
    ("non_coding_transcript_variant", 3),
    ("start_retained_variant", 3),
    ("stop_retained_variant", 3),
    ("synonymous_variant", 3),
    ("feature_elongation", 3),
    ("feature_truncation", 3),
    ("transcript_ablation", 3),
    ("transcript_amplification", 3),
    ("transcript_fusion", 3),
    ("transcript_translocation", 3),
    ("regulatory_region_variant", 4),
    ("TF_binding_site_variant", 4),
    ("regulatory_region_ablation", 4),
    ("regulatory_region_amplification", 4),
    ("regulatory_region_fusion", 4),
    ("regulatory_region_translocation", 4),
    ("TFBS_ablation", 4),
    ("TFBS_amplification", 4),
    ("TFBS_fusion", 4),
    ("TFBS_translocation", 4),
    ("upstream_gene_variant", 5),
    ("downstream_gene_variant", 5),
    ("intergenic_variant", 5),
];

/// An error associated with loading a rank table.
#[derive(Debug)]
pub enum Error {
    /// An I/O error while reading the rank resource.
    Io(io::Error),

    /// The rank resource was not valid JSON.
    Json(serde_json::Error),

    /// A rank value was neither a number nor a numeric string.
    InvalidRank(String, String),
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::Io(err) => write!(f, "i/o error: {err}"),
            Error::Json(err) => write!(f, "invalid rank resource: {err}"),
            Error::InvalidRank(term, value) => {
                write!(f, "invalid rank for term \"{term}\": \"{value}\"")
            }
        }
    }
}

impl std::error::Error for Error {}

/// A severity group.
///
/// Groups bucket consequence terms into five tiers, where group 1 carries the
/// highest impact and group 5 the lowest. The group is the per-base value
/// emitted into signal tracks.
#[derive(Clone, Copy, Debug, Eq, Ord, PartialEq, PartialOrd)]
pub struct Group(u8);

impl Group {
    /// Attempts to create a new severity group.
    ///
    /// [`None`] is returned if the value falls outside of 1 through 5.
    ///
    /// # Examples
    ///
    /// ```
    /// use vartrack::severity::Group;
    ///
    /// assert!(Group::try_new(3).is_some());
    /// assert!(Group::try_new(0).is_none());
    /// assert!(Group::try_new(6).is_none());
    /// ```
    pub fn try_new(value: u8) -> Option<Self> {
        if (HIGHEST_IMPACT_GROUP..=LOWEST_IMPACT_GROUP).contains(&value) {
            Some(Self(value))
        } else {
            None
        }
    }

    /// Gets the inner value of the group.
    ///
    /// # Examples
    ///
    /// ```
    /// use vartrack::severity::Group;
    ///
    /// let group = Group::try_new(2).unwrap();
    /// assert_eq!(group.get(), 2);
    /// ```
    pub fn get(&self) -> u8 {
        self.0
    }
}

impl std::fmt::Display for Group {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A rank table entry: the severity measures for a single consequence term.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Entry {
    /// The severity rank. Smaller is more severe.
    rank: u32,

    /// The severity group.
    group: Group,
}

impl Entry {
    /// Returns the rank of the entry.
    pub fn rank(&self) -> u32 {
        self.rank
    }

    /// Returns the group of the entry.
    pub fn group(&self) -> Group {
        self.group
    }
}

/// A rank value as it appears in the JSON resource.
///
/// Annotation tool releases have shipped ranks both as numbers and as numeric
/// strings, so both are accepted.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawRank {
    /// A numeric rank.
    Number(u32),

    /// A rank encoded as a string.
    Text(String),
}

/// A table mapping consequence terms to their severity measures.
///
/// The table is loaded once at startup and never mutated. A term encountered
/// in input but absent from the table indicates a schema mismatch between the
/// annotation run and the rank resource; callers treat that lookup failure as
/// fatal (see [`crate::consequence`]).
#[derive(Clone, Debug, Default)]
pub struct RankTable {
    /// The term-to-entry mapping.
    entries: HashMap<String, Entry>,
}

impl RankTable {
    /// Loads a rank table from a JSON string.
    ///
    /// The resource is a single JSON object mapping each consequence term to
    /// its rank. Groups are attached from the built-in group table.
    ///
    /// # Examples
    ///
    /// ```
    /// use vartrack::severity::RankTable;
    ///
    /// let table = RankTable::from_json(r#"{"missense_variant": 12, "intron_variant": "26"}"#)?;
    ///
    /// assert_eq!(table.get("missense_variant").unwrap().rank(), 12);
    /// assert_eq!(table.get("missense_variant").unwrap().group().get(), 1);
    /// assert_eq!(table.get("intron_variant").unwrap().rank(), 26);
    /// assert_eq!(table.get("intron_variant").unwrap().group().get(), 3);
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn from_json(json: &str) -> Result<Self, Error> {
        let raw: HashMap<String, RawRank> = serde_json::from_str(json).map_err(Error::Json)?;

        let mut entries = HashMap::with_capacity(raw.len());
        for (term, rank) in raw {
            let rank = match rank {
                RawRank::Number(n) => n,
                RawRank::Text(s) => s
                    .parse::<u32>()
                    .map_err(|_| Error::InvalidRank(term.clone(), s.clone()))?,
            };

            let group = group_for(&term);
            entries.insert(term, Entry { rank, group });
        }

        Ok(Self { entries })
    }

    /// Loads a rank table from a JSON file on disk.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, Error> {
        let json = std::fs::read_to_string(path).map_err(Error::Io)?;
        Self::from_json(&json)
    }

    /// Looks up the entry for a consequence term.
    ///
    /// # Examples
    ///
    /// ```
    /// use vartrack::severity::RankTable;
    ///
    /// let table = RankTable::from_json(r#"{"stop_gained": 4}"#)?;
    ///
    /// assert!(table.get("stop_gained").is_some());
    /// assert!(table.get("sneeze_variant").is_none());
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn get(&self, term: &str) -> Option<&Entry> {
        self.entries.get(term)
    }

    /// Returns the number of terms in the table.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns whether the table is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Returns the severity group for a term.
fn group_for(term: &str) -> Group {
    let value = GROUPS
        .iter()
        .find(|(t, _)| *t == term)
        .map(|(_, g)| *g)
        .unwrap_or(LOWEST_IMPACT_GROUP);

    // The built-in table only holds values within 1..=5, and the fallback is
    // within range too.
    Group(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_groups_are_all_within_range() {
        for (term, value) in GROUPS {
            assert!(
                Group::try_new(value).is_some(),
                "group for {term} out of range"
            );
        }
    }

    #[test]
    fn test_loading_a_rank_table() -> Result<(), Box<dyn std::error::Error>> {
        let table = RankTable::from_json(
            r#"{
                "stop_gained": "4",
                "splice_region_variant": 13,
                "intergenic_variant": 38
            }"#,
        )?;

        assert_eq!(table.len(), 3);

        let entry = table.get("stop_gained").unwrap();
        assert_eq!(entry.rank(), 4);
        assert_eq!(entry.group().get(), 1);

        let entry = table.get("splice_region_variant").unwrap();
        assert_eq!(entry.rank(), 13);
        assert_eq!(entry.group().get(), 2);

        let entry = table.get("intergenic_variant").unwrap();
        assert_eq!(entry.rank(), 38);
        assert_eq!(entry.group().get(), 5);

        Ok(())
    }

    #[test]
    fn test_unbucketed_terms_fall_into_the_lowest_impact_group()
    -> Result<(), Box<dyn std::error::Error>> {
        let table = RankTable::from_json(r#"{"sequence_variant": 39}"#)?;
        assert_eq!(
            table.get("sequence_variant").unwrap().group().get(),
            LOWEST_IMPACT_GROUP
        );
        Ok(())
    }

    #[test]
    fn test_invalid_rank() {
        let err = RankTable::from_json(r#"{"stop_gained": "four"}"#).unwrap_err();
        assert_eq!(
            err.to_string(),
            "invalid rank for term \"stop_gained\": \"four\""
        );
    }

    #[test]
    fn test_invalid_json() {
        let err = RankTable::from_json("not json").unwrap_err();
        assert!(err.to_string().starts_with("invalid rank resource:"));
    }
}
