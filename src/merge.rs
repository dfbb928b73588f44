//! Merging interval records across sources.
//!
//! A track is often assembled from several input datasets ("sources") that
//! each contribute intervals for the same chromosome. Merging concatenates
//! the sources in ascending priority order and then:
//!
//! - drops any record whose identifier was already contributed by an earlier
//!   source (first source wins);
//! - collapses records occupying exactly the same (chromosome, start, end)
//!   into one record whose alternative allele set is the union of the
//!   inputs, keeping the labels of the earliest record;
//! - emits the result sorted by (start, end, identifier).
//!
//! Records at merely adjacent or partially overlapping coordinates are never
//! merged. Each chromosome is merged independently; there is no state shared
//! across chromosomes, so shards can be merged in parallel.

use std::collections::HashMap;
use std::collections::HashSet;
use std::path::Path;
use std::path::PathBuf;

use crate::interval::Record;
use crate::shard;

/// A single input dataset contributing intervals to a merge.
#[derive(Clone, Debug)]
pub struct Source {
    /// The priority index. Lower wins on collision.
    priority: u32,

    /// The interval records contributed by this source.
    records: Vec<Record>,
}

impl Source {
    /// Creates a source from in-memory records.
    pub fn new(priority: u32, records: Vec<Record>) -> Self {
        Self { priority, records }
    }

    /// Loads a source from a per-chromosome interval file.
    pub fn from_path(priority: u32, path: impl AsRef<Path>) -> Result<Self, Error> {
        let path = path.as_ref();
        let records = shard::read_records(path)
            .map_err(|e| Error::Source(path.to_path_buf(), e))?;

        Ok(Self { priority, records })
    }

    /// Returns the priority index of the source.
    pub fn priority(&self) -> u32 {
        self.priority
    }

    /// Returns the records contributed by the source.
    pub fn records(&self) -> &[Record] {
        &self.records
    }
}

/// An error related to merging.
#[derive(Debug)]
pub enum Error {
    /// A source file could not be read.
    Source(PathBuf, shard::ReadError),
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::Source(path, err) => {
                write!(f, "source {}: {err}", path.display())
            }
        }
    }
}

impl std::error::Error for Error {}

/// Merges interval records contributed by multiple sources.
///
/// See the [module documentation](crate::merge) for the semantics. The
/// returned records are sorted by (chromosome, start, end, identifier), so
/// the output of a single-chromosome merge satisfies the ordering the
/// external interval-indexing tool expects.
///
/// # Examples
///
/// ```
/// use vartrack::interval::Record;
/// use vartrack::merge;
/// use vartrack::merge::Source;
///
/// let a = "1\t10\t11\trs1\tSNV\tA\tC\t3\tintron_variant".parse::<Record>()?;
/// let b = "1\t10\t11\trs2\tSNV\tA\tT\t1\tmissense_variant".parse::<Record>()?;
///
/// let merged = merge::merge(vec![
///     Source::new(2, vec![b]),
///     Source::new(1, vec![a]),
/// ]);
///
/// // The priority-1 source's labels win; the alt sets union.
/// assert_eq!(merged.len(), 1);
/// assert_eq!(merged[0].consequence(), "intron_variant");
/// assert_eq!(merged[0].group().get(), 3);
/// assert_eq!(
///     merged[0].alternatives().iter().cloned().collect::<Vec<_>>(),
///     vec![String::from("C"), String::from("T")]
/// );
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub fn merge(mut sources: Vec<Source>) -> Vec<Record> {
    // A stable sort on the priority key: sources given in any order merge
    // identically.
    sources.sort_by_key(|source| source.priority);

    let mut merged: Vec<Record> = Vec::new();
    let mut by_coordinates: HashMap<(String, u64, u64), usize> = HashMap::new();
    let mut seen_ids: HashSet<String> = HashSet::new();

    for source in sources {
        for record in source.records {
            if !seen_ids.insert(record.id().to_string()) {
                continue;
            }

            let key = (
                record.chromosome().to_string(),
                record.start(),
                record.end(),
            );

            match by_coordinates.get(&key) {
                Some(&index) => {
                    merged[index].union_alternatives(record.alternatives().iter().cloned());
                }
                None => {
                    by_coordinates.insert(key, merged.len());
                    merged.push(record);
                }
            }
        }
    }

    merged.sort_by(|a, b| {
        (a.chromosome(), a.start(), a.end(), a.id()).cmp(&(
            b.chromosome(),
            b.start(),
            b.end(),
            b.id(),
        ))
    });

    merged
}

/// Merges per-chromosome interval files, with priority given by file order.
pub fn merge_files(paths: &[PathBuf]) -> Result<Vec<Record>, Error> {
    let sources = paths
        .iter()
        .enumerate()
        .map(|(priority, path)| Source::from_path(priority as u32, path))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(merge(sources))
}

#[cfg(test)]
pub mod tests {
    use super::*;

    /// Parses interval record literals.
    fn records(lines: &[&str]) -> Vec<Record> {
        lines.iter().map(|line| line.parse().unwrap()).collect()
    }

    #[test]
    fn test_duplicate_ids_are_dropped_first_source_wins() {
        let a = records(&["1\t10\t11\trs1\tSNV\tA\tC\t3\tintron_variant"]);
        let b = records(&["1\t50\t51\trs1\tSNV\tG\tT\t1\tmissense_variant"]);

        let merged = merge(vec![Source::new(1, a), Source::new(2, b)]);

        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].start(), 10);
    }

    #[test]
    fn test_a_reused_id_is_dropped_before_any_union() {
        let a = records(&["1\t10\t11\trs1\tSNV\tA\tC\t3\tintron_variant"]);
        let b = records(&["1\t10\t11\trs1\tSNV\tA\tT\t1\tmissense_variant"]);

        // A later source reusing an identifier contributes nothing, not even
        // its alts: the record is dropped before the coordinate grouping.
        let merged = merge(vec![Source::new(1, a), Source::new(2, b)]);

        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].consequence(), "intron_variant");
        assert_eq!(
            merged[0].alternatives().iter().cloned().collect::<Vec<_>>(),
            vec![String::from("C")]
        );
    }

    #[test]
    fn test_priority_is_by_index_not_input_order() {
        let a = records(&["1\t10\t11\trs1\tSNV\tA\tC\t3\tintron_variant"]);
        let b = records(&["1\t10\t11\trs1\tSNV\tA\tC\t1\tmissense_variant"]);

        // The priority-1 source is passed second but still wins.
        let merged = merge(vec![Source::new(2, b), Source::new(1, a)]);

        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].consequence(), "intron_variant");
    }

    #[test]
    fn test_exact_coordinates_only() {
        let a = records(&[
            "1\t10\t15\trs1\tdeletion\tACGTA\tA\t3\tintron_variant",
            "1\t10\t16\trs2\tdeletion\tACGTAC\tA\t3\tintron_variant",
            "1\t11\t15\trs3\tdeletion\tCGTA\tC\t3\tintron_variant",
        ]);

        // Overlapping but not coordinate-identical: nothing merges.
        let merged = merge(vec![Source::new(1, a)]);
        assert_eq!(merged.len(), 3);
    }

    #[test]
    fn test_output_is_sorted_by_start_then_end() {
        let a = records(&[
            "1\t50\t51\trs9\tSNV\tA\tC\t3\tintron_variant",
            "1\t10\t15\trs5\tdeletion\tACGTA\tA\t3\tintron_variant",
            "1\t10\t11\trs7\tSNV\tA\tC\t3\tintron_variant",
            "1\t10\t12\trs2\tdeletion\tAG\tA\t3\tintron_variant",
        ]);

        let merged = merge(vec![Source::new(1, a)]);
        let ids = merged.iter().map(|r| r.id().to_string()).collect::<Vec<_>>();

        // rs7, rs2, and rs5 share a start; shorter ends come first.
        assert_eq!(ids, vec!["rs7", "rs2", "rs5", "rs9"]);
    }

    #[test]
    fn test_merging_is_commutative_across_equal_priority_content() {
        let a = records(&["1\t10\t11\trs1\tSNV\tA\tC\t3\tintron_variant"]);
        let b = records(&["1\t10\t11\trs2\tSNV\tA\tT\t3\tintron_variant"]);

        let ab = merge(vec![Source::new(1, a.clone()), Source::new(2, b.clone())]);
        let ba = merge(vec![Source::new(2, b), Source::new(1, a)]);

        assert_eq!(ab[0].alternatives(), ba[0].alternatives());
    }
}
