//! The kind of change a variant makes to the reference sequence.

use std::str::FromStr;

use nonempty::NonEmpty;

/// The label for a single-nucleotide variant.
const SNV: &str = "SNV";

/// The label for an insertion.
const INSERTION: &str = "insertion";

/// The label for a deletion.
const DELETION: &str = "deletion";

/// The label for an equal-length multi-base substitution.
const SUBSTITUTION: &str = "substitution";

/// The label for an unequal-length multi-base change.
const INDEL: &str = "indel";

/// The label for a generic sequence alteration.
const SEQUENCE_ALTERATION: &str = "sequence_alteration";

/// An error associated with parsing a variant kind.
#[derive(Debug)]
pub enum ParseError {
    /// An unknown variant kind.
    Invalid(String),
}

impl std::fmt::Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ParseError::Invalid(s) => write!(f, "invalid variant kind: \"{s}\""),
        }
    }
}

impl std::error::Error for ParseError {}

/// The kind of a variant.
///
/// Most kinds are inferred from the lengths of the reference allele and the
/// longest alternative allele (see [`Kind::classify`]). The exception is
/// [`Kind::SequenceAlteration`], which is only ever carried over from an
/// explicit variant-class label in the annotation payload: the annotation
/// tool reports it when a single identifier covers alleles of mixed classes,
/// and relabeling it from allele lengths would lose that signal.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Kind {
    /// A single-nucleotide variant.
    Snv,

    /// An insertion.
    Insertion,

    /// A deletion.
    Deletion,

    /// A multi-base change where the reference and alternative alleles have
    /// equal length.
    Substitution,

    /// A multi-base change where the reference and alternative alleles have
    /// unequal length.
    Indel,

    /// A generic sequence alteration declared by the annotation payload.
    SequenceAlteration,
}

impl Kind {
    /// Classifies a variant by the lengths of its reference allele and its
    /// longest alternative allele.
    ///
    /// # Examples
    ///
    /// ```
    /// use nonempty::NonEmpty;
    /// use vartrack::variant::Kind;
    ///
    /// let alts = NonEmpty::new(String::from("T"));
    /// assert_eq!(Kind::classify("A", &alts), Kind::Snv);
    ///
    /// let alts = NonEmpty::new(String::from("TTG"));
    /// assert_eq!(Kind::classify("A", &alts), Kind::Insertion);
    /// assert_eq!(Kind::classify("ATT", &alts), Kind::Substitution);
    /// assert_eq!(Kind::classify("ATTC", &alts), Kind::Indel);
    ///
    /// let alts = NonEmpty::new(String::from("T"));
    /// assert_eq!(Kind::classify("TAC", &alts), Kind::Deletion);
    /// ```
    pub fn classify(reference: &str, alternatives: &NonEmpty<String>) -> Kind {
        let ref_len = reference.len();
        let alt_len = alternatives
            .iter()
            .map(|alt| alt.len())
            .max()
            // A `NonEmpty` always has at least one element.
            .unwrap_or(1);

        match (ref_len, alt_len) {
            (1, 1) => Kind::Snv,
            (1, _) => Kind::Insertion,
            (_, 1) => Kind::Deletion,
            (r, a) if r == a => Kind::Substitution,
            (_, _) => Kind::Indel,
        }
    }

    /// Returns the label for the kind as it appears in interval files.
    pub fn as_str(&self) -> &'static str {
        match self {
            Kind::Snv => SNV,
            Kind::Insertion => INSERTION,
            Kind::Deletion => DELETION,
            Kind::Substitution => SUBSTITUTION,
            Kind::Indel => INDEL,
            Kind::SequenceAlteration => SEQUENCE_ALTERATION,
        }
    }
}

impl std::fmt::Display for Kind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Kind {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            SNV => Ok(Kind::Snv),
            INSERTION => Ok(Kind::Insertion),
            DELETION => Ok(Kind::Deletion),
            SUBSTITUTION => Ok(Kind::Substitution),
            INDEL => Ok(Kind::Indel),
            SEQUENCE_ALTERATION => Ok(Kind::SequenceAlteration),
            _ => Err(ParseError::Invalid(s.into())),
        }
    }
}

#[cfg(test)]
pub mod tests {
    use super::*;

    /// Builds a non-empty alt set from string literals.
    fn alts(values: &[&str]) -> NonEmpty<String> {
        NonEmpty::collect(values.iter().map(|s| s.to_string())).unwrap()
    }

    #[test]
    fn test_classification_uses_the_longest_alternative() {
        assert_eq!(Kind::classify("A", &alts(&["C", "T"])), Kind::Snv);
        assert_eq!(Kind::classify("A", &alts(&["C", "TTA"])), Kind::Insertion);
        assert_eq!(Kind::classify("ACG", &alts(&["A", "T"])), Kind::Deletion);
        assert_eq!(Kind::classify("ACG", &alts(&["TGA"])), Kind::Substitution);
        assert_eq!(Kind::classify("ACGT", &alts(&["TG"])), Kind::Indel);
    }

    #[test]
    fn test_round_trip() -> Result<(), Box<dyn std::error::Error>> {
        for label in [
            "SNV",
            "insertion",
            "deletion",
            "substitution",
            "indel",
            "sequence_alteration",
        ] {
            assert_eq!(label.parse::<Kind>()?.to_string(), label);
        }

        Ok(())
    }

    #[test]
    fn test_invalid_kind() {
        let err = "inversion".parse::<Kind>().unwrap_err();
        assert_eq!(err.to_string(), "invalid variant kind: \"inversion\"");
    }
}
