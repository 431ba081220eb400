//src/types.rs

use std::fmt;

/// One consumed `Query`/marker/`Sbjct` line triple inside an [`AlignmentMatch`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlignmentSegment {
    /// Index of the segment's first residue in the concatenated residue runs.
    pub offset: usize,
    /// Number of residues taken from this triple (at most 60).
    pub len: usize,
    /// Reference coordinate printed at the start of the `Sbjct` line.
    pub subject_start: usize,
    /// Reference coordinate printed at the end of the `Sbjct` line.
    pub subject_end: usize,
}

/// A structured representation of one alignment block (HSP) of a
/// protein similarity search dump, e.g.:
///
/// ```text
/// >GyrA|P0AES4 DNA gyrase subunit A
/// Length=875
///  Identities = 860/875 (98%), Positives = 868/875 (99%), Gaps = 0/875 (0%)
/// Query  1      MSDLAREITPVNIEEELKSSYLDYAMSVIVGRALPDVRDGLKPVHRRVLYAMNVLGNDWN  180
///               MSDLAREITPVNIEEELKSSYLDYAMSVIVGRALPDVRDGLKPVHRRVLYAMNVLGNDWN
/// Sbjct  1      MSDLAREITPVNIEEELKSSYLDYAMSVIVGRALPDVRDGLKPVHRRVLYAMNVLGNDWN  60
/// ```
#[derive(Debug, Clone, Default)]
pub struct AlignmentMatch {
    pub subject_id: String,
    pub subject_length: usize,
    pub percent_identity: f64,
    /// Numerator of `Identities = n/m`.
    pub identities: usize,
    /// Denominator of `Identities = n/m`: the aligned reference length.
    pub aligned_length: usize,
    pub query_residues: Vec<char>,
    /// The marker line between query and subject (letters, `+` or blanks).
    pub alignment_residues: Vec<char>,
    pub reference_residues: Vec<char>,
    /// Start coordinate of the first consumed `Sbjct` line (0 if none).
    pub subject_start: usize,
    /// End coordinate of the last consumed `Sbjct` line (0 if none).
    pub subject_end: usize,
    pub segments: Vec<AlignmentSegment>,
}

impl AlignmentMatch {
    pub fn is_reverse(&self) -> bool {
        self.subject_start > self.subject_end
    }

    pub fn has_residues(&self) -> bool {
        !self.segments.is_empty()
    }

    /// True when the alignment reaches the reference's first residue:
    /// a forward block whose first `Sbjct` line starts at 1, or a reverse
    /// block that ends at 1.
    pub fn starts_at_reference_origin(&self) -> bool {
        if !self.has_residues() {
            return false;
        }
        if self.is_reverse() {
            self.subject_end == 1
        } else {
            self.subject_start == 1
        }
    }

    /// Absolute reference coordinate of residue `index` in the concatenated runs.
    pub fn reference_position(&self, index: usize) -> Option<usize> {
        let seg = self
            .segments
            .iter()
            .find(|s| index >= s.offset && index < s.offset + s.len)?;
        let k = index - seg.offset;
        if seg.subject_start > seg.subject_end {
            seg.subject_start.checked_sub(k)
        } else {
            Some(seg.subject_start + k)
        }
    }
}

/// What a [`MutationRecord`] reports.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MutationKind {
    Truncation {
        aligned_length: usize,
        reference_length: usize,
    },
    Substitution {
        position: usize,
        reference_residue: char,
        observed_residue: char,
    },
}

/// A truncation or point substitution found in a reference protein.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MutationRecord {
    pub gene_symbol: String,
    pub kind: MutationKind,
    /// e.g. `deleterious`
    pub annotation: Option<String>,
}

impl MutationRecord {
    /// The bare `R123Q` form of a substitution, `None` for truncations.
    pub fn substitution_code(&self) -> Option<String> {
        match self.kind {
            MutationKind::Substitution {
                position,
                reference_residue,
                observed_residue,
            } => Some(format!("{reference_residue}{position}{observed_residue}")),
            MutationKind::Truncation { .. } => None,
        }
    }
}

impl fmt::Display for MutationRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            MutationKind::Truncation {
                aligned_length,
                reference_length,
            } => write!(
                f,
                "{} truncation: {}/{}",
                self.gene_symbol, aligned_length, reference_length
            )?,
            MutationKind::Substitution {
                position,
                reference_residue,
                observed_residue,
            } => write!(
                f,
                "{}:{}{}{}",
                self.gene_symbol, reference_residue, position, observed_residue
            )?,
        }
        if let Some(note) = &self.annotation {
            write!(f, "({note})")?;
        }
        Ok(())
    }
}

/// One row of gene-screening output that passed the coverage/identity filter.
#[derive(Debug, Clone, PartialEq)]
pub struct GeneHit {
    pub sequence_id: String,
    pub gene_symbol: String,
    /// Column 6: coverage of the database sequence, as printed (`1-861/861`).
    pub database_coverage: String,
    /// Column 9: coverage of the query.
    pub percent_coverage: f64,
    /// Column 9 exactly as printed.
    pub query_coverage: String,
    pub percent_identity: f64,
    /// Identity exactly as printed by the screening tool.
    pub allele_confidence: String,
    pub product: Option<String>,
}

/// Completeness/contamination summary of an assembly.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GenomeQuality {
    pub completeness: String,
    pub contamination: String,
    pub genome_size: String,
    pub contigs: String,
}

impl GenomeQuality {
    /// Contamination in percent; unparsable values count as 0.
    pub fn contamination_pct(&self) -> f64 {
        self.contamination.trim().parse().unwrap_or(0.0)
    }

    /// Genome size in bases; unparsable or zero values count as 1.
    pub fn genome_size_bp(&self) -> f64 {
        match self.genome_size.trim().parse::<f64>() {
            Ok(v) if v > 0.0 => v,
            _ => 1.0,
        }
    }
}

/// The two most common labels reported by the taxonomic classifier.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaxonomyVote {
    pub majority: String,
    pub majority_count: usize,
    pub runner_up: String,
    pub runner_up_count: usize,
}
