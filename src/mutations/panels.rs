// src/mutations/panels.rs

use crate::blast::{EXPLORATORY_ACTIVATION, PRIMARY_ACTIVATION};

/// A set of reference proteins scanned against one alignment dump.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GenePanel {
    pub name: &'static str,
    pub genes: &'static [&'static str],
    /// Minimum aligned reference length for substitution calls, per gene.
    /// Genes not listed must cover more than 90% of their reference.
    pub min_aligned: &'static [(&'static str, usize)],
    /// Identity a block must exceed before its residues are read.
    pub activation: f64,
}

impl GenePanel {
    pub fn contains(&self, gene: &str) -> bool {
        self.genes.contains(&gene)
    }

    pub fn min_aligned_for(&self, gene: &str) -> Option<usize> {
        self.min_aligned
            .iter()
            .find(|(g, _)| *g == gene)
            .map(|&(_, n)| n)
    }

    /// Whether an alignment is long enough to be scored for substitutions.
    pub fn is_scoreable(&self, gene: &str, aligned_length: usize, reference_length: usize) -> bool {
        match self.min_aligned_for(gene) {
            Some(min) => aligned_length > min,
            None => aligned_length * 10 > reference_length * 9,
        }
    }
}

/// The two genus-specific panels: chromosomal targets of other antibiotic
/// classes, and polymyxin targets. They are always scanned against separate
/// dumps and reported separately.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MutationPanels {
    pub others: GenePanel,
    pub polymyxin: GenePanel,
}

const TWO_COMPONENT_MIN_ALIGNED: &[(&str, usize)] = &[
    ("PmrB", 360),
    ("PmrA", 220),
    ("MgrB", 40),
    ("PhoP", 220),
    ("PhoQ", 480),
];

pub static ACINETOBACTER_BAUMANNII: MutationPanels = MutationPanels {
    others: GenePanel {
        name: "acinetobacter-others",
        genes: &["GyrA", "GyrB", "ParC", "AdeN", "AdeR", "CarO", "OmpA", "AdeL", "AdeS"],
        min_aligned: &[],
        activation: PRIMARY_ACTIVATION,
    },
    polymyxin: GenePanel {
        name: "acinetobacter-polymyxin",
        genes: &["PmrA", "PmrB", "LpxA", "LpxD", "LpxC"],
        min_aligned: &[],
        activation: PRIMARY_ACTIVATION,
    },
};

pub static ENTEROBACTER_CLOACAE: MutationPanels = MutationPanels {
    others: GenePanel {
        name: "ecloacae-others",
        genes: &["GyrA", "ParC"],
        min_aligned: &[],
        activation: PRIMARY_ACTIVATION,
    },
    polymyxin: GenePanel {
        name: "ecloacae-polymyxin",
        genes: &["PmrA", "PmrB", "MgrB", "PhoP", "PhoQ"],
        min_aligned: TWO_COMPONENT_MIN_ALIGNED,
        activation: PRIMARY_ACTIVATION,
    },
};

pub static KLEBSIELLA_PNEUMONIAE: MutationPanels = MutationPanels {
    others: GenePanel {
        name: "kpneumoniae-others",
        genes: &["GyrA", "GyrB", "ParC", "AcrR", "RamR"],
        min_aligned: &[],
        activation: PRIMARY_ACTIVATION,
    },
    polymyxin: GenePanel {
        name: "kpneumoniae-polymyxin",
        genes: &["PmrB", "PmrA", "MgrB", "PhoP", "PhoQ"],
        min_aligned: TWO_COMPONENT_MIN_ALIGNED,
        activation: PRIMARY_ACTIVATION,
    },
};

pub static PSEUDOMONAS_AERUGINOSA: MutationPanels = MutationPanels {
    others: GenePanel {
        name: "paeruginosa-others",
        genes: &["OprD", "MexT", "AmpC", "AmpR", "GyrA", "GyrB", "ParC", "ParE"],
        min_aligned: &[],
        activation: PRIMARY_ACTIVATION,
    },
    polymyxin: GenePanel {
        name: "paeruginosa-polymyxin",
        genes: &["PmrA", "PmrB", "PhoQ", "ParR", "ParS", "CrpS", "ColR", "ColS"],
        min_aligned: &[],
        activation: EXPLORATORY_ACTIVATION,
    },
};

/// Substitutions with a known deleterious effect on regulator function.
pub const KNOWN_DELETERIOUS: &[(&str, &str)] = &[
    ("PmrA", "T31I"),
    ("PmrB", "R256G"),
    ("PmrB", "L16P"),
    ("PhoQ", "S217R"),
    ("PhoQ", "L203Q"),
    ("PhoQ", "Q424L"),
];

pub fn is_known_deleterious(gene: &str, substitution: &str) -> bool {
    KNOWN_DELETERIOUS
        .iter()
        .any(|(g, s)| *g == gene && s.eq_ignore_ascii_case(substitution))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_threshold_table_and_default_fraction() {
        let poli = KLEBSIELLA_PNEUMONIAE.polymyxin;
        assert!(poli.is_scoreable("PmrB", 361, 365));
        assert!(!poli.is_scoreable("PmrB", 360, 365));
        assert!(poli.is_scoreable("MgrB", 47, 47));

        let others = KLEBSIELLA_PNEUMONIAE.others;
        assert!(others.is_scoreable("GyrA", 181, 200));
        assert!(!others.is_scoreable("GyrA", 180, 200));
    }

    #[test]
    fn test_deleterious_lookup() {
        assert!(is_known_deleterious("PmrB", "R256G"));
        assert!(is_known_deleterious("PhoQ", "q424l"));
        assert!(!is_known_deleterious("PmrA", "R256G"));
    }
}
