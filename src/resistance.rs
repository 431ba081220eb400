//src/resistance.rs

//! Antibiotic-class annotation of acquired resistance genes.
//!
//! Gene symbols are tested against [`RESISTANCE_CLASSES`] in order and the
//! first hit wins. Several families overlap (every OXA-51-like allele is also
//! a "blaOXA-" allele), so the order of the table is part of its meaning.

use std::sync::LazyLock;

use regex::Regex;

use crate::abricate::identification_summary;
use crate::types::GeneHit;

/// Allele-number prefixes of OXA carbapenemases (`23` also covers OXA-232).
pub const CARBAPENEMASE_OXA: &[&str] = &[
    "23", "24", "25", "26", "27", "48", "58", "72", "98", "116", "117", "160", "175", "176",
    "253",
];

/// Allele-number prefixes of the intrinsic OXA-51-like alleles of *A. baumannii*.
pub const OXA_51_LIKE: &[&str] = &["51", "64", "65", "69", "90", "259", "343"];

/// OXA-51-like alleles that would otherwise fall under a carbapenemase prefix.
pub const OXA_51_LIKE_EXEMPT: &[&str] = &["259"];

/// Allele-number prefixes never reported as ESBL.
pub const NON_ESBL_OXA: &[&str] = &[
    "23", "24", "25", "26", "27", "48", "58", "72", "98", "116", "117", "160", "175", "176",
    "253", "488", "486",
];

/// How a table row recognises a gene symbol.
pub enum GeneMatcher {
    /// Case-insensitive regular expression, searched anywhere in the symbol.
    Pattern(Regex),
    /// `pattern`, or any `blaOXA-N` allele whose number starts with one of
    /// `prefixes` and is not exactly one of `exempt`.
    OxaPrefixes {
        pattern: Option<Regex>,
        prefixes: &'static [&'static str],
        exempt: &'static [&'static str],
    },
    /// `pattern`, or any `blaOXA-` allele whose number starts with none of
    /// `excluded`.
    OxaPrefixesExcept {
        pattern: Regex,
        excluded: &'static [&'static str],
    },
}

static OXA_ALLELE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)blaOXA-(\d*)").expect("static regex"));

/// Digits following `blaOXA-`, possibly empty.
fn oxa_allele(gene: &str) -> Option<&str> {
    OXA_ALLELE
        .captures(gene)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str())
}

fn starts_with_any(number: &str, prefixes: &[&str]) -> bool {
    prefixes.iter().any(|p| number.starts_with(p))
}

impl GeneMatcher {
    fn pattern(re: &str) -> Self {
        GeneMatcher::Pattern(Regex::new(re).expect("static regex"))
    }

    pub fn is_match(&self, gene: &str) -> bool {
        match self {
            GeneMatcher::Pattern(re) => re.is_match(gene),
            GeneMatcher::OxaPrefixes {
                pattern,
                prefixes,
                exempt,
            } => {
                pattern.as_ref().is_some_and(|re| re.is_match(gene))
                    || oxa_allele(gene)
                        .is_some_and(|n| starts_with_any(n, prefixes) && !exempt.contains(&n))
            }
            GeneMatcher::OxaPrefixesExcept { pattern, excluded } => {
                pattern.is_match(gene)
                    || oxa_allele(gene).is_some_and(|n| !starts_with_any(n, excluded))
            }
        }
    }
}

/// One row of the classification table.
pub struct ResistanceClass {
    pub matcher: GeneMatcher,
    pub label: &'static str,
}

pub static RESISTANCE_CLASSES: LazyLock<Vec<ResistanceClass>> = LazyLock::new(|| {
    let row = |matcher, label| ResistanceClass { matcher, label };
    vec![
        row(
            GeneMatcher::OxaPrefixes {
                pattern: Some(Regex::new(r"(?i)bla(KPC|NDM|VIM|IMP|SPM)").expect("static regex")),
                prefixes: CARBAPENEMASE_OXA,
                exempt: OXA_51_LIKE_EXEMPT,
            },
            "(carbapenemase)",
        ),
        // must stay ahead of the ESBL row
        row(
            GeneMatcher::OxaPrefixes {
                pattern: None,
                prefixes: OXA_51_LIKE,
                exempt: &[],
            },
            "(OXA-51-like carbapenemase)",
        ),
        row(
            GeneMatcher::OxaPrefixesExcept {
                pattern: Regex::new(r"(?i)bla(TEM|SHV|ADC|CTX-M|GES)").expect("static regex"),
                excluded: NON_ESBL_OXA,
            },
            "(ESBL)",
        ),
        row(
            GeneMatcher::pattern(r"(?i)^aac\(6'\)-Ib-cr"),
            "(resistance to aminoglycosides and fluoroquinolones)",
        ),
        row(
            GeneMatcher::pattern(r"(?i)^(aph|aac|rmt|aad)"),
            "(resistance to aminoglycosides)",
        ),
        row(
            GeneMatcher::pattern(r"(?i)^(cat|cml|cmx|floR)"),
            "(resistance to chloramphenicol)",
        ),
        row(
            GeneMatcher::pattern(r"(?i)^(qnr|oqx)"),
            "(resistance to fluoroquinolones)",
        ),
        row(GeneMatcher::pattern(r"(?i)^sul"), "(resistance to sulfonamides)"),
        row(GeneMatcher::pattern(r"(?i)^dfrA"), "(resistance to trimethoprim)"),
        row(GeneMatcher::pattern(r"(?i)^tet"), "(resistance to tetracycline)"),
        row(GeneMatcher::pattern(r"(?i)^ere"), "(resistance to erythromycin)"),
        row(
            GeneMatcher::pattern(r"(?i)^erm"),
            "(resistance to lincosamides, macrolides and streptogramins)",
        ),
        row(GeneMatcher::pattern(r"(?i)^ARR"), "(resistance to rifampicin)"),
        row(GeneMatcher::pattern(r"(?i)^(mph|msr)"), "(resistance to macrolides)"),
        row(GeneMatcher::pattern(r"(?i)van"), "(resistance to vancomycin)"),
        row(GeneMatcher::pattern(r"(?i)lsa"), "(resistance to clindamycin)"),
        row(GeneMatcher::pattern(r"(?i)mcr"), "(resistance to polymyxin)"),
    ]
});

/// Label of the first table row matching `gene`.
pub fn classify_gene(gene: &str) -> Option<&'static str> {
    RESISTANCE_CLASSES
        .iter()
        .find(|class| class.matcher.is_match(gene))
        .map(|class| class.label)
}

/// `blaKPC-2 (carbapenemase) (allele confidence 100.00)`
pub fn describe_hit(hit: &GeneHit) -> String {
    match classify_gene(&hit.gene_symbol) {
        Some(label) => format!(
            "{} {} (allele confidence {})",
            hit.gene_symbol, label, hit.allele_confidence
        ),
        None => format!("{} (allele confidence {})", hit.gene_symbol, hit.allele_confidence),
    }
}

/// Annotated gene lines plus the parallel list of raw identification summaries.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResistanceReport {
    pub genes: Vec<String>,
    pub identifications: Vec<String>,
}

pub fn classify_hits(hits: &[GeneHit]) -> ResistanceReport {
    ResistanceReport {
        genes: hits.iter().map(describe_hit).collect(),
        identifications: hits.iter().map(identification_summary).collect(),
    }
}
