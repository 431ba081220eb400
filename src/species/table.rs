// src/species/table.rs

use crate::mutations::panels::{
    MutationPanels, ACINETOBACTER_BAUMANNII, ENTEROBACTER_CLOACAE, KLEBSIELLA_PNEUMONIAE,
    PSEUDOMONAS_AERUGINOSA,
};

/// Protein databases for one species: file names inside the "other
/// antibiotics" and polymyxin database directories, plus the gene panels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MutationDatabases {
    pub others_file: &'static str,
    pub polymyxin_file: &'static str,
    pub panels: &'static MutationPanels,
}

/// A species recognised straight from the normalised classifier key.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpeciesEntry {
    pub key: &'static str,
    pub display_name: &'static str,
    pub scheme: &'static str,
    pub databases: Option<MutationDatabases>,
}

/// A genus whose species are told apart by genome distance.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrackedGenus {
    pub genus: &'static str,
    /// Normalised keys sent to the distance tool.
    pub keys: &'static [&'static str],
    /// Reference list, relative to the distance database directory.
    pub reference_list: &'static str,
}

/// How a refined name is compared against a [`RefinedEntry`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NameMatch {
    Exact,
    Contains,
}

/// Second-pass dispatch on the name returned by the distance tool.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RefinedEntry {
    pub name: &'static str,
    pub name_match: NameMatch,
    pub scheme: &'static str,
    pub databases: MutationDatabases,
}

impl RefinedEntry {
    pub fn matches(&self, refined: &str) -> bool {
        match self.name_match {
            NameMatch::Exact => refined == self.name,
            NameMatch::Contains => refined.contains(self.name),
        }
    }
}

pub static PRIMARY_SPECIES: &[SpeciesEntry] = &[
    SpeciesEntry {
        key: "pseudomonasaeruginosa",
        display_name: "Pseudomonas aeruginosa",
        scheme: "paeruginosa",
        databases: Some(MutationDatabases {
            others_file: "proteins_outrasMut_pseudo.fasta",
            polymyxin_file: "proteins_pseudo_poli.fasta",
            panels: &PSEUDOMONAS_AERUGINOSA,
        }),
    },
    SpeciesEntry {
        key: "klebsiellapneumoniae",
        display_name: "Klebsiella pneumoniae",
        scheme: "kpneumoniae",
        databases: Some(MutationDatabases {
            others_file: "proteins_outrasMut_kleb.fasta",
            polymyxin_file: "proteins_kleb_poli.fasta",
            panels: &KLEBSIELLA_PNEUMONIAE,
        }),
    },
    SpeciesEntry {
        key: "escherichiacoli",
        display_name: "Escherichia coli",
        scheme: "ecoli",
        databases: None,
    },
    SpeciesEntry {
        key: "staphylococcusaureus",
        display_name: "Staphylococcus aureus",
        scheme: "saureus",
        databases: None,
    },
    SpeciesEntry {
        key: "streptococcuspyogenes",
        display_name: "Streptococcus pyogenes",
        scheme: "spyogenes",
        databases: None,
    },
    SpeciesEntry {
        key: "pseudomonasputida",
        display_name: "Pseudomonas putida",
        scheme: "pputida",
        databases: None,
    },
    SpeciesEntry {
        key: "listeriamonocytogenes",
        display_name: "Listeria monocytogenes",
        scheme: "lmonocytogenes",
        databases: None,
    },
    SpeciesEntry {
        key: "enterococcusfaecalis",
        display_name: "Enterococcus faecalis",
        scheme: "efaecalis",
        databases: None,
    },
    SpeciesEntry {
        key: "klebsiellaoxytoca",
        display_name: "Klebsiella oxytoca",
        scheme: "koxytoca",
        databases: None,
    },
    SpeciesEntry {
        key: "enterococcusfaecium",
        display_name: "Enterococcus faecium",
        scheme: "efaecium",
        databases: None,
    },
];

pub static TRACKED_GENERA: &[TrackedGenus] = &[
    TrackedGenus {
        genus: "acinetobacter",
        keys: &[
            "acinetobacterbaumannii",
            "acinetobacternosocomialis",
            "acinetobacterpittii",
            "acinetobacterseifertii",
            "acinetobacterdijkshoorniae",
            "acinetobacterlactucae",
            "acinetobactercalcoaceticus",
        ],
        reference_list: "fastANI_acineto/list-acineto",
    },
    TrackedGenus {
        genus: "enterobacter",
        keys: &[
            "enterobactercloacae",
            "enterobacterhormaechei",
            "enterobacterasburiae",
            "enterobacterkobei",
            "enterobacterroggenkampii",
            "enterobacterludwigii",
        ],
        reference_list: "fastANI/list_entero",
    },
];

pub static REFINED_SPECIES: &[RefinedEntry] = &[
    RefinedEntry {
        name: "Acinetobacter_baumannii",
        name_match: NameMatch::Contains,
        scheme: "abaumannii_2",
        databases: MutationDatabases {
            others_file: "proteins_outrasMut_acineto.fasta",
            polymyxin_file: "proteins_acineto_poli.fasta",
            panels: &ACINETOBACTER_BAUMANNII,
        },
    },
    RefinedEntry {
        name: "Enterobacter_cloacae_subsp_cloacae",
        name_match: NameMatch::Exact,
        scheme: "ecloacae",
        databases: MutationDatabases {
            others_file: "proteins_outrasMut_Ecloacae.fasta",
            polymyxin_file: "proteins_Ecloacae_poli.fasta",
            panels: &ENTEROBACTER_CLOACAE,
        },
    },
];

pub fn primary_entry(key: &str) -> Option<&'static SpeciesEntry> {
    PRIMARY_SPECIES.iter().find(|e| e.key == key)
}

pub fn tracked_genus(key: &str) -> Option<&'static TrackedGenus> {
    TRACKED_GENERA.iter().find(|g| g.keys.contains(&key))
}

pub fn refined_entry(name: &str) -> Option<&'static RefinedEntry> {
    REFINED_SPECIES.iter().find(|e| e.matches(name))
}
