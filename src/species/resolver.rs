// src/species/resolver.rs

use std::fmt;
use std::path::{Path, PathBuf};

use log::{info, warn};

use super::table::{primary_entry, refined_entry, tracked_genus, MutationDatabases};
use crate::error::Result;
use crate::mutations::panels::MutationPanels;
use crate::types::{GenomeQuality, TaxonomyVote};

/// Contamination (percent) above which the displayed species is replaced by
/// a contamination notice.
pub const CONTAMINATION_LIMIT: f64 = 10.0;

/// Display name used when the classifier produced no label at all.
pub const NOT_IDENTIFIED: &str = "Not identified";

/// Strain-typing scheme selected for a species.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypingScheme {
    Scheme(String),
    Unavailable,
}

impl TypingScheme {
    pub fn name(&self) -> Option<&str> {
        match self {
            TypingScheme::Scheme(name) => Some(name),
            TypingScheme::Unavailable => None,
        }
    }
}

impl fmt::Display for TypingScheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypingScheme::Scheme(name) => f.write_str(name),
            TypingScheme::Unavailable => f.write_str("unavailable"),
        }
    }
}

/// Resolved protein databases and panels for the mutation scan.
#[derive(Debug, Clone, PartialEq)]
pub struct MutationDbPair {
    pub others: PathBuf,
    pub polymyxin: PathBuf,
    pub panels: &'static MutationPanels,
}

/// Directories the species tables' relative file names are resolved against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabaseDirs {
    pub others: PathBuf,
    pub polymyxin: PathBuf,
    pub distance_lists: PathBuf,
}

impl DatabaseDirs {
    fn resolve(&self, dbs: &MutationDatabases) -> MutationDbPair {
        MutationDbPair {
            others: self.others.join(dbs.others_file),
            polymyxin: self.polymyxin.join(dbs.polymyxin_file),
            panels: dbs.panels,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SpeciesDecision {
    pub raw_majority_label: String,
    pub genus: String,
    pub species: String,
    /// `lower(genus + species)`
    pub normalized_key: String,
    pub display_name: String,
    pub typing_scheme: TypingScheme,
    /// `None` means no mutation scan for this sample.
    pub mutation_dbs: Option<MutationDbPair>,
    pub needs_distance_refinement: bool,
}

/// Runs a whole-genome distance search of the sample's assembly against a
/// list of reference genomes and returns the tool's tabular output.
pub trait GenomeDistance {
    fn nearest_references(&self, reference_list: &Path) -> Result<String>;
}

/// Splits a classifier label into genus, species and the normalised key.
/// Labels with fewer than two words keep the whole label as genus.
pub fn decompose(label: &str) -> (String, String, String) {
    let mut words = label.split_whitespace();
    let (genus, species) = match (words.next(), words.next()) {
        (Some(genus), Some(species)) => (genus.to_string(), species.to_string()),
        _ => (label.trim().to_string(), String::new()),
    };
    let key = format!("{genus}{species}").to_lowercase();
    (genus, species, key)
}

/// First-pass dispatch on the majority label. Never consults the distance tool.
pub fn resolve_label(label: &str, dirs: &DatabaseDirs) -> SpeciesDecision {
    let (genus, species, key) = decompose(label);
    let display_name = if species.is_empty() {
        genus.clone()
    } else {
        format!("{genus} {species}")
    };
    let mut decision = SpeciesDecision {
        raw_majority_label: label.to_string(),
        display_name,
        genus,
        species,
        normalized_key: key,
        typing_scheme: TypingScheme::Unavailable,
        mutation_dbs: None,
        needs_distance_refinement: false,
    };

    if decision.normalized_key.is_empty() {
        decision.display_name = NOT_IDENTIFIED.to_string();
        return decision;
    }

    if let Some(entry) = primary_entry(&decision.normalized_key) {
        decision.display_name = entry.display_name.to_string();
        decision.typing_scheme = TypingScheme::Scheme(entry.scheme.to_string());
        decision.mutation_dbs = entry.databases.as_ref().map(|dbs| dirs.resolve(dbs));
    } else if tracked_genus(&decision.normalized_key).is_some() {
        decision.needs_distance_refinement = true;
    }
    decision
}

/// Extracts the closest reference's name from distance-tool output: first
/// line, field 1, last path segment up to its first `.`.
pub fn parse_distance_output(text: &str) -> Option<String> {
    let line = text.lines().next()?;
    let reference = line.split('\t').nth(1)?.trim();
    let file_name = reference.rsplit('/').next()?;
    let name = file_name.split('.').next()?;
    (!name.is_empty()).then(|| name.to_string())
}

/// Second pass for tracked genera: asks the distance tool for the nearest
/// reference and re-dispatches on its name. Decisions that need no
/// refinement are returned unchanged.
pub fn refine<D: GenomeDistance + ?Sized>(
    decision: SpeciesDecision,
    distance: &D,
    dirs: &DatabaseDirs,
) -> Result<SpeciesDecision> {
    if !decision.needs_distance_refinement {
        return Ok(decision);
    }
    let Some(genus) = tracked_genus(&decision.normalized_key) else {
        return Ok(decision);
    };

    let list = dirs.distance_lists.join(genus.reference_list);
    let output = distance.nearest_references(&list)?;

    let mut refined = SpeciesDecision {
        needs_distance_refinement: false,
        typing_scheme: TypingScheme::Unavailable,
        mutation_dbs: None,
        ..decision
    };
    let Some(name) = parse_distance_output(&output) else {
        warn!(
            "No distance hit for {}, species left unresolved",
            refined.raw_majority_label
        );
        return Ok(refined);
    };

    match refined_entry(&name) {
        Some(entry) => {
            refined.typing_scheme = TypingScheme::Scheme(entry.scheme.to_string());
            refined.mutation_dbs = Some(dirs.resolve(&entry.databases));
        }
        None => info!("Refined species {name} has no typing scheme or mutation databases"),
    }
    refined.display_name = name;
    Ok(refined)
}

/// Full resolution: table dispatch, then distance refinement when needed.
pub fn resolve_species<D: GenomeDistance + ?Sized>(
    label: &str,
    dirs: &DatabaseDirs,
    distance: &D,
) -> Result<SpeciesDecision> {
    let decision = refine(resolve_label(label, dirs), distance, dirs)?;
    info!(
        "Species: {} (scheme {}, mutation scan: {})",
        decision.display_name,
        decision.typing_scheme,
        decision.mutation_dbs.is_some()
    );
    Ok(decision)
}

/// The species text reported for a sample. Above the contamination limit the
/// two leading classifier labels and their counts are reported instead; the
/// decision itself is not altered.
pub fn displayed_species(
    decision: &SpeciesDecision,
    vote: &TaxonomyVote,
    quality: &GenomeQuality,
) -> String {
    if quality.contamination_pct() > CONTAMINATION_LIMIT {
        format!(
            "Contamination: {} {} {} {}",
            vote.majority, vote.majority_count, vote.runner_up, vote.runner_up_count
        )
    } else {
        decision.display_name.clone()
    }
}
