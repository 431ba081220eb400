//! Species resolution: taxonomic vote → table dispatch → optional
//! genome-distance refinement → typing scheme and mutation databases.

pub mod resolver;
pub mod table;

pub use resolver::{
    decompose, displayed_species, parse_distance_output, refine, resolve_label, resolve_species,
    DatabaseDirs, GenomeDistance, MutationDbPair, SpeciesDecision, TypingScheme,
};
