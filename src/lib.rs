// src/lib.rs
pub mod abricate;
pub mod blast;
pub mod checkm;
pub mod config;
pub mod error;
pub mod kraken;
pub mod mlst;
pub mod mutations;
pub mod pipeline;
pub mod reads;
pub mod resistance;
pub mod species;
pub mod store;
pub mod tools;
pub mod types;

#[cfg(test)]
mod test_utils;

use crate::config::{PipelineConfig, SampleConfig};
use crate::error::Result;
use crate::mlst::StrainType;
use crate::mutations::MutationReport;
use crate::pipeline::{format_coverage, mutation_fields, quality_fields, screening_fields, SamplePipeline};
use crate::resistance::ResistanceReport;
use crate::species::SpeciesDecision;
use crate::store::{ResultField, ResultStore};
use crate::tools::SystemRunner;
use crate::types::{GenomeQuality, TaxonomyVote};

/// Everything reported for one sample. The record fields are rendered on
/// demand from the structured values.
#[derive(Debug, Clone)]
pub struct SampleResult {
    /// Sample number (the name up to the first `_`).
    pub sample: String,
    pub quality: GenomeQuality,
    pub vote: TaxonomyVote,
    pub species: SpeciesDecision,
    /// Species text as reported, a contamination notice when contaminated.
    pub displayed_species: String,
    pub resistance: ResistanceReport,
    pub virulence: Vec<String>,
    pub plasmids: Vec<String>,
    pub strain_type: StrainType,
    pub mutations: MutationReport,
    pub coverage: f64,
}

impl SampleResult {
    /// The record fields in the order the pipeline writes them.
    pub fn fields(&self) -> Vec<(ResultField, String)> {
        let mut fields = quality_fields(&self.sample, &self.quality);
        fields.push((ResultField::Species, self.displayed_species.clone()));
        fields.extend(screening_fields(&self.resistance, &self.virulence, &self.plasmids));
        fields.extend(mutation_fields(&self.mutations));
        fields.push((ResultField::StrainType, self.strain_type.to_string()));
        fields.push((ResultField::Coverage, format_coverage(self.coverage)));
        fields
    }
}

/// Runs the whole analysis of one sample with the system's tools, writing
/// each stage's fields to `store` as it completes.
pub fn analyze_sample<S: ResultStore + ?Sized>(
    config: &PipelineConfig,
    sample: &SampleConfig,
    store: &S,
) -> Result<SampleResult> {
    SamplePipeline::new(config, &SystemRunner, store).run(sample)
}
