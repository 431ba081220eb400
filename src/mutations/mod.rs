pub mod panels;
pub mod scanner;

use std::path::Path;

use log::info;

use crate::error::Result;
use crate::types::MutationRecord;
use panels::MutationPanels;

pub use scanner::{scan_dump, scan_dump_file, scan_matches};

/// Mutations found by the two scans of one sample. The lists are never merged.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MutationReport {
    pub others: Vec<MutationRecord>,
    pub polymyxin: Vec<MutationRecord>,
}

impl MutationReport {
    pub fn others_lines(&self) -> Vec<String> {
        self.others.iter().map(ToString::to_string).collect()
    }

    pub fn polymyxin_lines(&self) -> Vec<String> {
        self.polymyxin.iter().map(ToString::to_string).collect()
    }
}

/// Scans the "other antibiotics" dump with the others panel and the
/// polymyxin dump with the polymyxin panel.
pub fn scan_mutation_dumps<P: AsRef<Path>, Q: AsRef<Path>>(
    others_dump: P,
    polymyxin_dump: Q,
    panels: &MutationPanels,
) -> Result<MutationReport> {
    let others = scan_dump_file(others_dump, &panels.others)?;
    let polymyxin = scan_dump_file(polymyxin_dump, &panels.polymyxin)?;
    info!(
        "Mutation scan: {} record(s) for {}, {} for {}",
        others.len(),
        panels.others.name,
        polymyxin.len(),
        panels.polymyxin.name
    );
    Ok(MutationReport { others, polymyxin })
}
