// src/checkm.rs

//! Assembly quality table (`checkm qa --tab_table`).

use std::path::Path;

use log::{info, warn};

use crate::error::{read_input, Result};
use crate::types::GenomeQuality;

const COMPLETENESS: usize = 5;
const CONTAMINATION: usize = 6;
const GENOME_SIZE: usize = 8;
const CONTIGS: usize = 11;

/// Parses the table body, skipping the header. When several bins are listed
/// the last one wins. Rows too short to carry every field are skipped.
pub fn parse_quality(text: &str) -> Option<GenomeQuality> {
    text.lines()
        .skip(1)
        .filter_map(|line| {
            let fields: Vec<&str> = line.trim_end_matches('\r').split('\t').collect();
            if fields.len() <= CONTIGS {
                return None;
            }
            Some(GenomeQuality {
                completeness: fields[COMPLETENESS].trim().to_string(),
                contamination: fields[CONTAMINATION].trim().to_string(),
                genome_size: fields[GENOME_SIZE].trim().to_string(),
                contigs: fields[CONTIGS].trim().to_string(),
            })
        })
        .last()
}

/// Reads the quality table. A missing table is an error; a table without
/// usable rows gives empty fields (contamination 0, genome size 1).
pub fn read_quality<P: AsRef<Path>>(path: P) -> Result<GenomeQuality> {
    let text = read_input(path.as_ref())?;
    let quality = match parse_quality(&text) {
        Some(q) => q,
        None => {
            warn!("No quality rows in {}", path.as_ref().display());
            GenomeQuality::default()
        }
    };
    info!(
        "Assembly quality: completeness {}, contamination {}, size {}, contigs {}",
        quality.completeness, quality.contamination, quality.genome_size, quality.contigs
    );
    Ok(quality)
}
