//src/abricate.rs

//! Gene-screening output (`abricate` tab-delimited report).
//!
//! Columns used (0-based): 1 sequence, 5 gene, 6 covered range of the
//! database sequence, 9 %coverage, 10 %identity, 13 product.

use std::path::Path;

use log::debug;

use crate::error::{read_input, Result};
use crate::types::GeneHit;

pub const MIN_COVERAGE: f64 = 90.0;
pub const MIN_IDENTITY: f64 = 90.0;

const MIN_FIELDS: usize = 11;

/// Vancomycin-resistance genes are kept whatever their coverage or identity.
pub fn is_vancomycin_gene(gene: &str) -> bool {
    gene.to_ascii_lowercase().contains("van")
}

/// Parses one report row. Rows that are too short or carry non-numeric
/// coverage/identity (such as the header) yield `None`.
pub fn parse_hit(line: &str) -> Option<GeneHit> {
    let fields: Vec<&str> = line.trim_end_matches(['\r', '\n']).split('\t').collect();
    if fields.len() < MIN_FIELDS {
        return None;
    }

    let percent_coverage: f64 = fields[9].trim().parse().ok()?;
    let percent_identity: f64 = fields[10].trim().parse().ok()?;

    let product = fields
        .get(13)
        .map(|p| p.trim())
        .filter(|p| !p.is_empty())
        .map(str::to_string);

    Some(GeneHit {
        sequence_id: fields[1].trim().to_string(),
        gene_symbol: fields[5].trim().to_string(),
        database_coverage: fields[6].trim().to_string(),
        percent_coverage,
        query_coverage: fields[9].trim().to_string(),
        percent_identity,
        allele_confidence: fields[10].trim().to_string(),
        product,
    })
}

pub fn passes_filter(hit: &GeneHit) -> bool {
    (hit.percent_coverage > MIN_COVERAGE && hit.percent_identity > MIN_IDENTITY)
        || is_vancomycin_gene(&hit.gene_symbol)
}

pub fn parse_hits(text: &str) -> Vec<GeneHit> {
    text.lines()
        .filter_map(parse_hit)
        .filter(passes_filter)
        .collect()
}

/// Reads and filters a report file. A missing report is an error.
pub fn read_hits<P: AsRef<Path>>(path: P) -> Result<Vec<GeneHit>> {
    let text = read_input(path.as_ref())?;
    let hits = parse_hits(&text);
    debug!("{} screening hit(s) kept from {}", hits.len(), path.as_ref().display());
    Ok(hits)
}

/// `GENE (ID:99.10 COV_Q:100.00 COV_DB:1-861/861)`
pub fn identification_summary(hit: &GeneHit) -> String {
    format!(
        "{} (ID:{} COV_Q:{} COV_DB:{})",
        hit.gene_symbol, hit.allele_confidence, hit.query_coverage, hit.database_coverage
    )
}

/// Virulence-factor lines: `SEQ: GENE PRODUCT ID:.. COV_Q:.. COV_DB:..|`
pub fn format_virulence(hits: &[GeneHit]) -> Vec<String> {
    hits.iter()
        .map(|hit| {
            format!(
                "{}: {} {} ID:{} COV_Q:{} COV_DB:{}|",
                hit.sequence_id,
                hit.gene_symbol,
                hit.product.as_deref().unwrap_or(""),
                hit.allele_confidence,
                hit.query_coverage,
                hit.database_coverage
            )
        })
        .collect()
}

pub const NO_PLASMID: &str = "Not found";

/// Plasmid replicon lines, or a single `Not found` line.
pub fn format_plasmids(hits: &[GeneHit]) -> Vec<String> {
    if hits.is_empty() {
        return vec![NO_PLASMID.to_string()];
    }
    hits.iter()
        .map(|hit| {
            format!(
                "{} ID:{} COV_Q:{} COV_DB:{}|",
                hit.gene_symbol, hit.allele_confidence, hit.query_coverage, hit.database_coverage
            )
        })
        .collect()
}
