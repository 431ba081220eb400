// src/kraken.rs

//! Taxonomy vote over per-read classifier output.
//!
//! Each row is `C/U <tab> read id <tab> label (taxid N) <tab> ...`; only the
//! label of field 2 is counted.

use std::path::Path;

use ahash::AHashMap;
use log::info;

use crate::error::{read_input, Result};
use crate::types::TaxonomyVote;

const MIN_FIELDS: usize = 3;

/// Strips the `(taxid N)` suffix and surrounding blanks from a label field.
fn label_of(field: &str) -> &str {
    field.split('(').next().unwrap_or_default().trim()
}

/// Counts labels and returns the two most frequent. Ties go to the label
/// seen first; a missing runner-up is reported as an empty label with count 0.
pub fn count_votes_from_str(text: &str) -> TaxonomyVote {
    // label -> (count, first-seen index)
    let mut counts: AHashMap<&str, (usize, usize)> = AHashMap::new();
    for line in text.lines() {
        let fields: Vec<&str> = line.split('\t').collect();
        if fields.len() < MIN_FIELDS {
            continue;
        }
        let label = label_of(fields[2]);
        let next = counts.len();
        counts.entry(label).or_insert((0, next)).0 += 1;
    }

    let mut ranked: Vec<(&str, usize, usize)> = counts
        .into_iter()
        .map(|(label, (count, first))| (label, count, first))
        .collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then(a.2.cmp(&b.2)));

    let mut top = ranked.into_iter();
    let mut vote = TaxonomyVote::default();
    if let Some((label, count, _)) = top.next() {
        vote.majority = label.to_string();
        vote.majority_count = count;
    }
    if let Some((label, count, _)) = top.next() {
        vote.runner_up = label.to_string();
        vote.runner_up_count = count;
    }
    vote
}

/// Reads a classifier output file and votes on it. A missing file is an error.
pub fn count_votes<P: AsRef<Path>>(path: P) -> Result<TaxonomyVote> {
    let text = read_input(path.as_ref())?;
    let vote = count_votes_from_str(&text);
    info!(
        "Taxonomy vote: {} ({}), runner-up {} ({})",
        vote.majority, vote.majority_count, vote.runner_up, vote.runner_up_count
    );
    Ok(vote)
}
