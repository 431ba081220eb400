// src/mutations/scanner.rs

use std::path::Path;

use log::debug;

use super::panels::{is_known_deleterious, GenePanel};
use crate::blast::parse_alignment_dump;
use crate::error::{read_input, Result};
use crate::types::{AlignmentMatch, MutationKind, MutationRecord};

/// A block must exceed this identity to be reported as truncated.
pub const TRUNCATION_MIN_IDENTITY: f64 = 80.0;

/// A block must exceed this identity to be scored for substitutions.
pub const SUBSTITUTION_MIN_IDENTITY: f64 = 90.0;

pub const DELETERIOUS: &str = "deleterious";

/// Scans already parsed blocks for truncations and substitutions in `panel`'s genes.
pub fn scan_matches<I>(matches: I, panel: &GenePanel) -> Vec<MutationRecord>
where
    I: IntoIterator<Item = AlignmentMatch>,
{
    let mut records = Vec::new();
    for m in matches {
        scan_match(&m, panel, &mut records);
    }
    records
}

/// Parses an alignment dump with the panel's activation threshold and scans it.
pub fn scan_dump(text: &str, panel: &GenePanel) -> Vec<MutationRecord> {
    scan_matches(parse_alignment_dump(text, panel.activation), panel)
}

/// Like [`scan_dump`], reading the dump from disk. A missing dump is an error.
pub fn scan_dump_file<P: AsRef<Path>>(path: P, panel: &GenePanel) -> Result<Vec<MutationRecord>> {
    let text = read_input(path.as_ref())?;
    let records = scan_dump(&text, panel);
    debug!(
        "{}: {} mutation record(s) from {}",
        panel.name,
        records.len(),
        path.as_ref().display()
    );
    Ok(records)
}

fn scan_match(m: &AlignmentMatch, panel: &GenePanel, out: &mut Vec<MutationRecord>) {
    if !panel.contains(&m.subject_id) {
        return;
    }

    // aligned < 90% of the reference
    if m.aligned_length * 10 < m.subject_length * 9 && m.percent_identity > TRUNCATION_MIN_IDENTITY {
        out.push(MutationRecord {
            gene_symbol: m.subject_id.clone(),
            kind: MutationKind::Truncation {
                aligned_length: m.aligned_length,
                reference_length: m.subject_length,
            },
            annotation: None,
        });
    }

    if m.percent_identity <= SUBSTITUTION_MIN_IDENTITY
        || !m.starts_at_reference_origin()
        || !panel.is_scoreable(&m.subject_id, m.aligned_length, m.subject_length)
    {
        return;
    }

    for (i, (&reference, &observed)) in m
        .reference_residues
        .iter()
        .zip(&m.query_residues)
        .enumerate()
    {
        if reference.eq_ignore_ascii_case(&observed) {
            continue;
        }
        let Some(position) = m.reference_position(i) else {
            continue;
        };
        let code = format!("{reference}{position}{observed}");
        let annotation = is_known_deleterious(&m.subject_id, &code).then(|| DELETERIOUS.to_string());
        out.push(MutationRecord {
            gene_symbol: m.subject_id.clone(),
            kind: MutationKind::Substitution {
                position,
                reference_residue: reference,
                observed_residue: observed,
            },
            annotation,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mutations::panels::{
        ACINETOBACTER_BAUMANNII, KLEBSIELLA_PNEUMONIAE, PSEUDOMONAS_AERUGINOSA,
    };
    use crate::test_utils::DumpBuilder;

    fn with_mismatch(reference: &str, index: usize, residue: char) -> String {
        reference
            .chars()
            .enumerate()
            .map(|(i, c)| if i == index { residue } else { c })
            .collect()
    }

    #[test]
    fn test_forward_substitution_position() {
        let reference = "S".repeat(200);
        let query = with_mismatch(&reference, 5, 'L');
        let text = DumpBuilder::new()
            .block("GyrA", 200, 95, &query, &reference, 1, false)
            .build();

        let records = scan_dump(&text, &ACINETOBACTER_BAUMANNII.others);
        assert_eq!(records.len(), 1);
        assert_eq!(
            records[0].kind,
            MutationKind::Substitution {
                position: 6,
                reference_residue: 'S',
                observed_residue: 'L'
            }
        );
        assert_eq!(records[0].to_string(), "GyrA:S6L");
    }

    #[test]
    fn test_reverse_substitution_position() {
        let reference = "S".repeat(200);
        let query = with_mismatch(&reference, 5, 'L');
        let text = DumpBuilder::new()
            .block("GyrA", 200, 95, &query, &reference, 200, true)
            .build();

        let records = scan_dump(&text, &ACINETOBACTER_BAUMANNII.others);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].to_string(), "GyrA:S195L");
    }

    #[test]
    fn test_truncation_without_substitutions() {
        let reference = "K".repeat(150);
        let mut query = reference.clone();
        for i in [3, 40, 99] {
            query = with_mismatch(&query, i, 'W');
        }
        let text = DumpBuilder::new()
            .block("GyrA", 200, 85, &query, &reference, 1, false)
            .build();

        let records = scan_dump(&text, &ACINETOBACTER_BAUMANNII.others);
        assert_eq!(records.len(), 1);
        assert_eq!(
            records[0].kind,
            MutationKind::Truncation {
                aligned_length: 150,
                reference_length: 200
            }
        );
        assert_eq!(records[0].to_string(), "GyrA truncation: 150/200");
    }

    #[test]
    fn test_header_only_block_reports_truncation() {
        let text = "\
Query= contig_7

>MgrB|ref MgrB
Length=47

 Score = 80 bits (200),  Expect = 1e-20, Method: Compositional matrix adjust.
 Identities = 30/32 (94%), Positives = 31/32 (96%), Gaps = 0/32 (0%)
";
        let records = scan_dump(text, &KLEBSIELLA_PNEUMONIAE.polymyxin);
        let lines: Vec<String> = records.iter().map(ToString::to_string).collect();
        assert_eq!(lines, vec!["MgrB truncation: 32/47"]);
    }

    #[test]
    fn test_short_high_identity_match_is_truncation_only() {
        // anchored and above 90%, but too short to be scored
        let reference = "K".repeat(150);
        let query = with_mismatch(&reference, 10, 'W');
        let text = DumpBuilder::new()
            .block("ParC", 200, 99, &query, &reference, 1, false)
            .build();

        let records = scan_dump(&text, &ACINETOBACTER_BAUMANNII.others);
        assert_eq!(records.len(), 1);
        assert!(matches!(records[0].kind, MutationKind::Truncation { .. }));
    }

    #[test]
    fn test_genes_outside_panel_are_ignored() {
        let reference = "S".repeat(100);
        let query = with_mismatch(&reference, 2, 'L');
        let text = DumpBuilder::new()
            .block("MexT", 100, 98, &query, &reference, 1, false)
            .build();

        assert!(scan_dump(&text, &KLEBSIELLA_PNEUMONIAE.others).is_empty());
        assert_eq!(scan_dump(&text, &PSEUDOMONAS_AERUGINOSA.others).len(), 1);
    }

    #[test]
    fn test_mid_reference_alignment_reports_no_substitutions() {
        let reference = "S".repeat(200);
        let query = with_mismatch(&reference, 30, 'L');
        let text = DumpBuilder::new()
            .block("GyrA", 210, 97, &query, &reference, 11, false)
            .build();

        assert!(scan_dump(&text, &ACINETOBACTER_BAUMANNII.others).is_empty());
    }

    #[test]
    fn test_known_deleterious_annotation() {
        let mut reference = "A".repeat(365);
        reference.replace_range(255..256, "R");
        let query = with_mismatch(&reference, 255, 'G');
        let text = DumpBuilder::new()
            .block("PmrB", 365, 99, &query, &reference, 1, false)
            .build();

        let records = scan_dump(&text, &KLEBSIELLA_PNEUMONIAE.polymyxin);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].annotation.as_deref(), Some(DELETERIOUS));
        assert_eq!(records[0].to_string(), "PmrB:R256G(deleterious)");
    }

    #[test]
    fn test_case_insensitive_comparison() {
        let reference = "MSKL".repeat(25);
        let query = reference.to_lowercase();
        let text = DumpBuilder::new()
            .block("GyrB", 100, 100, &query, &reference, 1, false)
            .build();

        assert!(scan_dump(&text, &KLEBSIELLA_PNEUMONIAE.others).is_empty());
    }

    #[test]
    fn test_rescanning_is_deterministic() {
        let reference = "MSKLVE".repeat(40);
        let mut query = reference.clone();
        for i in [7, 64, 130, 201] {
            query = with_mismatch(&query, i, 'W');
        }
        let text = DumpBuilder::new()
            .block("GyrA", 240, 98, &query, &reference, 1, false)
            .block("ParC", 240, 98, &query, &reference, 1, false)
            .build();

        let first: Vec<String> = scan_dump(&text, &KLEBSIELLA_PNEUMONIAE.others)
            .iter()
            .map(ToString::to_string)
            .collect();
        let second: Vec<String> = scan_dump(&text, &KLEBSIELLA_PNEUMONIAE.others)
            .iter()
            .map(ToString::to_string)
            .collect();
        assert_eq!(first.len(), 8);
        assert_eq!(first, second);
        assert_eq!(first[0], "GyrA:S8W");
        assert_eq!(first[4], "ParC:S8W");
    }

    #[test]
    fn test_missing_dump_is_an_error() {
        let err = scan_dump_file("/nonexistent/sample_blastOthers", &KLEBSIELLA_PNEUMONIAE.others)
            .unwrap_err();
        assert!(matches!(err, crate::error::PipelineError::MissingInput { .. }));
    }
}
