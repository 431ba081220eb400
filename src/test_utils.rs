//src/test_utils.rs

use std::fmt::Write as _;

use crate::blast::MAX_RESIDUES_PER_LINE;

/// Builds synthetic `blastx` text dumps with correctly wrapped triples.
#[derive(Default)]
pub struct DumpBuilder {
    text: String,
}

impl DumpBuilder {
    pub fn new() -> Self {
        let mut text = String::new();
        text.push_str("BLASTX 2.12.0+\n\n\nQuery= contig_1 length=250000\n\nLength=250000\n");
        Self { text }
    }

    /// Adds a subject header followed by one HSP.
    pub fn block(
        mut self,
        subject: &str,
        subject_length: usize,
        identity_pct: u32,
        query: &str,
        reference: &str,
        subject_start: usize,
        reverse: bool,
    ) -> Self {
        let _ = write!(
            self.text,
            "\n>{subject}|WP_000000001.1 synthetic reference protein\nLength={subject_length}\n"
        );
        self.hsp(identity_pct, query, reference, subject_start, reverse)
    }

    /// Adds another HSP for the current subject.
    pub fn hsp(
        mut self,
        identity_pct: u32,
        query: &str,
        reference: &str,
        subject_start: usize,
        reverse: bool,
    ) -> Self {
        let q: Vec<char> = query.chars().collect();
        let r: Vec<char> = reference.chars().collect();
        assert_eq!(q.len(), r.len(), "query and reference must align");

        let identical = q.iter().zip(&r).filter(|(a, b)| a == b).count();
        let aligned = r.len();
        let _ = write!(
            self.text,
            "\n Score = 400 bits (1024),  Expect = 1e-120, Method: Compositional matrix adjust.\n \
             Identities = {identical}/{aligned} ({identity_pct}%), Positives = {identical}/{aligned} \
             ({identity_pct}%), Gaps = 0/{aligned} (0%)\n Frame = +1\n\n"
        );

        for (chunk_idx, (qc, rc)) in q
            .chunks(MAX_RESIDUES_PER_LINE)
            .zip(r.chunks(MAX_RESIDUES_PER_LINE))
            .enumerate()
        {
            let offset = chunk_idx * MAX_RESIDUES_PER_LINE;
            let n = qc.len();
            let q_start = 1 + 3 * offset;
            let q_end = q_start + 3 * n - 1;
            let (s_start, s_end) = if reverse {
                (subject_start - offset, subject_start - offset - (n - 1))
            } else {
                (subject_start + offset, subject_start + offset + n - 1)
            };
            let q_str: String = qc.iter().collect();
            let r_str: String = rc.iter().collect();
            let marker: String = qc
                .iter()
                .zip(rc)
                .map(|(a, b)| if a == b { *a } else { ' ' })
                .collect();

            let _ = writeln!(self.text, "Query  {:<6} {}  {}", q_start, q_str, q_end);
            let _ = writeln!(self.text, "{:14}{}", "", marker.trim_end());
            let _ = writeln!(self.text, "Sbjct  {:<6} {}  {}", s_start, r_str, s_end);
            self.text.push('\n');
        }
        self
    }

    pub fn build(self) -> String {
        let mut text = self.text;
        text.push_str("\n\nLambda      K        H\n    0.320    0.136    0.403\n");
        text
    }
}
