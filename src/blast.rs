//src/blast.rs

//! Parser for the pairwise text output of a translated protein search
//! (`blastx` default format).
//!
//! The dump is a flat sequence of lines; the subject name, its length and
//! the identity of the current HSP are announced once and then carried
//! across every following `Query`/marker/`Sbjct` triple. That carried state
//! lives in [`ParserState`], which is fed one line at a time and hands back
//! an [`AlignmentMatch`] whenever a block is closed.

use std::str::Lines;

use crate::types::{AlignmentMatch, AlignmentSegment};

/// Identity a block must exceed before its residues are collected (primary scans).
pub const PRIMARY_ACTIVATION: f64 = 90.0;

/// Identity a block must exceed before its residues are collected (exploratory scans).
pub const EXPLORATORY_ACTIVATION: f64 = 80.0;

/// BLAST wraps alignments at 60 residues per line.
pub const MAX_RESIDUES_PER_LINE: usize = 60;

/// A `Query` line whose marker/`Sbjct` partners have not been seen yet.
#[derive(Debug, Clone)]
struct PendingQuery {
    column: usize,
    residues: Vec<char>,
    marker: Option<Vec<char>>,
}

/// Running state of the line scan.
#[derive(Debug, Default)]
pub struct ParserState {
    /// Current subject id; persists until the next `>` header.
    pub subject_id: String,
    /// Current subject length; persists until the next `Length=` line.
    pub subject_length: usize,
    /// Identity of the most recent summary line.
    pub percent_identity: f64,
    current: Option<AlignmentMatch>,
    collecting: bool,
    pending: Option<PendingQuery>,
}

impl ParserState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Consumes one line. Returns the previous block when this line closes it.
    pub fn feed(&mut self, raw: &str, activation: f64) -> Option<AlignmentMatch> {
        let line = raw.trim_end_matches(['\r', '\n']);
        let trimmed = line.trim();

        // The line right after a Query line is the marker line, whatever it holds.
        if let Some(pending) = self.pending.as_mut() {
            if pending.marker.is_none() && !is_residue_line(trimmed, "Sbjct") {
                pending.marker = Some(marker_at(line, pending.column, pending.residues.len()));
                return None;
            }
        }

        if let Some(rest) = trimmed.strip_prefix('>') {
            let finished = self.finish();
            self.subject_id = parse_subject_id(rest);
            self.subject_length = 0;
            return finished;
        }

        if trimmed.starts_with("Query=") {
            let finished = self.finish();
            self.subject_id.clear();
            self.subject_length = 0;
            return finished;
        }

        if let Some(rest) = trimmed.strip_prefix("Length=") {
            if let Ok(len) = rest.trim().parse::<usize>() {
                self.subject_length = len;
            }
            return None;
        }

        if let Some((identities, aligned, pct)) = parse_identities(trimmed) {
            let finished = self.finish();
            self.percent_identity = pct;
            self.collecting = pct > activation;
            self.current = Some(AlignmentMatch {
                subject_id: self.subject_id.clone(),
                subject_length: self.subject_length,
                percent_identity: pct,
                identities,
                aligned_length: aligned,
                ..AlignmentMatch::default()
            });
            return finished;
        }

        if is_residue_line(trimmed, "Query") {
            if self.collecting && self.current.is_some() {
                if let Some((column, residues, _, _)) = parse_residue_line(line, "Query") {
                    self.pending = Some(PendingQuery {
                        column,
                        residues,
                        marker: None,
                    });
                }
            }
            return None;
        }

        if is_residue_line(trimmed, "Sbjct") {
            if let Some(pending) = self.pending.take() {
                if let (Some(current), Some((_, residues, start, end))) =
                    (self.current.as_mut(), parse_residue_line(line, "Sbjct"))
                {
                    push_triple(current, pending, residues, start, end);
                }
            }
        }
        None
    }

    /// Closes the open block, if any.
    pub fn finish(&mut self) -> Option<AlignmentMatch> {
        self.pending = None;
        self.collecting = false;
        self.current.take()
    }
}

/// Lazy iterator over the blocks of an alignment dump.
pub struct AlignmentDump<'a> {
    lines: Lines<'a>,
    activation: f64,
    state: ParserState,
    exhausted: bool,
}

impl<'a> Iterator for AlignmentDump<'a> {
    type Item = AlignmentMatch;

    fn next(&mut self) -> Option<Self::Item> {
        if self.exhausted {
            return None;
        }
        for line in self.lines.by_ref() {
            if let Some(done) = self.state.feed(line, self.activation) {
                return Some(done);
            }
        }
        self.exhausted = true;
        self.state.finish()
    }
}

/// Parses `text` into alignment blocks, collecting residues only for blocks
/// whose identity exceeds `activation`.
pub fn parse_alignment_dump(text: &str, activation: f64) -> AlignmentDump<'_> {
    AlignmentDump {
        lines: text.lines(),
        activation,
        state: ParserState::new(),
        exhausted: false,
    }
}

fn push_triple(
    current: &mut AlignmentMatch,
    pending: PendingQuery,
    subject: Vec<char>,
    start: usize,
    end: usize,
) {
    let n = MAX_RESIDUES_PER_LINE
        .min(pending.residues.len())
        .min(subject.len());
    if n == 0 {
        return;
    }
    let mut marker = pending.marker.unwrap_or_default();
    marker.resize(n, ' ');

    if current.segments.is_empty() {
        current.subject_start = start;
    }
    current.subject_end = end;
    current.segments.push(AlignmentSegment {
        offset: current.reference_residues.len(),
        len: n,
        subject_start: start,
        subject_end: end,
    });
    current.query_residues.extend_from_slice(&pending.residues[..n]);
    current.alignment_residues.extend_from_slice(&marker[..n]);
    current.reference_residues.extend_from_slice(&subject[..n]);
}

fn parse_subject_id(rest: &str) -> String {
    rest.chars()
        .take_while(|c| c.is_alphanumeric() || *c == '_' || *c == ':')
        .collect()
}

/// `Identities = 860/875 (98%), Positives = ..., Gaps = 0/875 (0%)`
/// => `(860, 875, 98.0)`
fn parse_identities(line: &str) -> Option<(usize, usize, f64)> {
    let start = line.find("Identities")?;
    let rest = line[start + "Identities".len()..].trim_start();
    let rest = rest.strip_prefix('=')?.trim_start();

    let ratio_end = rest.find(char::is_whitespace)?;
    let (identities, aligned) = rest[..ratio_end].split_once('/')?;
    let identities = identities.parse().ok()?;
    let aligned = aligned.parse().ok()?;

    let open = rest.find('(')?;
    let close = rest[open..].find('%')? + open;
    let pct = rest[open + 1..close].trim().parse().ok()?;
    Some((identities, aligned, pct))
}

fn is_residue_line(trimmed: &str, tag: &str) -> bool {
    trimmed
        .strip_prefix(tag)
        .and_then(|rest| rest.chars().next())
        .map(char::is_whitespace)
        .unwrap_or(false)
}

/// `Query  1      MSDLAREIT  27` => `(column of residues, residues, 1, 27)`
fn parse_residue_line(line: &str, tag: &str) -> Option<(usize, Vec<char>, usize, usize)> {
    let tag_at = line.find(tag)?;
    let mut pos = tag_at + tag.len();
    let bytes = line.as_bytes();

    let skip_ws = |mut i: usize| {
        while i < bytes.len() && bytes[i].is_ascii_whitespace() {
            i += 1;
        }
        i
    };

    pos = skip_ws(pos);
    let start_begin = pos;
    while pos < bytes.len() && bytes[pos].is_ascii_digit() {
        pos += 1;
    }
    let start: usize = line[start_begin..pos].parse().ok()?;

    pos = skip_ws(pos);
    let column = pos;
    while pos < bytes.len() && !bytes[pos].is_ascii_whitespace() {
        pos += 1;
    }
    let residues: Vec<char> = line[column..pos].chars().collect();
    if residues.is_empty() {
        return None;
    }

    let end: usize = line[pos..].trim().parse().ok()?;
    Some((column, residues, start, end))
}

/// Reads `len` marker characters starting at `column`, padding with blanks.
fn marker_at(line: &str, column: usize, len: usize) -> Vec<char> {
    let mut marker: Vec<char> = line.chars().skip(column).take(len).collect();
    marker.resize(len, ' ');
    marker
}
