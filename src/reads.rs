// src/reads.rs

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use flate2::read::MultiGzDecoder;
use log::debug;

use crate::error::{PipelineError, Result};

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// Read count and total sequenced bases of one FASTQ file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReadStats {
    pub reads: u64,
    pub bases: u64,
}

impl ReadStats {
    pub fn mean_length(&self) -> f64 {
        if self.reads == 0 {
            0.0
        } else {
            self.bases as f64 / self.reads as f64
        }
    }
}

/// Opens a FASTQ file, transparently decompressing gzip (detected by its
/// magic bytes, so `.fastq.gz` and misnamed files both work).
fn open_reads(path: &Path) -> Result<Box<dyn BufRead>> {
    let f = File::open(path).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => PipelineError::MissingInput {
            path: path.to_path_buf(),
        },
        _ => PipelineError::Io(e),
    })?;
    let mut reader = BufReader::new(f);
    let is_gz = reader.fill_buf()?.starts_with(&GZIP_MAGIC);

    Ok(if is_gz {
        Box::new(BufReader::new(MultiGzDecoder::new(reader)))
    } else {
        Box::new(reader)
    })
}

/// Streams a FASTQ(.gz) file and counts records and sequence bases.
/// Records are four lines; a trailing partial record is ignored.
pub fn read_stats<P: AsRef<Path>>(path: P) -> Result<ReadStats> {
    let mut reader = open_reads(path.as_ref())?;
    let mut stats = ReadStats::default();
    let mut line = String::new();

    loop {
        // 1) header
        line.clear();
        if reader.read_line(&mut line)? == 0 {
            break;
        }
        if !line.starts_with('@') {
            continue;
        }

        // 2) sequence
        line.clear();
        if reader.read_line(&mut line)? == 0 {
            break;
        }
        let seq_len = line.trim_end().len() as u64;

        // 3) plus line, 4) quality
        line.clear();
        if reader.read_line(&mut line)? == 0 {
            break;
        }
        line.clear();
        if reader.read_line(&mut line)? == 0 {
            break;
        }

        stats.reads += 1;
        stats.bases += seq_len;
    }

    debug!(
        "{}: {} reads, mean length {:.1}",
        path.as_ref().display(),
        stats.reads,
        stats.mean_length()
    );
    Ok(stats)
}

/// Sequencing depth: mean R1 read length × total reads of both mates / genome size.
pub fn estimate_coverage(r1: &ReadStats, r2: &ReadStats, genome_size: f64) -> f64 {
    if genome_size <= 0.0 {
        return 0.0;
    }
    r1.mean_length() * (r1.reads + r2.reads) as f64 / genome_size
}
