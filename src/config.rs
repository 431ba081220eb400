// src/config.rs

use std::path::PathBuf;

use crate::error::{PipelineError, Result};
use crate::species::DatabaseDirs;

pub const DEFAULT_THREADS: usize = 16;

/// Tool and database locations shared by every sample of a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineConfig {
    /// Gene screener executable.
    pub abricate: PathBuf,
    /// Directory holding the strain typer's `mlst_db`.
    pub mlst_install: PathBuf,
    pub polymyxin_db: PathBuf,
    pub others_db: PathBuf,
    /// Directory holding the `kraken2` executable.
    pub kraken2_install: PathBuf,
    pub kraken_db: PathBuf,
    pub unicycler: PathBuf,
    pub fastani: PathBuf,
    /// Directory holding the genome-distance reference lists.
    pub fastani_db: PathBuf,
    pub prokka: PathBuf,
    pub checkm: PathBuf,
    pub blastx: PathBuf,
    pub threads: usize,
}

fn non_empty(value: String) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

impl PipelineConfig {
    /// Reads the configuration from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Builds the configuration from any variable source. Required variables
    /// that are unset or blank are reported together in one `Config` error.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).and_then(non_empty);
        let mut missing = Vec::new();
        let mut required = |name: &'static str| match get(name) {
            Some(v) => PathBuf::from(v),
            None => {
                missing.push(name);
                PathBuf::new()
            }
        };

        let abricate = required("ABRICATE_PATH");
        let mlst_install = required("MLST_PATH");
        let polymyxin_db = required("POLIMYXIN_DB_PATH");
        let others_db = required("OUTHERS_DB_PATH");
        let kraken2_install = required("KRAKEN2_PATH");
        let kraken_db = required("KRAKEN_DB_PATH");
        let unicycler = required("UNICYCLER_PATH");
        let fastani = required("FASTANI_PATH");
        let fastani_db = required("FASTANI_DB_PATH");

        if !missing.is_empty() {
            return Err(PipelineError::Config(format!(
                "missing environment variable(s): {}",
                missing.join(", ")
            )));
        }

        let threads = match get("CABGEN_THREADS") {
            Some(v) => v.parse::<usize>().ok().filter(|&n| n > 0).ok_or_else(|| {
                PipelineError::Config(format!("CABGEN_THREADS must be a positive integer, got {v}"))
            })?,
            None => DEFAULT_THREADS,
        };
        let tool = |name: &str, default: &str| PathBuf::from(get(name).unwrap_or_else(|| default.to_string()));

        Ok(PipelineConfig {
            abricate,
            mlst_install,
            polymyxin_db,
            others_db,
            kraken2_install,
            kraken_db,
            unicycler,
            fastani,
            fastani_db,
            prokka: tool("PROKKA_PATH", "prokka"),
            checkm: tool("CHECKM_PATH", "checkm"),
            blastx: tool("BLASTX_PATH", "blastx"),
            threads,
        })
    }

    pub fn kraken2_bin(&self) -> PathBuf {
        self.kraken2_install.join("kraken2")
    }

    pub fn database_dirs(&self) -> DatabaseDirs {
        DatabaseDirs {
            others: self.others_db.clone(),
            polymyxin: self.polymyxin_db.clone(),
            distance_lists: self.fastani_db.clone(),
        }
    }
}

/// One sample: its name, paired reads and where its outputs go.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SampleConfig {
    /// Full sample name, e.g. `27563_S12`.
    pub sample: String,
    pub read1: PathBuf,
    pub read2: PathBuf,
    pub output_dir: PathBuf,
}

impl SampleConfig {
    pub fn new<S: Into<String>, P: Into<PathBuf>>(sample: S, read1: P, read2: P, output_dir: P) -> Self {
        SampleConfig {
            sample: sample.into(),
            read1: read1.into(),
            read2: read2.into(),
            output_dir: output_dir.into(),
        }
    }

    /// Rejects names that cannot key a record or name a directory.
    pub fn validate(&self) -> Result<()> {
        let id = self.sample_id();
        if id.is_empty() || id.starts_with('.') || id.contains(['/', '\\']) {
            return Err(PipelineError::InvalidInput(format!(
                "sample name {:?} does not start with a usable sample id",
                self.sample
            )));
        }
        Ok(())
    }

    /// Sample number, the part of the name before the first `_`.
    pub fn sample_id(&self) -> &str {
        self.sample.split('_').next().unwrap_or(&self.sample)
    }

    pub fn sample_dir(&self) -> PathBuf {
        self.output_dir.join(self.sample_id())
    }

    fn in_sample_dir(&self, suffix: &str) -> PathBuf {
        self.sample_dir().join(format!("{}_{suffix}", self.sample_id()))
    }

    pub fn assembly_dir(&self) -> PathBuf {
        self.sample_dir().join("unicycler")
    }

    pub fn assembly(&self) -> PathBuf {
        self.assembly_dir().join("assembly.fasta")
    }

    pub fn annotation_dir(&self) -> PathBuf {
        self.sample_dir().join("prokka")
    }

    /// Nucleotide sequences of the annotated genes.
    pub fn annotated_genes(&self) -> PathBuf {
        self.annotation_dir().join("genome.ffn")
    }

    pub fn quality_dir(&self) -> PathBuf {
        self.sample_dir().join("checkM_bins")
    }

    pub fn quality_table(&self) -> PathBuf {
        self.quality_dir().join(format!("{}_resultados", self.sample_id()))
    }

    pub fn classifier_output(&self) -> PathBuf {
        self.sample_dir().join("out_kraken")
    }

    pub fn resistance_hits(&self) -> PathBuf {
        self.in_sample_dir("outAbricateRes")
    }

    pub fn virulence_hits(&self) -> PathBuf {
        self.in_sample_dir("outAbricateVFDB")
    }

    pub fn plasmid_hits(&self) -> PathBuf {
        self.in_sample_dir("outAbricatePlasmid")
    }

    pub fn others_dump(&self) -> PathBuf {
        self.in_sample_dir("blastOthers")
    }

    pub fn polymyxin_dump(&self) -> PathBuf {
        self.in_sample_dir("blastPoli")
    }

    pub fn distance_output(&self) -> PathBuf {
        self.in_sample_dir("out-fastANI")
    }

    pub fn typing_result(&self) -> PathBuf {
        self.assembly_dir().join("data.json")
    }
}
