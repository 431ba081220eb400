// src/store.rs

//! Per-sample result records. Every write is an upsert of one named field,
//! so re-running a stage overwrites its previous value.

use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use log::debug;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::error::{PipelineError, Result};

/// Separator between entries of list-valued fields.
pub const LINE_BREAK: &str = "<br>";

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ResultField {
    Sample,
    Completeness,
    Contamination,
    GenomeSize,
    Contigs,
    Species,
    Genes,
    Resfinder,
    Virulence,
    Plasmid,
    StrainType,
    PolymyxinMutations,
    OtherMutations,
    Coverage,
}

impl ResultField {
    /// Name of the field in the stored record.
    pub fn name(self) -> &'static str {
        match self {
            ResultField::Sample => "sample",
            ResultField::Completeness => "checkm_1",
            ResultField::Contamination => "checkm_2",
            ResultField::GenomeSize => "checkm_3",
            ResultField::Contigs => "checkm_4",
            ResultField::Species => "especie",
            ResultField::Genes => "gene",
            ResultField::Resfinder => "resfinder",
            ResultField::Virulence => "VFDB",
            ResultField::Plasmid => "plasmid",
            ResultField::StrainType => "mlst",
            ResultField::PolymyxinMutations => "mutacoes_poli",
            ResultField::OtherMutations => "mutacoes_outras",
            ResultField::Coverage => "coverage",
        }
    }
}

impl fmt::Display for ResultField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Joins list entries the way the report renders them.
pub fn join_lines<S: AsRef<str>>(lines: &[S]) -> String {
    lines
        .iter()
        .map(AsRef::as_ref)
        .collect::<Vec<_>>()
        .join(LINE_BREAK)
}

/// One sample's stored fields, keyed by field name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SampleRecord {
    pub sample: String,
    pub fields: BTreeMap<String, String>,
}

impl SampleRecord {
    pub fn get(&self, field: ResultField) -> Option<&str> {
        self.fields.get(field.name()).map(String::as_str)
    }
}

pub trait ResultStore {
    /// Sets `field` of `sample`'s record, creating the record if needed.
    fn upsert(&self, sample: &str, field: ResultField, value: &str) -> Result<()>;

    fn load(&self, sample: &str) -> Result<Option<SampleRecord>>;
}

/// In-process store, used by tests and dry runs.
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: Mutex<BTreeMap<String, SampleRecord>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ResultStore for MemoryStore {
    fn upsert(&self, sample: &str, field: ResultField, value: &str) -> Result<()> {
        let mut records = self.records.lock();
        let record = records.entry(sample.to_string()).or_insert_with(|| SampleRecord {
            sample: sample.to_string(),
            ..Default::default()
        });
        record.fields.insert(field.name().to_string(), value.to_string());
        Ok(())
    }

    fn load(&self, sample: &str) -> Result<Option<SampleRecord>> {
        Ok(self.records.lock().get(sample).cloned())
    }
}

/// One pretty-printed JSON document per sample under a directory. Writes go
/// through a temporary file and a rename, so readers never see half a record.
#[derive(Debug)]
pub struct JsonDirStore {
    dir: PathBuf,
    lock: Mutex<()>,
}

impl JsonDirStore {
    pub fn open<P: Into<PathBuf>>(dir: P) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(JsonDirStore {
            dir,
            lock: Mutex::new(()),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn record_path(&self, sample: &str) -> Result<PathBuf> {
        if sample.is_empty() || sample.contains(['/', '\\']) || sample.starts_with('.') {
            return Err(PipelineError::Store(format!("invalid sample name {sample:?}")));
        }
        Ok(self.dir.join(format!("{sample}.json")))
    }

    fn read_record(path: &Path) -> Result<Option<SampleRecord>> {
        match fs::read_to_string(path) {
            Ok(text) => Ok(Some(serde_json::from_str(&text)?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

impl ResultStore for JsonDirStore {
    fn upsert(&self, sample: &str, field: ResultField, value: &str) -> Result<()> {
        let path = self.record_path(sample)?;
        let _guard = self.lock.lock();

        let mut record = Self::read_record(&path)?.unwrap_or_else(|| SampleRecord {
            sample: sample.to_string(),
            ..Default::default()
        });
        record.fields.insert(field.name().to_string(), value.to_string());

        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, serde_json::to_string_pretty(&record)?)?;
        fs::rename(&tmp, &path)?;
        debug!("{sample}: stored {field}");
        Ok(())
    }

    fn load(&self, sample: &str) -> Result<Option<SampleRecord>> {
        let path = self.record_path(sample)?;
        let _guard = self.lock.lock();
        Self::read_record(&path)
    }
}
