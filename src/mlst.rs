// src/mlst.rs

//! Strain typing result (`data.json` written by the typing container).

use std::fmt;
use std::path::Path;

use log::{info, warn};
use serde_json::Value;

use crate::error::{PipelineError, Result};
use crate::species::TypingScheme;

pub const NOT_AVAILABLE: &str = "Not available for this species";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StrainType {
    /// `131`, or `131*` for a novel allele combination close to ST131.
    Sequence(String),
    /// Comma-separated list of the closest known types.
    Nearest(String),
    Unknown,
    NotAvailable,
}

impl fmt::Display for StrainType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StrainType::Sequence(st) => f.write_str(st),
            StrainType::Nearest(sts) => write!(f, "Nearest {sts}"),
            StrainType::Unknown => f.write_str("Unknown"),
            StrainType::NotAvailable => f.write_str(NOT_AVAILABLE),
        }
    }
}

/// Depth-first search for the first string value stored under `key`.
fn find_string<'a>(value: &'a Value, key: &str) -> Option<&'a str> {
    match value {
        Value::Object(map) => map
            .get(key)
            .and_then(Value::as_str)
            .or_else(|| map.values().find_map(|v| find_string(v, key))),
        Value::Array(items) => items.iter().find_map(|v| find_string(v, key)),
        _ => None,
    }
}

fn is_sequence_type(st: &str) -> bool {
    let digits = st.strip_suffix('*').unwrap_or(st);
    (1..=4).contains(&digits.len()) && digits.bytes().all(|b| b.is_ascii_digit())
}

/// Interprets the typing result: nearest types when listed, otherwise the
/// sequence type, otherwise `Unknown`.
pub fn parse_strain_type(text: &str) -> Result<StrainType> {
    if text.trim().is_empty() {
        return Ok(StrainType::Unknown);
    }
    let json: Value = serde_json::from_str(text)?;

    if let Some(nearest) = find_string(&json, "nearest_sts").filter(|s| !s.trim().is_empty()) {
        return Ok(StrainType::Nearest(nearest.trim().to_string()));
    }
    match find_string(&json, "sequence_type").map(str::trim) {
        Some(st) if is_sequence_type(st) => Ok(StrainType::Sequence(st.to_string())),
        _ => Ok(StrainType::Unknown),
    }
}

/// Reads `data.json` for a sample whose scheme is known. Species without a
/// scheme are never typed and get [`StrainType::NotAvailable`]; a missing
/// result file for a typed species counts as `Unknown`.
pub fn read_strain_type<P: AsRef<Path>>(path: P, scheme: &TypingScheme) -> Result<StrainType> {
    if scheme.name().is_none() {
        return Ok(StrainType::NotAvailable);
    }
    let path = path.as_ref();
    let strain = match std::fs::read_to_string(path) {
        Ok(text) => parse_strain_type(&text)?,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            warn!("No typing result at {}", path.display());
            StrainType::Unknown
        }
        Err(e) => return Err(PipelineError::Io(e)),
    };
    info!("Strain type ({scheme}): {strain}");
    Ok(strain)
}
