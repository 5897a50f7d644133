//! JSON reading and writing for belief tables and pipeline artifacts.
//!
//! A belief table is a JSON array of records, or an object with a `beliefs` array. Records that
//! fail to deserialize or validate are returned as [`Rejection`]s; they never fail the batch.
use serde::Serialize;
use serde_json::Value;
use std::{
    fs::{create_dir_all, read_to_string, write},
    path::Path,
};

use crate::{
    error::{Result, TenetError},
    properties::{validate_beliefs, Belief, BeliefId, Rejection},
};

fn records(document: Value) -> Result<Vec<Value>> {
    match document {
        Value::Array(items) => Ok(items),
        Value::Object(mut map) => match map.remove("beliefs") {
            Some(Value::Array(items)) => Ok(items),
            _ => Err(TenetError::Serialization(
                "expected a JSON array of beliefs or an object with a 'beliefs' array".to_string(),
            )),
        },
        _ => Err(TenetError::Serialization(
            "expected a JSON array of beliefs".to_string(),
        )),
    }
}

/// Parse a belief table, splitting it into accepted records and per-record rejections (ordered
/// by input position).
pub fn parse_beliefs(json: &str) -> Result<(Vec<Belief>, Vec<Rejection>)> {
    let document: Value = serde_json::from_str(json)?;
    let mut parsed = Vec::new();
    let mut positions = Vec::new();
    let mut rejected = Vec::new();
    for (index, record) in records(document)?.into_iter().enumerate() {
        let belief_id = record
            .get("belief_id")
            .and_then(Value::as_str)
            .map(BeliefId::from);
        match serde_json::from_value::<Belief>(record) {
            Ok(belief) => {
                parsed.push(belief);
                positions.push(index);
            }
            Err(e) => {
                tracing::warn!("Rejecting belief record at index {index}: {e}");
                rejected.push(Rejection {
                    index,
                    belief_id,
                    reason: e.to_string(),
                });
            }
        }
    }
    let (accepted, invalid) = validate_beliefs(parsed);
    rejected.extend(invalid.into_iter().map(|mut r| {
        r.index = positions[r.index];
        r
    }));
    rejected.sort_by_key(|r| r.index);
    tracing::debug!(
        "Parsed {} beliefs, rejected {}",
        accepted.len(),
        rejected.len()
    );
    Ok((accepted, rejected))
}

pub fn read_beliefs<P: AsRef<Path>>(path: P) -> Result<(Vec<Belief>, Vec<Rejection>)> {
    tracing::debug!("Reading beliefs from {:?}", path.as_ref());
    parse_beliefs(&read_to_string(path)?)
}

pub fn to_json<T: Serialize + ?Sized>(value: &T) -> Result<String> {
    Ok(serde_json::to_string_pretty(value)?)
}

/// Write `value` as pretty JSON, creating parent directories as needed.
pub fn write_json<P: AsRef<Path>, T: Serialize + ?Sized>(path: P, value: &T) -> Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        create_dir_all(parent)?;
    }
    tracing::debug!("Writing {:?}", path);
    write(path, to_json(value)?)?;
    Ok(())
}
