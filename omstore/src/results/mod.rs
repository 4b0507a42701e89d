// Decoding of raw search result pages into entities

use crate::convert::{self, HashRecord, StorageRecord};
use crate::entity::Entity;
use crate::error::{OmError, Result};
use crate::schema::{DataStructure, Schema};

/// Payload of one search hit as the backend returns it
#[derive(Debug, Clone, PartialEq)]
pub enum RawPayload {
    /// Field/value pairs of a flat record
    Hash(Vec<(String, String)>),
    /// Document text of a structured record
    Json(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct RawRecord {
    pub key: String,
    pub payload: RawPayload,
}

/// One page of search hits plus the total number of matches.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RawBatch {
    pub count: usize,
    pub records: Vec<RawRecord>,
}

#[derive(Debug)]
pub struct SearchResults<'a> {
    /// Total matches reported by the backend, not just this page
    pub count: usize,
    pub entities: Vec<Entity<'a>>,
}

impl<'a> SearchResults<'a> {
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }
}

/// Decode every record of `batch`; the first bad record fails the whole batch.
pub fn convert<'a>(
    schema: &'a Schema,
    encoding: DataStructure,
    batch: RawBatch,
) -> Result<SearchResults<'a>> {
    let entities = batch
        .records
        .into_iter()
        .map(|record| {
            let storage = storage_record(encoding, &record)?;
            let data = convert::decode(schema, &storage)?;
            Ok(Entity::from_storage(schema, record.key, data))
        })
        .collect::<Result<Vec<_>>>()?;

    log::debug!(
        "Decoded {} of {} '{}' results",
        entities.len(),
        batch.count,
        schema.entity_name()
    );
    Ok(SearchResults {
        count: batch.count,
        entities,
    })
}

fn storage_record(encoding: DataStructure, record: &RawRecord) -> Result<StorageRecord> {
    match (encoding, &record.payload) {
        (DataStructure::Hash, RawPayload::Hash(pairs)) => {
            let fields: HashRecord = pairs.iter().cloned().collect();
            Ok(StorageRecord::Hash(fields))
        }
        (DataStructure::Json, RawPayload::Json(text)) => serde_json::from_str(text)
            .map(StorageRecord::Json)
            .map_err(|e| OmError::MalformedResult {
                key: record.key.clone(),
                reason: format!("invalid JSON document: {e}"),
            }),
        (expected, payload) => Err(OmError::MalformedResult {
            key: record.key.clone(),
            reason: format!("expected a {expected} payload, got {}", payload_kind(payload)),
        }),
    }
}

fn payload_kind(payload: &RawPayload) -> &'static str {
    match payload {
        RawPayload::Hash(_) => "HASH",
        RawPayload::Json(_) => "JSON",
    }
}
