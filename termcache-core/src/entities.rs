//! Entity types for termcache

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Record identifier: lowercase hyphenated UUIDv3 string.
///
/// Stored as the raw key bytes in the cache bucket, so key order is the
/// lexicographic order of this string.
pub type RecordId = String;

/// Identifier namespace → identifiers that produced a record.
pub type SourceRefs = BTreeMap<String, Vec<String>>;

/// A term as delivered by the upstream source.
///
/// Only lives for the duration of a load pass; never written to the cache.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawTerm {
    /// Upstream identifier, unique within a taxonomy.
    pub raw_id: String,
    /// Display name of the term.
    pub canonical_name: String,
    /// Alternative names, in upstream order.
    #[serde(default)]
    pub aliases: Vec<String>,
}

impl RawTerm {
    pub fn new(raw_id: impl Into<String>, canonical_name: impl Into<String>) -> Self {
        Self {
            raw_id: raw_id.into(),
            canonical_name: canonical_name.into(),
            aliases: Vec::new(),
        }
    }

    pub fn with_aliases<I, A>(mut self, aliases: I) -> Self
    where
        I: IntoIterator<Item = A>,
        A: Into<String>,
    {
        self.aliases = aliases.into_iter().map(Into::into).collect();
        self
    }
}

/// Canonical cached entity, one per upstream term.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Record {
    pub id: RecordId,
    pub label: String,
    pub kind: String,
    #[serde(default)]
    pub source_refs: SourceRefs,
    #[serde(default)]
    pub aliases: Vec<String>,
}

impl Record {
    /// Build the addressable view of this record under `base_url`.
    pub fn link(&self, base_url: &str) -> RecordLink {
        RecordLink::new(&self.id, base_url)
    }
}

/// Identifier-only view of a record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordKey {
    pub id: RecordId,
}

impl From<Record> for RecordKey {
    fn from(record: Record) -> Self {
        Self { id: record.id }
    }
}

/// Lightweight addressable view of a record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordLink {
    pub id: RecordId,
    pub url: String,
}

impl RecordLink {
    /// `url` is `base_url + "/" + id`; a trailing slash on `base_url` is not doubled.
    pub fn new(id: &str, base_url: &str) -> Self {
        let base = base_url.trim_end_matches('/');
        Self {
            id: id.to_string(),
            url: format!("{}/{}", base, id),
        }
    }
}
