//! Raw term → canonical record transformation.
//!
//! Deterministic and side-effect free. Aliases are copied in upstream order
//! without deduplication: duplicated upstream aliases are reproduced as-is.

use crate::entities::{RawTerm, Record, SourceRefs};
use crate::identity::{id_for_source_identifier, source_identifier};

/// Namespace under which a record lists its own id in `source_refs`.
pub const UUIDS_NAMESPACE: &str = "uuids";

/// Default authority namespace for upstream identifiers.
pub const DEFAULT_AUTHORITY: &str = "TME";

/// Default record kind.
pub const DEFAULT_KIND: &str = "Person";

/// Transforms upstream terms of one taxonomy into cached records.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transformer {
    taxonomy: String,
    kind: String,
    authority: String,
}

/// Result of transforming one upstream page.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransformedPage {
    pub records: Vec<Record>,
    /// Terms with an empty raw id. They are still transformed, so they all
    /// share the id derived from `""` and the taxonomy.
    pub unidentified: usize,
}

impl Transformer {
    pub fn new(taxonomy: impl Into<String>) -> Self {
        Self {
            taxonomy: taxonomy.into(),
            kind: DEFAULT_KIND.to_string(),
            authority: DEFAULT_AUTHORITY.to_string(),
        }
    }

    pub fn with_kind(mut self, kind: impl Into<String>) -> Self {
        self.kind = kind.into();
        self
    }

    pub fn with_authority(mut self, authority: impl Into<String>) -> Self {
        self.authority = authority.into();
        self
    }

    pub fn taxonomy(&self) -> &str {
        &self.taxonomy
    }

    pub fn transform(&self, term: &RawTerm) -> Record {
        let tme_identifier = source_identifier(&term.raw_id, &self.taxonomy);
        let id = id_for_source_identifier(&tme_identifier);

        let mut source_refs = SourceRefs::new();
        source_refs.insert(self.authority.clone(), vec![tme_identifier]);
        source_refs.insert(UUIDS_NAMESPACE.to_string(), vec![id.clone()]);

        Record {
            id,
            label: term.canonical_name.clone(),
            kind: self.kind.clone(),
            source_refs,
            aliases: term.aliases.clone(),
        }
    }

    /// Transform a whole page, one record per term.
    pub fn transform_page(&self, terms: &[RawTerm]) -> TransformedPage {
        TransformedPage {
            records: terms.iter().map(|term| self.transform(term)).collect(),
            unidentified: terms.iter().filter(|term| term.raw_id.is_empty()).count(),
        }
    }
}

/// Transform a single term with the default kind and authority.
pub fn transform(term: &RawTerm, taxonomy: &str) -> Record {
    Transformer::new(taxonomy).transform(term)
}
