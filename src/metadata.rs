use serde::{Deserialize, Serialize};
use rustc_hash::FxHashMap;
use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum LookupError {
    #[error("No strain record for leaf \"{0}\".")]
    UnknownLeaf(String),
}

/// Taxonomic metadata for one leaf.
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StrainRecord {
    pub genus: String,
    pub epithet: String,
    #[serde(default)]
    pub strain_names: Vec<String>,
    #[serde(default)]
    pub is_ex_type: bool,
}

impl StrainRecord {
    /// Stand-in for a leaf that has no record; the leaf name takes the
    /// place of the species.
    pub fn placeholder(name: &str) -> Self {
        Self {
            genus: String::new(),
            epithet: name.to_string(),
            strain_names: Vec::new(),
            is_ex_type: false,
        }
    }

    /// `"Aspergillus flavus"`, or `"A. flavus"` when abbreviated.
    pub fn species_name(&self, abbreviated: bool) -> String {
        let genus = if abbreviated {
            match self.genus.chars().next() {
                Some(initial) => format!("{initial}."),
                None => String::new(),
            }
        } else {
            self.genus.clone()
        };

        if genus.is_empty() {
            self.epithet.clone()
        } else {
            format!("{genus} {}", self.epithet)
        }
    }

    pub fn primary_strain(&self) -> Option<&str> {
        self.strain_names.first().map(String::as_str)
    }
}

/// Leaf name to [StrainRecord] mapping.
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StrainCatalog {
    records: FxHashMap<String, StrainRecord>,
}

impl StrainCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reads a JSON object keyed by leaf name.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn lookup(&self, name: &str) -> Result<&StrainRecord, LookupError> {
        self.records
            .get(name)
            .ok_or_else(|| LookupError::UnknownLeaf(name.to_string()))
    }

    pub fn insert(
        &mut self,
        name: impl Into<String>,
        record: StrainRecord,
    ) -> Option<StrainRecord> {
        self.records.insert(name.into(), record)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
