//! Business registry catalog
//!
//! Each registry is identified by its GLEIF registration authority code (e.g. `RA000585`
//! for Companies House). A registry may name the knowledge-base property that holds
//! its company numbers and the OpenCorporates jurisdiction it maps to.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::KbError;
use crate::kb::vocab::OPENCORPORATES_ID;

/// Location or text rewritten by a [`Transform`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TransformKey {
    /// Byte offset where the replacement text must be present
    Position(usize),
    /// Text replaced wherever it occurs
    Text(String),
}

/// Company number normalization step, written as `[key, replacement]`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transform(pub TransformKey, pub String);

/// Registry descriptor
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Registry {
    pub registration_authority_code: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Property holding the authoritative company number
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company_property: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub opencorporates_jurisdiction: Option<String>,
    /// `None`: no prefix. `Some("")`: prefix required but unknown.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub opencorporates_prefix: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub transform: Vec<Transform>,
}

impl Registry {
    pub fn new(code: &str) -> Self {
        Self {
            registration_authority_code: code.to_string(),
            name: None,
            company_property: None,
            opencorporates_jurisdiction: None,
            opencorporates_prefix: None,
            transform: Vec::new(),
        }
    }

    /// Normalize a company number for this registry
    pub fn normalize(&self, company_id: &str) -> String {
        let mut id: String = company_id.chars().filter(|c| *c != ' ').collect();
        for Transform(key, replacement) in &self.transform {
            match key {
                TransformKey::Position(pos) => {
                    let pos = *pos;
                    if pos > id.len() || !id.is_char_boundary(pos) {
                        continue;
                    }
                    if id.get(pos..pos + replacement.len()) != Some(replacement.as_str()) {
                        id.insert_str(pos, replacement);
                    }
                }
                TransformKey::Text(old) => {
                    if !old.is_empty() {
                        id = id.replace(old.as_str(), replacement);
                    }
                }
            }
        }
        id
    }
}

/// Identifier contributed by another registry
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ExternalId {
    pub property: String,
    pub value: String,
}

impl ExternalId {
    pub fn new(property: &str, value: impl Into<String>) -> Self {
        Self {
            property: property.to_string(),
            value: value.into(),
        }
    }
}

/// Provider of registry descriptors and identifier formatting
pub trait RegistryCatalog: Send + Sync {
    /// All known registries
    fn registries(&self) -> &[Registry];

    /// Canonical identifiers for a company registered under `registry`
    fn company_ids(&self, registry: &Registry, entity_id: &str) -> Vec<ExternalId>;

    /// Registries keyed by registration authority code; later entries win
    fn by_auth_code(&self) -> HashMap<String, Registry> {
        self.registries()
            .iter()
            .map(|r| (r.registration_authority_code.clone(), r.clone()))
            .collect()
    }
}

/// Registry table loaded from a JSON array of [`Registry`] objects
#[derive(Debug, Clone, Default)]
pub struct BusinessRegistries {
    registries: Vec<Registry>,
}

impl BusinessRegistries {
    pub fn new(registries: Vec<Registry>) -> Self {
        Self { registries }
    }

    pub fn load(path: &Path) -> Result<Self, KbError> {
        let content = fs::read_to_string(path).map_err(|source| KbError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let registries: Vec<Registry> =
            serde_json::from_str(&content).map_err(|source| KbError::Json {
                path: path.to_path_buf(),
                line: source.line(),
                source,
            })?;
        tracing::info!(path = %path.display(), registries = registries.len(), "Registry table loaded");
        Ok(Self { registries })
    }
}

impl RegistryCatalog for BusinessRegistries {
    fn registries(&self) -> &[Registry] {
        &self.registries
    }

    fn company_ids(&self, registry: &Registry, entity_id: &str) -> Vec<ExternalId> {
        let company_id = registry.normalize(entity_id);
        let mut ids = Vec::new();

        if let Some(property) = &registry.company_property {
            ids.push(ExternalId::new(property, company_id.clone()));
        }

        if let Some(jurisdiction) = &registry.opencorporates_jurisdiction {
            match registry.opencorporates_prefix.as_deref() {
                None => ids.push(ExternalId::new(
                    OPENCORPORATES_ID,
                    format!("{jurisdiction}/{company_id}"),
                )),
                Some("") => tracing::warn!(
                    code = %registry.registration_authority_code,
                    company_id = %company_id,
                    "Missing OpenCorporates prefix"
                ),
                Some(prefix) => ids.push(ExternalId::new(
                    OPENCORPORATES_ID,
                    format!("{jurisdiction}/{prefix}_{company_id}"),
                )),
            }
        }

        ids
    }
}
