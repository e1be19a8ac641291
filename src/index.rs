//! Reference index
//!
//! Country and region codes mapped to knowledge-base items, plus registration-authority
//! codes mapped to registry descriptors. Built once per run and read-only afterwards.
//! An absent code means "unknown" and is never an error.

use std::collections::HashMap;

use tracing::info;

use crate::kb::vocab::{COUNTRY_CODE, REGION_CODE};
use crate::kb::{ItemId, KnowledgeBase};
use crate::registry::{Registry, RegistryCatalog};

#[derive(Debug, Clone, Default)]
pub struct ReferenceIndex {
    countries: HashMap<String, ItemId>,
    regions: HashMap<String, ItemId>,
    registries: HashMap<String, Registry>,
}

impl ReferenceIndex {
    /// Scan every knowledge-base item once and index the registry catalog
    ///
    /// When two items share a code the one visited last wins.
    pub fn build(kb: &dyn KnowledgeBase, catalog: &dyn RegistryCatalog) -> Self {
        let mut index = Self::default();

        for item in kb.items() {
            if let Some(code) = item.value(COUNTRY_CODE) {
                index.countries.insert(code.to_string(), item.id.clone());
            }
            if let Some(code) = item.value(REGION_CODE) {
                index.regions.insert(code.to_string(), item.id.clone());
            }
        }
        index.registries = catalog.by_auth_code();

        info!(
            countries = index.country_count(),
            regions = index.region_count(),
            registries = index.registry_count(),
            "Built reference index"
        );
        index
    }

    pub fn country(&self, code: &str) -> Option<&ItemId> {
        self.countries.get(code)
    }

    pub fn region(&self, code: &str) -> Option<&ItemId> {
        self.regions.get(code)
    }

    /// Registry descriptor for a registration-authority code
    pub fn registry(&self, auth_code: &str) -> Option<&Registry> {
        self.registries.get(auth_code)
    }

    pub fn country_count(&self) -> usize {
        self.countries.len()
    }

    pub fn region_count(&self) -> usize {
        self.regions.len()
    }

    pub fn registry_count(&self) -> usize {
        self.registries.len()
    }
}
