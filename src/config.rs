//! Pipeline configuration types

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::address::DEFAULT_MAX_CLOSURE_ITEMS;
use crate::error::{PipelineError, PipelineResult};
use crate::extract::RecordTags;
use crate::kb::vocab::{ADMINISTRATIVE_ENTITY, HUMAN_SETTLEMENT, QUARTER};

/// Record blocks decoded per batch by default
pub const DEFAULT_BATCH_SIZE: usize = 10_000;

/// Main pipeline configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct PipelineConfig {
    /// Knowledge-base export, one JSON item per line
    pub kb: Option<PathBuf>,
    /// Business registry table (JSON array)
    pub registries: Option<PathBuf>,
    /// Level 1 entity feed (zip archive or plain XML)
    pub entities: Option<PathBuf>,
    /// Level 2 relationship feed; the relationship pass is skipped when absent
    pub relationships: Option<PathBuf>,
    /// Output record file
    pub output: PathBuf,
    pub entity_tags: RecordTags,
    pub relationship_tags: RecordTags,
    /// Classes an alias candidate must belong to before it is accepted as a city
    pub place_types: Vec<String>,
    /// Cap on items visited by one containment or subclass closure
    pub max_closure_items: usize,
    /// Record blocks decoded per batch
    pub batch_size: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            kb: None,
            registries: None,
            entities: None,
            relationships: None,
            output: PathBuf::from("gleif.jsonl"),
            entity_tags: RecordTags::lei_records(),
            relationship_tags: RecordTags::relationship_records(),
            place_types: default_place_types(),
            max_closure_items: DEFAULT_MAX_CLOSURE_ITEMS,
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }
}

fn default_place_types() -> Vec<String> {
    [HUMAN_SETTLEMENT, ADMINISTRATIVE_ENTITY, QUARTER]
        .iter()
        .map(|t| t.to_string())
        .collect()
}

impl PipelineConfig {
    /// Create a new pipeline config
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a TOML configuration file
    pub fn from_toml_file(path: &Path) -> PipelineResult<Self> {
        if !path.exists() {
            return Err(PipelineError::FileNotFound(path.to_path_buf()));
        }
        let content = fs::read_to_string(path)
            .map_err(|e| PipelineError::io_with_path(path, "reading configuration", e))?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> PipelineResult<Self> {
        toml::from_str(content).map_err(|e| PipelineError::ConfigError(e.to_string()))
    }

    /// Set the knowledge-base path
    pub fn with_kb(mut self, path: impl Into<PathBuf>) -> Self {
        self.kb = Some(path.into());
        self
    }

    /// Set the registry table path
    pub fn with_registries(mut self, path: impl Into<PathBuf>) -> Self {
        self.registries = Some(path.into());
        self
    }

    /// Set the entity feed
    pub fn with_entities(mut self, path: impl Into<PathBuf>) -> Self {
        self.entities = Some(path.into());
        self
    }

    /// Set the relationship feed
    pub fn with_relationships(mut self, path: impl Into<PathBuf>) -> Self {
        self.relationships = Some(path.into());
        self
    }

    /// Set the output file
    pub fn with_output(mut self, path: impl Into<PathBuf>) -> Self {
        self.output = path.into();
        self
    }

    pub fn with_entity_tags(mut self, tags: RecordTags) -> Self {
        self.entity_tags = tags;
        self
    }

    pub fn with_relationship_tags(mut self, tags: RecordTags) -> Self {
        self.relationship_tags = tags;
        self
    }

    pub fn with_place_types(mut self, types: Vec<String>) -> Self {
        self.place_types = types;
        self
    }

    pub fn with_max_closure_items(mut self, max: usize) -> Self {
        self.max_closure_items = max;
        self
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.kb.is_none() {
            return Err("Knowledge base path is required".to_string());
        }
        if self.registries.is_none() {
            return Err("Registry table path is required".to_string());
        }
        if self.entities.is_none() {
            return Err("Entity feed path is required".to_string());
        }
        if self.output.as_os_str().is_empty() {
            return Err("Output path is required".to_string());
        }

        for (label, tags) in [
            ("entity", &self.entity_tags),
            ("relationship", &self.relationship_tags),
        ] {
            if tags.start.is_empty() || tags.end.is_empty() {
                return Err(format!("The {label} start and end tags must not be empty"));
            }
        }

        if self.place_types.is_empty() {
            return Err("At least one place type is required".to_string());
        }
        if self.max_closure_items == 0 {
            return Err("max-closure-items must be greater than zero".to_string());
        }
        if self.batch_size == 0 {
            return Err("batch-size must be greater than zero".to_string());
        }
        Ok(())
    }
}
