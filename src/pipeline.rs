//! Full pipeline run
//!
//! Loads the knowledge base and registry table, builds organizations from the entity
//! feed, applies the relationship feed, and publishes the output file. Every input is
//! checked before any work starts; a failure at any point leaves no output behind.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::time::Instant;

use serde::Serialize;
use tracing::{debug, info, info_span, warn};
use zip::ZipArchive;

use crate::address::AddressResolver;
use crate::config::PipelineConfig;
use crate::entity::{BuildStats, EntityBuilder};
use crate::error::{PipelineError, PipelineResult};
use crate::extract::{RawRecordBlock, RecordTags, extract};
use crate::index::ReferenceIndex;
use crate::kb::{AliasIndex, MemoryKnowledgeBase, TypeTaxonomy};
use crate::models::{OrganizationRecord, OrganizationSet};
use crate::output::{JsonlRecordWriter, RecordWriter};
use crate::registry::BusinessRegistries;
use crate::relationship::{GraphStats, RelationshipGraphBuilder};

/// Open a feed and hand a buffered reader to `f`
///
/// A `.zip` path is read from its first entry, any other path as plain text.
pub fn with_input<T>(
    path: &Path,
    f: impl FnOnce(&mut dyn BufRead) -> PipelineResult<T>,
) -> PipelineResult<T> {
    if !path.exists() {
        return Err(PipelineError::FileNotFound(path.to_path_buf()));
    }
    let file =
        File::open(path).map_err(|e| PipelineError::io_with_path(path, "opening input", e))?;

    if !is_zip(path) {
        return f(&mut BufReader::new(file));
    }

    let archive_error = |message: String| PipelineError::Archive {
        path: path.to_path_buf(),
        message,
    };
    let mut archive =
        ZipArchive::new(BufReader::new(file)).map_err(|e| archive_error(e.to_string()))?;
    if archive.is_empty() {
        return Err(archive_error("archive has no entries".to_string()));
    }
    let entry = archive.by_index(0).map_err(|e| archive_error(e.to_string()))?;
    debug!(path = %path.display(), entry = entry.name(), "Reading archive entry");
    f(&mut BufReader::new(entry))
}

fn is_zip(path: &Path) -> bool {
    path.extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("zip"))
}

/// Outcome of a successful run
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunReport {
    pub output: PathBuf,
    /// Organizations built and written
    pub companies: usize,
    /// Records dropped because their LEI was already built
    pub duplicate_records: usize,
    pub entities: BuildStats,
    /// Absent when no relationship feed was configured
    #[serde(skip_serializing_if = "Option::is_none")]
    pub relationships: Option<GraphStats>,
    pub duration_ms: u64,
}

impl RunReport {
    /// Relationships attached to both endpoints
    pub fn relationships_applied(&self) -> usize {
        self.relationships.as_ref().map_or(0, |stats| stats.applied)
    }
}

/// Pipeline configured for one run
pub struct Pipeline {
    config: PipelineConfig,
}

impl Pipeline {
    pub fn new(config: PipelineConfig) -> PipelineResult<Self> {
        config.validate().map_err(PipelineError::ConfigError)?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Run all stages and publish the output
    pub fn run(&self) -> PipelineResult<RunReport> {
        let _span = info_span!("pipeline_run", output = %self.config.output.display()).entered();
        let start = Instant::now();

        let kb_path = required(&self.config.kb, "kb")?;
        let registries_path = required(&self.config.registries, "registries")?;
        let entities_path = required(&self.config.entities, "entities")?;
        for path in [kb_path, registries_path, entities_path]
            .into_iter()
            .chain(self.config.relationships.as_deref())
        {
            if !path.exists() {
                return Err(PipelineError::FileNotFound(path.to_path_buf()));
            }
        }

        let kb = MemoryKnowledgeBase::load(kb_path)?;
        let registries = BusinessRegistries::load(registries_path)?;
        let aliases = AliasIndex::from_kb(&kb);
        let place_types: Vec<&str> = self.config.place_types.iter().map(String::as_str).collect();
        let taxonomy = TypeTaxonomy::new(&kb, &place_types, self.config.max_closure_items);
        let index = ReferenceIndex::build(&kb, &registries);

        let addresses = AddressResolver::new(&kb, &aliases, &taxonomy, &index)
            .with_max_closure_items(self.config.max_closure_items);
        let builder = EntityBuilder::new(&kb, &index, &registries, addresses);

        let (mut organizations, entities, duplicate_records) = {
            let _stage = info_span!("pipeline_stage", stage = "entities").entered();
            with_input(entities_path, |reader| {
                build_organizations(
                    reader,
                    entities_path,
                    &builder,
                    &self.config.entity_tags,
                    self.config.batch_size,
                )
            })?
        };
        info!(
            companies = organizations.len(),
            rejected = entities.rejected,
            duplicates = duplicate_records,
            "Entities built"
        );

        let relationships = match &self.config.relationships {
            Some(path) => {
                let _stage = info_span!("pipeline_stage", stage = "relationships").entered();
                Some(with_input(path, |reader| {
                    apply_relationships(reader, path, &self.config.relationship_tags, &mut organizations)
                })?)
            }
            None => {
                debug!("No relationship feed configured");
                None
            }
        };

        let companies = organizations.len();
        {
            let _stage = info_span!("pipeline_stage", stage = "output").entered();
            write_records(&self.config.output, organizations.iter())?;
        }

        let duration_ms = start.elapsed().as_millis() as u64;
        info!(companies, duration_ms, "Pipeline completed");

        Ok(RunReport {
            output: self.config.output.clone(),
            companies,
            duplicate_records,
            entities,
            relationships,
            duration_ms,
        })
    }
}

fn required<'a>(path: &'a Option<PathBuf>, key: &str) -> PipelineResult<&'a Path> {
    path.as_deref()
        .ok_or_else(|| PipelineError::ConfigError(format!("{key} path is required")))
}

/// Decode entity blocks batch by batch, keeping the first record for each LEI
fn build_organizations(
    reader: &mut dyn BufRead,
    path: &Path,
    builder: &EntityBuilder<'_>,
    tags: &RecordTags,
    batch_size: usize,
) -> PipelineResult<(OrganizationSet, BuildStats, usize)> {
    let mut organizations = OrganizationSet::new();
    let mut stats = BuildStats::new();
    let mut duplicates = 0;
    let mut batch = Vec::with_capacity(batch_size);
    let mut blocks = extract(reader, tags.clone());

    loop {
        batch.clear();
        for block in blocks.by_ref().take(batch_size) {
            batch.push(block.map_err(|e| PipelineError::io_with_path(path, "reading records", e))?);
        }
        if batch.is_empty() {
            break;
        }

        let (records, batch_stats) = decode_batch(builder, &batch);
        stats.merge(batch_stats);
        for record in records {
            let lei = record.lei.clone();
            if !organizations.insert(record) {
                warn!(lei = %lei, "Duplicate LEI record dropped");
                duplicates += 1;
            }
        }
        debug!(
            lines = blocks.lines_read(),
            companies = organizations.len(),
            "Entity batch decoded"
        );
    }

    Ok((organizations, stats, duplicates))
}

#[cfg(not(feature = "parallel"))]
fn decode_batch(
    builder: &EntityBuilder<'_>,
    batch: &[RawRecordBlock],
) -> (Vec<OrganizationRecord>, BuildStats) {
    let mut stats = BuildStats::new();
    let records = batch
        .iter()
        .filter_map(|block| builder.decode(block, &mut stats))
        .collect();
    (records, stats)
}

#[cfg(feature = "parallel")]
fn decode_batch(
    builder: &EntityBuilder<'_>,
    batch: &[RawRecordBlock],
) -> (Vec<OrganizationRecord>, BuildStats) {
    use rayon::prelude::*;

    let decoded: Vec<(Option<OrganizationRecord>, BuildStats)> = batch
        .par_iter()
        .map(|block| {
            let mut stats = BuildStats::new();
            let record = builder.decode(block, &mut stats);
            (record, stats)
        })
        .collect();

    let mut stats = BuildStats::new();
    let mut records = Vec::with_capacity(decoded.len());
    for (record, block_stats) in decoded {
        stats.merge(block_stats);
        records.extend(record);
    }
    (records, stats)
}

fn apply_relationships(
    reader: &mut dyn BufRead,
    path: &Path,
    tags: &RecordTags,
    organizations: &mut OrganizationSet,
) -> PipelineResult<GraphStats> {
    let mut graph = RelationshipGraphBuilder::new();
    for block in extract(reader, tags.clone()) {
        let block = block.map_err(|e| PipelineError::io_with_path(path, "reading relationships", e))?;
        graph.add_block(&block);
    }
    info!(edges = graph.len(), "Relationship edges read");
    Ok(graph.apply(organizations))
}

/// Write all records and publish the file; nothing is published on error
pub fn write_records<'a>(
    path: &Path,
    records: impl Iterator<Item = &'a OrganizationRecord>,
) -> PipelineResult<usize> {
    let mut writer = JsonlRecordWriter::create(path)?;
    for record in records {
        writer.write(&record.id, record)?;
    }
    writer.commit()
}
