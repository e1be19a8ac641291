//! corpgraph - LEI entity resolution and ownership graph construction
//!
//! Provides:
//! - Streaming extraction of records from bulk GLEIF XML feeds
//! - Resolution of free-text addresses onto knowledge-base places
//! - Organization records with jurisdiction, legal form and registry identifiers
//! - Deduplicated parent/subsidiary and ownership links between organizations
//! - JSON-lines output published atomically

pub mod address;
pub mod config;
pub mod entity;
pub mod error;
pub mod extract;
pub mod frame;
pub mod index;
pub mod kb;
pub mod models;
pub mod output;
pub mod pipeline;
pub mod registry;
pub mod relationship;
pub mod xml;

// Re-export commonly used types
pub use address::AddressResolver;
pub use config::PipelineConfig;
pub use entity::{BuildStats, EntityBuilder};
pub use error::{AddressError, BuildError, IdentifierError, KbError, PipelineError, PipelineResult};
pub use extract::{RawRecordBlock, RecordExtractor, RecordTags, extract};
pub use frame::{Frame, organization_frame};
pub use index::ReferenceIndex;
pub use kb::{AliasIndex, AliasLookup, Item, ItemId, KnowledgeBase, MemoryKnowledgeBase, PlaceClassifier, TypeTaxonomy};
pub use models::{Address, Coordinate, EntityCategory, LegalName, Lei, LinkKind, OrganizationRecord, OrganizationSet, SiteAddress};
pub use output::{JsonlRecordWriter, RecordWriter};
pub use pipeline::{Pipeline, RunReport, with_input};
pub use registry::{BusinessRegistries, ExternalId, Registry, RegistryCatalog};
pub use relationship::{GraphStats, OwnershipEdge, RelationshipGraphBuilder, RelationshipRecord, RelationshipType};
pub use xml::XmlElement;
