//! Relationship graph builder
//!
//! Collects ownership edges from the relationship feed and attaches them to already
//! built organizations. Edges are sorted by (parent, child, indirect) and consecutive
//! edges for the same (parent, child) pair are collapsed, so the first in sort order
//! wins. Since `false < true`, a direct edge wins over an indirect edge for the same pair.
//!
//! An edge is attached to both endpoints or to neither.

use std::collections::BTreeMap;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::error::BuildError;
use crate::extract::RawRecordBlock;
use crate::models::{Lei, LinkKind, OrganizationSet};
use crate::xml::XmlElement;

/// Relationship types carried over from the feed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RelationshipType {
    DirectlyConsolidatedBy,
    UltimatelyConsolidatedBy,
    InternationalBranchOf,
}

impl RelationshipType {
    pub fn parse(label: &str) -> Option<Self> {
        match label.trim() {
            "IS_DIRECTLY_CONSOLIDATED_BY" => Some(Self::DirectlyConsolidatedBy),
            "IS_ULTIMATELY_CONSOLIDATED_BY" => Some(Self::UltimatelyConsolidatedBy),
            "IS_INTERNATIONAL_BRANCH_OF" => Some(Self::InternationalBranchOf),
            _ => None,
        }
    }

    /// Ultimate control is indirect, everything else is direct
    pub fn is_indirect(self) -> bool {
        matches!(self, Self::UltimatelyConsolidatedBy)
    }
}

/// Ownership edge, ordered by parent, then child, then indirect flag
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct OwnershipEdge {
    pub parent: Lei,
    pub child: Lei,
    pub indirect: bool,
}

impl OwnershipEdge {
    pub fn new(parent: Lei, child: Lei, indirect: bool) -> Self {
        Self {
            parent,
            child,
            indirect,
        }
    }

    /// Link stored on the parent; the child gets the inverse
    pub fn parent_link(&self) -> LinkKind {
        if self.indirect {
            LinkKind::OwnerOf
        } else {
            LinkKind::Subsidiary
        }
    }
}

/// A parsed relationship record
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RelationshipRecord {
    Edge(OwnershipEdge),
    /// Relationship type outside the recognized set
    Unrecognized(String),
}

impl RelationshipRecord {
    /// Parse a `RelationshipRecord` element
    ///
    /// The start node is the child and the end node the parent.
    pub fn from_element(record: &XmlElement) -> Result<Self, BuildError> {
        let relationship = record
            .child("Relationship")
            .ok_or(BuildError::MissingElement("Relationship"))?;
        let label = relationship
            .child_text("RelationshipType")
            .ok_or(BuildError::MissingElement("RelationshipType"))?;
        let Some(kind) = RelationshipType::parse(label) else {
            return Ok(Self::Unrecognized(label.trim().to_string()));
        };

        let child = relationship
            .find(&["StartNode", "NodeID"])
            .ok_or(BuildError::MissingElement("StartNode"))?;
        let parent = relationship
            .find(&["EndNode", "NodeID"])
            .ok_or(BuildError::MissingElement("EndNode"))?;

        Ok(Self::Edge(OwnershipEdge::new(
            Lei::parse(&parent.text)?,
            Lei::parse(&child.text)?,
            kind.is_indirect(),
        )))
    }

    pub fn from_block(block: &RawRecordBlock) -> Result<Self, BuildError> {
        let root = XmlElement::parse(block.as_bytes())?;
        Self::from_element(&root)
    }
}

/// Per-run tallies from the relationship pass
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphStats {
    /// Edges accepted from the feed
    pub edges: usize,
    /// Edges attached to both endpoints
    pub applied: usize,
    pub direct: usize,
    pub indirect: usize,
    /// Edges collapsed into an earlier edge for the same pair
    pub duplicates: usize,
    /// Edges skipped because an endpoint was not built
    pub missing_endpoints: usize,
    /// Records that could not be parsed
    pub invalid: usize,
    pub unknown_types: BTreeMap<String, usize>,
}

impl GraphStats {
    /// Edges that were read but not applied
    pub fn skipped(&self) -> usize {
        self.duplicates + self.missing_endpoints
    }
}

/// Accumulates edges, then applies them to an [`OrganizationSet`]
#[derive(Debug, Default)]
pub struct RelationshipGraphBuilder {
    edges: Vec<OwnershipEdge>,
    stats: GraphStats,
}

impl RelationshipGraphBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse one relationship block, counting unusable records
    pub fn add_block(&mut self, block: &RawRecordBlock) {
        match RelationshipRecord::from_block(block) {
            Ok(RelationshipRecord::Edge(edge)) => self.add_edge(edge),
            Ok(RelationshipRecord::Unrecognized(label)) => {
                warn!(line = block.line, relationship_type = %label, "Unknown relationship type");
                *self.stats.unknown_types.entry(label).or_default() += 1;
            }
            Err(e) => {
                warn!(line = block.line, error = %e, "Invalid relationship record");
                self.stats.invalid += 1;
            }
        }
    }

    pub fn add_edge(&mut self, edge: OwnershipEdge) {
        self.stats.edges += 1;
        self.edges.push(edge);
    }

    pub fn len(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }

    /// Sort, collapse and attach all edges
    pub fn apply(mut self, organizations: &mut OrganizationSet) -> GraphStats {
        self.edges.sort();
        let before = self.edges.len();
        self.edges
            .dedup_by(|later, earlier| later.parent == earlier.parent && later.child == earlier.child);
        self.stats.duplicates = before - self.edges.len();

        for edge in &self.edges {
            let parent_id = edge.parent.item_id();
            let child_id = edge.child.item_id();
            let Some(parent) = organizations.position(&parent_id) else {
                warn!(lei = %edge.parent, "Missing parent");
                self.stats.missing_endpoints += 1;
                continue;
            };
            let Some(child) = organizations.position(&child_id) else {
                warn!(lei = %edge.child, "Missing subsidiary");
                self.stats.missing_endpoints += 1;
                continue;
            };

            organizations.link(parent, child, edge.parent_link());
            if edge.indirect {
                self.stats.indirect += 1;
            } else {
                self.stats.direct += 1;
            }
            self.stats.applied += 1;
            debug!(parent = %edge.parent, child = %edge.child, indirect = edge.indirect, "Linked");
        }

        info!(
            applied = self.stats.applied,
            duplicates = self.stats.duplicates,
            missing_endpoints = self.stats.missing_endpoints,
            "Relationships applied"
        );
        self.stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{LegalName, OrganizationRecord};

    const LEI1: &str = "213800D1EI4B9WTWWD28";
    const LEI2: &str = "5493001KJTIIGC8Y1R12";
    const LEI3: &str = "549300GKFG0RYRRQ1414";

    fn lei(value: &str) -> Lei {
        Lei::parse(value).unwrap()
    }

    fn organizations(leis: &[&str]) -> OrganizationSet {
        let mut set = OrganizationSet::new();
        for value in leis {
            set.insert(OrganizationRecord::new(lei(value), LegalName::Plain(value.to_string())));
        }
        set
    }

    fn relationship_block(start: &str, end: &str, kind: &str) -> RawRecordBlock {
        let xml = format!(
            "<rr:RelationshipRecord>\n<rr:Relationship>\n\
             <rr:StartNode><rr:NodeID>{start}</rr:NodeID><rr:NodeIDType>LEI</rr:NodeIDType></rr:StartNode>\n\
             <rr:EndNode><rr:NodeID>{end}</rr:NodeID><rr:NodeIDType>LEI</rr:NodeIDType></rr:EndNode>\n\
             <rr:RelationshipType>{kind}</rr:RelationshipType>\n\
             </rr:Relationship>\n</rr:RelationshipRecord>\n"
        );
        RawRecordBlock {
            line: 1,
            data: xml.into_bytes(),
        }
    }

    #[test]
    fn test_relationship_type_classification() {
        assert!(!RelationshipType::parse("IS_DIRECTLY_CONSOLIDATED_BY").unwrap().is_indirect());
        assert!(!RelationshipType::parse("IS_INTERNATIONAL_BRANCH_OF").unwrap().is_indirect());
        assert!(RelationshipType::parse("IS_ULTIMATELY_CONSOLIDATED_BY").unwrap().is_indirect());
        assert_eq!(RelationshipType::parse("IS_FUND-MANAGED_BY"), None);
    }

    #[test]
    fn test_parse_orients_edge() {
        let block = relationship_block(LEI1, LEI2, "IS_DIRECTLY_CONSOLIDATED_BY");
        let parsed = RelationshipRecord::from_block(&block).unwrap();
        assert_eq!(parsed, RelationshipRecord::Edge(OwnershipEdge::new(lei(LEI2), lei(LEI1), false)));
    }

    #[test]
    fn test_direct_edge_wins_over_indirect() {
        let mut organizations = organizations(&[LEI1, LEI2]);
        let mut builder = RelationshipGraphBuilder::new();
        builder.add_block(&relationship_block(LEI1, LEI2, "IS_DIRECTLY_CONSOLIDATED_BY"));
        builder.add_block(&relationship_block(LEI1, LEI2, "IS_ULTIMATELY_CONSOLIDATED_BY"));

        let stats = builder.apply(&mut organizations);
        assert_eq!(stats.applied, 1);
        assert_eq!(stats.direct, 1);
        assert_eq!(stats.duplicates, 1);

        let parent = organizations.get(&lei(LEI2).item_id()).unwrap();
        let child = organizations.get(&lei(LEI1).item_id()).unwrap();
        assert_eq!(parent.subsidiaries, vec![child.id.clone()]);
        assert_eq!(child.parents, vec![parent.id.clone()]);
        assert!(parent.owner_of.is_empty());
        assert!(child.owned_by.is_empty());
    }

    #[test]
    fn test_direct_wins_regardless_of_feed_order() {
        let mut organizations = organizations(&[LEI1, LEI2]);
        let mut builder = RelationshipGraphBuilder::new();
        builder.add_edge(OwnershipEdge::new(lei(LEI2), lei(LEI1), true));
        builder.add_edge(OwnershipEdge::new(lei(LEI2), lei(LEI1), false));
        builder.apply(&mut organizations);

        let parent = organizations.get(&lei(LEI2).item_id()).unwrap();
        assert_eq!(parent.subsidiaries.len(), 1);
        assert!(parent.owner_of.is_empty());
    }

    #[test]
    fn test_indirect_edge_links() {
        let mut organizations = organizations(&[LEI1, LEI3]);
        let mut builder = RelationshipGraphBuilder::new();
        builder.add_block(&relationship_block(LEI1, LEI3, "IS_ULTIMATELY_CONSOLIDATED_BY"));
        let stats = builder.apply(&mut organizations);
        assert_eq!(stats.indirect, 1);

        let owner = organizations.get(&lei(LEI3).item_id()).unwrap();
        let owned = organizations.get(&lei(LEI1).item_id()).unwrap();
        assert_eq!(owner.owner_of, vec![owned.id.clone()]);
        assert_eq!(owned.owned_by, vec![owner.id.clone()]);
        assert!(owner.subsidiaries.is_empty());
    }

    #[test]
    fn test_missing_endpoint_leaves_records_unchanged() {
        let mut organizations = organizations(&[LEI1, LEI2]);
        let before: Vec<OrganizationRecord> = organizations.iter().cloned().collect();

        let mut builder = RelationshipGraphBuilder::new();
        builder.add_edge(OwnershipEdge::new(lei(LEI3), lei(LEI1), false));
        builder.add_edge(OwnershipEdge::new(lei(LEI2), lei(LEI3), true));
        let stats = builder.apply(&mut organizations);

        assert_eq!(stats.applied, 0);
        assert_eq!(stats.missing_endpoints, 2);
        let after: Vec<OrganizationRecord> = organizations.iter().cloned().collect();
        assert_eq!(before, after);
    }

    #[test]
    fn test_unusable_records_counted() {
        let mut builder = RelationshipGraphBuilder::new();
        builder.add_block(&relationship_block(LEI1, LEI2, "IS_FUND-MANAGED_BY"));
        builder.add_block(&relationship_block(LEI1, LEI2, "IS_FUND-MANAGED_BY"));
        builder.add_block(&relationship_block("LEI1", LEI2, "IS_DIRECTLY_CONSOLIDATED_BY"));
        assert!(builder.is_empty());

        let stats = builder.apply(&mut OrganizationSet::new());
        assert_eq!(stats.unknown_types.get("IS_FUND-MANAGED_BY"), Some(&2));
        assert_eq!(stats.invalid, 1);
        assert_eq!(stats.edges, 0);
    }

    #[test]
    fn test_distinct_pairs_all_applied() {
        let mut organizations = organizations(&[LEI1, LEI2, LEI3]);
        let mut builder = RelationshipGraphBuilder::new();
        builder.add_edge(OwnershipEdge::new(lei(LEI2), lei(LEI1), false));
        builder.add_edge(OwnershipEdge::new(lei(LEI3), lei(LEI1), true));
        builder.add_edge(OwnershipEdge::new(lei(LEI3), lei(LEI2), false));
        let stats = builder.apply(&mut organizations);

        assert_eq!(stats.applied, 3);
        assert_eq!(stats.skipped(), 0);
        let child = organizations.get(&lei(LEI1).item_id()).unwrap();
        assert_eq!(child.parents.len(), 1);
        assert_eq!(child.owned_by.len(), 1);
    }
}
