//! Organization record model

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::address::Address;
use super::identifier::Lei;
use crate::kb::ItemId;
use crate::kb::vocab::{ORGANIZATION, OWNED_BY, OWNER_OF, PARENT, SUBSIDIARY};
use crate::registry::ExternalId;

/// Legal name as it appears in the feed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LegalName {
    /// Name without language information
    Plain(String),
    /// Name tagged with an `xml:lang` language code
    Localized { language: String, text: String },
}

impl LegalName {
    pub fn text(&self) -> &str {
        match self {
            LegalName::Plain(text) => text,
            LegalName::Localized { text, .. } => text,
        }
    }

    pub fn language(&self) -> Option<&str> {
        match self {
            LegalName::Plain(_) => None,
            LegalName::Localized { language, .. } => Some(language),
        }
    }
}

/// GLEIF entity category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EntityCategory {
    General,
    Fund,
    Branch,
    SoleProprietor,
    ResidentGovernmentEntity,
    InternationalOrganization,
}

impl EntityCategory {
    /// Parse a feed category code; `None` for codes outside the known set
    pub fn parse(code: &str) -> Option<Self> {
        match code.trim() {
            "GENERAL" => Some(Self::General),
            "FUND" => Some(Self::Fund),
            "BRANCH" => Some(Self::Branch),
            "SOLE_PROPRIETOR" => Some(Self::SoleProprietor),
            "RESIDENT_GOVERNMENT_ENTITY" => Some(Self::ResidentGovernmentEntity),
            "INTERNATIONAL_ORGANIZATION" => Some(Self::InternationalOrganization),
            _ => None,
        }
    }

    /// Feed code for this category
    pub fn as_str(self) -> &'static str {
        match self {
            Self::General => "GENERAL",
            Self::Fund => "FUND",
            Self::Branch => "BRANCH",
            Self::SoleProprietor => "SOLE_PROPRIETOR",
            Self::ResidentGovernmentEntity => "RESIDENT_GOVERNMENT_ENTITY",
            Self::InternationalOrganization => "INTERNATIONAL_ORGANIZATION",
        }
    }
}

/// The single address kept for an organization
///
/// The headquarters address is kept when the feed has one, the legal address otherwise.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "address", rename_all = "camelCase")]
pub enum SiteAddress {
    Headquarters(Address),
    Legal(Address),
}

impl SiteAddress {
    pub fn address(&self) -> &Address {
        match self {
            SiteAddress::Headquarters(address) | SiteAddress::Legal(address) => address,
        }
    }
}

/// Direction of a relationship link as seen from the record holding it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LinkKind {
    Parent,
    Subsidiary,
    OwnerOf,
    OwnedBy,
}

impl LinkKind {
    /// Knowledge-base property for this link
    pub fn property(self) -> &'static str {
        match self {
            LinkKind::Parent => PARENT,
            LinkKind::Subsidiary => SUBSIDIARY,
            LinkKind::OwnerOf => OWNER_OF,
            LinkKind::OwnedBy => OWNED_BY,
        }
    }

    /// The link stored on the other endpoint
    pub fn inverse(self) -> Self {
        match self {
            LinkKind::Parent => LinkKind::Subsidiary,
            LinkKind::Subsidiary => LinkKind::Parent,
            LinkKind::OwnerOf => LinkKind::OwnedBy,
            LinkKind::OwnedBy => LinkKind::OwnerOf,
        }
    }
}

/// Canonical organization record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrganizationRecord {
    /// Stable identifier, `P1278/<LEI>`
    pub id: ItemId,
    pub lei: Lei,
    pub instance_of: ItemId,
    pub name: LegalName,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<EntityCategory>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<SiteAddress>,
    /// Jurisdiction country
    #[serde(skip_serializing_if = "Option::is_none")]
    pub country: Option<ItemId>,
    /// Jurisdiction region, for entities formed under a sub-national jurisdiction
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location_of_creation: Option<ItemId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub legal_form: Option<ItemId>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub external_ids: Vec<ExternalId>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub parents: Vec<ItemId>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub subsidiaries: Vec<ItemId>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub owner_of: Vec<ItemId>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub owned_by: Vec<ItemId>,
}

impl OrganizationRecord {
    /// Create a record with only identifier and name set
    pub fn new(lei: Lei, name: LegalName) -> Self {
        Self {
            id: lei.item_id(),
            lei,
            instance_of: ItemId::from(ORGANIZATION),
            name,
            category: None,
            address: None,
            country: None,
            location_of_creation: None,
            legal_form: None,
            external_ids: Vec::new(),
            parents: Vec::new(),
            subsidiaries: Vec::new(),
            owner_of: Vec::new(),
            owned_by: Vec::new(),
        }
    }

    pub fn headquarters(&self) -> Option<&Address> {
        match &self.address {
            Some(SiteAddress::Headquarters(address)) => Some(address),
            _ => None,
        }
    }

    pub fn legal_address(&self) -> Option<&Address> {
        match &self.address {
            Some(SiteAddress::Legal(address)) => Some(address),
            _ => None,
        }
    }

    /// Links of one kind
    pub fn links(&self, kind: LinkKind) -> &[ItemId] {
        match kind {
            LinkKind::Parent => &self.parents,
            LinkKind::Subsidiary => &self.subsidiaries,
            LinkKind::OwnerOf => &self.owner_of,
            LinkKind::OwnedBy => &self.owned_by,
        }
    }

    /// Append a link
    pub fn add_link(&mut self, kind: LinkKind, target: ItemId) {
        let links = match kind {
            LinkKind::Parent => &mut self.parents,
            LinkKind::Subsidiary => &mut self.subsidiaries,
            LinkKind::OwnerOf => &mut self.owner_of,
            LinkKind::OwnedBy => &mut self.owned_by,
        };
        links.push(target);
    }

    /// Total number of relationship links on this record
    pub fn link_count(&self) -> usize {
        self.parents.len() + self.subsidiaries.len() + self.owner_of.len() + self.owned_by.len()
    }
}

/// Organization records in build order, addressable by stable identifier
#[derive(Debug, Clone, Default)]
pub struct OrganizationSet {
    records: Vec<OrganizationRecord>,
    by_id: HashMap<ItemId, usize>,
}

impl OrganizationSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a record; returns false and keeps the existing record when the identifier is
    /// already present
    pub fn insert(&mut self, record: OrganizationRecord) -> bool {
        if self.by_id.contains_key(&record.id) {
            return false;
        }
        self.by_id.insert(record.id.clone(), self.records.len());
        self.records.push(record);
        true
    }

    pub fn get(&self, id: &ItemId) -> Option<&OrganizationRecord> {
        self.position(id).map(|index| &self.records[index])
    }

    /// Index of a record in build order
    pub fn position(&self, id: &ItemId) -> Option<usize> {
        self.by_id.get(id).copied()
    }

    pub fn contains(&self, id: &ItemId) -> bool {
        self.by_id.contains_key(id)
    }

    /// Add a link to the record at `from` and its inverse to the record at `to`
    ///
    /// Both indices must come from [`OrganizationSet::position`].
    pub fn link(&mut self, from: usize, to: usize, kind: LinkKind) {
        let from_id = self.records[from].id.clone();
        let to_id = self.records[to].id.clone();
        self.records[from].add_link(kind, to_id);
        self.records[to].add_link(kind.inverse(), from_id);
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &OrganizationRecord> {
        self.records.iter()
    }

    pub fn into_records(self) -> Vec<OrganizationRecord> {
        self.records
    }
}
