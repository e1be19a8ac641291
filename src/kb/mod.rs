//! Knowledge-base seams
//!
//! The pipeline consumes the knowledge base through three traits:
//! - [`KnowledgeBase`]: point lookup, iteration and reference resolution
//! - [`AliasLookup`]: free-text name to candidate items
//! - [`PlaceClassifier`]: classification against a fixed set of place types
//!
//! In-memory implementations are provided for each of them.

pub mod alias;
#[cfg(test)]
pub(crate) mod fixtures;
pub mod memory;
pub mod taxonomy;
pub mod vocab;

use std::collections::{BTreeMap, HashSet, VecDeque};
use std::fmt;

use serde::{Deserialize, Serialize};

pub use alias::AliasIndex;
pub use memory::MemoryKnowledgeBase;
pub use taxonomy::TypeTaxonomy;

/// Identifier of a knowledge-base item (e.g. `Q145`, `P1278/<LEI>`)
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemId(String);

impl ItemId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ItemId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// A knowledge-base item
///
/// `links` holds item-valued properties, `values` holds text-valued properties.
/// An item with `redirect` set is a placeholder for another item.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Item {
    pub id: ItemId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub aliases: Vec<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub links: BTreeMap<String, Vec<ItemId>>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub values: BTreeMap<String, Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub redirect: Option<ItemId>,
}

impl Item {
    /// Create an empty item
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: ItemId::new(id),
            ..Default::default()
        }
    }

    /// Set the display name
    pub fn with_name(mut self, name: &str) -> Self {
        self.name = Some(name.to_string());
        self
    }

    /// Add an alias
    pub fn with_alias(mut self, alias: &str) -> Self {
        self.aliases.push(alias.to_string());
        self
    }

    /// Add an item-valued property
    pub fn with_link(mut self, property: &str, target: &str) -> Self {
        self.links
            .entry(property.to_string())
            .or_default()
            .push(ItemId::new(target));
        self
    }

    /// Add a text-valued property
    pub fn with_value(mut self, property: &str, value: &str) -> Self {
        self.values
            .entry(property.to_string())
            .or_default()
            .push(value.to_string());
        self
    }

    /// All targets of an item-valued property
    pub fn links(&self, property: &str) -> &[ItemId] {
        self.links.get(property).map(Vec::as_slice).unwrap_or(&[])
    }

    /// First target of an item-valued property
    pub fn link(&self, property: &str) -> Option<&ItemId> {
        self.links(property).first()
    }

    /// First value of a text-valued property
    pub fn value(&self, property: &str) -> Option<&str> {
        self.values
            .get(property)
            .and_then(|v| v.first())
            .map(String::as_str)
    }
}

/// Read-only graph of items
pub trait KnowledgeBase: Send + Sync {
    /// Point lookup by identifier, without following redirects
    fn get(&self, id: &ItemId) -> Option<&Item>;

    /// Iterate over all items
    fn items(&self) -> Box<dyn Iterator<Item = &Item> + '_>;

    /// Resolve a possibly-indirect reference to its canonical item id
    fn resolve(&self, id: &ItemId) -> ItemId;

    /// Look up the canonical item behind a reference
    fn lookup(&self, id: &ItemId) -> Option<&Item> {
        self.get(&self.resolve(id))
    }
}

/// Name/alias lookup
pub trait AliasLookup: Send + Sync {
    /// Candidate items whose names or aliases match `name`, best match first
    fn lookup(&self, name: &str) -> Vec<ItemId>;
}

/// Classifier against a fixed set of types
pub trait PlaceClassifier: Send + Sync {
    /// The matching type, or `None` when the item is none of the configured types
    fn classify(&self, item: &ItemId) -> Option<ItemId>;
}

/// Transitive closure of `property` starting at `start`
///
/// Breadth-first; the start item comes first. Every reference is resolved before it is
/// visited, and each item is visited once, so cyclic graphs terminate. At most
/// `max_items` items are collected.
pub fn closure(
    kb: &dyn KnowledgeBase,
    start: &ItemId,
    property: &str,
    max_items: usize,
) -> Vec<ItemId> {
    let start = kb.resolve(start);
    let mut visited = HashSet::new();
    let mut order = Vec::new();
    let mut queue = VecDeque::new();

    visited.insert(start.clone());
    queue.push_back(start.clone());

    while let Some(current) = queue.pop_front() {
        if order.len() >= max_items {
            tracing::debug!(start = %start, max_items, "Closure truncated");
            break;
        }
        if let Some(item) = kb.get(&current) {
            for next in item.links(property) {
                let next = kb.resolve(next);
                if visited.insert(next.clone()) {
                    queue.push_back(next);
                }
            }
        }
        order.push(current);
    }

    order
}

#[cfg(test)]
mod tests {
    use super::vocab::LOCATED_IN;
    use super::*;

    fn chain_kb() -> MemoryKnowledgeBase {
        MemoryKnowledgeBase::from_items(vec![
            Item::new("Q84").with_link(LOCATED_IN, "Q23306"),
            Item::new("Q23306").with_link(LOCATED_IN, "Q21"),
            Item::new("Q21").with_link(LOCATED_IN, "Q145"),
            Item::new("Q145"),
        ])
        .unwrap()
    }

    #[test]
    fn test_closure_follows_chain() {
        let kb = chain_kb();
        let items = closure(&kb, &ItemId::from("Q84"), LOCATED_IN, 100);
        let ids: Vec<&str> = items.iter().map(ItemId::as_str).collect();
        assert_eq!(ids, vec!["Q84", "Q23306", "Q21", "Q145"]);
    }

    #[test]
    fn test_closure_terminates_on_cycle() {
        let kb = MemoryKnowledgeBase::from_items(vec![
            Item::new("Q1").with_link(LOCATED_IN, "Q2"),
            Item::new("Q2").with_link(LOCATED_IN, "Q1"),
        ])
        .unwrap();

        let items = closure(&kb, &ItemId::from("Q1"), LOCATED_IN, 100);
        assert_eq!(items.len(), 2);
    }

    #[test]
    fn test_closure_respects_cap() {
        let kb = chain_kb();
        let items = closure(&kb, &ItemId::from("Q84"), LOCATED_IN, 2);
        assert_eq!(items.len(), 2);
    }

    #[test]
    fn test_closure_resolves_redirects() {
        let mut old = Item::new("Q999");
        old.redirect = Some(ItemId::from("Q145"));
        let kb = MemoryKnowledgeBase::from_items(vec![
            Item::new("Q84").with_link(LOCATED_IN, "Q999"),
            old,
            Item::new("Q145"),
        ])
        .unwrap();

        let items = closure(&kb, &ItemId::from("Q84"), LOCATED_IN, 100);
        assert!(items.contains(&ItemId::from("Q145")));
        assert!(!items.contains(&ItemId::from("Q999")));
    }

    #[test]
    fn test_item_accessors() {
        let item = Item::new("Q145")
            .with_value(vocab::COUNTRY_CODE, "GB")
            .with_link(vocab::INSTANCE_OF, "Q6256");
        assert_eq!(item.value(vocab::COUNTRY_CODE), Some("GB"));
        assert_eq!(item.link(vocab::INSTANCE_OF), Some(&ItemId::from("Q6256")));
        assert!(item.links(LOCATED_IN).is_empty());
    }
}
