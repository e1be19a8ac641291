//! Address resolution
//!
//! Maps a raw address block onto knowledge-base places. The most specific place found
//! becomes the location: the city when it can be resolved inside the address's region
//! (or country), otherwise the region, otherwise the country. Text that could not be
//! resolved is kept in the street address.
//!
//! Coordinates are attached separately from the record's geocoding extension, see
//! [`coordinate_for`].

use tracing::debug;

use crate::error::AddressError;
use crate::index::ReferenceIndex;
use crate::kb::vocab::LOCATED_IN;
use crate::kb::{AliasLookup, ItemId, KnowledgeBase, PlaceClassifier, closure};
use crate::models::{Address, Coordinate};
use crate::xml::XmlElement;

/// Default cap on items visited by one containment closure
pub const DEFAULT_MAX_CLOSURE_ITEMS: usize = 10_000;

/// Resolves raw address blocks against the knowledge base
pub struct AddressResolver<'a> {
    kb: &'a dyn KnowledgeBase,
    aliases: &'a dyn AliasLookup,
    places: &'a dyn PlaceClassifier,
    index: &'a ReferenceIndex,
    max_closure_items: usize,
}

impl<'a> AddressResolver<'a> {
    pub fn new(
        kb: &'a dyn KnowledgeBase,
        aliases: &'a dyn AliasLookup,
        places: &'a dyn PlaceClassifier,
        index: &'a ReferenceIndex,
    ) -> Self {
        Self {
            kb,
            aliases,
            places,
            index,
            max_closure_items: DEFAULT_MAX_CLOSURE_ITEMS,
        }
    }

    pub fn with_max_closure_items(mut self, max_closure_items: usize) -> Self {
        self.max_closure_items = max_closure_items;
        self
    }

    /// Find a place named `name` that is located in `container`
    ///
    /// Candidates are tried in alias order. The first one classified as a place whose
    /// `located in` closure contains `container` wins.
    pub fn city_in(&self, name: &str, container: &ItemId) -> Option<ItemId> {
        for candidate in self.aliases.lookup(name) {
            let candidate = self.kb.resolve(&candidate);
            if self.places.classify(&candidate).is_none() {
                continue;
            }
            let containment = closure(self.kb, &candidate, LOCATED_IN, self.max_closure_items);
            if containment.contains(container) {
                return Some(candidate);
            }
        }
        None
    }

    /// Resolve one address block (`HeadquartersAddress` or `LegalAddress`)
    ///
    /// Fails only when the country code is missing or unknown.
    pub fn resolve(&self, block: &XmlElement) -> Result<Address, AddressError> {
        let mut parts: Vec<String> = Vec::new();
        if let Some(first) = block.child_text("FirstAddressLine").and_then(trim) {
            parts.push(first);
        }
        for line in block.children_named("AdditionalAddressLine") {
            if let Some(line) = trim(&line.text) {
                if parts.last() != Some(&line) {
                    parts.push(line);
                }
            }
        }

        let city_name = block.child_text("City").and_then(trim);
        let postal_code = block.child_text("PostalCode").and_then(trim);

        let region = block
            .child_text("Region")
            .and_then(|code| self.index.region(code.trim()))
            .cloned();
        let country_code = block
            .child_text("Country")
            .map(str::trim)
            .ok_or(AddressError::MissingCountry)?;
        let mut country = Some(
            self.index
                .country(country_code)
                .cloned()
                .ok_or_else(|| AddressError::UnknownCountry(country_code.to_string()))?,
        );

        let container = region.as_ref().or(country.as_ref());
        let city = match (&city_name, container) {
            (Some(name), Some(container)) => self.city_in(name, container),
            _ => None,
        };

        let location = match city {
            Some(city) => Some(city),
            None => {
                if let Some(name) = &city_name {
                    if parts.last() != Some(name) {
                        parts.push(name.clone());
                    }
                    debug!(city = %name, country = country_code, "City not resolved");
                }
                match region {
                    Some(region) => Some(region),
                    None => country.take(),
                }
            }
        };

        let street = parts.join(", ");
        Ok(Address {
            location,
            street_address: (!street.is_empty()).then_some(street),
            postal_code,
            country,
            coordinate: None,
        })
    }
}

/// Trim a trailing comma and surrounding whitespace; empty text becomes `None`
pub fn trim(text: &str) -> Option<String> {
    let text = text.trim();
    let text = text.strip_suffix(',').unwrap_or(text).trim();
    (!text.is_empty()).then(|| text.to_string())
}

/// Coordinate for an address from the record's geocoding extension
///
/// The first `Geocoding` entry whose `original_address` starts with the address's first
/// line and has a parseable latitude and longitude is used.
pub fn coordinate_for(record: &XmlElement, block: &XmlElement) -> Option<Coordinate> {
    let prefix = block.child_text("FirstAddressLine").and_then(trim)?;
    let extension = record.child("Extension")?;

    for geocode in extension.children_named("Geocoding") {
        let Some(original) = geocode.child_text("original_address") else {
            continue;
        };
        if !original.starts_with(prefix.as_str()) {
            continue;
        }
        let lat = geocode.child_text("lat").and_then(|v| v.trim().parse::<f64>().ok());
        let lng = geocode.child_text("lng").and_then(|v| v.trim().parse::<f64>().ok());
        if let (Some(lat), Some(lng)) = (lat, lng) {
            return Some(Coordinate { lat, lng });
        }
    }
    None
}
