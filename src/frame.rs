//! Knowledge-base frames for output records
//!
//! A frame is a JSON object keyed by knowledge-base property ids (`P159`, `P355`, ...).
//! A property added more than once holds an array of its values in the order added.

use serde_json::{Map, Value, json};

use crate::kb::vocab::{
    CATEGORY, COORDINATE_LOCATION, COUNTRY, GEO, HEADQUARTERS, ID, INSTANCE_OF, IS, ISA, LAT,
    LEGAL_FORM, LEI, LNG, LOCATION, LOCATION_OF_CREATION, NAME, POSTAL_CODE, STREET_ADDRESS,
};
use crate::models::{Address, Coordinate, LegalName, LinkKind, OrganizationRecord, SiteAddress};

const LINK_KINDS: [LinkKind; 4] = [
    LinkKind::Parent,
    LinkKind::Subsidiary,
    LinkKind::OwnerOf,
    LinkKind::OwnedBy,
];

/// Slots of one frame
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Frame {
    slots: Map<String, Value>,
}

impl Frame {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a slot; a repeated property collects its values into an array
    pub fn add(&mut self, property: &str, value: impl Into<Value>) {
        let value = value.into();
        match self.slots.get_mut(property) {
            None => {
                self.slots.insert(property.to_string(), value);
            }
            Some(Value::Array(values)) => values.push(value),
            Some(existing) => {
                let first = existing.take();
                *existing = Value::Array(vec![first, value]);
            }
        }
    }

    pub fn get(&self, property: &str) -> Option<&Value> {
        self.slots.get(property)
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn into_value(self) -> Value {
        Value::Object(self.slots)
    }
}

/// Frame for one organization
pub fn organization_frame(record: &OrganizationRecord) -> Frame {
    let mut frame = Frame::new();
    frame.add(ID, record.id.as_str());
    frame.add(LEI, record.lei.as_str());
    frame.add(INSTANCE_OF, record.instance_of.as_str());
    frame.add(NAME, name_value(&record.name));
    if let Some(category) = record.category {
        frame.add(CATEGORY, category.as_str());
    }

    match &record.address {
        Some(SiteAddress::Headquarters(address)) => {
            frame.add(HEADQUARTERS, address_frame(address).into_value());
        }
        Some(SiteAddress::Legal(address)) => {
            frame.add(LOCATION, address_frame(address).into_value());
        }
        None => {}
    }

    if let Some(region) = &record.location_of_creation {
        frame.add(LOCATION_OF_CREATION, region.as_str());
    }
    if let Some(country) = &record.country {
        frame.add(COUNTRY, country.as_str());
    }
    if let Some(form) = &record.legal_form {
        frame.add(LEGAL_FORM, form.as_str());
    }
    for id in &record.external_ids {
        frame.add(&id.property, id.value.as_str());
    }

    for kind in LINK_KINDS {
        for target in record.links(kind) {
            frame.add(kind.property(), target.as_str());
        }
    }
    frame
}

/// Frame for an address; the place itself is the `is` slot
pub fn address_frame(address: &Address) -> Frame {
    let mut frame = Frame::new();
    if let Some(location) = &address.location {
        frame.add(IS, location.as_str());
    }
    if let Some(street) = &address.street_address {
        frame.add(STREET_ADDRESS, street.as_str());
    }
    if let Some(postal_code) = &address.postal_code {
        frame.add(POSTAL_CODE, postal_code.as_str());
    }
    if let Some(country) = &address.country {
        frame.add(COUNTRY, country.as_str());
    }
    if let Some(coordinate) = &address.coordinate {
        frame.add(COORDINATE_LOCATION, coordinate_frame(coordinate).into_value());
    }
    frame
}

fn coordinate_frame(coordinate: &Coordinate) -> Frame {
    let mut frame = Frame::new();
    frame.add(ISA, GEO);
    frame.add(LAT, coordinate.lat);
    frame.add(LNG, coordinate.lng);
    frame
}

fn name_value(name: &LegalName) -> Value {
    match name.language() {
        Some(lang) => json!({ "text": name.text(), "lang": lang }),
        None => Value::from(name.text()),
    }
}
