//! Output record models

pub mod address;
pub mod identifier;
pub mod organization;

pub use address::{Address, Coordinate};
pub use identifier::Lei;
pub use organization::{
    EntityCategory, LegalName, LinkKind, OrganizationRecord, OrganizationSet, SiteAddress,
};
