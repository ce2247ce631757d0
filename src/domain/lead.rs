use bigdecimal::BigDecimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub type LeadId = String;

/// A lead ready to be written to the repository.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LeadRecord {
    pub name: String,
    pub company: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub service_interest: Option<String>,
    pub estimated_value: Option<BigDecimal>,
    pub origin: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub social_handle: Option<String>,
    pub notes: Option<String>,
    /// Values for catalog keys that have no dedicated field.
    pub extra: BTreeMap<String, String>,
}

/// Identity view of a lead already stored in the repository.
/// Only the fields used for duplicate detection are carried.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExistingRecord {
    pub id: LeadId,
    pub email: Option<String>,
    pub phone: Option<String>,
}
