//! The dashboard's record lists and where each one lives.
//!
//! Every list has a local slot key (the offline copy), a remote collection,
//! and optionally a discriminator when two lists share one collection.

use serde::{Deserialize, Serialize};

use crate::types::{Discriminator, Record};

/// Built-in dashboard domains.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Domain {
    Clients,
    Teammates,
    FinanceEntries,
    ClientPayments,
    Assignments,
    Scripts,
    UpskillTasks,
    LearningItems,
}

impl Domain {
    pub const ALL: [Domain; 8] = [
        Domain::Clients,
        Domain::Teammates,
        Domain::FinanceEntries,
        Domain::ClientPayments,
        Domain::Assignments,
        Domain::Scripts,
        Domain::UpskillTasks,
        Domain::LearningItems,
    ];

    pub fn config(self) -> DomainConfig {
        match self {
            Domain::Clients => DomainConfig::new("clients", "clients"),
            Domain::Teammates => DomainConfig::new("teammates", "teammates"),
            Domain::FinanceEntries => DomainConfig::new("financeEntries", "finance")
                .with_discriminator(Discriminator::new("itemType", "entry")),
            Domain::ClientPayments => DomainConfig::new("clientPayments", "finance")
                .with_discriminator(Discriminator::new("itemType", "payment")),
            Domain::Assignments => DomainConfig::new("events", "collegeAssignments"),
            Domain::Scripts => DomainConfig::new("scripts", "scripts"),
            Domain::UpskillTasks => DomainConfig::new("upskillTasks", "upskillTasks"),
            Domain::LearningItems => DomainConfig::new("learnapartItems", "learnapart"),
        }
    }
}

/// Storage coordinates for one domain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DomainConfig {
    /// Local slot holding the domain's record list.
    pub local_key: String,
    /// Remote collection name.
    pub collection: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub discriminator: Option<Discriminator>,
}

impl DomainConfig {
    pub fn new(local_key: impl Into<String>, collection: impl Into<String>) -> Self {
        Self {
            local_key: local_key.into(),
            collection: collection.into(),
            discriminator: None,
        }
    }

    pub fn with_discriminator(mut self, discriminator: Discriminator) -> Self {
        self.discriminator = Some(discriminator);
        self
    }

    /// Slot for records whose remote create failed and await migration.
    pub fn outbox_key(&self) -> String {
        format!("{}::outbox", self.local_key)
    }

    /// Whether `record` belongs to this domain's slice of the collection.
    pub fn owns(&self, record: &Record) -> bool {
        self.discriminator
            .as_ref()
            .map_or(true, |d| d.matches(record))
    }
}

impl From<Domain> for DomainConfig {
    fn from(domain: Domain) -> Self {
        domain.config()
    }
}
