//! Common type definitions.
//!
//! # ID Types
//!
//! Every entity is keyed by a surrogate [`EntityId`], assigned by the relational store on first
//! save and never reassigned afterwards.
//!
//! # Operations
//!
//! [`Operation`] names the write performed on an entity. It drives the alert headers returned by
//! the REST layer (`cwcrmApp.waiver.created`, ...).

/// Surrogate identifier shared by all entities (a PostgreSQL `BIGINT`).
pub type EntityId = i64;

/// Name of the application as it appears in alert headers and message keys.
pub const APPLICATION_NAME: &str = "cwcrmApp";

// Write operations that produce an alert for the client
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Create,
    Update,
    Delete,
}

impl Operation {
    /// Past-tense verb used in alert message keys
    pub fn past_tense(self) -> &'static str {
        match self {
            Operation::Create => "created",
            Operation::Update => "updated",
            Operation::Delete => "deleted",
        }
    }
}
