//! Database model for waivers.

use super::Entity;
use crate::types::EntityId;
use serde::{Deserialize, Serialize};
use sqlx::{Postgres, postgres::PgArguments, query::QueryAs};
use std::fmt;
use std::hash::{Hash, Hasher};

/// Database representation of a waiver
#[derive(Debug, Clone, Default, Serialize, Deserialize, sqlx::FromRow)]
pub struct Waiver {
    pub id: Option<EntityId>,
    pub name: String,
}

impl Waiver {
    /// A waiver that has not been persisted yet
    pub fn new() -> Self {
        Self::default()
    }

    /// Fluent setter for `name`
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }
}

impl Entity for Waiver {
    const NAME: &'static str = "Waiver";
    const PLURAL: &'static str = "Waivers";
    const KEY: &'static str = "waiver";
    const TABLE: &'static str = "waiver";
    const INDEX: &'static str = "waiver";
    const COLUMNS: &'static [&'static str] = &["name"];

    fn id(&self) -> Option<EntityId> {
        self.id
    }

    fn set_id(&mut self, id: EntityId) {
        self.id = Some(id);
    }

    fn bind_columns<'q, O>(&'q self, query: QueryAs<'q, Postgres, O, PgArguments>) -> QueryAs<'q, Postgres, O, PgArguments> {
        query.bind(self.name.as_str())
    }
}

impl PartialEq for Waiver {
    fn eq(&self, other: &Self) -> bool {
        if std::ptr::eq(self, other) {
            return true;
        }
        match (self.id, other.id) {
            (Some(a), Some(b)) => a == b,
            _ => false,
        }
    }
}

impl Hash for Waiver {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Display for Waiver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.id {
            Some(id) => write!(f, "Waiver{{id={id}, name='{}'}}", self.name),
            None => write!(f, "Waiver{{id=null, name='{}'}}", self.name),
        }
    }
}
