//! Database model for priorities.

use super::Entity;
use crate::types::EntityId;
use serde::{Deserialize, Serialize};
use sqlx::{Postgres, postgres::PgArguments, query::QueryAs};
use std::fmt;
use std::hash::{Hash, Hasher};

/// Database representation of a priority
#[derive(Debug, Clone, Default, Serialize, Deserialize, sqlx::FromRow)]
pub struct Priority {
    pub id: Option<EntityId>,
    pub name: String,
}

impl Priority {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }
}

impl Entity for Priority {
    const NAME: &'static str = "Priority";
    const PLURAL: &'static str = "Priorities";
    const KEY: &'static str = "priority";
    const TABLE: &'static str = "priority";
    const INDEX: &'static str = "priority";
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

impl PartialEq for Priority {
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

impl Hash for Priority {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.id {
            Some(id) => write!(f, "Priority{{id={id}, name='{}'}}", self.name),
            None => write!(f, "Priority{{id=null, name='{}'}}", self.name),
        }
    }
}
