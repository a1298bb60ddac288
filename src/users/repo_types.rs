use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// User record in the `users` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: Option<i64>, // assigned by the store on first save
    pub name: String,
    pub email: String,
    pub address: Option<String>,
}

impl User {
    pub fn new(name: impl Into<String>, email: impl Into<String>, address: Option<String>) -> Self {
        Self {
            id: None,
            name: name.into(),
            email: email.into(),
            address,
        }
    }
}

/// Outcome of a point lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Lookup {
    Found(User),
    Absent,
}

impl From<Option<User>> for Lookup {
    fn from(row: Option<User>) -> Self {
        match row {
            Some(user) => Lookup::Found(user),
            None => Lookup::Absent,
        }
    }
}
