//! Table definition for persisted users.
//!
//! Column limits declared here drive request validation; the migration under
//! `migrations/` must render the same columns.

pub const NAME_MAX_LEN: usize = 100;
pub const EMAIL_MAX_LEN: usize = 150;
pub const ADDRESS_MAX_LEN: usize = 200;

#[derive(Debug, Clone, Copy)]
pub struct Column {
    pub name: &'static str,
    pub sql_type: &'static str,
    pub max_len: Option<usize>,
    pub primary_key: bool,
    pub nullable: bool,
    pub unique: bool,
}

impl Column {
    const fn varchar(name: &'static str, max_len: usize) -> Self {
        Self {
            name,
            sql_type: "VARCHAR",
            max_len: Some(max_len),
            primary_key: false,
            nullable: true,
            unique: false,
        }
    }

    const fn required(mut self) -> Self {
        self.nullable = false;
        self
    }

    const fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    /// Column clause as it appears in `CREATE TABLE`.
    pub fn ddl(&self) -> String {
        let mut out = format!("{} {}", self.name, self.sql_type);
        if let Some(len) = self.max_len {
            out.push_str(&format!("({})", len));
        }
        if self.primary_key {
            out.push_str(" PRIMARY KEY");
        } else if !self.nullable {
            out.push_str(" NOT NULL");
        }
        if self.unique {
            out.push_str(" UNIQUE");
        }
        out
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Table {
    pub name: &'static str,
    pub columns: &'static [Column],
}

impl Table {
    /// Idempotent `CREATE TABLE` statement for this table.
    pub fn create_sql(&self) -> String {
        let columns: Vec<String> = self
            .columns
            .iter()
            .map(|c| format!("    {}", c.ddl()))
            .collect();
        format!(
            "CREATE TABLE IF NOT EXISTS {} (\n{}\n);",
            self.name,
            columns.join(",\n")
        )
    }
}

pub const USERS: Table = Table {
    name: "users",
    columns: &[
        Column {
            name: "id",
            sql_type: "BIGSERIAL",
            max_len: None,
            primary_key: true,
            nullable: false,
            unique: false,
        },
        Column::varchar("name", NAME_MAX_LEN).required(),
        Column::varchar("email", EMAIL_MAX_LEN).required().unique(),
        Column::varchar("address", ADDRESS_MAX_LEN),
    ],
};
