//! Schema catalog and DDL descriptors.
//!
//! The catalog is the in-memory database state built by executing DDL: one
//! `TableDef` per CREATE TABLE and one `ViewDef` per CREATE VIEW. The
//! circuit compiler consumes the resulting [`Program`].

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::error::PlanError;
use crate::rel::RelNode;
use crate::types::{RelField, RowType, SqlType};

/// A column of a SQL table.
///
/// `nullable` records what the DDL declared (columns are nullable by default
/// in SQL); `ty` is the type used when planning row types and stays
/// non-nullable. The catalog reports declared nullability while planned
/// rows carry bare types.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnInfo {
    pub name: String,
    pub ty: SqlType,
    pub nullable: bool,
}

/// The schema of a table as produced by a CREATE TABLE statement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableDef {
    pub name: String,
    pub columns: Vec<ColumnInfo>,
}

impl TableDef {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            columns: Vec::new(),
        }
    }

    pub fn add_column(&mut self, column: ColumnInfo) {
        self.columns.push(column);
    }

    pub fn row_type(&self) -> RowType {
        RowType::new(
            self.columns
                .iter()
                .map(|c| RelField {
                    name: c.name.clone(),
                    ty: c.ty.clone(),
                })
                .collect(),
        )
    }
}

/// A compiled CREATE VIEW statement: the view's name, its planned relational
/// tree, and the validated row type of the tree's root.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ViewDef {
    pub name: String,
    pub rel: RelNode,
    pub row_type: RowType,
}

/// Name-to-table map with put-new semantics.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    name: String,
    tables: HashMap<String, TableDef>,
}

impl Catalog {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            tables: HashMap::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Registers a table. Re-registering a name is an invariant violation:
    /// the DDL stream is expected to define each table once.
    pub fn add_table(&mut self, table: TableDef) -> Result<(), PlanError> {
        if self.tables.contains_key(&table.name) {
            return Err(PlanError::Invariant(format!(
                "table '{}' is already defined",
                table.name
            )));
        }
        self.tables.insert(table.name.clone(), table);
        Ok(())
    }

    pub fn table(&self, name: &str) -> Result<&TableDef, PlanError> {
        self.tables
            .get(name)
            .ok_or_else(|| PlanError::Validate(format!("table '{name}' not found")))
    }
}

/// Everything the front end has accepted so far, in first-presentation
/// order: the input tables and the compiled views.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Program {
    pub tables: Vec<TableDef>,
    pub views: Vec<ViewDef>,
}
