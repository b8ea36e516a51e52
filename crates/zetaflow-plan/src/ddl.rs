//! DDL simulator.
//!
//! Executes CREATE TABLE / CREATE VIEW statements against the catalog. The
//! simulator recognizes types by their printed name rather than by parser
//! AST shape, so a `VARCHAR(10)` and a bare `VARCHAR` land on the same kind.

use sqlparser::ast::{ColumnOption, DataType, ObjectName, Query, Statement};

use crate::catalog::{Catalog, ColumnInfo, TableDef};
use crate::error::PlanError;
use crate::types::{SqlType, SqlTypeKind};

/// A CREATE VIEW statement as extracted by the simulator, before planning.
#[derive(Debug, Clone)]
pub struct ViewDecl {
    pub name: String,
    pub query: Query,
}

/// What executing one DDL statement produced.
#[derive(Debug, Clone)]
pub enum SimulatorResult {
    Table(TableDef),
    View(ViewDecl),
}

/// Simulates DDL execution against an in-memory catalog.
pub struct DdlSimulator<'a> {
    catalog: &'a mut Catalog,
}

impl<'a> DdlSimulator<'a> {
    pub fn new(catalog: &'a mut Catalog) -> Self {
        Self { catalog }
    }

    /// Executes one statement. CREATE TABLE updates the catalog; CREATE VIEW
    /// is returned for the caller to plan. Everything else is rejected.
    pub fn execute(&mut self, statement: &Statement) -> Result<SimulatorResult, PlanError> {
        match statement {
            Statement::CreateTable(create) => {
                let name = object_name(&create.name)?;
                let mut table = TableDef::new(name);
                for column in &create.columns {
                    let ty = convert_column_type(&column.data_type)?;
                    let not_null = column
                        .options
                        .iter()
                        .any(|o| matches!(o.option, ColumnOption::NotNull));
                    table.add_column(ColumnInfo {
                        name: column.name.value.clone(),
                        ty,
                        nullable: !not_null,
                    });
                }
                self.catalog.add_table(table.clone())?;
                Ok(SimulatorResult::Table(table))
            }
            Statement::CreateView { name, query, .. } => Ok(SimulatorResult::View(ViewDecl {
                name: object_name(name)?,
                query: (**query).clone(),
            })),
            other => Err(PlanError::Unimplemented(format!("statement: {other}"))),
        }
    }
}

/// Last component of a possibly qualified name.
pub(crate) fn object_name(name: &ObjectName) -> Result<String, PlanError> {
    name.0
        .last()
        .map(|part| part.to_string())
        .ok_or_else(|| PlanError::Invariant("empty object name".into()))
}

/// Maps a declared column type onto a [`SqlType`] by its printed name.
pub(crate) fn convert_column_type(data_type: &DataType) -> Result<SqlType, PlanError> {
    let printed = data_type.to_string().to_ascii_uppercase();
    if printed.starts_with("CHARACTER VARYING") || printed.starts_with("CHAR VARYING") {
        return Ok(SqlType::new(SqlTypeKind::Varchar));
    }
    let base = printed
        .split(['(', ' '])
        .next()
        .unwrap_or(printed.as_str());
    let kind = match base {
        "BOOLEAN" | "BOOL" => SqlTypeKind::Boolean,
        "TINYINT" => SqlTypeKind::TinyInt,
        "SMALLINT" => SqlTypeKind::SmallInt,
        "INT" | "INTEGER" => SqlTypeKind::Integer,
        "BIGINT" => SqlTypeKind::BigInt,
        "DECIMAL" | "DEC" | "NUMERIC" => SqlTypeKind::Decimal,
        "FLOAT" => SqlTypeKind::Float,
        "REAL" => SqlTypeKind::Real,
        // "DOUBLE PRECISION" splits to "DOUBLE"
        "DOUBLE" => SqlTypeKind::Double,
        "CHAR" | "CHARACTER" => SqlTypeKind::Char,
        "VARCHAR" => SqlTypeKind::Varchar,
        "BINARY" => SqlTypeKind::Binary,
        "VARBINARY" => SqlTypeKind::Varbinary,
        "DATE" => SqlTypeKind::Date,
        "TIME" => SqlTypeKind::Time,
        "TIMESTAMP" => SqlTypeKind::Timestamp,
        "INTERVAL" => SqlTypeKind::Interval,
        _ => {
            return Err(PlanError::Unimplemented(format!("SQL type {printed}")));
        }
    };
    Ok(SqlType::new(kind))
}
