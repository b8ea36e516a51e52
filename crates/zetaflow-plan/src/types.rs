//! SQL-side type descriptors.
//!
//! These describe what the catalog and the planner know about a value's SQL
//! type. The circuit compiler maps them onto its own type lattice; nothing
//! here knows about dataflow types.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A SQL type as declared in DDL or derived for a scalar expression.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SqlType {
    pub kind: SqlTypeKind,
    pub nullable: bool,
}

impl SqlType {
    pub fn new(kind: SqlTypeKind) -> Self {
        Self {
            kind,
            nullable: false,
        }
    }

    pub fn nullable(kind: SqlTypeKind) -> Self {
        Self {
            kind,
            nullable: true,
        }
    }

    pub fn with_nullable(mut self, nullable: bool) -> Self {
        self.nullable = nullable;
        self
    }
}

impl fmt::Display for SqlType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.kind)?;
        if self.nullable {
            write!(f, " NULL")?;
        }
        Ok(())
    }
}

/// The SQL type kinds the front end can describe.
///
/// Only the primitive kinds (through `Varchar`) and `Row` are convertible to
/// dataflow types; the rest are recognized so that conversion can reject them
/// with a precise message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SqlTypeKind {
    Boolean,
    TinyInt,
    SmallInt,
    Integer,
    BigInt,
    Decimal,
    Float,
    Real,
    Double,
    Char,
    Varchar,
    Binary,
    Varbinary,
    Date,
    Time,
    Timestamp,
    Interval,
    Array,
    Map,
    Geometry,
    Null,
    Unknown,
    /// A struct type with named, ordered fields.
    Row(Vec<RelField>),
}

impl fmt::Display for SqlTypeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SqlTypeKind::Row(fields) => {
                write!(f, "ROW(")?;
                for (i, field) in fields.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{} {}", field.name, field.ty)?;
                }
                write!(f, ")")
            }
            other => write!(f, "{}", format!("{other:?}").to_ascii_uppercase()),
        }
    }
}

/// A named field of a row type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelField {
    pub name: String,
    pub ty: SqlType,
}

/// The shape of the rows a relational node produces.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RowType {
    pub fields: Vec<RelField>,
}

impl RowType {
    pub fn new(fields: Vec<RelField>) -> Self {
        Self { fields }
    }

    pub fn arity(&self) -> usize {
        self.fields.len()
    }

    pub fn field(&self, index: usize) -> &RelField {
        &self.fields[index]
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|f| f.name == name)
    }

    /// Set-operation compatibility: same arity and the same type kinds,
    /// ignoring field names and nullability.
    pub fn compatible(&self, other: &RowType) -> bool {
        self.arity() == other.arity()
            && self
                .fields
                .iter()
                .zip(&other.fields)
                .all(|(a, b)| a.ty.kind == b.ty.kind)
    }
}

impl fmt::Display for RowType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", SqlTypeKind::Row(self.fields.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compatible_ignores_names_and_nullability() {
        let a = RowType::new(vec![
            RelField {
                name: "A".into(),
                ty: SqlType::new(SqlTypeKind::Integer),
            },
            RelField {
                name: "B".into(),
                ty: SqlType::nullable(SqlTypeKind::Boolean),
            },
        ]);
        let b = RowType::new(vec![
            RelField {
                name: "X".into(),
                ty: SqlType::nullable(SqlTypeKind::Integer),
            },
            RelField {
                name: "Y".into(),
                ty: SqlType::new(SqlTypeKind::Boolean),
            },
        ]);
        assert!(a.compatible(&b));

        let c = RowType::new(vec![RelField {
            name: "A".into(),
            ty: SqlType::new(SqlTypeKind::Integer),
        }]);
        assert!(!a.compatible(&c));
    }
}
