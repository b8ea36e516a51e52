//! SQL type descriptors to dataflow types.

use zetaflow_plan::{RowType, SqlType, SqlTypeKind};

use crate::error::IrError;
use crate::node::Origin;
use crate::types::{IntWidth, Type};

/// Pure conversion from SQL types to the dataflow lattice.
#[derive(Debug, Default)]
pub struct TypeCompiler;

impl TypeCompiler {
    pub fn new() -> Self {
        Self
    }

    /// Converts a SQL type. Struct types become non-nullable tuples with
    /// nullability living on each element; the SQL type's own nullable bit
    /// is carried onto the produced base type.
    pub fn convert(&self, ty: &SqlType) -> Result<Type, IrError> {
        let nullable = ty.nullable;
        let converted = match &ty.kind {
            SqlTypeKind::Row(fields) => {
                let elements = fields
                    .iter()
                    .map(|f| self.convert(&f.ty))
                    .collect::<Result<Vec<_>, _>>()?;
                Type::tuple(elements)
            }
            SqlTypeKind::Boolean => Type::boolean(nullable),
            SqlTypeKind::TinyInt => Type::signed(IntWidth::W8, nullable),
            SqlTypeKind::SmallInt => Type::signed(IntWidth::W16, nullable),
            SqlTypeKind::Integer => Type::signed(IntWidth::W32, nullable),
            // DECIMAL lands on i64, discarding precision and scale.
            SqlTypeKind::BigInt | SqlTypeKind::Decimal => Type::signed(IntWidth::W64, nullable),
            SqlTypeKind::Float | SqlTypeKind::Real => Type::float32(nullable),
            SqlTypeKind::Double => Type::float64(nullable),
            SqlTypeKind::Char | SqlTypeKind::Varchar => Type::string(nullable),
            _ => {
                return Err(IrError::Unimplemented(format!("SQL type {ty}")));
            }
        };
        Ok(converted.with_origin(Origin::of(ty)))
    }

    /// Converts a row type to the tuple flowing through operators.
    pub fn convert_row(&self, row: &RowType) -> Result<Type, IrError> {
        let elements = row
            .fields
            .iter()
            .map(|f| self.convert(&f.ty))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Type::tuple(elements))
    }
}
