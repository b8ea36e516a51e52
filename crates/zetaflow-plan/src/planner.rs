//! Query planner.
//!
//! Builds validated relational trees from parsed queries: name resolution
//! against the catalog, row-type computation, and a simple type deriver for
//! scalar expressions. The planner covers exactly the query surface the
//! circuit compiler lowers (single-table SELECT, WHERE, set operations);
//! everything else is rejected here rather than half-planned.

use sqlparser::ast::{
    BinaryOperator, Expr, GroupByExpr, Query, Select, SelectItem, SetExpr, SetOperator,
    SetQuantifier, TableFactor, TableWithJoins, UnaryOperator, Value,
};

use crate::catalog::Catalog;
use crate::ddl::{convert_column_type, object_name};
use crate::error::PlanError;
use crate::rel::{CallKind, RelNode, RexNode};
use crate::types::{RelField, RowType, SqlType, SqlTypeKind};

pub struct Planner<'a> {
    catalog: &'a Catalog,
}

impl<'a> Planner<'a> {
    pub fn new(catalog: &'a Catalog) -> Self {
        Self { catalog }
    }

    /// Plans a view query. ORDER BY has no relational meaning for a
    /// continuously maintained view, so it is rejected outright.
    pub fn plan(&self, query: &Query) -> Result<RelNode, PlanError> {
        if query.order_by.is_some() {
            return Err(PlanError::Unsupported("ORDER BY".into()));
        }
        if query.with.is_some() {
            return Err(PlanError::Unimplemented("WITH".into()));
        }
        self.plan_set_expr(&query.body)
    }

    fn plan_set_expr(&self, body: &SetExpr) -> Result<RelNode, PlanError> {
        match body {
            SetExpr::Select(select) => self.plan_select(select),
            SetExpr::Query(inner) => self.plan(inner),
            SetExpr::SetOperation {
                op,
                set_quantifier,
                left,
                right,
            } => {
                let left = self.plan_set_expr(left)?;
                let right = self.plan_set_expr(right)?;
                if !left.row_type.compatible(&right.row_type) {
                    return Err(PlanError::Validate(format!(
                        "set operation branches have incompatible row types: {} vs {}",
                        left.row_type, right.row_type
                    )));
                }
                let all = matches!(set_quantifier, SetQuantifier::All);
                let row_type = left.row_type.clone();
                match op {
                    SetOperator::Union => Ok(RelNode::union(row_type, vec![left, right], all)),
                    SetOperator::Except => Ok(RelNode::minus(row_type, vec![left, right], all)),
                    SetOperator::Intersect => {
                        Ok(RelNode::intersect(row_type, vec![left, right], all))
                    }
                    other => Err(PlanError::Unimplemented(format!("set operator {other}"))),
                }
            }
            other => Err(PlanError::Unimplemented(format!("query body: {other}"))),
        }
    }

    fn plan_select(&self, select: &Select) -> Result<RelNode, PlanError> {
        if select.distinct.is_some() {
            return Err(PlanError::Unimplemented("SELECT DISTINCT".into()));
        }
        if select.having.is_some() {
            return Err(PlanError::Unimplemented("HAVING".into()));
        }
        match &select.group_by {
            GroupByExpr::Expressions(exprs, modifiers)
                if exprs.is_empty() && modifiers.is_empty() => {}
            _ => return Err(PlanError::Unimplemented("GROUP BY".into())),
        }

        let mut node = self.plan_from(&select.from)?;

        if let Some(condition) = &select.selection {
            let predicate = self.to_rex(condition, &node.row_type)?;
            let row_type = node.row_type.clone();
            node = RelNode::filter(row_type, node, predicate);
        }

        if is_select_star(&select.projection) {
            return Ok(node);
        }

        let mut exprs = Vec::with_capacity(select.projection.len());
        let mut fields = Vec::with_capacity(select.projection.len());
        for (i, item) in select.projection.iter().enumerate() {
            let (expr, alias) = match item {
                SelectItem::UnnamedExpr(expr) => (expr, None),
                SelectItem::ExprWithAlias { expr, alias } => (expr, Some(alias.value.clone())),
                other => {
                    return Err(PlanError::Unimplemented(format!("projection: {other}")));
                }
            };
            let rex = self.to_rex(expr, &node.row_type)?;
            let name = alias.unwrap_or_else(|| derive_field_name(expr, i));
            fields.push(RelField {
                name,
                ty: rex.ty.clone(),
            });
            exprs.push(rex);
        }
        Ok(RelNode::project(RowType::new(fields), node, exprs))
    }

    fn plan_from(&self, from: &[TableWithJoins]) -> Result<RelNode, PlanError> {
        let [table] = from else {
            return Err(PlanError::Unimplemented(format!(
                "FROM over {} relations",
                from.len()
            )));
        };
        if !table.joins.is_empty() {
            return Err(PlanError::Unimplemented("JOIN".into()));
        }
        match &table.relation {
            TableFactor::Table { name, .. } => {
                let table_name = object_name(name)?;
                let def = self.catalog.table(&table_name)?;
                Ok(RelNode::scan(def.row_type(), def.name.clone()))
            }
            other => Err(PlanError::Unimplemented(format!("table factor: {other}"))),
        }
    }

    fn to_rex(&self, expr: &Expr, row: &RowType) -> Result<RexNode, PlanError> {
        match expr {
            Expr::Identifier(ident) => self.column_ref(&ident.value, row),
            Expr::CompoundIdentifier(parts) => {
                let last = parts
                    .last()
                    .ok_or_else(|| PlanError::Invariant("empty compound identifier".into()))?;
                self.column_ref(&last.value, row)
            }
            Expr::Nested(inner) => self.to_rex(inner, row),
            Expr::Value(value) => literal(&value.value),
            Expr::BinaryOp { left, op, right } => {
                let left = self.to_rex(left, row)?;
                let right = self.to_rex(right, row)?;
                let op = convert_binary_op(op)?;
                let ty = derive_binary_type(op, &left, &right);
                Ok(RexNode::call(ty, op, vec![left, right]))
            }
            Expr::UnaryOp { op, expr } => {
                let operand = self.to_rex(expr, row)?;
                let (op, ty) = match op {
                    UnaryOperator::Not => (
                        CallKind::Not,
                        SqlType::new(SqlTypeKind::Boolean).with_nullable(operand.ty.nullable),
                    ),
                    UnaryOperator::Plus => (CallKind::PlusPrefix, operand.ty.clone()),
                    UnaryOperator::Minus => (CallKind::MinusPrefix, operand.ty.clone()),
                    other => {
                        return Err(PlanError::Unimplemented(format!("unary operator {other}")));
                    }
                };
                Ok(RexNode::call(ty, op, vec![operand]))
            }
            Expr::IsTrue(inner) => self.bool_call(CallKind::IsTrue, inner, row),
            Expr::IsNotTrue(inner) => self.bool_call(CallKind::IsNotTrue, inner, row),
            Expr::IsFalse(inner) => self.bool_call(CallKind::IsFalse, inner, row),
            Expr::IsNotFalse(inner) => self.bool_call(CallKind::IsNotFalse, inner, row),
            Expr::IsNull(inner) => self.bool_call(CallKind::IsNull, inner, row),
            Expr::IsNotNull(inner) => self.bool_call(CallKind::IsNotNull, inner, row),
            Expr::Cast {
                expr, data_type, ..
            } => {
                let operand = self.to_rex(expr, row)?;
                let ty = convert_column_type(data_type)?.with_nullable(operand.ty.nullable);
                Ok(RexNode::call(ty, CallKind::Cast, vec![operand]))
            }
            Expr::Floor { expr, .. } => {
                let operand = self.to_rex(expr, row)?;
                let ty = operand.ty.clone();
                Ok(RexNode::call(ty, CallKind::Floor, vec![operand]))
            }
            Expr::Ceil { expr, .. } => {
                let operand = self.to_rex(expr, row)?;
                let ty = operand.ty.clone();
                Ok(RexNode::call(ty, CallKind::Ceil, vec![operand]))
            }
            other => Err(PlanError::Unimplemented(format!("expression: {other}"))),
        }
    }

    fn bool_call(&self, op: CallKind, inner: &Expr, row: &RowType) -> Result<RexNode, PlanError> {
        let operand = self.to_rex(inner, row)?;
        Ok(RexNode::call(
            SqlType::new(SqlTypeKind::Boolean),
            op,
            vec![operand],
        ))
    }

    fn column_ref(&self, name: &str, row: &RowType) -> Result<RexNode, PlanError> {
        let index = row
            .index_of(name)
            .ok_or_else(|| PlanError::Validate(format!("column '{name}' not found")))?;
        Ok(RexNode::input_ref(row.field(index).ty.clone(), index))
    }
}

fn is_select_star(projection: &[SelectItem]) -> bool {
    matches!(projection, [SelectItem::Wildcard(_)])
}

fn derive_field_name(expr: &Expr, index: usize) -> String {
    match expr {
        Expr::Identifier(ident) => ident.value.clone(),
        Expr::CompoundIdentifier(parts) => parts
            .last()
            .map(|p| p.value.clone())
            .unwrap_or_else(|| format!("expr_{index}")),
        _ => format!("expr_{index}"),
    }
}

fn literal(value: &Value) -> Result<RexNode, PlanError> {
    match value {
        Value::Number(n, _) => Ok(RexNode::literal(
            SqlType::new(SqlTypeKind::Integer),
            n.clone(),
        )),
        Value::Boolean(b) => Ok(RexNode::literal(
            SqlType::new(SqlTypeKind::Boolean),
            b.to_string(),
        )),
        Value::SingleQuotedString(s) | Value::DoubleQuotedString(s) => Ok(RexNode::literal(
            SqlType::new(SqlTypeKind::Char),
            format!("{s:?}"),
        )),
        Value::Null => Ok(RexNode::literal(
            SqlType::nullable(SqlTypeKind::Null),
            "NULL",
        )),
        other => Err(PlanError::Unimplemented(format!("literal: {other}"))),
    }
}

fn convert_binary_op(op: &BinaryOperator) -> Result<CallKind, PlanError> {
    Ok(match op {
        BinaryOperator::Multiply => CallKind::Times,
        BinaryOperator::Divide => CallKind::Divide,
        BinaryOperator::Modulo => CallKind::Mod,
        BinaryOperator::Plus => CallKind::Plus,
        BinaryOperator::Minus => CallKind::Minus,
        BinaryOperator::Lt => CallKind::LessThan,
        BinaryOperator::Gt => CallKind::GreaterThan,
        BinaryOperator::LtEq => CallKind::LessThanOrEqual,
        BinaryOperator::GtEq => CallKind::GreaterThanOrEqual,
        BinaryOperator::Eq => CallKind::Equals,
        BinaryOperator::NotEq => CallKind::NotEquals,
        BinaryOperator::And => CallKind::And,
        BinaryOperator::Or => CallKind::Or,
        BinaryOperator::BitwiseAnd => CallKind::BitAnd,
        BinaryOperator::BitwiseOr => CallKind::BitOr,
        BinaryOperator::BitwiseXor => CallKind::BitXor,
        other => {
            return Err(PlanError::Unimplemented(format!("binary operator {other}")));
        }
    })
}

fn derive_binary_type(op: CallKind, left: &RexNode, right: &RexNode) -> SqlType {
    let nullable = left.ty.nullable || right.ty.nullable;
    match op {
        CallKind::LessThan
        | CallKind::GreaterThan
        | CallKind::LessThanOrEqual
        | CallKind::GreaterThanOrEqual
        | CallKind::Equals
        | CallKind::NotEquals
        | CallKind::And
        | CallKind::Or => SqlType::new(SqlTypeKind::Boolean).with_nullable(nullable),
        _ => left.ty.clone().with_nullable(nullable),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{ColumnInfo, TableDef};
    use crate::rel::{RelKind, RexKind};
    use sqlparser::dialect::GenericDialect;
    use sqlparser::parser::Parser;

    fn catalog() -> Catalog {
        let mut catalog = Catalog::new("schema");
        let mut t = TableDef::new("T");
        for (name, kind) in [
            ("COL1", SqlTypeKind::Integer),
            ("COL2", SqlTypeKind::Float),
            ("COL3", SqlTypeKind::Boolean),
        ] {
            t.add_column(ColumnInfo {
                name: name.into(),
                ty: SqlType::new(kind),
                nullable: true,
            });
        }
        catalog.add_table(t).unwrap();
        catalog
    }

    fn plan(sql: &str) -> Result<RelNode, PlanError> {
        let catalog = catalog();
        let statement = Parser::parse_sql(&GenericDialect {}, sql).unwrap().remove(0);
        let sqlparser::ast::Statement::Query(query) = statement else {
            panic!("expected a query");
        };
        Planner::new(&catalog).plan(&query)
    }

    #[test]
    fn select_star_is_a_bare_scan() {
        let node = plan("SELECT * FROM T").unwrap();
        assert!(matches!(node.kind, RelKind::TableScan { .. }));
        assert_eq!(node.row_type.arity(), 3);
    }

    #[test]
    fn projection_resolves_columns() {
        let node = plan("SELECT T.COL3 FROM T").unwrap();
        let RelKind::Project { input, exprs } = &node.kind else {
            panic!("expected a projection");
        };
        assert!(matches!(input.kind, RelKind::TableScan { .. }));
        assert!(matches!(exprs[0].kind, RexKind::InputRef { index: 2 }));
        assert_eq!(node.row_type.field(0).name, "COL3");
        assert_eq!(node.row_type.field(0).ty.kind, SqlTypeKind::Boolean);
    }

    #[test]
    fn where_becomes_a_filter() {
        let node = plan("SELECT * FROM T WHERE COL3").unwrap();
        let RelKind::Filter { input, predicate } = &node.kind else {
            panic!("expected a filter");
        };
        assert!(matches!(input.kind, RelKind::TableScan { .. }));
        assert!(matches!(predicate.kind, RexKind::InputRef { index: 2 }));
    }

    #[test]
    fn comparison_derives_boolean() {
        let node = plan("SELECT * FROM T WHERE COL1 < 10").unwrap();
        let RelKind::Filter { predicate, .. } = &node.kind else {
            panic!("expected a filter");
        };
        assert_eq!(predicate.ty.kind, SqlTypeKind::Boolean);
        let RexKind::Call { op, operands } = &predicate.kind else {
            panic!("expected a call");
        };
        assert_eq!(*op, CallKind::LessThan);
        assert_eq!(operands.len(), 2);
    }

    #[test]
    fn union_all_keeps_the_flag() {
        let node = plan("(SELECT * FROM T) UNION ALL (SELECT * FROM T)").unwrap();
        let RelKind::Union { inputs, all } = &node.kind else {
            panic!("expected a union");
        };
        assert!(*all);
        assert_eq!(inputs.len(), 2);
    }

    #[test]
    fn except_plans_as_minus() {
        let node = plan("SELECT * FROM T EXCEPT (SELECT * FROM T WHERE COL3)").unwrap();
        let RelKind::Minus { inputs, all } = &node.kind else {
            panic!("expected a minus");
        };
        assert!(!*all);
        assert!(matches!(inputs[1].kind, RelKind::Filter { .. }));
    }

    #[test]
    fn order_by_is_unsupported() {
        let err = plan("SELECT * FROM T ORDER BY COL1").unwrap_err();
        match err {
            PlanError::Unsupported(msg) => assert_eq!(msg, "ORDER BY"),
            other => panic!("expected Unsupported, got {other:?}"),
        }
    }

    #[test]
    fn join_is_unimplemented() {
        let mut catalog = catalog();
        let mut u = TableDef::new("U");
        u.add_column(ColumnInfo {
            name: "COL1".into(),
            ty: SqlType::new(SqlTypeKind::Integer),
            nullable: true,
        });
        catalog.add_table(u).unwrap();
        let statement = Parser::parse_sql(
            &GenericDialect {},
            "SELECT * FROM T JOIN U ON T.COL1 = U.COL1",
        )
        .unwrap()
        .remove(0);
        let sqlparser::ast::Statement::Query(query) = statement else {
            panic!("expected a query");
        };
        let err = Planner::new(&catalog).plan(&query).unwrap_err();
        assert!(matches!(err, PlanError::Unimplemented(_)));
    }

    #[test]
    fn unknown_column_fails_validation() {
        let err = plan("SELECT COL9 FROM T").unwrap_err();
        assert!(matches!(err, PlanError::Validate(_)));
    }
}
