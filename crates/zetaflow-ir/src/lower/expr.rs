//! Scalar expressions to row closures.

use zetaflow_plan::{CallKind, RexKind, RexNode};

use crate::error::IrError;
use crate::expr::{BinaryOp, Expression, UnaryOp};
use crate::lower::types::TypeCompiler;
use crate::node::Origin;

/// Compiles one scalar expression over a row of known arity into a closure
/// over the implicit row variable `t`.
pub struct ExpressionCompiler {
    types: TypeCompiler,
    row_arity: usize,
}

impl ExpressionCompiler {
    pub fn new(row_arity: usize) -> Self {
        Self {
            types: TypeCompiler::new(),
            row_arity,
        }
    }

    /// Compiles `rex` and wraps it in the single row closure. The closure
    /// takes the body's type.
    pub fn compile(&self, rex: &RexNode) -> Result<Expression, IrError> {
        let body = self.visit(rex)?;
        Ok(Expression::closure(body)?.with_origin(Origin::of(rex)))
    }

    fn visit(&self, rex: &RexNode) -> Result<Expression, IrError> {
        let origin = Origin::of(rex);
        match &rex.kind {
            RexKind::InputRef { index } => {
                let ty = self.types.convert(&rex.ty)?;
                Ok(Expression::field(ty, *index, self.row_arity)?.with_origin(origin))
            }
            RexKind::Literal { value } => {
                let ty = self.types.convert(&rex.ty)?;
                Ok(Expression::literal(ty, value.clone()).with_origin(origin))
            }
            RexKind::Call { op, operands } => {
                let operands = operands
                    .iter()
                    .map(|operand| self.visit(operand))
                    .collect::<Result<Vec<_>, _>>()?;
                self.visit_call(rex, *op, operands)
            }
        }
    }

    fn visit_call(
        &self,
        rex: &RexNode,
        op: CallKind,
        operands: Vec<Expression>,
    ) -> Result<Expression, IrError> {
        use CallKind::*;
        match op {
            Times => self.binary(rex, BinaryOp::Mul, &operands),
            Divide => self.binary(rex, BinaryOp::Div, &operands),
            Mod => self.binary(rex, BinaryOp::Rem, &operands),
            Plus => self.binary(rex, BinaryOp::Add, &operands),
            Minus => self.binary(rex, BinaryOp::Sub, &operands),
            LessThan => self.binary(rex, BinaryOp::Lt, &operands),
            GreaterThan => self.binary(rex, BinaryOp::Gt, &operands),
            LessThanOrEqual => self.binary(rex, BinaryOp::Le, &operands),
            GreaterThanOrEqual => self.binary(rex, BinaryOp::Ge, &operands),
            Equals => self.binary(rex, BinaryOp::Eq, &operands),
            NotEquals => self.binary(rex, BinaryOp::Ne, &operands),
            Or => self.binary(rex, BinaryOp::Or, &operands),
            And => self.binary(rex, BinaryOp::And, &operands),
            Dot => self.binary(rex, BinaryOp::Dot, &operands),
            BitAnd => self.binary(rex, BinaryOp::BitAnd, &operands),
            BitOr => self.binary(rex, BinaryOp::BitOr, &operands),
            BitXor => self.binary(rex, BinaryOp::BitXor, &operands),
            Not | IsFalse | IsNotTrue => self.unary(rex, UnaryOp::Not, &operands),
            PlusPrefix => self.unary(rex, UnaryOp::Plus, &operands),
            MinusPrefix => self.unary(rex, UnaryOp::Neg, &operands),
            IsTrue | IsNotFalse => {
                let [operand] = <[Expression; 1]>::try_from(operands).map_err(|ops| {
                    IrError::Invariant(format!("expected 1 operand, not {}", ops.len()))
                })?;
                // On a non-nullable boolean these are the identity. A NULL
                // operand must map to false instead, which needs null-aware
                // lowering.
                if operand.ty.nullable() {
                    return Err(IrError::Unimplemented(format!(
                        "{op:?} on a nullable operand: {rex}"
                    )));
                }
                Ok(operand)
            }
            IsNull | IsNotNull | Cast | Floor | Ceil => {
                Err(IrError::Unimplemented(format!("call {op:?}: {rex}")))
            }
        }
    }

    fn binary(
        &self,
        rex: &RexNode,
        op: BinaryOp,
        operands: &[Expression],
    ) -> Result<Expression, IrError> {
        let [left, right] = operands else {
            return Err(IrError::Invariant(format!(
                "expected 2 operands, not {}",
                operands.len()
            )));
        };
        let ty = self.types.convert(&rex.ty)?;
        Ok(Expression::binary(ty, op, left.clone(), right.clone()).with_origin(Origin::of(rex)))
    }

    fn unary(
        &self,
        rex: &RexNode,
        op: UnaryOp,
        operands: &[Expression],
    ) -> Result<Expression, IrError> {
        let [operand] = operands else {
            return Err(IrError::Invariant(format!(
                "expected 1 operand, not {}",
                operands.len()
            )));
        };
        let ty = self.types.convert(&rex.ty)?;
        Ok(Expression::unary(ty, op, operand.clone()).with_origin(Origin::of(rex)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::ExprKind;
    use crate::types::{IntWidth, Type};
    use zetaflow_plan::{SqlType, SqlTypeKind};

    fn col(index: usize, kind: SqlTypeKind) -> RexNode {
        RexNode::input_ref(SqlType::new(kind), index)
    }

    #[test]
    fn compile_wraps_exactly_one_closure() {
        let compiler = ExpressionCompiler::new(3);
        let compiled = compiler.compile(&col(2, SqlTypeKind::Boolean)).unwrap();
        assert!(compiled.is_closure());
        let ExprKind::Closure { body } = &compiled.kind else {
            panic!("expected a closure");
        };
        assert!(!body.contains_closure());
        assert_eq!(compiled.to_rust(), "|t| t.2");
    }

    #[test]
    fn expression_type_matches_the_type_compiler() {
        let compiler = ExpressionCompiler::new(3);
        let rex = col(0, SqlTypeKind::Integer);
        let compiled = compiler.compile(&rex).unwrap();
        let expected = TypeCompiler::new().convert(&rex.ty).unwrap();
        assert!(compiled.ty.same(&expected));
    }

    #[test]
    fn operator_table_renders_symbols() {
        let compiler = ExpressionCompiler::new(2);
        let rex = RexNode::call(
            SqlType::new(SqlTypeKind::Boolean),
            CallKind::And,
            vec![
                RexNode::call(
                    SqlType::new(SqlTypeKind::Boolean),
                    CallKind::LessThan,
                    vec![
                        col(0, SqlTypeKind::Integer),
                        RexNode::literal(SqlType::new(SqlTypeKind::Integer), "10"),
                    ],
                ),
                col(1, SqlTypeKind::Boolean),
            ],
        );
        let compiled = compiler.compile(&rex).unwrap();
        assert_eq!(compiled.to_rust(), "|t| ((t.0 < 10) && t.1)");
    }

    #[test]
    fn is_true_collapses_on_non_nullable_operand() {
        let compiler = ExpressionCompiler::new(3);
        let rex = RexNode::call(
            SqlType::new(SqlTypeKind::Boolean),
            CallKind::IsTrue,
            vec![col(2, SqlTypeKind::Boolean)],
        );
        let compiled = compiler.compile(&rex).unwrap();
        assert_eq!(compiled.to_rust(), "|t| t.2");
    }

    #[test]
    fn is_true_on_nullable_operand_is_unimplemented() {
        let compiler = ExpressionCompiler::new(3);
        let rex = RexNode::call(
            SqlType::new(SqlTypeKind::Boolean),
            CallKind::IsTrue,
            vec![RexNode::input_ref(
                SqlType::nullable(SqlTypeKind::Boolean),
                2,
            )],
        );
        assert!(matches!(
            compiler.compile(&rex),
            Err(IrError::Unimplemented(_))
        ));
    }

    #[test]
    fn not_and_is_false_share_the_negation() {
        let compiler = ExpressionCompiler::new(1);
        for kind in [CallKind::Not, CallKind::IsFalse, CallKind::IsNotTrue] {
            let rex = RexNode::call(
                SqlType::new(SqlTypeKind::Boolean),
                kind,
                vec![col(0, SqlTypeKind::Boolean)],
            );
            let compiled = compiler.compile(&rex).unwrap();
            assert_eq!(compiled.to_rust(), "|t| (!t.0)");
        }
    }

    #[test]
    fn unlowered_calls_are_unimplemented() {
        let compiler = ExpressionCompiler::new(1);
        for kind in [
            CallKind::IsNull,
            CallKind::IsNotNull,
            CallKind::Cast,
            CallKind::Floor,
            CallKind::Ceil,
        ] {
            let rex = RexNode::call(
                SqlType::new(SqlTypeKind::Boolean),
                kind,
                vec![col(0, SqlTypeKind::Boolean)],
            );
            assert!(matches!(
                compiler.compile(&rex),
                Err(IrError::Unimplemented(_))
            ));
        }
    }

    #[test]
    fn wrong_arity_is_an_invariant_violation() {
        let compiler = ExpressionCompiler::new(1);
        let rex = RexNode::call(
            SqlType::new(SqlTypeKind::Boolean),
            CallKind::Equals,
            vec![col(0, SqlTypeKind::Boolean)],
        );
        assert!(matches!(compiler.compile(&rex), Err(IrError::Invariant(_))));
    }

    #[test]
    fn out_of_range_field_is_an_invariant_violation() {
        let compiler = ExpressionCompiler::new(2);
        let rex = col(5, SqlTypeKind::Boolean);
        assert!(matches!(compiler.compile(&rex), Err(IrError::Invariant(_))));
    }

    #[test]
    fn field_type_survives_compilation() {
        let compiler = ExpressionCompiler::new(1);
        let rex = col(0, SqlTypeKind::BigInt);
        let compiled = compiler.compile(&rex).unwrap();
        assert!(compiled.ty.same(&Type::signed(IntWidth::W64, false)));
    }
}
