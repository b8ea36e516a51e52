//! The expression IR carried by stream operators.
//!
//! Expressions are strict trees. A compiled expression is always a single
//! [`ExprKind::Closure`] over the implicit row variable `t`; field accesses
//! inside the body index into that row.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::IrError;
use crate::node::{NodeMeta, Origin};
use crate::printer::Printer;
use crate::types::Type;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Expression {
    pub meta: NodeMeta,
    pub ty: Type,
    pub kind: ExprKind,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ExprKind {
    /// Positional reference into the implicit row `t`.
    Field { index: usize },
    /// A constant whose printed form is opaque to the compiler.
    Literal { value: String },
    Unary {
        op: UnaryOp,
        operand: Box<Expression>,
    },
    Binary {
        op: BinaryOp,
        left: Box<Expression>,
        right: Box<Expression>,
    },
    /// Binds the row variable `t` in scope of `body`. Closures never nest.
    Closure { body: Box<Expression> },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BinaryOp {
    Mul,
    Div,
    Rem,
    Add,
    Sub,
    Lt,
    Gt,
    Le,
    Ge,
    Eq,
    Ne,
    And,
    Or,
    Dot,
    BitAnd,
    BitOr,
    BitXor,
}

impl BinaryOp {
    pub fn symbol(self) -> &'static str {
        match self {
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Rem => "%",
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Lt => "<",
            BinaryOp::Gt => ">",
            BinaryOp::Le => "<=",
            BinaryOp::Ge => ">=",
            BinaryOp::Eq => "==",
            BinaryOp::Ne => "!=",
            BinaryOp::And => "&&",
            BinaryOp::Or => "||",
            BinaryOp::Dot => ".",
            BinaryOp::BitAnd => "&",
            BinaryOp::BitOr => "|",
            BinaryOp::BitXor => "^",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UnaryOp {
    Not,
    Plus,
    Neg,
}

impl UnaryOp {
    pub fn symbol(self) -> &'static str {
        match self {
            UnaryOp::Not => "!",
            UnaryOp::Plus => "+",
            UnaryOp::Neg => "-",
        }
    }
}

impl Expression {
    fn new(ty: Type, kind: ExprKind) -> Self {
        Self {
            meta: NodeMeta::default(),
            ty,
            kind,
        }
    }

    pub fn with_origin(mut self, origin: Origin) -> Self {
        self.meta.origin = origin;
        self
    }

    /// A reference to field `index` of a row with `arity` columns.
    pub fn field(ty: Type, index: usize, arity: usize) -> Result<Self, IrError> {
        if index >= arity {
            return Err(IrError::Invariant(format!(
                "field index {index} outside row of arity {arity}"
            )));
        }
        Ok(Self::new(ty, ExprKind::Field { index }))
    }

    pub fn literal(ty: Type, value: impl Into<String>) -> Self {
        Self::new(
            ty,
            ExprKind::Literal {
                value: value.into(),
            },
        )
    }

    pub fn unary(ty: Type, op: UnaryOp, operand: Expression) -> Self {
        Self::new(
            ty,
            ExprKind::Unary {
                op,
                operand: Box::new(operand),
            },
        )
    }

    pub fn binary(ty: Type, op: BinaryOp, left: Expression, right: Expression) -> Self {
        Self::new(
            ty,
            ExprKind::Binary {
                op,
                left: Box::new(left),
                right: Box::new(right),
            },
        )
    }

    /// Wraps `body` in the row closure. The closure takes the body's type.
    pub fn closure(body: Expression) -> Result<Self, IrError> {
        if body.contains_closure() {
            return Err(IrError::Unsupported("nested closures".into()));
        }
        let ty = body.ty.clone();
        Ok(Self::new(
            ty,
            ExprKind::Closure {
                body: Box::new(body),
            },
        ))
    }

    pub fn is_closure(&self) -> bool {
        matches!(self.kind, ExprKind::Closure { .. })
    }

    pub fn contains_closure(&self) -> bool {
        match &self.kind {
            ExprKind::Field { .. } | ExprKind::Literal { .. } => false,
            ExprKind::Unary { operand, .. } => operand.contains_closure(),
            ExprKind::Binary { left, right, .. } => {
                left.contains_closure() || right.contains_closure()
            }
            ExprKind::Closure { .. } => true,
        }
    }

    pub fn write(&self, p: &mut Printer) {
        match &self.kind {
            ExprKind::Field { index } => {
                p.append("t.").append(&index.to_string());
            }
            ExprKind::Literal { value } => {
                p.append(value);
            }
            ExprKind::Unary { op, operand } => {
                p.append("(").append(op.symbol());
                operand.write(p);
                p.append(")");
            }
            ExprKind::Binary { op, left, right } => {
                p.append("(");
                left.write(p);
                p.append(" ").append(op.symbol()).append(" ");
                right.write(p);
                p.append(")");
            }
            ExprKind::Closure { body } => {
                p.append("|t| ");
                body.write(p);
            }
        }
    }

    pub fn to_rust(&self) -> String {
        let mut p = Printer::new();
        self.write(&mut p);
        p.finish()
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_rust())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::IntWidth;

    #[test]
    fn field_index_must_fit_the_row() {
        assert!(Expression::field(Type::boolean(false), 2, 3).is_ok());
        let err = Expression::field(Type::boolean(false), 3, 3).unwrap_err();
        assert!(matches!(err, IrError::Invariant(_)));
    }

    #[test]
    fn closures_never_nest() {
        let body = Expression::field(Type::boolean(false), 0, 1).unwrap();
        let closure = Expression::closure(body).unwrap();
        assert!(closure.is_closure());
        let err = Expression::closure(closure).unwrap_err();
        assert!(matches!(err, IrError::Unsupported(_)));
    }

    #[test]
    fn closure_takes_the_body_type() {
        let body = Expression::field(Type::signed(IntWidth::W32, false), 0, 2).unwrap();
        let closure = Expression::closure(body).unwrap();
        assert!(closure.ty.same(&Type::signed(IntWidth::W32, false)));
    }

    #[test]
    fn rendering_parenthesizes_operations() {
        let lhs = Expression::field(Type::signed(IntWidth::W32, false), 0, 2).unwrap();
        let rhs = Expression::literal(Type::signed(IntWidth::W32, false), "10");
        let cmp = Expression::binary(Type::boolean(false), BinaryOp::Lt, lhs, rhs);
        let not = Expression::unary(Type::boolean(false), UnaryOp::Not, cmp);
        let closure = Expression::closure(not).unwrap();
        assert_eq!(closure.to_rust(), "|t| (!(t.0 < 10))");
    }
}
