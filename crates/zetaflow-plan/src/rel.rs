//! Relational algebra trees and scalar expressions.
//!
//! This is the validated plan language the circuit compiler consumes. The
//! node-kind set is deliberately wider than what lowering handles (Intersect
//! has no lowering), so "recognized but unimplemented" failures stay honest.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU32, Ordering};

use crate::types::{RowType, SqlType};

static NEXT_REL_ID: AtomicU32 = AtomicU32::new(0);

/// Identity of a relational node, used by the circuit compiler to key its
/// node-to-operator map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RelId(u32);

impl RelId {
    fn fresh() -> Self {
        Self(NEXT_REL_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for RelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A node of a validated relational tree.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelNode {
    pub id: RelId,
    pub row_type: RowType,
    pub kind: RelKind,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum RelKind {
    TableScan {
        table: String,
    },
    Project {
        input: Box<RelNode>,
        exprs: Vec<RexNode>,
    },
    Filter {
        input: Box<RelNode>,
        predicate: RexNode,
    },
    Union {
        inputs: Vec<RelNode>,
        all: bool,
    },
    Minus {
        inputs: Vec<RelNode>,
        all: bool,
    },
    Intersect {
        inputs: Vec<RelNode>,
        all: bool,
    },
}

impl RelNode {
    fn new(row_type: RowType, kind: RelKind) -> Self {
        Self {
            id: RelId::fresh(),
            row_type,
            kind,
        }
    }

    pub fn scan(row_type: RowType, table: impl Into<String>) -> Self {
        Self::new(
            row_type,
            RelKind::TableScan {
                table: table.into(),
            },
        )
    }

    pub fn project(row_type: RowType, input: RelNode, exprs: Vec<RexNode>) -> Self {
        Self::new(
            row_type,
            RelKind::Project {
                input: Box::new(input),
                exprs,
            },
        )
    }

    pub fn filter(row_type: RowType, input: RelNode, predicate: RexNode) -> Self {
        Self::new(
            row_type,
            RelKind::Filter {
                input: Box::new(input),
                predicate,
            },
        )
    }

    pub fn union(row_type: RowType, inputs: Vec<RelNode>, all: bool) -> Self {
        Self::new(row_type, RelKind::Union { inputs, all })
    }

    pub fn minus(row_type: RowType, inputs: Vec<RelNode>, all: bool) -> Self {
        Self::new(row_type, RelKind::Minus { inputs, all })
    }

    pub fn intersect(row_type: RowType, inputs: Vec<RelNode>, all: bool) -> Self {
        Self::new(row_type, RelKind::Intersect { inputs, all })
    }

    /// Children in operand order.
    pub fn inputs(&self) -> Vec<&RelNode> {
        match &self.kind {
            RelKind::TableScan { .. } => Vec::new(),
            RelKind::Project { input, .. } | RelKind::Filter { input, .. } => vec![input],
            RelKind::Union { inputs, .. }
            | RelKind::Minus { inputs, .. }
            | RelKind::Intersect { inputs, .. } => inputs.iter().collect(),
        }
    }
}

impl fmt::Display for RelNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match &self.kind {
            RelKind::TableScan { table } => return write!(f, "TableScan({table}){}", self.id),
            RelKind::Project { .. } => "Project",
            RelKind::Filter { .. } => "Filter",
            RelKind::Union { .. } => "Union",
            RelKind::Minus { .. } => "Minus",
            RelKind::Intersect { .. } => "Intersect",
        };
        write!(f, "{label}{}[{} inputs]", self.id, self.inputs().len())
    }
}

/// A scalar expression over the columns of its input row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RexNode {
    pub ty: SqlType,
    pub kind: RexKind,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum RexKind {
    /// Reference to a column of the input row, by position.
    InputRef { index: usize },
    /// A constant, kept in printed form.
    Literal { value: String },
    /// An operator application.
    Call {
        op: CallKind,
        operands: Vec<RexNode>,
    },
}

impl RexNode {
    pub fn input_ref(ty: SqlType, index: usize) -> Self {
        Self {
            ty,
            kind: RexKind::InputRef { index },
        }
    }

    pub fn literal(ty: SqlType, value: impl Into<String>) -> Self {
        Self {
            ty,
            kind: RexKind::Literal {
                value: value.into(),
            },
        }
    }

    pub fn call(ty: SqlType, op: CallKind, operands: Vec<RexNode>) -> Self {
        Self {
            ty,
            kind: RexKind::Call { op, operands },
        }
    }
}

impl fmt::Display for RexNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            RexKind::InputRef { index } => write!(f, "${index}"),
            RexKind::Literal { value } => write!(f, "{value}"),
            RexKind::Call { op, operands } => {
                write!(f, "{op:?}(")?;
                for (i, operand) in operands.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{operand}")?;
                }
                write!(f, ")")
            }
        }
    }
}

/// Operator kinds a call can carry, mirroring the SQL surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CallKind {
    Times,
    Divide,
    Mod,
    Plus,
    Minus,
    LessThan,
    GreaterThan,
    LessThanOrEqual,
    GreaterThanOrEqual,
    Equals,
    NotEquals,
    And,
    Or,
    Dot,
    Not,
    IsFalse,
    IsNotTrue,
    PlusPrefix,
    MinusPrefix,
    IsTrue,
    IsNotFalse,
    IsNull,
    IsNotNull,
    Cast,
    Floor,
    Ceil,
    BitAnd,
    BitOr,
    BitXor,
}
