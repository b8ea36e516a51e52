//! Dataflow circuit IR and SQL-plan lowering.
//!
//! This crate turns the validated [`Program`](zetaflow_plan::Program) built
//! by `zetaflow-plan` into an executable incremental-dataflow circuit: a
//! typed DAG of operators over Z-set streams, serialized as source text for
//! the downstream dataflow host.
//!
//! Four pieces cooperate:
//! - the type lattice ([`types`]) mapping SQL column types onto dataflow
//!   types, with a nullability bit that lifts any base type into an
//!   `Option`-carrying variant;
//! - the expression IR ([`expr`]) evaluated inside operators, always rooted
//!   in a closure over the implicit row variable `t`;
//! - the operator IR and circuit graph ([`op`], [`circuit`]);
//! - the lowering visitor ([`lower`]) walking relational trees bottom-up
//!   and enforcing multiset vs. set semantics.
//!
//! ```no_run
//! use zetaflow_plan::SqlFrontend;
//!
//! let mut frontend = SqlFrontend::new();
//! frontend.compile("CREATE TABLE T (COL1 INT, COL2 FLOAT, COL3 BOOLEAN)")?;
//! frontend.compile("CREATE VIEW V AS SELECT T.COL3 FROM T")?;
//! let circuit = zetaflow_ir::compile(frontend.program())?;
//! println!("{}", circuit.to_rust());
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod circuit;
pub mod error;
pub mod expr;
pub mod lower;
pub mod node;
pub mod op;
pub mod printer;
pub mod types;

pub use circuit::Circuit;
pub use error::IrError;
pub use expr::{BinaryOp, ExprKind, Expression, UnaryOp};
pub use lower::{CircuitCompiler, ExpressionCompiler, TypeCompiler};
pub use node::{NameGen, NodeId, NodeMeta, Origin};
pub use op::{Operator, OperatorKind};
pub use printer::Printer;
pub use types::{IntWidth, Type, TypeKind, WEIGHT_NAME, ZSET_NAME};

use zetaflow_plan::Program;

/// Compiles a program into a circuit named `circuit`.
pub fn compile(program: &Program) -> Result<Circuit, IrError> {
    CircuitCompiler::new().compile(program)
}
