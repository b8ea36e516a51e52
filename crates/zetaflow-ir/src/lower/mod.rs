//! Lowering from validated relational plans to circuits.
//!
//! Three cooperating pieces: [`TypeCompiler`] maps SQL type descriptors onto
//! the dataflow lattice, [`ExpressionCompiler`] turns scalar expressions
//! into row closures, and [`CircuitCompiler`] walks relational trees
//! bottom-up, synthesizing operators.

mod expr;
mod types;
mod visitor;

pub use expr::ExpressionCompiler;
pub use types::TypeCompiler;
pub use visitor::CircuitCompiler;
