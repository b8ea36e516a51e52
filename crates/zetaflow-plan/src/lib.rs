//! SQL front end for the zetaflow compiler.
//!
//! Turns a stream of SQL DDL statements into a validated [`Program`]: an
//! in-memory catalog of tables plus one planned relational tree per view.
//! The circuit compiler (`zetaflow-ir`) consumes the program and never sees
//! SQL text.
//!
//! The pipeline is statement-at-a-time:
//! 1. parse (`sqlparser`, generic dialect)
//! 2. simulate DDL against the [`Catalog`]
//! 3. for CREATE VIEW, plan and validate the query ([`Planner`])

pub mod catalog;
pub mod ddl;
pub mod error;
pub mod frontend;
pub mod planner;
pub mod rel;
pub mod types;

pub use catalog::{Catalog, ColumnInfo, Program, TableDef, ViewDef};
pub use ddl::{DdlSimulator, SimulatorResult, ViewDecl};
pub use error::PlanError;
pub use frontend::SqlFrontend;
pub use planner::Planner;
pub use rel::{CallKind, RelId, RelKind, RelNode, RexKind, RexNode};
pub use types::{RelField, RowType, SqlType, SqlTypeKind};
