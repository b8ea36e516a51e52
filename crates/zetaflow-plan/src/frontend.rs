//! Statement-at-a-time SQL front end.
//!
//! Wraps parsing, DDL simulation, and planning behind a single `compile`
//! entry point. Given a complete sequence of DDL statements it accumulates a
//! [`Program`] the circuit compiler can consume.

use sqlparser::dialect::GenericDialect;
use sqlparser::parser::Parser;
use tracing::{debug, trace};

use crate::catalog::{Catalog, Program, ViewDef};
use crate::ddl::{DdlSimulator, SimulatorResult};
use crate::error::PlanError;
use crate::planner::Planner;

pub struct SqlFrontend {
    catalog: Catalog,
    program: Program,
}

impl SqlFrontend {
    pub fn new() -> Self {
        Self {
            catalog: Catalog::new("schema"),
            program: Program::default(),
        }
    }

    /// Compiles one SQL statement.
    ///
    /// CREATE TABLE updates the catalog; CREATE VIEW plans and validates the
    /// view query. Every other statement is rejected. A failed statement
    /// leaves the accumulated program as it was before the call.
    pub fn compile(&mut self, sql: &str) -> Result<(), PlanError> {
        let mut statements = Parser::parse_sql(&GenericDialect {}, sql)?;
        if statements.len() != 1 {
            return Err(PlanError::Unsupported(format!(
                "expected a single statement, found {}",
                statements.len()
            )));
        }
        let statement = statements.remove(0);

        match DdlSimulator::new(&mut self.catalog).execute(&statement)? {
            SimulatorResult::Table(table) => {
                debug!(table = %table.name, columns = table.columns.len(), "registered table");
                self.program.tables.push(table);
            }
            SimulatorResult::View(decl) => {
                let rel = Planner::new(&self.catalog).plan(&decl.query)?;
                trace!(view = %decl.name, plan = %rel, "planned view");
                let row_type = rel.row_type.clone();
                self.program.views.push(ViewDef {
                    name: decl.name,
                    rel,
                    row_type,
                });
            }
        }
        Ok(())
    }

    pub fn program(&self) -> &Program {
        &self.program
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }
}

impl Default for SqlFrontend {
    fn default() -> Self {
        Self::new()
    }
}
