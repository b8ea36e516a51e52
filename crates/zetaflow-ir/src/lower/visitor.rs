//! Relational trees to circuits.
//!
//! The compiler runs a post-order walk over each view's relational tree,
//! synthesizing operators bottom-up and wiring them through a node-to-
//! operator map. A compilation unit either lowers entirely or fails fast;
//! after a failure the partially built circuit must be discarded.

use std::collections::HashMap;
use tracing::{debug, trace};

use zetaflow_plan::{Program, RelId, RelKind, RelNode, RexKind, RexNode, TableDef, ViewDef};

use crate::circuit::Circuit;
use crate::error::IrError;
use crate::lower::expr::ExpressionCompiler;
use crate::lower::types::TypeCompiler;
use crate::node::{NodeId, Origin};
use crate::op::Operator;
use crate::types::Type;

/// Path step used for diagnostics while the walk is in flight.
#[derive(Debug)]
struct Frame {
    parent: Option<RelId>,
    ordinal: usize,
}

pub struct CircuitCompiler {
    circuit: Circuit,
    stack: Vec<Frame>,
    node_operators: HashMap<RelId, NodeId>,
    types: TypeCompiler,
}

impl CircuitCompiler {
    pub fn new() -> Self {
        Self::with_name("circuit")
    }

    pub fn with_name(name: impl Into<String>) -> Self {
        Self {
            circuit: Circuit::new(name),
            stack: Vec::new(),
            node_operators: HashMap::new(),
            types: TypeCompiler::new(),
        }
    }

    /// Compiles a whole program: one source per table, then per view a sink,
    /// the lowered tree, and the connecting edge.
    pub fn compile(mut self, program: &Program) -> Result<Circuit, IrError> {
        for table in &program.tables {
            self.create_input(table)?;
        }
        for view in &program.views {
            let sink = self.create_output(view)?;
            self.visit(&view.rel, 0, None)?;
            let result = self.operator_for(view.rel.id)?;
            self.circuit.connect(sink, result)?;
        }
        Ok(self.circuit)
    }

    fn create_input(&mut self, table: &TableDef) -> Result<NodeId, IrError> {
        let mut fields = Vec::with_capacity(table.columns.len());
        for column in &table.columns {
            fields.push(self.types.convert(&column.ty)?);
        }
        let element = Type::tuple(fields);
        let source = Operator::source(Type::zset(element), &table.name)
            .with_origin(Origin::of(&table.name));
        self.circuit.add_operator(source)
    }

    fn create_output(&mut self, view: &ViewDef) -> Result<NodeId, IrError> {
        let element = self.types.convert_row(&view.row_type)?;
        let sink =
            Operator::sink(Type::zset(element), &view.name).with_origin(Origin::of(&view.name));
        self.circuit.add_operator(sink)
    }

    /// Post-order: children first, then the node itself.
    fn visit(
        &mut self,
        node: &RelNode,
        ordinal: usize,
        parent: Option<RelId>,
    ) -> Result<(), IrError> {
        self.stack.push(Frame { parent, ordinal });
        trace!(node = %node, "visiting");
        for (i, child) in node.inputs().into_iter().enumerate() {
            self.visit(child, i, Some(node.id))?;
        }
        debug!(node = %node, "processing");
        match &node.kind {
            RelKind::TableScan { table } => self.visit_scan(node, table)?,
            RelKind::Project { input, exprs } => self.visit_project(node, input, exprs)?,
            RelKind::Union { inputs, all } => self.visit_union(node, inputs, *all)?,
            RelKind::Minus { inputs, all } => self.visit_minus(node, inputs, *all)?,
            RelKind::Filter { input, predicate } => self.visit_filter(node, input, predicate)?,
            _ => {
                return Err(IrError::Unimplemented(format!(
                    "relational node: {node} (at {})",
                    self.path()
                )));
            }
        }
        self.stack.pop();
        Ok(())
    }

    /// The walk's current path, for diagnostics.
    fn path(&self) -> String {
        self.stack
            .iter()
            .map(|frame| match frame.parent {
                Some(parent) => format!("{parent}.{}", frame.ordinal),
                None => "root".to_string(),
            })
            .collect::<Vec<_>>()
            .join("/")
    }

    /// Registers `op` as the lowering of `rel`. Each relational node lowers
    /// exactly once.
    fn assign(&mut self, rel: RelId, op: NodeId) -> Result<(), IrError> {
        if self.node_operators.insert(rel, op).is_some() {
            return Err(IrError::Invariant(format!(
                "relational node {rel} was lowered twice"
            )));
        }
        Ok(())
    }

    fn operator_for(&self, rel: RelId) -> Result<NodeId, IrError> {
        self.node_operators
            .get(&rel)
            .copied()
            .ok_or_else(|| IrError::Invariant(format!("no operator for relational node {rel}")))
    }

    fn visit_scan(&mut self, node: &RelNode, table: &str) -> Result<(), IrError> {
        let source = self.circuit.endpoint(table).ok_or_else(|| {
            IrError::Invariant(format!("no source registered for table '{table}'"))
        })?;
        self.assign(node.id, source)
    }

    /// Projections accept only bare column references; the projection pipes
    /// through a distinct to restore set semantics.
    fn visit_project(
        &mut self,
        node: &RelNode,
        input: &RelNode,
        exprs: &[RexNode],
    ) -> Result<(), IrError> {
        let input_op = self.operator_for(input.id)?;
        let element = self.types.convert_row(&node.row_type)?;

        let mut columns = Vec::with_capacity(exprs.len());
        for expr in exprs {
            let RexKind::InputRef { index } = &expr.kind else {
                return Err(IrError::Unimplemented(format!(
                    "projection of a computed expression: {expr}"
                )));
            };
            columns.push(*index);
        }

        let mut project =
            Operator::project(columns, element.clone()).with_origin(Origin::of(node));
        project.add_input(input_op);
        let project = self.circuit.add_operator(project)?;

        let mut distinct = Operator::distinct(element).with_origin(Origin::of(node));
        distinct.add_input(project);
        let distinct = self.circuit.add_operator(distinct)?;
        self.assign(node.id, distinct)
    }

    fn visit_union(&mut self, node: &RelNode, inputs: &[RelNode], all: bool) -> Result<(), IrError> {
        let element = self.types.convert_row(&node.row_type)?;
        let mut sum = Operator::sum(element.clone()).with_origin(Origin::of(node));
        for input in inputs {
            sum.add_input(self.operator_for(input.id)?);
        }
        let sum = self.circuit.add_operator(sum)?;

        if all {
            self.assign(node.id, sum)
        } else {
            let mut distinct = Operator::distinct(element).with_origin(Origin::of(node));
            distinct.add_input(sum);
            let distinct = self.circuit.add_operator(distinct)?;
            self.assign(node.id, distinct)
        }
    }

    /// Difference by weights: the first input enters the sum unchanged and
    /// every later input is negated first.
    fn visit_minus(&mut self, node: &RelNode, inputs: &[RelNode], all: bool) -> Result<(), IrError> {
        let element = self.types.convert_row(&node.row_type)?;
        let mut sum = Operator::sum(element.clone()).with_origin(Origin::of(node));
        for (i, input) in inputs.iter().enumerate() {
            let input_op = self.operator_for(input.id)?;
            if i == 0 {
                sum.add_input(input_op);
            } else {
                let mut negate = Operator::negate(element.clone()).with_origin(Origin::of(node));
                negate.add_input(input_op);
                let negate = self.circuit.add_operator(negate)?;
                sum.add_input(negate);
            }
        }
        let sum = self.circuit.add_operator(sum)?;

        if all {
            self.assign(node.id, sum)
        } else {
            let mut distinct = Operator::distinct(element).with_origin(Origin::of(node));
            distinct.add_input(sum);
            let distinct = self.circuit.add_operator(distinct)?;
            self.assign(node.id, distinct)
        }
    }

    fn visit_filter(
        &mut self,
        node: &RelNode,
        input: &RelNode,
        predicate: &RexNode,
    ) -> Result<(), IrError> {
        let element = self.types.convert_row(&node.row_type)?;
        let condition = ExpressionCompiler::new(node.row_type.arity()).compile(predicate)?;
        let mut filter =
            Operator::filter(condition, element).with_origin(Origin::of(node));
        filter.add_input(self.operator_for(input.id)?);
        let filter = self.circuit.add_operator(filter)?;
        self.assign(node.id, filter)
    }
}

impl Default for CircuitCompiler {
    fn default() -> Self {
        Self::new()
    }
}
