//! Dataflow operators.
//!
//! An operator is one node of the circuit DAG: an operation tag, an optional
//! payload expression for its function slot, the element type of the stream
//! it produces, a unique output binding name, and the ids of its inputs.
//! Input order is significant: the first input is the pipeline carrier the
//! operation is invoked on, the rest are extra operands.

use serde::{Deserialize, Serialize};

use crate::expr::Expression;
use crate::node::{NameGen, NodeId, NodeMeta, Origin};
use crate::types::Type;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Operator {
    pub meta: NodeMeta,
    pub kind: OperatorKind,
    /// Expression rendered into the operation's function slot, if any.
    pub function: Option<Expression>,
    /// Element type of the produced stream, a Z-set for relational
    /// operators.
    pub output: Type,
    /// Output binding name; doubles as the endpoint name for sources and
    /// sinks.
    pub name: String,
    pub inputs: Vec<NodeId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum OperatorKind {
    /// Exposes an external input as a stream.
    Source,
    /// Terminal observer of its single input.
    Sink,
    /// Element-wise projection onto the given column positions; preserves
    /// weights.
    Project { columns: Vec<usize> },
    /// Keeps elements whose predicate holds; preserves weights.
    Filter,
    /// Multiset union of its inputs by weight addition.
    Sum,
    /// Negates every weight.
    Negate,
    /// Squashes positive weights to 1 and drops the rest.
    Distinct,
}

impl OperatorKind {
    /// Operation name the dataflow host exposes for this kind.
    pub fn operation(&self) -> &'static str {
        match self {
            OperatorKind::Source => "source",
            OperatorKind::Sink => "inspect",
            OperatorKind::Project { .. } => "map_keys",
            OperatorKind::Filter => "filter_keys",
            OperatorKind::Sum => "sum",
            OperatorKind::Negate => "neg",
            OperatorKind::Distinct => "distinct",
        }
    }
}

impl Operator {
    fn new(kind: OperatorKind, function: Option<Expression>, output: Type, name: String) -> Self {
        Self {
            meta: NodeMeta::default(),
            kind,
            function,
            output,
            name,
            inputs: Vec::new(),
        }
    }

    pub fn with_origin(mut self, origin: Origin) -> Self {
        self.meta.origin = origin;
        self
    }

    /// Overrides the generated output binding name.
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// A source endpoint. `output` is the full Z-set type of the input
    /// batches; `name` is the endpoint name the driver binds.
    pub fn source(output: Type, name: impl Into<String>) -> Self {
        Self::new(OperatorKind::Source, None, output, name.into())
    }

    /// A sink endpoint observing a view's result.
    pub fn sink(output: Type, name: impl Into<String>) -> Self {
        Self::new(OperatorKind::Sink, None, output, name.into())
    }

    pub fn project(columns: Vec<usize>, element: Type) -> Self {
        Self::new(
            OperatorKind::Project { columns },
            None,
            Type::zset(element),
            NameGen::fresh(),
        )
    }

    pub fn filter(predicate: Expression, element: Type) -> Self {
        Self::new(
            OperatorKind::Filter,
            Some(predicate),
            Type::zset(element),
            NameGen::fresh(),
        )
    }

    pub fn sum(element: Type) -> Self {
        Self::new(OperatorKind::Sum, None, Type::zset(element), NameGen::fresh())
    }

    pub fn negate(element: Type) -> Self {
        Self::new(
            OperatorKind::Negate,
            None,
            Type::zset(element),
            NameGen::fresh(),
        )
    }

    pub fn distinct(element: Type) -> Self {
        Self::new(
            OperatorKind::Distinct,
            None,
            Type::zset(element),
            NameGen::fresh(),
        )
    }

    /// Appends an input. The first input becomes the pipeline carrier.
    pub fn add_input(&mut self, input: NodeId) {
        self.inputs.push(input);
    }

    pub fn operation(&self) -> &'static str {
        self.kind.operation()
    }

    pub fn is_source(&self) -> bool {
        matches!(self.kind, OperatorKind::Source)
    }

    pub fn is_sink(&self) -> bool {
        matches!(self.kind, OperatorKind::Sink)
    }

    /// Driver-side handle of the shared cell backing a source or sink.
    pub fn external_name(&self) -> String {
        format!("{}_external", self.name)
    }

    /// The text placed in the operation's function slot, if any.
    pub fn function_text(&self) -> Option<String> {
        match &self.kind {
            OperatorKind::Project { columns } => {
                let fields: Vec<String> = columns.iter().map(|i| format!("t.{i}")).collect();
                Some(format!("|t| ({})", fields.join(", ")))
            }
            _ => self.function.as_ref().map(|f| f.to_rust()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::IntWidth;

    fn row() -> Type {
        Type::tuple(vec![
            Type::signed(IntWidth::W32, false),
            Type::boolean(false),
        ])
    }

    #[test]
    fn generated_names_are_unique() {
        let a = Operator::distinct(row());
        let b = Operator::distinct(row());
        assert_ne!(a.name, b.name);
    }

    #[test]
    fn project_renders_its_columns() {
        let op = Operator::project(vec![1, 0], row());
        assert_eq!(op.function_text().unwrap(), "|t| (t.1, t.0)");
        assert_eq!(op.operation(), "map_keys");
    }

    #[test]
    fn relational_operators_produce_zsets() {
        let op = Operator::sum(row());
        assert!(op.output.is_zset());
    }
}
