//! The circuit graph and its textual emission.
//!
//! A circuit owns its operators in an insertion-ordered arena keyed by node
//! id; edges between operators are ids. Sources, sinks, and internal
//! operators are kept in separate ordered lists: the driver's argument order
//! is the source registration order and its output order is the sink
//! registration order, while internal operators emit in insertion order.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::fmt;

use crate::error::IrError;
use crate::node::{NodeId, NodeMeta};
use crate::op::{Operator, OperatorKind};
use crate::printer::Printer;
use crate::types::Type;

/// Imports and aliases every emitted circuit needs from the dataflow host.
const RUST_PREAMBLE: &str = r#"use dbsp::{
    algebra::{FiniteMap, HasZero, ZSetHashMap},
    circuit::{Root, Runtime, Stream},
    operator::{CsvSource, DelayedFeedback},
};
use ordered_float::OrderedFloat;
type Weight = isize;
"#;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Circuit {
    pub meta: NodeMeta,
    name: String,
    operators: IndexMap<NodeId, Operator>,
    sources: Vec<NodeId>,
    sinks: Vec<NodeId>,
    internal: Vec<NodeId>,
    endpoints: HashMap<String, NodeId>,
}

impl Circuit {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            meta: NodeMeta::default(),
            name: name.into(),
            operators: IndexMap::new(),
            sources: Vec::new(),
            sinks: Vec::new(),
            internal: Vec::new(),
            endpoints: HashMap::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Adds an operator, routing it to the matching list. Binding names must
    /// be unique across the circuit, and endpoint names must not repeat.
    pub fn add_operator(&mut self, operator: Operator) -> Result<NodeId, IrError> {
        let id = operator.meta.id;
        if self.operators.contains_key(&id) {
            return Err(IrError::Invariant(format!(
                "operator {id} is already part of the circuit"
            )));
        }
        if self.operators.values().any(|op| op.name == operator.name) {
            return Err(IrError::Invariant(format!(
                "output binding name '{}' is already in use",
                operator.name
            )));
        }
        match operator.kind {
            OperatorKind::Source | OperatorKind::Sink => {
                if self.endpoints.contains_key(&operator.name) {
                    return Err(IrError::Invariant(format!(
                        "endpoint '{}' is already registered",
                        operator.name
                    )));
                }
                self.endpoints.insert(operator.name.clone(), id);
                if operator.is_source() {
                    self.sources.push(id);
                } else {
                    self.sinks.push(id);
                }
            }
            _ => self.internal.push(id),
        }
        self.operators.insert(id, operator);
        Ok(id)
    }

    /// Appends `input` to `target`'s input list.
    pub fn connect(&mut self, target: NodeId, input: NodeId) -> Result<(), IrError> {
        if !self.operators.contains_key(&input) {
            return Err(IrError::Invariant(format!(
                "input operator {input} is not part of the circuit"
            )));
        }
        let target = self
            .operators
            .get_mut(&target)
            .ok_or_else(|| IrError::Invariant(format!("no operator {target} in the circuit")))?;
        target.add_input(input);
        Ok(())
    }

    pub fn operator(&self, id: NodeId) -> Result<&Operator, IrError> {
        self.operators
            .get(&id)
            .ok_or_else(|| IrError::Invariant(format!("no operator {id} in the circuit")))
    }

    /// The source or sink registered under `name`, if any.
    pub fn endpoint(&self, name: &str) -> Option<NodeId> {
        self.endpoints.get(name).copied()
    }

    pub fn sources(&self) -> impl Iterator<Item = &Operator> {
        self.sources.iter().map(|id| &self.operators[id])
    }

    pub fn sinks(&self) -> impl Iterator<Item = &Operator> {
        self.sinks.iter().map(|id| &self.operators[id])
    }

    pub fn internal_operators(&self) -> impl Iterator<Item = &Operator> {
        self.internal.iter().map(|id| &self.operators[id])
    }

    pub fn len(&self) -> usize {
        self.operators.len()
    }

    pub fn is_empty(&self) -> bool {
        self.operators.is_empty()
    }

    /// SHA-256 digest of the serialized circuit, for caching and provenance.
    pub fn fingerprint(&self) -> String {
        let json = serde_json::to_string(self).expect("circuit should always serialize");
        let mut hasher = Sha256::new();
        hasher.update(json.as_bytes());
        format!("{:x}", hasher.finalize())
    }

    /// Emits the circuit as a generator function for the dataflow host:
    /// preamble, generator signature, one shared cell per endpoint, the
    /// circuit body, and the step-driver closure.
    pub fn to_rust(&self) -> String {
        let mut p = Printer::new();
        p.append(RUST_PREAMBLE).newline();

        p.append("fn ")
            .append(&self.name)
            .append("_generator")
            .append("() -> impl FnMut(");
        for (i, source) in self.sources().enumerate() {
            if i > 0 {
                p.append(",");
            }
            source.output.write(&mut p);
        }
        p.append(") -> ");
        let outputs = Type::tuple(self.sinks().map(|s| s.output.clone()).collect());
        outputs.write(&mut p);
        p.append(" {").increase();

        for source in self.sources() {
            self.write_cell(&mut p, source);
        }
        for sink in self.sinks() {
            self.write_cell(&mut p, sink);
        }

        p.append("let root = Root::build(|circuit| {").increase();
        for source in self.sources() {
            self.write_source(&mut p, source);
            p.newline();
        }
        for op in self.internal_operators() {
            self.write_operator(&mut p, op);
            p.newline();
        }
        for sink in self.sinks() {
            self.write_sink(&mut p, sink);
            p.newline();
        }
        p.decrease().append("})").append(".unwrap();").newline();

        let names: Vec<&str> = self.sources().map(|s| s.name.as_str()).collect();
        p.append("return move |")
            .append(&names.join(", "))
            .append("| {")
            .increase();
        for source in self.sources() {
            p.append("*")
                .append(&source.external_name())
                .append(".borrow_mut() = ")
                .append(&source.name)
                .append(";")
                .newline();
        }
        p.append("root.step().unwrap();").newline();
        p.append("return ");
        let sink_count = self.sinks.len();
        if sink_count > 1 {
            p.append("(");
        }
        let reads: Vec<String> = self
            .sinks()
            .map(|s| format!("{}.borrow().clone()", s.external_name()))
            .collect();
        p.append(&reads.join(", "));
        if sink_count > 1 {
            p.append(")");
        }
        p.append(";").newline().decrease().append("};").newline();
        p.decrease().append("}").newline();
        p.finish()
    }

    /// One shared mutable cell per endpoint: the circuit-side binding keeps
    /// the endpoint name, the driver side reads `<name>_external`. Sources
    /// additionally shadow the cell with a generator the circuit polls.
    fn write_cell(&self, p: &mut Printer, op: &Operator) {
        p.append("let ")
            .append(&op.name)
            .append(" = Rc::new(RefCell::<");
        op.output.write(p);
        p.append(">::new(Default::default()));").newline();
        p.append("let ")
            .append(&op.external_name())
            .append(" = ")
            .append(&op.name)
            .append(".clone();")
            .newline();
        if op.is_source() {
            p.append("let ")
                .append(&op.name)
                .append(" = Generator::new(move || ")
                .append(&op.name)
                .append(".borrow().clone());")
                .newline();
        }
    }

    fn write_source(&self, p: &mut Printer, op: &Operator) {
        p.append("let ")
            .append(&op.name)
            .append(" = circuit.add_source(")
            .append(&op.name)
            .append(");");
    }

    fn write_sink(&self, p: &mut Printer, op: &Operator) {
        let input = &self.operators[&op.inputs[0]];
        p.append(&input.name)
            .append(".")
            .append(op.operation())
            .append("(move |m| { *")
            .append(&op.name)
            .append(".borrow_mut() = m.clone() });");
    }

    fn write_operator(&self, p: &mut Printer, op: &Operator) {
        p.append("let ").append(&op.name).append(": ");
        Type::stream(op.output.clone()).write(p);
        p.append(" = ");
        if let Some(first) = op.inputs.first() {
            p.append(&self.operators[first].name).append(".");
        }
        p.append(op.operation()).append("(");
        // Sum is variadic: the trailing inputs travel in a bracketed slice.
        let variadic = matches!(op.kind, OperatorKind::Sum);
        if variadic {
            p.append("&[");
        }
        let extra = op.inputs.len().saturating_sub(1);
        for (i, input) in op.inputs.iter().skip(1).enumerate() {
            if i > 0 {
                p.append(",");
            }
            p.append(&self.operators[input].name);
        }
        if let Some(function) = op.function_text() {
            if extra > 0 {
                p.append(",");
            }
            p.append(&function);
        }
        if variadic {
            p.append("]");
        }
        p.append(");");
    }
}

impl fmt::Display for Circuit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_rust())
    }
}
