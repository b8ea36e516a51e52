//! End-to-end scenarios: SQL text through the front end and the circuit
//! compiler, with assertions on the circuit shape and the emitted driver.

use zetaflow_ir::{Circuit, OperatorKind};
use zetaflow_plan::{PlanError, SqlFrontend};

const DDL: &str = "CREATE TABLE T (COL1 INT, COL2 FLOAT, COL3 BOOLEAN)";

fn frontend(statements: &[&str]) -> SqlFrontend {
    let mut frontend = SqlFrontend::new();
    for statement in statements {
        frontend.compile(statement).unwrap();
    }
    frontend
}

fn circuit_for(statements: &[&str]) -> Circuit {
    zetaflow_ir::compile(frontend(statements).program()).unwrap()
}

fn internal_operations(circuit: &Circuit) -> Vec<&'static str> {
    circuit
        .internal_operators()
        .map(|op| op.operation())
        .collect()
}

#[test]
fn schema_only_program_has_no_sinks() {
    let circuit = circuit_for(&[DDL]);
    assert_eq!(circuit.sources().count(), 1);
    assert_eq!(circuit.sinks().count(), 0);
    assert_eq!(circuit.internal_operators().count(), 0);

    let source = circuit.sources().next().unwrap();
    assert_eq!(source.name, "T");
    assert_eq!(
        source.output.to_rust(),
        "ZSetHashMap<(i32, f32, bool), Weight>"
    );
}

#[test]
fn projection_lowers_to_project_then_distinct() {
    let circuit = circuit_for(&[DDL, "CREATE VIEW V AS SELECT T.COL3 FROM T"]);
    assert_eq!(circuit.sources().count(), 1);
    assert_eq!(circuit.sinks().count(), 1);
    assert_eq!(internal_operations(&circuit), vec!["map_keys", "distinct"]);

    let sink = circuit.sinks().next().unwrap();
    assert_eq!(sink.name, "V");
    assert_eq!(sink.output.to_rust(), "ZSetHashMap<bool, Weight>");
    let last = circuit.operator(sink.inputs[0]).unwrap();
    assert!(matches!(last.kind, OperatorKind::Distinct));

    let text = circuit.to_rust();
    assert!(text.contains(
        "fn circuit_generator() -> impl FnMut(ZSetHashMap<(i32, f32, bool), Weight>) -> ZSetHashMap<bool, Weight> {"
    ));
    assert!(text.contains("let T = circuit.add_source(T);"));
    assert!(text.contains(".map_keys(|t| (t.2));"));
    assert!(text.contains(".distinct();"));
    assert!(text.contains(".inspect(move |m| { *V.borrow_mut() = m.clone() });"));
    assert!(text.contains("return V_external.borrow().clone();"));
}

#[test]
fn union_all_is_a_bare_sum() {
    let circuit = circuit_for(&[
        DDL,
        "CREATE VIEW V AS (SELECT * FROM T) UNION ALL (SELECT * FROM T)",
    ]);
    assert_eq!(internal_operations(&circuit), vec!["sum"]);

    let sum = circuit.internal_operators().next().unwrap();
    let source = circuit.sources().next().unwrap();
    assert_eq!(sum.inputs, vec![source.meta.id, source.meta.id]);

    let text = circuit.to_rust();
    assert!(text.contains("T.sum(&[T]);"));
    assert!(!text.contains(".distinct()"));
}

#[test]
fn plain_union_restores_set_semantics() {
    let circuit = circuit_for(&[
        DDL,
        "CREATE VIEW V AS (SELECT * FROM T) UNION (SELECT * FROM T)",
    ]);
    assert_eq!(internal_operations(&circuit), vec!["sum", "distinct"]);

    let sink = circuit.sinks().next().unwrap();
    let last = circuit.operator(sink.inputs[0]).unwrap();
    assert!(matches!(last.kind, OperatorKind::Distinct));
}

#[test]
fn where_lowers_to_a_filter_closure() {
    let circuit = circuit_for(&[DDL, "CREATE VIEW V AS SELECT * FROM T WHERE COL3"]);
    assert_eq!(internal_operations(&circuit), vec!["filter_keys"]);

    let filter = circuit.internal_operators().next().unwrap();
    assert_eq!(filter.function_text().unwrap(), "|t| t.2");
    assert_eq!(
        filter.output.to_rust(),
        "ZSetHashMap<(i32, f32, bool), Weight>"
    );

    let text = circuit.to_rust();
    assert!(text.contains(".filter_keys(|t| t.2);"));
}

#[test]
fn except_negates_the_subtrahend() {
    let circuit = circuit_for(&[
        DDL,
        "CREATE VIEW V AS SELECT * FROM T EXCEPT (SELECT * FROM T WHERE COL3)",
    ]);
    assert_eq!(
        internal_operations(&circuit),
        vec!["filter_keys", "neg", "sum", "distinct"]
    );
    // Both branches read the same source.
    assert_eq!(circuit.sources().count(), 1);

    let sum = circuit
        .internal_operators()
        .find(|op| matches!(op.kind, OperatorKind::Sum))
        .unwrap();
    assert_eq!(sum.inputs.len(), 2);
    let source = circuit.sources().next().unwrap();
    assert_eq!(sum.inputs[0], source.meta.id);
    let negated = circuit.operator(sum.inputs[1]).unwrap();
    assert!(matches!(negated.kind, OperatorKind::Negate));

    let text = circuit.to_rust();
    assert!(text.contains(".neg();"));
    assert!(text.contains(".sum(&["));
}

#[test]
fn order_by_fails_before_any_circuit_exists() {
    let mut frontend = SqlFrontend::new();
    frontend.compile(DDL).unwrap();
    let err = frontend
        .compile("CREATE VIEW V AS SELECT * FROM T ORDER BY COL1")
        .unwrap_err();
    match err {
        PlanError::Unsupported(msg) => assert_eq!(msg, "ORDER BY"),
        other => panic!("expected Unsupported, got {other:?}"),
    }
    assert!(frontend.program().views.is_empty());

    let circuit = zetaflow_ir::compile(frontend.program()).unwrap();
    assert_eq!(circuit.sinks().count(), 0);
}

#[test]
fn computed_projection_is_rejected_by_lowering() {
    let frontend = frontend(&[DDL, "CREATE VIEW V AS SELECT COL1 + 1 FROM T"]);
    let err = zetaflow_ir::compile(frontend.program()).unwrap_err();
    assert!(matches!(err, zetaflow_ir::IrError::Unimplemented(_)));
}

#[test]
fn intersect_plans_but_does_not_lower() {
    let frontend = frontend(&[
        DDL,
        "CREATE VIEW V AS (SELECT * FROM T) INTERSECT (SELECT * FROM T)",
    ]);
    let err = zetaflow_ir::compile(frontend.program()).unwrap_err();
    assert!(matches!(err, zetaflow_ir::IrError::Unimplemented(_)));
}

#[test]
fn binding_names_are_unique_and_lists_partition_the_circuit() {
    let circuit = circuit_for(&[
        DDL,
        "CREATE VIEW V AS SELECT * FROM T EXCEPT (SELECT * FROM T WHERE COL3)",
    ]);
    let mut names: Vec<&str> = circuit.sources().map(|op| op.name.as_str()).collect();
    names.extend(circuit.internal_operators().map(|op| op.name.as_str()));
    names.extend(circuit.sinks().map(|op| op.name.as_str()));
    assert_eq!(names.len(), circuit.len());

    let mut deduped = names.clone();
    deduped.sort_unstable();
    deduped.dedup();
    assert_eq!(deduped.len(), names.len());
}

#[test]
fn driver_signature_follows_registration_order() {
    let circuit = circuit_for(&[
        "CREATE TABLE A (COL1 INT)",
        "CREATE TABLE B (COL1 BOOLEAN)",
        "CREATE VIEW VA AS SELECT * FROM A",
        "CREATE VIEW VB AS SELECT * FROM B",
    ]);
    let text = circuit.to_rust();
    // Inputs in table order, outputs in view order.
    assert!(text.contains(
        "fn circuit_generator() -> impl FnMut(ZSetHashMap<i32, Weight>,ZSetHashMap<bool, Weight>) -> (ZSetHashMap<i32, Weight>, ZSetHashMap<bool, Weight>) {"
    ));
    assert!(text.contains("return move |A, B| {"));
    let a = text.find("*A_external.borrow_mut() = A;").unwrap();
    let b = text.find("*B_external.borrow_mut() = B;").unwrap();
    assert!(a < b);
    assert!(text
        .contains("return (VA_external.borrow().clone(), VB_external.borrow().clone());"));
}

#[test]
fn emitted_preamble_names_the_host_items() {
    let circuit = circuit_for(&[DDL, "CREATE VIEW V AS SELECT T.COL3 FROM T"]);
    let text = circuit.to_rust();
    for item in [
        "FiniteMap",
        "HasZero",
        "ZSetHashMap",
        "Root",
        "Runtime",
        "Stream",
        "CsvSource",
        "DelayedFeedback",
        "ordered_float::OrderedFloat",
        "type Weight = isize;",
    ] {
        assert!(text.contains(item), "preamble is missing {item}");
    }
    assert!(text.contains("let root = Root::build(|circuit| {"));
    assert!(text.contains("root.step().unwrap();"));
}
