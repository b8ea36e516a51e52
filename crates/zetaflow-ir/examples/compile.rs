//! Compiles a small schema and view, printing the emitted circuit.
//!
//! Run with: cargo run -p zetaflow-ir --example compile
//! Set RUST_LOG=zetaflow_ir=debug to watch the lowering walk.

use tracing_subscriber::EnvFilter;
use zetaflow_plan::SqlFrontend;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let mut frontend = SqlFrontend::new();
    frontend.compile("CREATE TABLE T (COL1 INT, COL2 FLOAT, COL3 BOOLEAN)")?;
    frontend.compile("CREATE VIEW V AS SELECT * FROM T WHERE COL3")?;
    frontend.compile("CREATE VIEW W AS SELECT T.COL1 FROM T")?;

    let circuit = zetaflow_ir::compile(frontend.program())?;
    println!("{circuit}");
    Ok(())
}
