use std::path::Path;

use ledger_acceptance::runner::{init_tracing, run};

#[tokio::main(flavor = "current_thread")]
async fn main() {
    init_tracing();
    run(&Path::new(env!("CARGO_MANIFEST_DIR")).join("features")).await;
}
