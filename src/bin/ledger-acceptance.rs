use std::path::PathBuf;

use anyhow::{Result, ensure};
use ledger_acceptance::runner::{FEATURES_PATH, init_tracing, run};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let features = PathBuf::from(
        std::env::args()
            .nth(1)
            .unwrap_or_else(|| FEATURES_PATH.to_owned()),
    );
    ensure!(
        features.exists(),
        "Features path `{}` does not exist",
        features.display()
    );

    init_tracing();
    run(&features).await;
    Ok(())
}
