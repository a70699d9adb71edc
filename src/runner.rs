use std::path::Path;

use cucumber::World as _;
use tracing_subscriber::{EnvFilter, fmt};

use crate::world::LedgerWorld;

pub const FEATURES_PATH: &str = "features";

pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = fmt().with_env_filter(filter).with_target(true).try_init();
}

/// Runs every feature under `features` and exits non-zero if any step failed or was skipped.
pub async fn run(features: &Path) {
    LedgerWorld::cucumber()
        .max_concurrent_scenarios(Some(1))
        .fail_on_skipped()
        .run_and_exit(features)
        .await;
}
