//! Binary that runs every registered scenario under the default config and
//! prints deterministic output lines for cross-process verification.
//!
//! Usage: `scenario_fixture`
//! Output: two lines per scenario, each `key=value`:
//!   `<id>.report_digest`=sha256:...
//!   `<id>.state_digest`=sha256:...
//!
//! Logs go to stderr, filtered by `RUST_LOG` (default `warn`), so stdout
//! carries only the digests.

use gauntlet_harness::config::HarnessConfig;
use gauntlet_harness::scenarios::ScenarioId;
use tracing_subscriber::EnvFilter;

fn main() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let config = HarnessConfig::default();
    for id in ScenarioId::ALL {
        let report = id
            .run(&config)
            .unwrap_or_else(|e| panic!("scenario {id} failed: {e}"));
        println!("{id}.report_digest={}", report.digest.as_str());
        println!("{id}.state_digest={}", report.state_digest.as_str());
    }
}
