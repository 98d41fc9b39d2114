pub mod fake_notifier;
pub mod recording_sink;

use std::sync::Once;
use std::time::Duration;

use tracing_subscriber::{EnvFilter, fmt};

pub use fake_notifier::{FakeNotifier, FakeStreamControl};
pub use recording_sink::{Recorder, RecordingSink};

static INIT: Once = Once::new();

/// Install a per-test log writer once per test binary.
///
/// Output is captured and only shown for failing tests (or with
/// `-- --nocapture`). `RUST_LOG` overrides the default of `warn` for
/// dependencies and `debug` for the monitor, e.g.
/// `RUST_LOG=contentmon::engine=trace cargo test`.
pub fn init_tracing() {
    INIT.call_once(|| {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new("warn,contentmon=debug"));

        let _ = fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .with_thread_names(true)
            .try_init();
    });
}

/// Await `f`, failing the test if it takes longer than five seconds.
pub async fn with_timeout<F, T>(f: F) -> T
where
    F: std::future::Future<Output = T>,
{
    tokio::time::timeout(Duration::from_secs(5), f)
        .await
        .expect("timed out waiting for the monitor")
}
