//! Env-driven tracing setup: `RUST_LOG` wins when set, otherwise the
//! `--log-level` flag's value is the default directive. Output is
//! human-readable text on stderr, matching every other binary in the
//! workspace's test output.

pub fn install(default_level: &str) {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();
}
