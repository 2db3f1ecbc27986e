use snafu::{ResultExt, Snafu};
use tracing_subscriber::{
    EnvFilter, Registry, filter::LevelFilter, layer::SubscriberExt, util::SubscriberInitExt,
};

#[derive(Debug, Snafu)]
pub enum Error {
    #[snafu(display("failed to install the global tracing subscriber"))]
    InstallSubscriber {
        source: tracing_subscriber::util::TryInitError,
    },
}

/// Initializes `tracing` logging with options from the environment variable
/// given in the `env` parameter.
///
/// We force callers to provide a variable name so it can be different per
/// tool, e.g. `KURE_LOG`. If the variable is unset or invalid, the maximum log
/// level is set to INFO.
///
/// Returns an error instead of panicking if a global subscriber was already
/// installed, so it is safe to call from tests.
pub fn initialize_logging(env: &str) -> Result<(), Error> {
    let filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .with_env_var(env)
        .from_env_lossy();

    let fmt = tracing_subscriber::fmt::layer().with_target(true);

    Registry::default()
        .with(filter)
        .with(fmt)
        .try_init()
        .context(InstallSubscriberSnafu)?;

    tracing::debug!(env, "logging initialized");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_initialization_fails() {
        // Other tests in this binary may already have installed a subscriber,
        // so only the second call is guaranteed to fail.
        let _ = initialize_logging("KURE_TEST_LOG");
        initialize_logging("KURE_TEST_LOG").expect_err("subscriber is already installed");
    }
}
