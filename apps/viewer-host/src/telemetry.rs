use tracing_subscriber::{EnvFilter, Registry, layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::DEFAULT_LOG_FILTER;

/// Installs the global subscriber. Logs go to stderr so stdout stays free for
/// protocol output.
pub fn init_tracing(filter: &str) {
    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_writer(std::io::stderr);
    Registry::default()
        .with(build_filter(filter))
        .with(fmt_layer)
        .init();
}

fn build_filter(filter: &str) -> EnvFilter {
    EnvFilter::try_new(filter).unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_directive_falls_back_to_default() {
        assert_eq!(
            build_filter("viewer_host=notalevel").to_string(),
            EnvFilter::new(DEFAULT_LOG_FILTER).to_string()
        );
        assert_eq!(
            build_filter("warn").to_string(),
            EnvFilter::new("warn").to_string()
        );
    }
}
