use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize logging.
///
/// Quiet by default: only error-level events are emitted unless `verbose`
/// is set, which raises the level to info. JSON events go to stderr so
/// stdout stays clean for user-facing output.
pub fn init_logging(verbose: bool) {
    let directive = if verbose {
        "teamplify=info"
    } else {
        "teamplify=error"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_writer(std::io::stderr)
                .with_current_span(false)
                .with_span_list(false),
        )
        .with(
            EnvFilter::from_default_env()
                .add_directive(directive.parse().expect("Invalid log directive")),
        )
        .init();
}
