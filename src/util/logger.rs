use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Install the global subscriber. `RUST_LOG` wins over `verbose` when set.
pub fn init_cli_logger(verbose: bool, json: bool) {
    let default_directive = if verbose {
        "design_quote=debug,info"
    } else {
        "design_quote=warn"
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive));

    let registry = tracing_subscriber::registry().with(filter);
    let base = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false);

    if json {
        registry.with(base.json()).init();
    } else {
        registry.with(base.compact()).init();
    }
}
