use tracing_subscriber::{fmt, EnvFilter};

// tower_http emits request spans at debug
const DEFAULT_DIRECTIVES: &str = "info,tower_http=debug";

/// `RUST_LOG` takes precedence over the defaults. `format` is `pretty` or `json`.
pub fn init_tracing(format: &str) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_DIRECTIVES));

    let builder = fmt().with_env_filter(filter).with_target(true);

    if format.eq_ignore_ascii_case("json") {
        builder.json().flatten_event(true).with_current_span(true).init();
    } else {
        builder.init();
    }
}
