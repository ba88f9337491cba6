use tracing_subscriber::EnvFilter;

/// Installs the global JSON logger. INFO by default, DEBUG with the `--debug`
/// flag; an explicit `RUST_LOG` wins over both.
pub fn init_json_logger(debug: bool) {
	let filter = EnvFilter::try_from_default_env()
		.unwrap_or_else(|_| EnvFilter::new(if debug { "debug" } else { "info" }));

	tracing_subscriber::fmt().json().with_env_filter(filter).init();
}
