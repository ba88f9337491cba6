//! Metric monitoring for the feeder,
//! allowing a prometheus server to scrape counters from the daemon.
//! Returns the metrics encoded in the prometheus text format.

use prometheus::{IntCounterVec, Opts, Registry};
use tracing::info;
use warp::Filter;

pub const PROMETHEUS_NAMESPACE: &str = "pricefeeder";

lazy_static::lazy_static! {
	static ref REGISTRY: Registry = Registry::new();

	pub static ref PRICE_SOURCE_COUNTER: IntCounterVec = IntCounterVec::new(
		Opts::new("price_source_total", "The total number of fetches performed against each price source, by success status")
			.namespace(PROMETHEUS_NAMESPACE),
		&["source", "success"],
	).expect("Metric succesfully created");

	pub static ref AGGREGATE_PRICES_COUNTER: IntCounterVec = IntCounterVec::new(
		Opts::new("aggregate_prices_total", "The total number of prices provided by the aggregate price provider, by pair, source, and success status")
			.namespace(PROMETHEUS_NAMESPACE),
		&["pair", "source", "success"],
	).expect("Metric succesfully created");

	pub static ref PRICES_POSTED_COUNTER: IntCounterVec = IntCounterVec::new(
		Opts::new("prices_posted_total", "The total number of price update txs sent to the chain, by success status")
			.namespace(PROMETHEUS_NAMESPACE),
		&["success"],
	).expect("Metric succesfully created");
}

pub fn register_metrics() {
	REGISTRY
		.register(Box::new(PRICE_SOURCE_COUNTER.clone()))
		.expect("Metric succesfully register");
	REGISTRY
		.register(Box::new(AGGREGATE_PRICES_COUNTER.clone()))
		.expect("Metric succesfully register");
	REGISTRY
		.register(Box::new(PRICES_POSTED_COUNTER.clone()))
		.expect("Metric succesfully register");
}

/// Serves `/metrics` on the given port until the returned task is dropped or
/// aborted.
pub fn spawn_metrics_server(port: u16) -> tokio::task::JoinHandle<()> {
	info!(port, "starting prometheus metrics server");

	let future = warp::serve(
		warp::any()
			.and(warp::path("metrics"))
			.and(warp::path::end())
			.map(metrics_handler),
	)
	.run(([0, 0, 0, 0], port));

	tokio::spawn(future)
}

fn metrics_handler() -> String {
	use prometheus::Encoder;
	let encoder = prometheus::TextEncoder::new();

	let mut buffer = Vec::new();
	if let Err(e) = encoder.encode(&REGISTRY.gather(), &mut buffer) {
		tracing::error!("could not encode custom metrics: {}", e);
	};
	match String::from_utf8(buffer) {
		Ok(v) => v,
		Err(e) => {
			tracing::error!("custom metrics could not be from_utf8'd: {}", e);
			String::default()
		},
	}
}
