use clap::Parser;
use tokio::sync::oneshot;
use tracing::{error, info};

use pricefeeder::{
	constants::METRICS_PORT,
	event_stream::Stream,
	feeder::Feeder,
	keys::Keyring,
	logging, metrics,
	price_poster,
	price_provider::AggregatePriceProvider,
	settings::Settings,
};

#[derive(Parser)]
#[clap(about = "Price feeder daemon posting exchange rates to the chain's oracle module")]
struct CommandLineOptions {
	/// Optional settings file; the environment overrides it.
	#[clap(short = 'c', long = "config-path")]
	config_path: Option<String>,

	/// Sets the log level to debug.
	#[clap(long = "debug")]
	debug: bool,
}

#[tokio::main]
async fn main() {
	let opts = CommandLineOptions::parse();
	logging::init_json_logger(opts.debug);

	let settings = match Settings::load(opts.config_path.as_deref()) {
		Ok(settings) => settings,
		Err(e) => {
			error!("invalid configuration: {e}");
			std::process::exit(1)
		},
	};

	metrics::register_metrics();
	let _metrics_server = metrics::spawn_metrics_server(METRICS_PORT);

	let keyring = Keyring::from_mnemonic(&settings.feeder_mnemonic).unwrap_or_else(|e| {
		error!("failed to derive the feeder key: {e:#}");
		std::process::exit(1)
	});
	let feeder_address = keyring.account_address();
	let validator_address = settings
		.validator_address
		.clone()
		.unwrap_or_else(|| keyring.validator_address());
	info!(%feeder_address, %validator_address, "feeding prices as");

	let event_stream = Stream::dial(
		&settings.websocket_endpoint,
		&settings.grpc_endpoint,
		settings.enable_tls,
	)
	.unwrap_or_else(|e| {
		error!("failed to set up the chain event stream: {e:#}");
		std::process::exit(1)
	});
	let price_provider = AggregatePriceProvider::new(
		settings.exchange_symbols_map.clone(),
		&settings.data_source_config_map,
	)
	.unwrap_or_else(|e| {
		error!("failed to set up the price sources: {e:#}");
		std::process::exit(1)
	});
	let price_poster = price_poster::Client::dial(
		&settings.grpc_endpoint,
		&settings.chain_id,
		settings.enable_tls,
		keyring,
		validator_address,
		feeder_address,
	)
	.unwrap_or_else(|e| {
		error!("failed to set up the price poster: {e:#}");
		std::process::exit(1)
	});

	let (shutdown_tx, shutdown_rx) = oneshot::channel();
	let feeder_handle =
		tokio::spawn(Feeder::new(event_stream, price_provider, price_poster).run(shutdown_rx));

	tokio::signal::ctrl_c().await.expect("can listen for shutdown signals");
	info!("shutting down gracefully");
	let _ = shutdown_tx.send(());
	let _ = feeder_handle.await;

	// Signal-triggered shutdown deliberately reports as abnormal so process
	// supervisors restart the feeder.
	std::process::exit(1);
}
