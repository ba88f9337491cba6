pub mod chain_client;
pub mod constants;
pub mod event_stream;
pub mod feeder;
pub mod keys;
pub mod logging;
pub mod metrics;
pub mod price_poster;
pub mod price_provider;
pub mod settings;
pub mod types;
