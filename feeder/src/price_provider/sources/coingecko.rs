use std::collections::{BTreeSet, HashMap};

use anyhow::Result;
use itertools::Itertools;
use serde::Deserialize;
use tracing::{debug, warn};

use super::{COINGECKO, HTTP_CLIENT};
use crate::types::Symbol;

const PUBLIC_API: &str = "https://api.coingecko.com/api/v3";
const PRO_API: &str = "https://pro-api.coingecko.com/api/v3";

/// Optional operator configuration; with an api key the pro endpoint is used.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CoingeckoConfig {
	#[serde(default)]
	pub api_key: Option<String>,
}

/// Returns the prices for the given symbols, which for this source are
/// coingecko coin ids (`bitcoin`, `ethereum`, ...) quoted in USD.
/// Uses the Coingecko API at https://docs.coingecko.com/reference/simple-price.
pub(super) async fn fetch_prices(
	config: &CoingeckoConfig,
	symbols: &BTreeSet<Symbol>,
) -> Result<HashMap<Symbol, f64>> {
	if symbols.is_empty() {
		return Ok(HashMap::new());
	}

	let base = if config.api_key.is_some() { PRO_API } else { PUBLIC_API };
	let ids = symbols.iter().join(",");
	let url = format!("{base}/simple/price?ids={ids}&vs_currencies=usd");

	let mut request = HTTP_CLIENT.get(&url);
	if let Some(api_key) = &config.api_key {
		request = request.header("x-cg-pro-api-key", api_key);
	}

	let body = request.send().await?.error_for_status()?.text().await?;
	parse_response(&body, symbols)
}

fn parse_response(body: &str, symbols: &BTreeSet<Symbol>) -> Result<HashMap<Symbol, f64>> {
	let quotes: HashMap<String, HashMap<String, f64>> = serde_json::from_str(body)?;

	let mut raw_prices = HashMap::new();
	for (id, currencies) in quotes {
		let symbol = Symbol::from(id);
		if !symbols.contains(&symbol) {
			continue;
		}
		match currencies.get("usd") {
			Some(&price) if price.is_finite() => {
				debug!("fetched price for {symbol} on data source {COINGECKO}: {price}");
				raw_prices.insert(symbol, price);
			},
			_ => warn!("missing usd quote for {symbol} on data source {COINGECKO}"),
		}
	}
	Ok(raw_prices)
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn parses_the_simple_price_response() {
		let body = r#"{
			"bitcoin": {"usd": 30000.5},
			"ethereum": {"usd": 2000.25},
			"ripple": {"eur": 0.45}
		}"#;

		let symbols = BTreeSet::from([
			Symbol::from("bitcoin"),
			Symbol::from("ethereum"),
			Symbol::from("ripple"),
		]);
		let raw_prices = parse_response(body, &symbols).unwrap();
		// ripple has no usd quote and is dropped
		assert_eq!(raw_prices.len(), 2);
		assert_eq!(raw_prices[&Symbol::from("bitcoin")], 30000.5);
	}

	#[ignore = "requires network access to Coingecko"]
	#[tokio::test]
	async fn live_fetch() {
		let raw_prices = fetch_prices(
			&CoingeckoConfig::default(),
			&BTreeSet::from([Symbol::from("bitcoin")]),
		)
		.await
		.unwrap();
		assert!(raw_prices[&Symbol::from("bitcoin")] > 0.0);
	}
}
