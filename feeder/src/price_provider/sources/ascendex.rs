use std::collections::{BTreeSet, HashMap};

use anyhow::Result;
use serde::Deserialize;
use tracing::debug;

use super::{parse_price, ASCENDEX, HTTP_CLIENT};
use crate::types::Symbol;

#[derive(Debug, Deserialize)]
struct AscendexTicker {
	symbol: String,
	close: String,
}

#[derive(Debug, Deserialize)]
struct AscendexResponse {
	#[serde(default)]
	data: Vec<AscendexTicker>,
}

/// Returns the prices for the given symbols.
/// Uses the Ascendex API at https://ascendex.github.io/ascendex-pro-api/.
pub(super) async fn fetch_prices(symbols: &BTreeSet<Symbol>) -> Result<HashMap<Symbol, f64>> {
	let url = "https://ascendex.com/api/pro/v1/spot/ticker";

	let body = HTTP_CLIENT.get(url).send().await?.error_for_status()?.text().await?;
	parse_response(&body, symbols)
}

fn parse_response(body: &str, symbols: &BTreeSet<Symbol>) -> Result<HashMap<Symbol, f64>> {
	let response: AscendexResponse = serde_json::from_str(body)?;

	let mut raw_prices = HashMap::new();
	for ticker in response.data {
		let symbol = Symbol::from(ticker.symbol);
		if !symbols.contains(&symbol) {
			continue;
		}
		if let Some(price) = parse_price(ASCENDEX, &symbol, &ticker.close) {
			debug!("fetched price for {symbol} on data source {ASCENDEX}: {price}");
			raw_prices.insert(symbol, price);
		}
	}
	Ok(raw_prices)
}
