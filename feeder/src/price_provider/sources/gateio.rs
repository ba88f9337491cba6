use std::collections::{BTreeSet, HashMap};

use anyhow::Result;
use serde::Deserialize;
use tracing::debug;

use super::{parse_price, GATEIO, HTTP_CLIENT};
use crate::types::Symbol;

#[derive(Debug, Deserialize)]
struct GateIoTicker {
	currency_pair: String,
	last: String,
}

/// Returns the prices for the given symbols.
/// Uses the Gate.io API at https://www.gate.io/docs/developers/apiv4/en/#get-details-of-a-specifc-currency-pair.
pub(super) async fn fetch_prices(symbols: &BTreeSet<Symbol>) -> Result<HashMap<Symbol, f64>> {
	let url = "https://api.gateio.ws/api/v4/spot/tickers";

	let body = HTTP_CLIENT.get(url).send().await?.error_for_status()?.text().await?;
	parse_response(&body, symbols)
}

fn parse_response(body: &str, symbols: &BTreeSet<Symbol>) -> Result<HashMap<Symbol, f64>> {
	let tickers: Vec<GateIoTicker> = serde_json::from_str(body)?;

	let mut raw_prices = HashMap::new();
	for ticker in tickers {
		let symbol = Symbol::from(ticker.currency_pair);
		if !symbols.contains(&symbol) {
			continue;
		}
		if let Some(price) = parse_price(GATEIO, &symbol, &ticker.last) {
			debug!("fetched price for {symbol} on data source {GATEIO}: {price}");
			raw_prices.insert(symbol, price);
		}
	}
	Ok(raw_prices)
}
