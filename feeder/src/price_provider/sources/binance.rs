use std::collections::{BTreeSet, HashMap};

use anyhow::Result;
use itertools::Itertools;
use serde::Deserialize;
use tracing::debug;

use super::{parse_price, BINANCE, HTTP_CLIENT};
use crate::types::Symbol;

#[derive(Debug, Deserialize)]
struct BinanceTicker {
	symbol: String,
	price: String,
}

/// Returns the prices for the given symbols.
/// Uses the Binance API at https://docs.binance.us/#price-data.
pub(super) async fn fetch_prices(symbols: &BTreeSet<Symbol>) -> Result<HashMap<Symbol, f64>> {
	if symbols.is_empty() {
		return Ok(HashMap::new());
	}

	let csv = symbols.iter().map(|symbol| format!("%22{symbol}%22")).join(",");
	let url = format!("https://api.binance.us/api/v3/ticker/price?symbols=%5B{csv}%5D");

	let body = HTTP_CLIENT.get(&url).send().await?.error_for_status()?.text().await?;
	parse_response(&body, symbols)
}

fn parse_response(body: &str, symbols: &BTreeSet<Symbol>) -> Result<HashMap<Symbol, f64>> {
	let tickers: Vec<BinanceTicker> = serde_json::from_str(body)?;

	let mut raw_prices = HashMap::new();
	for ticker in tickers {
		let symbol = Symbol::from(ticker.symbol);
		if !symbols.contains(&symbol) {
			continue;
		}
		if let Some(price) = parse_price(BINANCE, &symbol, &ticker.price) {
			debug!("fetched price for {symbol} on data source {BINANCE}: {price}");
			raw_prices.insert(symbol, price);
		}
	}
	Ok(raw_prices)
}
