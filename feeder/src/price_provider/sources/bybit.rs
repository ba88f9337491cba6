use std::collections::{BTreeSet, HashMap};

use anyhow::Result;
use serde::Deserialize;
use tracing::debug;

use super::{parse_price, BYBIT, HTTP_CLIENT};
use crate::types::Symbol;

#[derive(Debug, Deserialize)]
struct BybitTicker {
	symbol: String,
	#[serde(rename = "lastPrice")]
	last_price: String,
}

#[derive(Debug, Deserialize)]
struct BybitResult {
	#[serde(default)]
	list: Vec<BybitTicker>,
}

#[derive(Debug, Deserialize)]
struct BybitResponse {
	result: BybitResult,
}

/// Returns the prices for the given symbols.
/// Uses the Bybit API at https://bybit-exchange.github.io/docs/v5/market/tickers.
pub(super) async fn fetch_prices(symbols: &BTreeSet<Symbol>) -> Result<HashMap<Symbol, f64>> {
	let url = "https://api.bybit.com/v5/market/tickers?category=spot";

	let body = HTTP_CLIENT.get(url).send().await?.error_for_status()?.text().await?;
	parse_response(&body, symbols)
}

fn parse_response(body: &str, symbols: &BTreeSet<Symbol>) -> Result<HashMap<Symbol, f64>> {
	let response: BybitResponse = serde_json::from_str(body)?;

	let mut raw_prices = HashMap::new();
	for ticker in response.result.list {
		let symbol = Symbol::from(ticker.symbol);
		if !symbols.contains(&symbol) {
			continue;
		}
		if let Some(price) = parse_price(BYBIT, &symbol, &ticker.last_price) {
			debug!("fetched price for {symbol} on data source {BYBIT}: {price}");
			raw_prices.insert(symbol, price);
		}
	}
	Ok(raw_prices)
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn parses_the_ticker_response() {
		let body = r#"{
			"retCode": 0,
			"result": {
				"category": "spot",
				"list": [
					{"symbol": "BTCUSDT", "lastPrice": "30000.5", "bid1Price": "29999"},
					{"symbol": "ETHUSDT", "lastPrice": "2000.25", "bid1Price": "1999"}
				]
			}
		}"#;

		let symbols = BTreeSet::from([Symbol::from("BTCUSDT")]);
		let raw_prices = parse_response(body, &symbols).unwrap();
		assert_eq!(raw_prices.len(), 1);
		assert_eq!(raw_prices[&Symbol::from("BTCUSDT")], 30000.5);
	}

	#[ignore = "requires network access to Bybit"]
	#[tokio::test]
	async fn live_fetch() {
		let raw_prices = fetch_prices(&BTreeSet::from([Symbol::from("BTCUSDT")])).await.unwrap();
		assert!(raw_prices[&Symbol::from("BTCUSDT")] > 0.0);
	}
}
