use std::collections::{BTreeSet, HashMap};

use anyhow::Result;
use serde::Deserialize;
use tracing::debug;

use super::{parse_price, HTTP_CLIENT, OKEX};
use crate::types::Symbol;

#[derive(Debug, Deserialize)]
struct OkexTicker {
	#[serde(rename = "instId")]
	inst_id: String,
	last: String,
}

#[derive(Debug, Deserialize)]
struct OkexResponse {
	#[serde(default)]
	data: Vec<OkexTicker>,
}

/// Returns the prices for the given symbols.
/// Uses the OKX API at https://www.okx.com/docs-v5/en/#rest-api-market-data.
pub(super) async fn fetch_prices(symbols: &BTreeSet<Symbol>) -> Result<HashMap<Symbol, f64>> {
	let url = "https://www.okx.com/api/v5/market/tickers?instType=SPOT";

	let body = HTTP_CLIENT.get(url).send().await?.error_for_status()?.text().await?;
	parse_response(&body, symbols)
}

fn parse_response(body: &str, symbols: &BTreeSet<Symbol>) -> Result<HashMap<Symbol, f64>> {
	let response: OkexResponse = serde_json::from_str(body)?;

	let mut raw_prices = HashMap::new();
	for ticker in response.data {
		let symbol = Symbol::from(ticker.inst_id);
		if !symbols.contains(&symbol) {
			continue;
		}
		if let Some(price) = parse_price(OKEX, &symbol, &ticker.last) {
			debug!("fetched price for {symbol} on data source {OKEX}: {price}");
			raw_prices.insert(symbol, price);
		}
	}
	Ok(raw_prices)
}
