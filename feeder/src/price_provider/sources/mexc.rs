use std::collections::{BTreeSet, HashMap};

use anyhow::Result;
use serde::Deserialize;
use tracing::debug;

use super::{parse_price, HTTP_CLIENT, MEXC};
use crate::types::Symbol;

#[derive(Debug, Deserialize)]
struct MexcTicker {
	symbol: String,
	price: String,
}

/// Returns the prices for the given symbols.
/// Uses the Mexc API at https://mexcdevelop.github.io/apidocs/spot_v3_en/#general-info.
pub(super) async fn fetch_prices(symbols: &BTreeSet<Symbol>) -> Result<HashMap<Symbol, f64>> {
	let url = "https://api.mexc.com/api/v3/ticker/price";

	let body = HTTP_CLIENT.get(url).send().await?.error_for_status()?.text().await?;
	parse_response(&body, symbols)
}

fn parse_response(body: &str, symbols: &BTreeSet<Symbol>) -> Result<HashMap<Symbol, f64>> {
	let tickers: Vec<MexcTicker> = serde_json::from_str(body)?;

	let mut raw_prices = HashMap::new();
	for ticker in tickers {
		let symbol = Symbol::from(ticker.symbol);
		if !symbols.contains(&symbol) {
			continue;
		}
		if let Some(price) = parse_price(MEXC, &symbol, &ticker.price) {
			debug!("fetched price for {symbol} on data source {MEXC}: {price}");
			raw_prices.insert(symbol, price);
		}
	}
	Ok(raw_prices)
}
