use std::collections::{BTreeSet, HashMap};

use anyhow::Result;
use itertools::Itertools;
use tracing::{debug, warn};

use super::{BITFINEX, HTTP_CLIENT};
use crate::types::Symbol;

/// Index of the last-price field in a bitfinex ticker array.
const LAST_PRICE_INDEX: usize = 7;

/// Returns the prices for the given symbols.
/// Uses the Bitfinex API at https://docs.bitfinex.com/reference/rest-public-tickers.
pub(super) async fn fetch_prices(symbols: &BTreeSet<Symbol>) -> Result<HashMap<Symbol, f64>> {
	if symbols.is_empty() {
		return Ok(HashMap::new());
	}

	let csv = symbols.iter().join(",");
	let url = format!("https://api-pub.bitfinex.com/v2/tickers?symbols={csv}");

	let body = HTTP_CLIENT.get(&url).send().await?.error_for_status()?.text().await?;
	parse_response(&body, symbols)
}

fn parse_response(body: &str, symbols: &BTreeSet<Symbol>) -> Result<HashMap<Symbol, f64>> {
	// Bitfinex tickers are positional arrays led by the symbol name.
	let tickers: Vec<Vec<serde_json::Value>> = serde_json::from_str(body)?;

	let mut raw_prices = HashMap::new();
	for ticker in tickers {
		let Some(symbol) = ticker.first().and_then(|field| field.as_str()) else {
			warn!("ticker without a symbol field on data source {BITFINEX}");
			continue;
		};
		let symbol = Symbol::from(symbol);
		if !symbols.contains(&symbol) {
			continue;
		}

		match ticker.get(LAST_PRICE_INDEX).and_then(|field| field.as_f64()) {
			Some(price) if price.is_finite() => {
				debug!("fetched price for {symbol} on data source {BITFINEX}: {price}");
				raw_prices.insert(symbol, price);
			},
			_ => warn!("failed to parse price for {symbol} on data source {BITFINEX}"),
		}
	}
	Ok(raw_prices)
}
