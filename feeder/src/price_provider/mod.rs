pub mod aggregate;
pub mod sources;

use std::collections::{BTreeSet, HashMap};

use anyhow::Result;

pub use aggregate::AggregatePriceProvider;
use sources::Source;

use crate::types::{AssetPair, Price, Symbol};

/// Asks one exchange for one pair's price, translating between the chain's
/// pair identifiers and the exchange's symbols. Stateless; every call is a
/// fresh fetch.
pub struct SourceProvider {
	source: Source,
	pairs_to_symbols: HashMap<AssetPair, Symbol>,
}

impl SourceProvider {
	pub fn new(
		source_name: &str,
		pairs_to_symbols: HashMap<AssetPair, Symbol>,
		config: Option<&serde_json::Value>,
	) -> Result<Self> {
		Ok(Self { source: Source::from_name(source_name, config)?, pairs_to_symbols })
	}

	pub async fn get_price(&self, pair: &AssetPair) -> Price {
		let Some(symbol) = self.pairs_to_symbols.get(pair) else {
			return self.invalid_price(pair);
		};

		match self.source.fetch_prices(&BTreeSet::from([symbol.clone()])).await {
			Ok(raw_prices) => match raw_prices.get(symbol) {
				Some(&value) if value.is_finite() => Price {
					pair: pair.clone(),
					value,
					source_name: self.source.name().to_string(),
					valid: true,
				},
				_ => self.invalid_price(pair),
			},
			// Fetch errors are logged and counted at the source; the caller
			// only ever sees a price that is not valid.
			Err(_) => self.invalid_price(pair),
		}
	}

	fn invalid_price(&self, pair: &AssetPair) -> Price {
		Price {
			pair: pair.clone(),
			value: 0.0,
			source_name: self.source.name().to_string(),
			valid: false,
		}
	}
}
