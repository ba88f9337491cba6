//! Pluggable price sources. Each adapter answers with a bulk fetch against a
//! public ticker endpoint, filtered down to the requested symbol set. A
//! symbol that fails to parse is dropped; a transport or decode failure fails
//! the whole call.

pub mod ascendex;
pub mod binance;
pub mod bitfinex;
pub mod bybit;
pub mod coingecko;
pub mod gateio;
pub mod mexc;
pub mod okex;
pub mod uniswap;

use std::collections::{BTreeSet, HashMap};

use anyhow::{bail, Result};
use serde::de::DeserializeOwned;
use tracing::warn;

use crate::{constants::HTTP_TIMEOUT, metrics::PRICE_SOURCE_COUNTER, types::Symbol};

pub const ASCENDEX: &str = "ascendex";
pub const BINANCE: &str = "binance";
pub const BITFINEX: &str = "bitfinex";
pub const BYBIT: &str = "bybit";
pub const COINGECKO: &str = "coingecko";
pub const GATEIO: &str = "gateio";
pub const MEXC: &str = "mexc";
pub const OKEX: &str = "okex";
pub const UNISWAP: &str = "uniswap";

lazy_static::lazy_static! {
	pub(crate) static ref HTTP_CLIENT: reqwest::Client = reqwest::Client::builder()
		.timeout(HTTP_TIMEOUT)
		.build()
		.expect("reqwest client builds with static configuration");
}

/// A configured price source. Variants that take operator configuration
/// decode their own blob out of `DATA_SOURCE_CONFIG_MAP`.
pub enum Source {
	Ascendex,
	Binance,
	Bitfinex,
	Bybit,
	Coingecko(coingecko::CoingeckoConfig),
	GateIo,
	Mexc,
	Okex,
	Uniswap(uniswap::UniswapConfig),
}

impl Source {
	pub fn from_name(name: &str, config: Option<&serde_json::Value>) -> Result<Self> {
		match name {
			ASCENDEX => Ok(Self::Ascendex),
			BINANCE => Ok(Self::Binance),
			BITFINEX => Ok(Self::Bitfinex),
			BYBIT => Ok(Self::Bybit),
			COINGECKO => Ok(Self::Coingecko(decode_config(config)?)),
			GATEIO => Ok(Self::GateIo),
			MEXC => Ok(Self::Mexc),
			OKEX => Ok(Self::Okex),
			UNISWAP => Ok(Self::Uniswap(decode_config(config)?)),
			other => bail!("unknown price source {other}"),
		}
	}

	pub fn name(&self) -> &'static str {
		match self {
			Self::Ascendex => ASCENDEX,
			Self::Binance => BINANCE,
			Self::Bitfinex => BITFINEX,
			Self::Bybit => BYBIT,
			Self::Coingecko(_) => COINGECKO,
			Self::GateIo => GATEIO,
			Self::Mexc => MEXC,
			Self::Okex => OKEX,
			Self::Uniswap(_) => UNISWAP,
		}
	}

	/// Fetches current prices for the requested symbols. Symbols the source
	/// does not know are absent from the result, not errors.
	pub async fn fetch_prices(
		&self,
		symbols: &BTreeSet<Symbol>,
	) -> Result<HashMap<Symbol, f64>> {
		let result = match self {
			Self::Ascendex => ascendex::fetch_prices(symbols).await,
			Self::Binance => binance::fetch_prices(symbols).await,
			Self::Bitfinex => bitfinex::fetch_prices(symbols).await,
			Self::Bybit => bybit::fetch_prices(symbols).await,
			Self::Coingecko(config) => coingecko::fetch_prices(config, symbols).await,
			Self::GateIo => gateio::fetch_prices(symbols).await,
			Self::Mexc => mexc::fetch_prices(symbols).await,
			Self::Okex => okex::fetch_prices(symbols).await,
			Self::Uniswap(config) => uniswap::fetch_prices(config, symbols).await,
		};

		let success = if result.is_ok() { "true" } else { "false" };
		PRICE_SOURCE_COUNTER.with_label_values(&[self.name(), success]).inc();
		if let Err(e) = &result {
			warn!(source = self.name(), "failed to fetch prices: {e:#}");
		}
		result
	}
}

fn decode_config<T>(config: Option<&serde_json::Value>) -> Result<T>
where
	T: DeserializeOwned + Default,
{
	match config {
		Some(raw) => Ok(serde_json::from_value(raw.clone())?),
		None => Ok(T::default()),
	}
}

/// Parses one ticker's price field, dropping (with a log line) values that
/// are unparseable or non-finite so a bad symbol never fails the bulk call.
pub(crate) fn parse_price(source: &'static str, symbol: &Symbol, raw: &str) -> Option<f64> {
	match raw.parse::<f64>() {
		Ok(price) if price.is_finite() => Some(price),
		Ok(price) => {
			warn!("unusable price {price} for {symbol} on data source {source}");
			None
		},
		Err(e) => {
			warn!("failed to parse price for {symbol} on data source {source}: {e}");
			None
		},
	}
}
