use std::fmt;

use anyhow::Result;
use async_trait::async_trait;
use futures::stream::BoxStream;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

/// An exchange-specific ticker identifier, e.g. `tBTCUSD` on Bitfinex or
/// `BTCUSDT` on Binance. Symbols are not portable across exchanges.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Symbol(pub String);

impl Symbol {
	pub fn as_str(&self) -> &str {
		&self.0
	}
}

impl From<&str> for Symbol {
	fn from(s: &str) -> Self {
		Self(s.to_string())
	}
}

impl From<String> for Symbol {
	fn from(s: String) -> Self {
		Self(s)
	}
}

impl fmt::Display for Symbol {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		f.write_str(&self.0)
	}
}

/// The canonical pair identifier used by the chain, e.g. `ubtc:unusd`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AssetPair(pub String);

impl AssetPair {
	pub fn as_str(&self) -> &str {
		&self.0
	}
}

impl From<&str> for AssetPair {
	fn from(s: &str) -> Self {
		Self(s.to_string())
	}
}

impl From<String> for AssetPair {
	fn from(s: String) -> Self {
		Self(s)
	}
}

impl fmt::Display for AssetPair {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		f.write_str(&self.0)
	}
}

pub const CONSOLIDATED_SOURCE_NAME: &str = "consolidated";
pub const MISSING_SOURCE_NAME: &str = "missing";

/// A single price observation. `valid == false` means no reliable value is
/// available and `value` is meaningless.
#[derive(Debug, Clone, PartialEq)]
pub struct Price {
	pub pair: AssetPair,
	pub value: f64,
	pub source_name: String,
	pub valid: bool,
}

impl Price {
	pub fn missing(pair: AssetPair) -> Self {
		Self { pair, value: 0.0, source_name: MISSING_SOURCE_NAME.to_string(), valid: false }
	}
}

/// The oracle module parameters the feeder cares about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Params {
	/// The pairs we need to provide prices for, in whitelist order.
	pub pairs: Vec<AssetPair>,
	/// The length of a voting period in blocks.
	pub vote_period_blocks: u64,
}

/// The block height at which a new voting period began.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VotingPeriod {
	pub height: u64,
}

/// The client-side record of a commit broadcast to the chain. The reveal in
/// the next period must reproduce exactly the committed rates and salt, so
/// both are kept here rather than recomputed.
#[derive(Debug, Clone, PartialEq)]
pub struct Prevote {
	/// Hex encoding of the random 32 byte salt.
	pub salt: String,
	/// The on-chain commit hash over (salt, rates, validator).
	pub hash: String,
	/// The valid prices whose rates string was committed.
	pub prices: Vec<Price>,
	pub submitted_at_height: u64,
}

/// A new-block notification from the chain.
#[derive(Debug, Clone, Copy)]
pub struct BlockEvent {
	pub height: u64,
}

/// Read access to the chain, as needed to follow the oracle voting lifecycle.
#[async_trait]
pub trait ChainEvents: Send + Sync + 'static {
	/// Subscribes to new-block events. The returned stream ends when the
	/// underlying connection is lost; callers are expected to re-subscribe.
	async fn subscribe_block_events(&self) -> Result<BoxStream<'static, BlockEvent>>;

	/// Fetches the current oracle params.
	async fn query_oracle_params(&self) -> Result<Params>;

	/// Fetches the pairs the chain is currently soliciting votes for.
	async fn query_vote_targets(&self) -> Result<Vec<AssetPair>>;
}

/// The two signal streams the vote coordinator consumes. Both are
/// single-consumer and non-restartable; late subscribers miss prior signals.
pub trait EventStream: Send {
	/// Borrows the params-update and voting-period-started streams together,
	/// so one select loop can poll both.
	fn signals(&mut self) -> (&mut mpsc::Receiver<Params>, &mut mpsc::Receiver<VotingPeriod>);

	/// Terminates both streams.
	fn close(&mut self);
}

/// Answers price queries for a single asset pair.
#[async_trait]
pub trait PriceProvider: Send + Sync {
	/// Always returns a [Price]; `valid == false` when no source produced one.
	async fn get_price(&self, pair: &AssetPair) -> Price;
}

/// Posts the commit-reveal vote pair for one voting period.
#[async_trait]
pub trait PricePoster: Send {
	/// The validator on whose behalf votes are cast.
	fn whoami(&self) -> &str;

	/// Broadcasts one transaction containing the reveal for
	/// `previous_prevote` (when present) and the commit for `new_prevote`.
	/// Returns the tx hash on success.
	async fn send_prices(
		&mut self,
		voting_period: VotingPeriod,
		prices: &[Price],
		new_prevote: &Prevote,
		previous_prevote: Option<&Prevote>,
	) -> Result<String>;
}
