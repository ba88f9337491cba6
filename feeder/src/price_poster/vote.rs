use itertools::Itertools;
use rand::Rng;
use sha2::{Digest, Sha256};

use crate::{
	constants::{EXCHANGE_RATE_DECIMALS, VOTE_HASH_BYTES},
	types::{Price, Prevote},
};

/// Builds the commit for one voting period: a fresh random salt and the
/// chain's commit hash over the rates this validator will reveal next period.
pub fn new_prevote(prices: Vec<Price>, submitted_at_height: u64, validator: &str) -> Prevote {
	let salt: [u8; 32] = rand::thread_rng().gen();
	let salt = hex::encode(salt);
	let hash = aggregate_vote_hash(&salt, &exchange_rates_string(&prices), validator);
	Prevote { salt, hash, prices, submitted_at_height }
}

/// The canonical exchange-rate vector: `pair:value` entries joined by commas,
/// values rendered at the chain's fixed-point precision. Invalid prices are
/// elided.
pub fn exchange_rates_string(prices: &[Price]) -> String {
	prices
		.iter()
		.filter(|price| price.valid)
		.map(|price| format!("{}:{:.prec$}", price.pair, price.value, prec = EXCHANGE_RATE_DECIMALS))
		.join(",")
}

/// The chain's commit hash rule: truncated SHA-256 over
/// `"{salt}:{rates}:{validator}"`, hex encoded.
pub fn aggregate_vote_hash(salt: &str, exchange_rates: &str, validator: &str) -> String {
	let digest = Sha256::digest(format!("{salt}:{exchange_rates}:{validator}"));
	hex::encode(&digest[..VOTE_HASH_BYTES])
}
