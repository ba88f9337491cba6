use std::{
	collections::{BTreeSet, HashMap},
	sync::Arc,
};

use anyhow::{anyhow, bail, Result};
use ethers::{
	contract::abigen,
	providers::{Http, Provider},
	types::{Address, U256},
};
use serde::Deserialize;
use tracing::debug;

use super::UNISWAP;
use crate::types::Symbol;

abigen!(
	IUniswapV2Pair,
	r#"[
		function getReserves() external view returns (uint256, uint256, uint256)
	]"#,
);

pub const ETH_USD_SYMBOL: &str = "ETHUSD";
pub const VSG_USD_SYMBOL: &str = "VSGUSD";

/// The two stablecoin quotes must agree within this band or the whole call
/// is rejected; a depegged pool would otherwise poison both reported prices.
const STABLE_RATIO_MIN: f64 = 0.8;
const STABLE_RATIO_MAX: f64 = 1.25;

/// On-chain source configuration. The VSG/ETH pool address has moved before,
/// so every pair address stays configurable.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct UniswapConfig {
	pub rpc_endpoint: String,
	pub eth_usdt_pair: String,
	pub eth_usdc_pair: String,
	pub vsg_eth_pair: String,
}

impl Default for UniswapConfig {
	fn default() -> Self {
		Self {
			rpc_endpoint: "https://ethereum-rpc.publicnode.com".to_string(),
			eth_usdt_pair: "0x0d4a11d5EEaaC28EC3F61d100daF4d40471f1852".to_string(),
			eth_usdc_pair: "0xB4e16d0168e52d35CaCD2c6185b44281Ec28C9Dc".to_string(),
			vsg_eth_pair: "0x844a5ccdc91e604f55085adfc02e4d52c8227099".to_string(),
		}
	}
}

/// Derives ETHUSD from the two stablecoin pools and VSGUSD from the VSG/ETH
/// pool, by reading uniswap v2 `getReserves()` over eth rpc.
pub(super) async fn fetch_prices(
	config: &UniswapConfig,
	_symbols: &BTreeSet<Symbol>,
) -> Result<HashMap<Symbol, f64>> {
	let provider = Arc::new(Provider::<Http>::try_from(config.rpc_endpoint.as_str())?);

	let eth_usdt = pair_price(&provider, &config.eth_usdt_pair, 18, 6).await?;
	let eth_usdc = pair_price(&provider, &config.eth_usdc_pair, 18, 6).await?;
	let eth_usd = consolidate_stable_quotes(eth_usdt, eth_usdc)?;
	debug!("fetched price for ETH/USD on data source {UNISWAP}: {eth_usd}");

	let vsg_eth = pair_price(&provider, &config.vsg_eth_pair, 18, 18).await?;
	debug!("fetched price for VSG/ETH on data source {UNISWAP}: {vsg_eth}");

	Ok(HashMap::from([
		(Symbol::from(ETH_USD_SYMBOL), eth_usd),
		(Symbol::from(VSG_USD_SYMBOL), vsg_eth * eth_usd),
	]))
}

async fn pair_price(
	provider: &Arc<Provider<Http>>,
	pair_address: &str,
	token0_decimals: i32,
	token1_decimals: i32,
) -> Result<f64> {
	let address: Address = pair_address
		.parse()
		.map_err(|e| anyhow!("invalid pair address {pair_address}: {e}"))?;
	let pair = IUniswapV2Pair::new(address, provider.clone());

	let (reserve0, reserve1, _block_timestamp_last) = pair.get_reserves().call().await?;
	reserves_to_price(reserve0, reserve1, token0_decimals, token1_decimals)
}

/// reserve1/reserve0 adjusted for token decimals, i.e. the token1 price of
/// one token0.
fn reserves_to_price(
	reserve0: U256,
	reserve1: U256,
	token0_decimals: i32,
	token1_decimals: i32,
) -> Result<f64> {
	if reserve0.is_zero() || reserve1.is_zero() {
		bail!("pair has empty reserves");
	}
	// v2 reserves are uint112, they always fit u128
	let reserve0 = reserve0.as_u128() as f64 / 10f64.powi(token0_decimals);
	let reserve1 = reserve1.as_u128() as f64 / 10f64.powi(token1_decimals);
	Ok(reserve1 / reserve0)
}

fn consolidate_stable_quotes(eth_usdt: f64, eth_usdc: f64) -> Result<f64> {
	let ratio = eth_usdt / eth_usdc;
	if !(STABLE_RATIO_MIN..=STABLE_RATIO_MAX).contains(&ratio) {
		bail!(
			"stablecoin quotes diverge: ETH/USDT {eth_usdt} vs ETH/USDC {eth_usdc} (ratio {ratio:.4})"
		);
	}
	Ok((eth_usdt + eth_usdc) / 2.0)
}
