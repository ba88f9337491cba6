use std::collections::HashMap;

use config::{Config, ConfigError, Environment, File};
use serde::{de::DeserializeOwned, Deserialize, Deserializer};

use crate::types::{AssetPair, Symbol};

/// Daemon configuration, read from the environment (and optionally a file,
/// which the environment overrides). All keys map to env vars by upper-casing,
/// e.g. `grpc_endpoint` <- `GRPC_ENDPOINT`.
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
	/// Chain identifier used in tx signing.
	pub chain_id: String,
	pub grpc_endpoint: String,
	pub websocket_endpoint: String,
	#[serde(default)]
	pub enable_tls: bool,
	/// BIP-39 mnemonic the feeder account is derived from.
	pub feeder_mnemonic: String,
	/// Optional override; otherwise the operator address is derived from the
	/// mnemonic.
	#[serde(default)]
	pub validator_address: Option<String>,
	/// JSON: `{source name -> {asset pair -> symbol}}`. Absent means empty.
	#[serde(default, deserialize_with = "from_json_str")]
	pub exchange_symbols_map: HashMap<String, HashMap<AssetPair, Symbol>>,
	/// JSON: `{source name -> opaque adapter config}`. Each adapter decodes
	/// its own blob.
	#[serde(default, deserialize_with = "from_json_str")]
	pub data_source_config_map: HashMap<String, serde_json::Value>,
}

impl Settings {
	pub fn load(config_path: Option<&str>) -> Result<Self, ConfigError> {
		let mut builder = Config::builder();
		if let Some(path) = config_path {
			builder = builder.add_source(File::with_name(path));
		}
		builder
			.add_source(Environment::default().try_parsing(true))
			.build()?
			.try_deserialize()
	}
}

/// The map-valued settings arrive as JSON encoded strings; decode them here
/// so the rest of the daemon sees typed maps.
fn from_json_str<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
	D: Deserializer<'de>,
	T: DeserializeOwned + Default,
{
	let raw: Option<String> = Option::deserialize(deserializer)?;
	match raw {
		None => Ok(T::default()),
		Some(s) if s.trim().is_empty() => Ok(T::default()),
		Some(s) => serde_json::from_str(&s).map_err(serde::de::Error::custom),
	}
}
