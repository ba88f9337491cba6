//! Hand-rolled protobuf messages for the slice of the node's gRPC surface the
//! feeder talks to: the oracle query/vote messages, the auth account query,
//! and the tx broadcast service. The shapes are stable enough that build-time
//! codegen would be more machinery than message.

/// `google.protobuf.Any`.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Any {
	#[prost(string, tag = "1")]
	pub type_url: String,
	#[prost(bytes = "vec", tag = "2")]
	pub value: Vec<u8>,
}

// ======= vsc.oracle.v1 =======

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct OracleParams {
	#[prost(uint64, tag = "1")]
	pub vote_period: u64,
	#[prost(string, repeated, tag = "2")]
	pub whitelist: Vec<String>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct QueryParamsRequest {}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct QueryParamsResponse {
	#[prost(message, optional, tag = "1")]
	pub params: Option<OracleParams>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct QueryVoteTargetsRequest {}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct QueryVoteTargetsResponse {
	#[prost(string, repeated, tag = "1")]
	pub vote_targets: Vec<String>,
}

/// The commit half of the vote pair: a hash over the rates the validator
/// intends to reveal next period.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct MsgAggregateExchangeRatePrevote {
	#[prost(string, tag = "1")]
	pub hash: String,
	#[prost(string, tag = "2")]
	pub feeder: String,
	#[prost(string, tag = "3")]
	pub validator: String,
}

/// The reveal half: the plaintext rates and salt for the prior commit.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct MsgAggregateExchangeRateVote {
	#[prost(string, tag = "1")]
	pub salt: String,
	#[prost(string, tag = "2")]
	pub exchange_rates: String,
	#[prost(string, tag = "3")]
	pub feeder: String,
	#[prost(string, tag = "4")]
	pub validator: String,
}

pub const MSG_AGGREGATE_EXCHANGE_RATE_PREVOTE_TYPE_URL: &str =
	"/vsc.oracle.v1.MsgAggregateExchangeRatePrevote";
pub const MSG_AGGREGATE_EXCHANGE_RATE_VOTE_TYPE_URL: &str =
	"/vsc.oracle.v1.MsgAggregateExchangeRateVote";

// ======= cosmos.auth.v1beta1 / vsc.types.v1 =======

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct BaseAccount {
	#[prost(string, tag = "1")]
	pub address: String,
	#[prost(message, optional, tag = "2")]
	pub pub_key: Option<Any>,
	#[prost(uint64, tag = "3")]
	pub account_number: u64,
	#[prost(uint64, tag = "4")]
	pub sequence: u64,
}

/// The chain wraps its eth-flavoured accounts around a plain base account.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct EthAccount {
	#[prost(message, optional, tag = "1")]
	pub base_account: Option<BaseAccount>,
	#[prost(string, tag = "2")]
	pub code_hash: String,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct QueryAccountRequest {
	#[prost(string, tag = "1")]
	pub address: String,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct QueryAccountResponse {
	#[prost(message, optional, tag = "1")]
	pub account: Option<Any>,
}

// ======= cosmos.crypto =======

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct PubKey {
	#[prost(bytes = "vec", tag = "1")]
	pub key: Vec<u8>,
}

pub const ETH_SECP256K1_PUBKEY_TYPE_URL: &str = "/vsc.crypto.v1.ethsecp256k1.PubKey";

// ======= cosmos.tx.v1beta1 =======

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct TxBody {
	#[prost(message, repeated, tag = "1")]
	pub messages: Vec<Any>,
	#[prost(string, tag = "2")]
	pub memo: String,
	#[prost(uint64, tag = "3")]
	pub timeout_height: u64,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct SignerInfo {
	#[prost(message, optional, tag = "1")]
	pub public_key: Option<Any>,
	#[prost(message, optional, tag = "2")]
	pub mode_info: Option<ModeInfo>,
	#[prost(uint64, tag = "3")]
	pub sequence: u64,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ModeInfo {
	#[prost(oneof = "mode_info::Sum", tags = "1")]
	pub sum: Option<mode_info::Sum>,
}

pub mod mode_info {
	#[derive(Clone, PartialEq, ::prost::Message)]
	pub struct Single {
		#[prost(enumeration = "super::SignMode", tag = "1")]
		pub mode: i32,
	}

	#[derive(Clone, PartialEq, ::prost::Oneof)]
	pub enum Sum {
		#[prost(message, tag = "1")]
		Single(Single),
	}
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ::prost::Enumeration)]
#[repr(i32)]
pub enum SignMode {
	Unspecified = 0,
	Direct = 1,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Coin {
	#[prost(string, tag = "1")]
	pub denom: String,
	#[prost(string, tag = "2")]
	pub amount: String,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Fee {
	#[prost(message, repeated, tag = "1")]
	pub amount: Vec<Coin>,
	#[prost(uint64, tag = "2")]
	pub gas_limit: u64,
	#[prost(string, tag = "3")]
	pub payer: String,
	#[prost(string, tag = "4")]
	pub granter: String,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct AuthInfo {
	#[prost(message, repeated, tag = "1")]
	pub signer_infos: Vec<SignerInfo>,
	#[prost(message, optional, tag = "2")]
	pub fee: Option<Fee>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct SignDoc {
	#[prost(bytes = "vec", tag = "1")]
	pub body_bytes: Vec<u8>,
	#[prost(bytes = "vec", tag = "2")]
	pub auth_info_bytes: Vec<u8>,
	#[prost(string, tag = "3")]
	pub chain_id: String,
	#[prost(uint64, tag = "4")]
	pub account_number: u64,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct TxRaw {
	#[prost(bytes = "vec", tag = "1")]
	pub body_bytes: Vec<u8>,
	#[prost(bytes = "vec", tag = "2")]
	pub auth_info_bytes: Vec<u8>,
	#[prost(bytes = "vec", repeated, tag = "3")]
	pub signatures: Vec<Vec<u8>>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ::prost::Enumeration)]
#[repr(i32)]
pub enum BroadcastMode {
	Unspecified = 0,
	Block = 1,
	Sync = 2,
	Async = 3,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct BroadcastTxRequest {
	#[prost(bytes = "vec", tag = "1")]
	pub tx_bytes: Vec<u8>,
	#[prost(enumeration = "BroadcastMode", tag = "2")]
	pub mode: i32,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct TxResponse {
	#[prost(int64, tag = "1")]
	pub height: i64,
	#[prost(string, tag = "2")]
	pub txhash: String,
	#[prost(string, tag = "3")]
	pub codespace: String,
	#[prost(uint32, tag = "4")]
	pub code: u32,
	#[prost(string, tag = "6")]
	pub raw_log: String,
	#[prost(int64, tag = "9")]
	pub gas_wanted: i64,
	#[prost(int64, tag = "10")]
	pub gas_used: i64,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct BroadcastTxResponse {
	#[prost(message, optional, tag = "1")]
	pub tx_response: Option<TxResponse>,
}
