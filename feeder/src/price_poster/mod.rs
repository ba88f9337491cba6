//! The price poster: turns one voting period's prices into the commit-reveal
//! message pair, wraps them in a signed transaction and broadcasts it.

mod vote;

use anyhow::{anyhow, bail, Result};
use async_trait::async_trait;
use prost::Message;
use tracing::{error, info};

pub use vote::{aggregate_vote_hash, exchange_rates_string, new_prevote};

use crate::{
	chain_client::{proto, GrpcClient},
	constants::{FEE_DENOM, TX_FEE_AMOUNT, TX_GAS_LIMIT, TX_TIMEOUT},
	keys::Keyring,
	metrics::PRICES_POSTED_COUNTER,
	types::{Price, PricePoster, Prevote, VotingPeriod},
};

pub struct Client {
	validator: String,
	feeder: String,
	chain_id: String,
	keyring: Keyring,
	grpc: GrpcClient,
}

impl Client {
	pub fn dial(
		grpc_endpoint: &str,
		chain_id: &str,
		enable_tls: bool,
		keyring: Keyring,
		validator: String,
		feeder: String,
	) -> Result<Self> {
		Ok(Self {
			validator,
			feeder,
			chain_id: chain_id.to_string(),
			keyring,
			grpc: GrpcClient::connect(grpc_endpoint, enable_tls)?,
		})
	}

	async fn vote(
		&mut self,
		new_prevote: &Prevote,
		previous_prevote: Option<&Prevote>,
	) -> Result<String> {
		let mut messages = Vec::with_capacity(2);

		match previous_prevote {
			Some(previous) => {
				let reveal = proto::MsgAggregateExchangeRateVote {
					salt: previous.salt.clone(),
					exchange_rates: exchange_rates_string(&previous.prices),
					feeder: self.feeder.clone(),
					validator: self.validator.clone(),
				};
				messages.push(pack_any(
					proto::MSG_AGGREGATE_EXCHANGE_RATE_VOTE_TYPE_URL,
					&reveal,
				));
				info!("prepared vote message");
			},
			None => info!("skipping vote preparation as there is no old prevote"),
		}

		let commit = proto::MsgAggregateExchangeRatePrevote {
			hash: new_prevote.hash.clone(),
			feeder: self.feeder.clone(),
			validator: self.validator.clone(),
		};
		messages.push(pack_any(proto::MSG_AGGREGATE_EXCHANGE_RATE_PREVOTE_TYPE_URL, &commit));

		let account = self.grpc.account(&self.feeder).await?;
		let tx = build_signed_tx(&self.keyring, &self.chain_id, &account, messages);

		let response = self.grpc.broadcast_tx(tx).await?;
		if response.code != 0 {
			bail!(
				"tx rejected with code {} ({}): {}",
				response.code,
				response.codespace,
				response.raw_log
			);
		}
		Ok(response.txhash)
	}
}

#[async_trait]
impl PricePoster for Client {
	fn whoami(&self) -> &str {
		&self.validator
	}

	async fn send_prices(
		&mut self,
		voting_period: VotingPeriod,
		_prices: &[Price],
		new_prevote: &Prevote,
		previous_prevote: Option<&Prevote>,
	) -> Result<String> {
		let result = match tokio::time::timeout(
			TX_TIMEOUT,
			self.vote(new_prevote, previous_prevote),
		)
		.await
		{
			Ok(result) => result,
			Err(_) => Err(anyhow!("vote broadcast timed out after {TX_TIMEOUT:?}")),
		};

		match &result {
			Ok(tx_hash) => {
				info!(
					voting_period_height = voting_period.height,
					tx_hash = %tx_hash,
					"successfully forwarded prices"
				);
				PRICES_POSTED_COUNTER.with_label_values(&["true"]).inc();
			},
			Err(e) => {
				error!(voting_period_height = voting_period.height, "prevote failed: {e:#}");
				PRICES_POSTED_COUNTER.with_label_values(&["false"]).inc();
			},
		}
		result
	}
}

fn pack_any<M: Message>(type_url: &str, message: &M) -> proto::Any {
	proto::Any { type_url: type_url.to_string(), value: message.encode_to_vec() }
}

/// Assembles and signs a single-signer direct-mode transaction.
fn build_signed_tx(
	keyring: &Keyring,
	chain_id: &str,
	account: &proto::BaseAccount,
	messages: Vec<proto::Any>,
) -> proto::TxRaw {
	let body = proto::TxBody { messages, memo: String::new(), timeout_height: 0 };

	let public_key = proto::PubKey { key: keyring.public_key().to_vec() };
	let signer_info = proto::SignerInfo {
		public_key: Some(pack_any(proto::ETH_SECP256K1_PUBKEY_TYPE_URL, &public_key)),
		mode_info: Some(proto::ModeInfo {
			sum: Some(proto::mode_info::Sum::Single(proto::mode_info::Single {
				mode: proto::SignMode::Direct as i32,
			})),
		}),
		sequence: account.sequence,
	};
	let auth_info = proto::AuthInfo {
		signer_infos: vec![signer_info],
		fee: Some(proto::Fee {
			amount: vec![proto::Coin {
				denom: FEE_DENOM.to_string(),
				amount: TX_FEE_AMOUNT.to_string(),
			}],
			gas_limit: TX_GAS_LIMIT,
			payer: String::new(),
			granter: String::new(),
		}),
	};

	let body_bytes = body.encode_to_vec();
	let auth_info_bytes = auth_info.encode_to_vec();
	let sign_doc = proto::SignDoc {
		body_bytes: body_bytes.clone(),
		auth_info_bytes: auth_info_bytes.clone(),
		chain_id: chain_id.to_string(),
		account_number: account.account_number,
	};
	let signature = keyring.sign(&sign_doc.encode_to_vec());

	proto::TxRaw { body_bytes, auth_info_bytes, signatures: vec![signature.to_vec()] }
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::types::AssetPair;

	const DEV_MNEMONIC: &str =
		"test test test test test test test test test test test junk";

	fn account() -> proto::BaseAccount {
		proto::BaseAccount {
			address: "vsc1feeder".to_string(),
			pub_key: None,
			account_number: 7,
			sequence: 42,
		}
	}

	#[test]
	fn builds_a_decodable_signed_tx() {
		let keyring = Keyring::from_mnemonic(DEV_MNEMONIC).unwrap();
		let prevote = new_prevote(
			vec![Price {
				pair: AssetPair::from("ubtc:unusd"),
				value: 30_000.0,
				source_name: "bitfinex".to_string(),
				valid: true,
			}],
			100,
			"vscvaloper1xyz",
		);
		let commit = proto::MsgAggregateExchangeRatePrevote {
			hash: prevote.hash.clone(),
			feeder: "vsc1feeder".to_string(),
			validator: "vscvaloper1xyz".to_string(),
		};

		let tx = build_signed_tx(
			&keyring,
			"vsc-localnet-0",
			&account(),
			vec![pack_any(proto::MSG_AGGREGATE_EXCHANGE_RATE_PREVOTE_TYPE_URL, &commit)],
		);

		let body = proto::TxBody::decode(tx.body_bytes.as_slice()).unwrap();
		assert_eq!(body.messages.len(), 1);
		assert_eq!(
			body.messages[0].type_url,
			proto::MSG_AGGREGATE_EXCHANGE_RATE_PREVOTE_TYPE_URL
		);
		let decoded =
			proto::MsgAggregateExchangeRatePrevote::decode(body.messages[0].value.as_slice())
				.unwrap();
		assert_eq!(decoded, commit);

		let auth_info = proto::AuthInfo::decode(tx.auth_info_bytes.as_slice()).unwrap();
		assert_eq!(auth_info.signer_infos.len(), 1);
		assert_eq!(auth_info.signer_infos[0].sequence, 42);
		assert_eq!(auth_info.fee.unwrap().amount[0].denom, FEE_DENOM);

		assert_eq!(tx.signatures.len(), 1);
		assert_eq!(tx.signatures[0].len(), 64);
	}

	#[test]
	fn the_signature_covers_the_account_number() {
		let keyring = Keyring::from_mnemonic(DEV_MNEMONIC).unwrap();
		let messages = vec![pack_any(
			proto::MSG_AGGREGATE_EXCHANGE_RATE_PREVOTE_TYPE_URL,
			&proto::MsgAggregateExchangeRatePrevote::default(),
		)];

		let tx_a = build_signed_tx(&keyring, "vsc-localnet-0", &account(), messages.clone());
		let mut other_account = account();
		other_account.account_number += 1;
		let tx_b = build_signed_tx(&keyring, "vsc-localnet-0", &other_account, messages);

		assert_eq!(tx_a.body_bytes, tx_b.body_bytes);
		assert_ne!(tx_a.signatures, tx_b.signatures);
	}
}
