use anyhow::{anyhow, Result};
use bech32::{ToBase32, Variant};
use bip39::{Language, Mnemonic, Seed};
use secp256k1::{All, Message, PublicKey, Scalar, Secp256k1, SecretKey};
use sha3::{Digest, Keccak256};

use crate::constants::{ACCOUNT_ADDRESS_PREFIX, BIP44_COIN_TYPE, VALIDATOR_ADDRESS_PREFIX};

const HARDENED_OFFSET: u32 = 0x8000_0000;

/// The chain uses eth-flavoured accounts: BIP-44 coin type 60, keccak
/// addresses, keccak digests under ECDSA signatures.
fn derivation_path() -> [u32; 5] {
	[
		44 | HARDENED_OFFSET,
		BIP44_COIN_TYPE | HARDENED_OFFSET,
		HARDENED_OFFSET,
		0,
		0,
	]
}

/// Holds the feeder's signing key. Read-only after construction.
pub struct Keyring {
	secp: Secp256k1<All>,
	secret_key: SecretKey,
	public_key: PublicKey,
}

impl Keyring {
	pub fn from_mnemonic(phrase: &str) -> Result<Self> {
		let mnemonic = Mnemonic::from_phrase(phrase, Language::English)
			.map_err(|e| anyhow!("invalid mnemonic: {e}"))?;
		let seed = Seed::new(&mnemonic, "");

		let secp = Secp256k1::new();
		let secret_key = derive_key(&secp, seed.as_bytes(), &derivation_path())?;
		let public_key = PublicKey::from_secret_key(&secp, &secret_key);
		Ok(Self { secp, secret_key, public_key })
	}

	/// Signs the keccak digest of `bytes`, returning the compact signature.
	pub fn sign(&self, bytes: &[u8]) -> [u8; 64] {
		let digest: [u8; 32] = Keccak256::digest(bytes).into();
		let message = Message::from_digest(digest);
		self.secp.sign_ecdsa(&message, &self.secret_key).serialize_compact()
	}

	/// The compressed secp256k1 public key, as carried in txs.
	pub fn public_key(&self) -> [u8; 33] {
		self.public_key.serialize()
	}

	/// keccak256(pubkey)[12..], the eth-style account id.
	pub fn address_bytes(&self) -> [u8; 20] {
		let uncompressed = self.public_key.serialize_uncompressed();
		let digest: [u8; 32] = Keccak256::digest(&uncompressed[1..]).into();
		digest[12..].try_into().expect("20 byte slice of a 32 byte digest")
	}

	pub fn account_address(&self) -> String {
		encode_bech32(ACCOUNT_ADDRESS_PREFIX, &self.address_bytes())
	}

	pub fn validator_address(&self) -> String {
		encode_bech32(VALIDATOR_ADDRESS_PREFIX, &self.address_bytes())
	}
}

fn encode_bech32(prefix: &str, data: &[u8]) -> String {
	bech32::encode(prefix, data.to_base32(), Variant::Bech32).expect("hard-coded hrp is valid")
}

/// BIP-32 child key derivation over secp256k1. Indices at or above
/// 0x80000000 are hardened.
fn derive_key(secp: &Secp256k1<All>, seed: &[u8], path: &[u32]) -> Result<SecretKey> {
	let i = hmac_sha512::HMAC::mac(seed, b"Bitcoin seed");
	let mut key =
		SecretKey::from_slice(&i[..32]).map_err(|e| anyhow!("invalid master key: {e}"))?;
	let mut chain_code: [u8; 32] = i[32..].try_into().expect("hmac-sha512 output is 64 bytes");

	for &index in path {
		let mut data = Vec::with_capacity(37);
		if index >= HARDENED_OFFSET {
			data.push(0);
			data.extend_from_slice(&key.secret_bytes());
		} else {
			data.extend_from_slice(&PublicKey::from_secret_key(secp, &key).serialize());
		}
		data.extend_from_slice(&index.to_be_bytes());

		let i = hmac_sha512::HMAC::mac(&data, &chain_code);
		let tweak = Scalar::from_be_bytes(i[..32].try_into().expect("32 byte chunk"))
			.map_err(|e| anyhow!("derived key out of range: {e}"))?;
		key = key.add_tweak(&tweak).map_err(|e| anyhow!("derived key invalid: {e}"))?;
		chain_code = i[32..].try_into().expect("hmac-sha512 output is 64 bytes");
	}

	Ok(key)
}
