pub mod authority;

pub use authority::FundAuthority;

use chrono::Utc;
use rand::rngs::OsRng;
use ripemd::Ripemd160;
use secp256k1::{Message, PublicKey, Secp256k1, ecdsa::Signature};
use sha2::{Digest, Sha256};

use crate::error::{NodeError, Result};
use crate::transaction::{LineItem, Transaction, TxKind};

/// Version byte prepended to the key hash; base58-encodes to a leading 'd'.
const ADDRESS_VERSION: u8 = 0x5a;
const ADDRESS_CHECKSUM_LEN: usize = 4;

/// Generate a new secp256k1 keypair and return (priv_hex, pub_hex_compressed, address).
pub fn generate_keypair_hex() -> (String, String, String) {
    let secp = Secp256k1::new();
    let (sk, pk) = secp.generate_keypair(&mut OsRng);
    let sk_hex = hex::encode(sk.secret_bytes());
    let pk_bytes = pk.serialize();
    let address = address_from_key_bytes(&pk_bytes);
    (sk_hex, hex::encode(pk_bytes), address)
}

fn address_from_key_bytes(pubkey: &[u8]) -> String {
    let key_hash = Ripemd160::digest(Sha256::digest(pubkey));
    let mut payload = Vec::with_capacity(1 + key_hash.len() + ADDRESS_CHECKSUM_LEN);
    payload.push(ADDRESS_VERSION);
    payload.extend_from_slice(&key_hash);
    let checksum = Sha256::digest(Sha256::digest(&payload));
    payload.extend_from_slice(&checksum[..ADDRESS_CHECKSUM_LEN]);
    bs58::encode(payload).into_string()
}

/// Derive the 34-character wallet address of a hex public key
/// (compressed or uncompressed).
pub fn address_from_public_key(pubkey_hex: &str) -> Result<String> {
    let bytes = hex::decode(pubkey_hex)
        .map_err(|_| NodeError::structural("invalid pubkey hex"))?;
    let pk = PublicKey::from_slice(&bytes)
        .map_err(|_| NodeError::structural("invalid pubkey bytes"))?;
    Ok(address_from_key_bytes(&pk.serialize()))
}

/// Verify a signature (hex DER) against the given pubkey (hex) and message hash (32 bytes).
#[allow(deprecated)]
pub fn verify_signature_hex(pubkey_hex: &str, sig_hex: &str, msg32: [u8; 32]) -> Result<bool> {
    let secp = Secp256k1::verification_only();

    let sig_bytes =
        hex::decode(sig_hex).map_err(|_| NodeError::unauthorized("invalid signature hex"))?;
    let sig = Signature::from_der(&sig_bytes)
        .map_err(|_| NodeError::unauthorized("invalid DER signature"))?;

    let pk_bytes =
        hex::decode(pubkey_hex).map_err(|_| NodeError::unauthorized("invalid pubkey hex"))?;
    let pk = PublicKey::from_slice(&pk_bytes)
        .map_err(|_| NodeError::unauthorized("invalid pubkey bytes"))?;

    let msg = Message::from_slice(&msg32)
        .map_err(|_| NodeError::unauthorized("invalid message length"))?;
    Ok(secp.verify_ecdsa(&msg, &sig, &pk).is_ok())
}

/// Signature check used for authority confirmations and owner withdrawals.
pub trait SignatureVerifier: Send + Sync {
    /// `message` is a hex-encoded 32-byte digest (a transaction ID).
    fn verify(&self, message: &str, signature: &str, public_key: &str) -> bool;
}

/// ECDSA over secp256k1 with hex DER signatures.
#[derive(Debug, Clone, Copy, Default)]
pub struct Secp256k1Verifier;

impl SignatureVerifier for Secp256k1Verifier {
    fn verify(&self, message: &str, signature: &str, public_key: &str) -> bool {
        let Ok(digest) = hex::decode(message) else {
            return false;
        };
        let Ok(msg32) = <[u8; 32]>::try_from(digest.as_slice()) else {
            return false;
        };
        verify_signature_hex(public_key, signature, msg32).unwrap_or(false)
    }
}

/// Build an unsigned, pending single-item transaction stamped with the
/// current time.
pub fn create_transaction(
    wallet: &str,
    wallet_key: &str,
    wallet_owner: &str,
    amount: i64,
    month: u32,
    year: u32,
    kind: TxKind,
) -> Transaction {
    Transaction::new(vec![LineItem {
        wallet: wallet.to_string(),
        wallet_key: wallet_key.to_string(),
        wallet_owner: wallet_owner.to_string(),
        amount,
        month,
        year,
        kind,
        timestamp: Utc::now().timestamp(),
    }])
}

/// Keypair with signing ability, for tests only.
#[cfg(test)]
pub struct TestKeys {
    secret: secp256k1::SecretKey,
    pub public_key: String,
    pub address: String,
}

#[cfg(test)]
impl TestKeys {
    pub fn generate() -> Self {
        let secp = Secp256k1::new();
        let (secret, pk) = secp.generate_keypair(&mut OsRng);
        let bytes = pk.serialize();
        Self {
            secret,
            public_key: hex::encode(bytes),
            address: address_from_key_bytes(&bytes),
        }
    }

    pub fn authority(&self) -> FundAuthority {
        FundAuthority::new(self.address.clone(), self.public_key.clone())
    }

    /// Hex DER signature over a hex 32-byte digest.
    #[allow(deprecated)]
    pub fn sign(&self, message_hex: &str) -> String {
        let digest = hex::decode(message_hex).expect("hex digest");
        let msg = Message::from_slice(&digest).expect("32-byte digest");
        let sig = Secp256k1::new().sign_ecdsa(&msg, &self.secret);
        hex::encode(&sig.serialize_der()[..])
    }
}
