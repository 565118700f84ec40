//! Ed25519 transaction signing.
//!
//! The ledger verifies a signature over the Blake2b-256 digest of the
//! intent-prefixed transaction bytes. The serialized form submitted with a
//! transaction is scheme flag, signature, then public key, base64-encoded.
//! Addresses derive from Blake2b-256 over flag plus public key.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use blake2::digest::consts::U32;
use blake2::{Blake2b, Digest};
use ed25519_dalek::{Signer as _, SigningKey};
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;
use zeroize::{Zeroize, Zeroizing};

type Blake2b256 = Blake2b<U32>;

/// Signature scheme flag for Ed25519.
const ED25519_FLAG: u8 = 0x00;

/// Intent prefix for transaction data: scheme, version, app id.
const TX_INTENT: [u8; 3] = [0, 0, 0];

/// Key loading and signing errors.
#[derive(Debug, Error)]
pub enum KeyError {
    #[error("Environment variable not set: {0}")]
    EnvVarNotFound(String),

    #[error("Failed to read key file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid hex in key material: {0}")]
    InvalidHex(#[from] hex::FromHexError),

    #[error("Invalid key length: expected 32 bytes, got {0}")]
    InvalidLength(usize),
}

/// Where the signing key comes from.
///
/// The key is a hex-encoded 32-byte Ed25519 seed, with or without a 0x
/// prefix. Loaded once at startup; no runtime rotation.
#[derive(Debug, Clone)]
pub enum KeySource {
    /// Environment variable holding the hex seed (development and systemd
    /// deployments).
    EnvVar { var_name: String },
    /// File holding the hex seed (recommend 0600 permissions).
    File { path: PathBuf },
}

/// Ed25519 keypair with the derived on-chain address.
pub struct KeypairSigner {
    key: SigningKey,
    address: String,
}

impl KeypairSigner {
    /// Load the seed from the given source and derive the address.
    pub fn load(source: &KeySource) -> Result<Self, KeyError> {
        let hex_seed: Zeroizing<String> = match source {
            KeySource::EnvVar { var_name } => Zeroizing::new(
                std::env::var(var_name).map_err(|_| KeyError::EnvVarNotFound(var_name.clone()))?,
            ),
            KeySource::File { path } => Zeroizing::new(std::fs::read_to_string(path)?),
        };
        Self::from_hex(&hex_seed)
    }

    /// Build from a hex-encoded 32-byte seed. Surrounding whitespace and a
    /// 0x prefix are tolerated.
    pub fn from_hex(hex_seed: &str) -> Result<Self, KeyError> {
        let trimmed = hex_seed.trim().trim_start_matches("0x");
        let seed: Zeroizing<Vec<u8>> = Zeroizing::new(hex::decode(trimmed)?);
        if seed.len() != 32 {
            return Err(KeyError::InvalidLength(seed.len()));
        }

        let mut seed_arr = [0u8; 32];
        seed_arr.copy_from_slice(&seed);
        let key = SigningKey::from_bytes(&seed_arr);
        seed_arr.zeroize();

        let address = derive_address(&key.verifying_key().to_bytes());
        Ok(Self { key, address })
    }

    /// On-chain address of this keypair (0x plus 64 hex chars).
    #[must_use]
    pub fn address(&self) -> &str {
        &self.address
    }

    /// Sign raw transaction bytes, returning the serialized signature the
    /// execution endpoint expects (base64 of flag, signature, public key).
    #[must_use]
    pub fn sign_transaction(&self, tx_bytes: &[u8]) -> String {
        let mut hasher = Blake2b256::new();
        hasher.update(TX_INTENT);
        hasher.update(tx_bytes);
        let digest: [u8; 32] = hasher.finalize().into();

        let signature = self.key.sign(&digest);

        let mut serialized = Vec::with_capacity(1 + 64 + 32);
        serialized.push(ED25519_FLAG);
        serialized.extend_from_slice(&signature.to_bytes());
        serialized.extend_from_slice(&self.key.verifying_key().to_bytes());
        BASE64.encode(serialized)
    }
}

impl fmt::Debug for KeypairSigner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeypairSigner")
            .field("address", &self.address)
            .finish_non_exhaustive()
    }
}

/// Address = Blake2b-256 over scheme flag plus public key bytes.
fn derive_address(public_key: &[u8; 32]) -> String {
    let mut hasher = Blake2b256::new();
    hasher.update([ED25519_FLAG]);
    hasher.update(public_key);
    format!("0x{}", hex::encode(hasher.finalize()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ed25519_dalek::{Signature, Verifier, VerifyingKey};

    const SEED_HEX: &str = "0101010101010101010101010101010101010101010101010101010101010101";

    #[test]
    fn address_is_deterministic_and_well_formed() {
        let a = KeypairSigner::from_hex(SEED_HEX).unwrap();
        let b = KeypairSigner::from_hex(&format!("0x{SEED_HEX}")).unwrap();

        assert_eq!(a.address(), b.address());
        assert!(a.address().starts_with("0x"));
        assert_eq!(a.address().len(), 66);
    }

    #[test]
    fn whitespace_around_seed_is_tolerated() {
        let signer = KeypairSigner::from_hex(&format!("  {SEED_HEX}\n")).unwrap();
        assert_eq!(signer.address().len(), 66);
    }

    #[test]
    fn wrong_seed_length_is_rejected() {
        let err = KeypairSigner::from_hex("0102").unwrap_err();
        assert!(matches!(err, KeyError::InvalidLength(2)));

        let err = KeypairSigner::from_hex("zz").unwrap_err();
        assert!(matches!(err, KeyError::InvalidHex(_)));
    }

    #[test]
    fn serialized_signature_verifies_over_intent_digest() {
        let signer = KeypairSigner::from_hex(SEED_HEX).unwrap();
        let tx_bytes = b"transaction payload";

        let serialized = BASE64.decode(signer.sign_transaction(tx_bytes)).unwrap();
        assert_eq!(serialized.len(), 97);
        assert_eq!(serialized[0], ED25519_FLAG);

        // Recompute the digest the ledger would check against.
        let mut hasher = Blake2b256::new();
        hasher.update(TX_INTENT);
        hasher.update(tx_bytes);
        let digest: [u8; 32] = hasher.finalize().into();

        let signature = Signature::from_slice(&serialized[1..65]).unwrap();
        let public_key: [u8; 32] = serialized[65..97].try_into().unwrap();
        let verifying_key = VerifyingKey::from_bytes(&public_key).unwrap();

        verifying_key.verify(&digest, &signature).unwrap();
    }

    #[test]
    fn missing_env_var_is_reported() {
        let source = KeySource::EnvVar {
            var_name: "TIDE_TEST_KEY_THAT_DOES_NOT_EXIST".to_string(),
        };
        let err = KeypairSigner::load(&source).unwrap_err();
        assert!(matches!(err, KeyError::EnvVarNotFound(_)));
    }
}
