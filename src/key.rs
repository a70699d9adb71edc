use std::{collections::HashSet, fmt};

use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use rand::RngCore;
use serde::{Serialize, Serializer};
use thiserror::Error;

/// ASN.1 DER header of an ed25519 PKCS#8 private key, as exported by wallets and portals.
const ED25519_PRIVATE_DER_PREFIX: [u8; 16] = [
    0x30, 0x2e, 0x02, 0x01, 0x00, 0x30, 0x05, 0x06, 0x03, 0x2b, 0x65, 0x70, 0x04, 0x22, 0x04, 0x20,
];

#[derive(Debug, Error)]
pub enum KeyError {
    #[error("Key is not valid hex: {0}")]
    Hex(#[from] hex::FromHexError),
    #[error("Unsupported ed25519 private key length: {0} bytes")]
    Length(usize),
    #[error("Threshold {threshold} is out of range for a list of {keys} keys")]
    Threshold { threshold: u32, keys: usize },
}

#[derive(Clone)]
pub struct PrivateKey(SigningKey);

impl PrivateKey {
    pub fn generate_ed25519() -> Self {
        let mut seed = [0u8; 32];
        rand::thread_rng().fill_bytes(&mut seed);
        Self(SigningKey::from_bytes(&seed))
    }

    /// Accepts a raw 32-byte seed, a 64-byte seed+public pair, or a DER encoded key, hex encoded.
    pub fn from_str_ed25519(s: &str) -> Result<Self, KeyError> {
        let raw = s.trim();
        let bytes = hex::decode(raw.strip_prefix("0x").unwrap_or(raw))?;
        let seed: &[u8] = match bytes.len() {
            32 => &bytes,
            48 if bytes.starts_with(&ED25519_PRIVATE_DER_PREFIX) => &bytes[16..],
            64 => &bytes[..32],
            len => return Err(KeyError::Length(len)),
        };
        let seed: [u8; 32] = seed.try_into().map_err(|_| KeyError::Length(seed.len()))?;
        Ok(Self(SigningKey::from_bytes(&seed)))
    }

    pub fn public_key(&self) -> PublicKey {
        PublicKey(self.0.verifying_key())
    }

    pub fn sign(&self, message: &[u8]) -> Signature {
        self.0.sign(message)
    }

    pub fn to_string_raw(&self) -> String {
        hex::encode(self.0.to_bytes())
    }
}

impl fmt::Debug for PrivateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("PrivateKey").field(&self.public_key()).finish()
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct PublicKey(VerifyingKey);

impl PublicKey {
    pub fn verify(&self, message: &[u8], signature: &Signature) -> bool {
        self.0.verify(message, signature).is_ok()
    }

    pub fn to_string_raw(&self) -> String {
        hex::encode(self.0.to_bytes())
    }
}

impl fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PublicKey({})", self.to_string_raw())
    }
}

impl fmt::Display for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_string_raw())
    }
}

impl Serialize for PublicKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string_raw())
    }
}

/// `threshold` of `keys` must sign.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct KeyList {
    keys: Vec<PublicKey>,
    threshold: u32,
}

impl KeyList {
    pub fn new(keys: Vec<PublicKey>, threshold: u32) -> Result<Self, KeyError> {
        if threshold == 0 || threshold as usize > keys.len() {
            return Err(KeyError::Threshold {
                threshold,
                keys: keys.len(),
            });
        }
        Ok(Self { keys, threshold })
    }

    pub fn keys(&self) -> &[PublicKey] {
        &self.keys
    }

    pub fn threshold(&self) -> u32 {
        self.threshold
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Key {
    Single(PublicKey),
    List(KeyList),
}

impl Key {
    pub fn is_satisfied_by(&self, signers: &HashSet<PublicKey>) -> bool {
        match self {
            Key::Single(key) => signers.contains(key),
            Key::List(list) => {
                let signed = list.keys.iter().filter(|k| signers.contains(k)).count();
                signed >= list.threshold as usize
            }
        }
    }
}

impl From<PublicKey> for Key {
    fn from(key: PublicKey) -> Self {
        Key::Single(key)
    }
}

impl From<KeyList> for Key {
    fn from(list: KeyList) -> Self {
        Key::List(list)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SEED_HEX: &str = "9d61b19deffd5a60ba844af492ec2cc44449c5697b326919703bac031cae7f60";

    #[test]
    fn parse_raw_and_der_private_keys() {
        let raw = PrivateKey::from_str_ed25519(SEED_HEX).unwrap();
        let der = PrivateKey::from_str_ed25519(&format!("302e020100300506032b657004220420{SEED_HEX}"))
            .unwrap();
        assert_eq!(raw.public_key(), der.public_key());
        assert_eq!(raw.to_string_raw(), SEED_HEX);

        let err = PrivateKey::from_str_ed25519("abcd").unwrap_err();
        assert!(matches!(err, KeyError::Length(2)));
    }

    #[test]
    fn sign_and_verify() {
        let key = PrivateKey::generate_ed25519();
        let signature = key.sign(b"payload");
        assert!(key.public_key().verify(b"payload", &signature));
        assert!(!key.public_key().verify(b"other", &signature));
        assert!(!PrivateKey::generate_ed25519()
            .public_key()
            .verify(b"payload", &signature));
    }

    #[test]
    fn threshold_key_list() {
        let a = PrivateKey::generate_ed25519().public_key();
        let b = PrivateKey::generate_ed25519().public_key();
        let key = Key::from(KeyList::new(vec![a, b], 1).unwrap());

        assert!(key.is_satisfied_by(&HashSet::from([b])));
        assert!(!key.is_satisfied_by(&HashSet::new()));

        let err = KeyList::new(vec![a, b], 3).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Threshold 3 is out of range for a list of 2 keys"
        );
    }
}
