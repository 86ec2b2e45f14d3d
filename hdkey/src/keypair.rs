use std::fmt;

use crypto_utils::hash::sha256;
use secp256k1::{All, Message, PublicKey, Secp256k1, SecretKey, ecdsa::Signature};

use crate::derivation::DerivationPath;
use crate::error::{HdError, Result};
use crate::extended_key::ExtendedPrivKey;

/// ECDSA message for `data`: its SHA-256 digest.
fn message_for(data: &[u8]) -> core::result::Result<Message, secp256k1::Error> {
    Message::from_slice(&sha256(data))
}

/// A secp256k1 signing key pair.
#[derive(Clone, PartialEq, Eq)]
pub struct EcKeyPair {
    secret_key: SecretKey,
    public_key: PublicKey,
}

impl EcKeyPair {
    /// Builds a key pair from a 32-byte big-endian scalar.
    ///
    /// The scalar is validated again here even when it comes out of a
    /// derivation that already range-checked it.
    pub fn from_private_key_bytes(secp: &Secp256k1<All>, scalar: &[u8]) -> Result<Self> {
        let secret_key =
            SecretKey::from_slice(scalar).map_err(|_| HdError::KeyPairConstructionError)?;
        let public_key = PublicKey::from_secret_key(secp, &secret_key);
        Ok(EcKeyPair {
            secret_key,
            public_key,
        })
    }

    pub fn public_key(&self) -> &PublicKey {
        &self.public_key
    }

    /// SEC1 compressed public key, 33 bytes.
    pub fn public_key_bytes(&self) -> [u8; 33] {
        self.public_key.serialize()
    }

    /// SEC1 uncompressed public key, 65 bytes.
    pub fn uncompressed_public_key_bytes(&self) -> [u8; 65] {
        self.public_key.serialize_uncompressed()
    }

    pub fn private_key_bytes(&self) -> [u8; 32] {
        self.secret_key.secret_bytes()
    }

    /// ECDSA (RFC 6979 nonces) over SHA-256 of `message`.
    pub fn sign(
        &self,
        secp: &Secp256k1<All>,
        message: &[u8],
    ) -> core::result::Result<Signature, secp256k1::Error> {
        Ok(secp.sign_ecdsa(&message_for(message)?, &self.secret_key))
    }

    pub fn verify(&self, secp: &Secp256k1<All>, message: &[u8], signature: &Signature) -> bool {
        message_for(message)
            .and_then(|msg| secp.verify_ecdsa(&msg, signature, &self.public_key))
            .is_ok()
    }
}

impl fmt::Debug for EcKeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EcKeyPair")
            .field("public_key", &hex::encode(self.public_key_bytes()))
            .finish_non_exhaustive()
    }
}

/// A signing key pair together with the path it was derived at.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HdKeyPair {
    key_pair: EcKeyPair,
    path: DerivationPath,
}

impl HdKeyPair {
    pub fn new(key_pair: EcKeyPair, path: DerivationPath) -> Self {
        HdKeyPair { key_pair, path }
    }

    /// Turns the final node of a path walk into a key pair.
    pub fn from_extended_key(
        secp: &Secp256k1<All>,
        key: &ExtendedPrivKey,
        path: DerivationPath,
    ) -> Result<Self> {
        let key_pair = EcKeyPair::from_private_key_bytes(secp, &key.private_key_bytes())?;
        Ok(HdKeyPair { key_pair, path })
    }

    pub fn key_pair(&self) -> &EcKeyPair {
        &self.key_pair
    }

    pub fn path(&self) -> &DerivationPath {
        &self.path
    }

    pub fn into_parts(self) -> (EcKeyPair, DerivationPath) {
        (self.key_pair, self.path)
    }
}
