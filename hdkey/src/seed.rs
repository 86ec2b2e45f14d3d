//! Seed material: raw bytes, hex, or a BIP39 mnemonic stretched with PBKDF2.

use std::fmt;

use crypto_utils::stretch::mnemonic_to_seed;
use zeroize::Zeroizing;

use crate::error::{HdError, Result};

/// Passphrase used when a mnemonic is given without one.
pub const BIP39_MNEMONIC_NO_PASSPHRASE: &str = "";

/// Normalized seed bytes, wiped on drop.
#[derive(Clone, PartialEq, Eq)]
pub struct Seed(Zeroizing<Vec<u8>>);

impl Seed {
    /// Seed bytes used verbatim. Empty input is rejected.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.is_empty() {
            return Err(HdError::InvalidSeedEncoding("seed is empty".into()));
        }
        Ok(Seed(Zeroizing::new(bytes.to_vec())))
    }

    /// Decodes an even-length hex string.
    pub fn from_hex(seed_hex: &str) -> Result<Self> {
        let bytes = Zeroizing::new(
            hex::decode(seed_hex).map_err(|e| HdError::InvalidSeedEncoding(e.to_string()))?,
        );
        Self::from_bytes(&bytes)
    }

    /// Stretches a word list: words are joined by single spaces and fed to
    /// PBKDF2-HMAC-SHA512 (2048 rounds) with salt `"mnemonic" + passphrase`.
    ///
    /// Words are not checked against a BIP39 wordlist.
    pub fn from_mnemonic_words<S: AsRef<str>>(words: &[S], passphrase: &str) -> Result<Self> {
        if words.is_empty() || words.iter().any(|w| w.as_ref().is_empty()) {
            return Err(HdError::InvalidSeedEncoding("mnemonic is empty".into()));
        }
        let phrase = Zeroizing::new(
            words
                .iter()
                .map(AsRef::as_ref)
                .collect::<Vec<&str>>()
                .join(" "),
        );
        let seed = Zeroizing::new(mnemonic_to_seed(&phrase, passphrase));
        Ok(Seed(Zeroizing::new(seed.to_vec())))
    }

    /// Splits `mnemonic` on runs of ASCII whitespace, then as `from_mnemonic_words`.
    pub fn from_mnemonic(mnemonic: &str, passphrase: &str) -> Result<Self> {
        let words: Vec<&str> = mnemonic.split_ascii_whitespace().collect();
        Self::from_mnemonic_words(&words, passphrase)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl AsRef<[u8]> for Seed {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for Seed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Seed({} bytes)", self.0.len())
    }
}

/// The accepted input forms for seed material.
#[derive(Clone)]
pub enum SeedSource {
    Bytes(Vec<u8>),
    Hex(String),
    MnemonicWords {
        words: Vec<String>,
        passphrase: String,
    },
    Mnemonic {
        phrase: String,
        passphrase: String,
    },
}

impl SeedSource {
    /// Mnemonic phrase with the empty passphrase.
    pub fn mnemonic_no_passphrase(phrase: impl Into<String>) -> Self {
        SeedSource::Mnemonic {
            phrase: phrase.into(),
            passphrase: BIP39_MNEMONIC_NO_PASSPHRASE.to_owned(),
        }
    }

    /// Normalize this source into seed bytes.
    pub fn to_seed(&self) -> Result<Seed> {
        match self {
            SeedSource::Bytes(bytes) => Seed::from_bytes(bytes),
            SeedSource::Hex(seed_hex) => Seed::from_hex(seed_hex),
            SeedSource::MnemonicWords { words, passphrase } => {
                Seed::from_mnemonic_words(words.as_slice(), passphrase)
            }
            SeedSource::Mnemonic { phrase, passphrase } => Seed::from_mnemonic(phrase, passphrase),
        }
    }
}

impl fmt::Debug for SeedSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self {
            SeedSource::Bytes(_) => "Bytes",
            SeedSource::Hex(_) => "Hex",
            SeedSource::MnemonicWords { .. } => "MnemonicWords",
            SeedSource::Mnemonic { .. } => "Mnemonic",
        };
        write!(f, "SeedSource::{kind}(..)")
    }
}
