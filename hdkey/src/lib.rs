//! Hierarchical deterministic (BIP32) secp256k1 key derivation from a seed,
//! hex string or BIP39 mnemonic.
//!
//! ```no_run
//! use hdkey::HdKeyPairDerivation;
//!
//! let session = HdKeyPairDerivation::mnemonic_no_passphrase(
//!     "abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon about",
//! )?;
//! let account = session.derive_key_at_path_str("m/44'/0'/0'/0/0")?;
//! println!("{}", hex::encode(account.key_pair().public_key_bytes()));
//! # Ok::<(), hdkey::HdError>(())
//! ```

pub mod derivation;
pub mod error;
pub mod extended_key;
pub mod keypair;
pub mod seed;
pub mod session;

pub use derivation::{ChildIndex, DerivationPath, HARDENED_OFFSET};
pub use error::{HdError, Result};
pub use extended_key::{ExtendedPrivKey, MASTER_HMAC_KEY};
pub use keypair::{EcKeyPair, HdKeyPair};
pub use secp256k1;
pub use seed::{BIP39_MNEMONIC_NO_PASSPHRASE, Seed, SeedSource};
pub use session::{DEFAULT_CACHE_CAPACITY, DerivationCache, HdKeyPairDerivation};
