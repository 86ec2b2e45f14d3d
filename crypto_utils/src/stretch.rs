//! BIP39 mnemonic-to-seed stretching.

use pbkdf2::pbkdf2_hmac;
use sha2::Sha512;

/// PBKDF2 iteration count fixed by BIP39.
pub const PBKDF2_ROUNDS: u32 = 2048;

/// Length in bytes of a BIP39 seed.
pub const SEED_LEN: usize = 64;

/// Literal prefix of the PBKDF2 salt; the passphrase is appended to it.
pub const MNEMONIC_SALT_PREFIX: &str = "mnemonic";

/// PBKDF2-HMAC-SHA512 with the BIP39 parameters.
///
/// `phrase` is the space-joined word list, `passphrase` may be empty.
pub fn mnemonic_to_seed(phrase: &str, passphrase: &str) -> [u8; SEED_LEN] {
    let mut salt = Vec::with_capacity(MNEMONIC_SALT_PREFIX.len() + passphrase.len());
    salt.extend_from_slice(MNEMONIC_SALT_PREFIX.as_bytes());
    salt.extend_from_slice(passphrase.as_bytes());

    let mut seed = [0u8; SEED_LEN];
    pbkdf2_hmac::<Sha512>(phrase.as_bytes(), &salt, PBKDF2_ROUNDS, &mut seed);
    seed
}
