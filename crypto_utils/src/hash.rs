use sha2::{Digest, Sha256};

/// SHA-256 digest of `input`, used as the ECDSA message digest.
pub fn sha256(input: &[u8]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(input);
    hasher.finalize().into()
}
