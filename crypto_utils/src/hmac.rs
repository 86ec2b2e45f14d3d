use hmac::{Hmac, Mac};
use sha2::Sha512;

type HmacSha512 = Hmac<Sha512>;

/// HMAC-SHA512 over a message given as consecutive chunks.
///
/// The chunks are fed in order, so the result equals `hmac_sha512` of their
/// concatenation. Lets callers build the 37-byte CKD message without an
/// intermediate buffer.
pub fn hmac_sha512_chunks(key: &[u8], chunks: &[&[u8]]) -> [u8; 64] {
    let mut mac = HmacSha512::new_from_slice(key).expect("HMAC accepts keys of any length");
    for chunk in chunks {
        mac.update(chunk);
    }
    mac.finalize().into_bytes().into()
}

pub fn hmac_sha512(key: &[u8], data: &[u8]) -> [u8; 64] {
    hmac_sha512_chunks(key, &[data])
}

/// Split a 64-byte HMAC-SHA512 output into its `IL` and `IR` halves.
pub fn split_halves(output: &[u8; 64]) -> ([u8; 32], [u8; 32]) {
    let mut left = [0u8; 32];
    let mut right = [0u8; 32];
    left.copy_from_slice(&output[..32]);
    right.copy_from_slice(&output[32..]);
    (left, right)
}
