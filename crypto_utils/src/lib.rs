pub mod hash;
pub mod hmac;
pub mod stretch;
