// Crypto module declarations

pub mod hash;
pub mod keys;
pub mod secretbox;
pub mod x25519;
