// X25519 ephemeral keys for the per-session Diffie-Hellman exchange.

use rand::rngs::OsRng;
use rand::{CryptoRng, RngCore};
use x25519_dalek::{PublicKey, StaticSecret};

/// An X25519 ephemeral keypair for one handshake attempt.
///
/// Never reused across attempts; the secret is zeroized on drop.
pub struct EphemeralKeyPair {
    secret: StaticSecret,
    public: PublicKey,
}

impl EphemeralKeyPair {
    /// Generate a new keypair from the given CSPRNG.
    pub fn generate<R: RngCore + CryptoRng>(rng: &mut R) -> Self {
        let secret = StaticSecret::random_from_rng(rng);
        let public = PublicKey::from(&secret);
        Self { secret, public }
    }

    /// Generate a new keypair from the operating system RNG.
    pub fn generate_os() -> Self {
        Self::generate(&mut OsRng)
    }

    /// Create from existing secret bytes (used in deterministic tests).
    pub fn from_secret_bytes(bytes: [u8; 32]) -> Self {
        let secret = StaticSecret::from(bytes);
        let public = PublicKey::from(&secret);
        Self { secret, public }
    }

    /// The 32-byte public key.
    pub fn public_key_bytes(&self) -> [u8; 32] {
        *self.public.as_bytes()
    }

    /// Perform Diffie-Hellman with a peer's public key, returning the 32-byte shared secret.
    pub fn diffie_hellman(&self, peer_public: &[u8; 32]) -> [u8; 32] {
        let peer_pk = PublicKey::from(*peer_public);
        self.secret.diffie_hellman(&peer_pk).to_bytes()
    }

    /// Diffie-Hellman against an already-converted Curve25519 key.
    pub fn diffie_hellman_with(&self, peer_public: &PublicKey) -> [u8; 32] {
        self.secret.diffie_hellman(peer_public).to_bytes()
    }
}
