// Per-attempt handshake context: keys, intermediates and the cryptographic steps.

use zeroize::Zeroize;

use crate::config::NetworkKey;
use crate::crypto::hash::ct_eq;
use crate::crypto::keys::{is_low_order_point, LongTermKeyPair, PublicKey, SIGNATURE_LENGTH};
use crate::crypto::secretbox::{SecretBox, ZERO_NONCE};
use crate::crypto::x25519::EphemeralKeyPair;
use crate::error::{HandshakeError, Result};
use crate::handshake::derive::{
    app_mac, derive_final_secret, derive_secret2, derive_secret3, derive_session_keys,
    transcript_hash, SessionKeys,
};
use crate::handshake::messages::{
    Challenge, ClientAuth, ServerAuth, APP_MAC_LENGTH, CLIENT_AUTH_LENGTH, HELLO_LENGTH,
    SERVER_AUTH_LENGTH,
};

/// Mutable state of a single handshake attempt.
///
/// Owned exclusively by one `ClientHandshake` or `ServerHandshake`. All
/// secret intermediates are wiped on drop and once the session keys have
/// been derived.
pub struct HandshakeContext {
    network_key: NetworkKey,
    local: LongTermKeyPair,
    ephemeral: EphemeralKeyPair,
    remote_public: Option<PublicKey>,
    remote_ephemeral: [u8; 32],
    local_app_mac: [u8; APP_MAC_LENGTH],
    remote_app_mac: [u8; APP_MAC_LENGTH],
    secret: [u8; 32],
    sec_hash: [u8; 32],
    a_bob: [u8; 32],
    b_alice: [u8; 32],
    secret2: [u8; 32],
    secret3: [u8; 32],
    hello: [u8; HELLO_LENGTH],
}

impl HandshakeContext {
    /// `remote_public` is the server's key for a client and `None` for a
    /// server, which learns it from ClientAuth.
    pub fn new(
        network_key: NetworkKey,
        local: LongTermKeyPair,
        ephemeral: EphemeralKeyPair,
        remote_public: Option<PublicKey>,
    ) -> Result<Self> {
        let local_app_mac = app_mac(&network_key, &ephemeral.public_key_bytes())?;
        Ok(Self {
            network_key,
            local,
            ephemeral,
            remote_public,
            remote_ephemeral: [0u8; 32],
            local_app_mac,
            remote_app_mac: [0u8; APP_MAC_LENGTH],
            secret: [0u8; 32],
            sec_hash: [0u8; 32],
            a_bob: [0u8; 32],
            b_alice: [0u8; 32],
            secret2: [0u8; 32],
            secret3: [0u8; 32],
            hello: [0u8; HELLO_LENGTH],
        })
    }

    pub fn local_public(&self) -> PublicKey {
        self.local.public_key()
    }

    pub fn remote_public(&self) -> Option<PublicKey> {
        self.remote_public
    }

    /// Our challenge: `app MAC ‖ ephemeral public key`.
    pub fn challenge(&self) -> Challenge {
        Challenge::new(&self.local_app_mac, &self.ephemeral.public_key_bytes())
    }

    /// Check the peer's challenge MAC and, on success, derive the shared
    /// ephemeral secret and the transcript hash.
    pub fn verify_challenge(&mut self, challenge: &Challenge) -> Result<bool> {
        let remote_ephemeral = challenge.ephemeral_public();
        let expected = app_mac(&self.network_key, &remote_ephemeral)?;
        if !ct_eq(&expected, &challenge.mac()) {
            return Ok(false);
        }

        self.remote_ephemeral = remote_ephemeral;
        self.remote_app_mac = challenge.mac();
        self.secret = self.ephemeral.diffie_hellman(&remote_ephemeral);
        self.sec_hash = transcript_hash(&self.secret);
        Ok(true)
    }

    // ── Client steps ────────────────────────────────────────────────────

    /// Sign the server's identity and the transcript, then box the hello
    /// under `secret2`.
    pub fn client_auth(&mut self) -> Result<ClientAuth> {
        let server = self.require_remote()?;
        self.a_bob = self.ephemeral.diffie_hellman_with(&server.to_curve25519()?);
        self.secret2 = derive_secret2(&self.network_key, &self.secret, &self.a_bob);

        let signature = self.local.sign(&self.signed_by_client(&server));
        self.hello[..SIGNATURE_LENGTH].copy_from_slice(&signature);
        self.hello[SIGNATURE_LENGTH..].copy_from_slice(self.local.public_key().as_bytes());

        let sealed = SecretBox::new(&self.secret2)
            .seal(&ZERO_NONCE, &self.hello)
            .map_err(|_| HandshakeError::Encryption)?;
        let mut out = [0u8; CLIENT_AUTH_LENGTH];
        out.copy_from_slice(&sealed);
        Ok(ClientAuth(out))
    }

    /// Open ServerAuth under `secret3` and verify the server's signature over
    /// our hello.
    pub fn verify_server_auth(&mut self, auth: &ServerAuth) -> Result<bool> {
        let server = self.require_remote()?;
        let mut curve_secret = self.local.to_curve25519();
        self.b_alice = curve_secret
            .diffie_hellman(&x25519_dalek::PublicKey::from(self.remote_ephemeral))
            .to_bytes();
        curve_secret.zeroize();
        self.secret3 =
            derive_secret3(&self.network_key, &self.secret, &self.a_bob, &self.b_alice);

        let Ok(opened) = SecretBox::new(&self.secret3).open(&ZERO_NONCE, &auth.0) else {
            return Ok(false);
        };
        let Ok(signature) = <[u8; SIGNATURE_LENGTH]>::try_from(opened.as_slice()) else {
            return Ok(false);
        };
        Ok(server.verify(&self.signed_by_server(), &signature))
    }

    // ── Server steps ────────────────────────────────────────────────────

    /// Open ClientAuth under `secret2`, learn the client's identity and
    /// verify its signature.
    ///
    /// A box that does not open, or that carries low-order key material, is
    /// replaced by an all-zero hello so that verification still runs and
    /// fails the same way.
    pub fn verify_client_auth(&mut self, auth: &ClientAuth) -> Result<bool> {
        let mut curve_secret = self.local.to_curve25519();
        self.a_bob = curve_secret
            .diffie_hellman(&x25519_dalek::PublicKey::from(self.remote_ephemeral))
            .to_bytes();
        curve_secret.zeroize();
        self.secret2 = derive_secret2(&self.network_key, &self.secret, &self.a_bob);

        let opened = SecretBox::new(&self.secret2).open(&ZERO_NONCE, &auth.0);
        let open_ok = match &opened {
            Ok(hello) if hello.len() == HELLO_LENGTH => {
                self.hello.copy_from_slice(hello);
                true
            }
            _ => {
                self.hello = [0u8; HELLO_LENGTH];
                false
            }
        };

        let mut signature = [0u8; SIGNATURE_LENGTH];
        signature.copy_from_slice(&self.hello[..SIGNATURE_LENGTH]);
        let mut client_bytes = [0u8; 32];
        client_bytes.copy_from_slice(&self.hello[SIGNATURE_LENGTH..]);

        let mut r_point = [0u8; 32];
        r_point.copy_from_slice(&signature[..32]);
        let low_order = is_low_order_point(&client_bytes) | is_low_order_point(&r_point);
        if low_order {
            self.hello = [0u8; HELLO_LENGTH];
        }

        let client = PublicKey::from_bytes(client_bytes);
        let verify_ok = client.verify(&self.signed_by_client(&self.local.public_key()), &signature);

        let ok = open_ok & !low_order & verify_ok;
        if ok {
            self.remote_public = Some(client);
        }
        Ok(ok)
    }

    /// Sign the client's hello and box the signature under `secret3`.
    pub fn server_auth(&mut self) -> Result<ServerAuth> {
        let client = self.require_remote()?;
        self.b_alice = self.ephemeral.diffie_hellman_with(&client.to_curve25519()?);
        self.secret3 =
            derive_secret3(&self.network_key, &self.secret, &self.a_bob, &self.b_alice);

        let signature = self.local.sign(&self.signed_by_server());
        let sealed = SecretBox::new(&self.secret3)
            .seal(&ZERO_NONCE, &signature)
            .map_err(|_| HandshakeError::Encryption)?;
        let mut out = [0u8; SERVER_AUTH_LENGTH];
        out.copy_from_slice(&sealed);
        Ok(ServerAuth(out))
    }

    // ── Completion ──────────────────────────────────────────────────────

    /// Derive the session keys and wipe every intermediate.
    pub fn session_keys(&mut self) -> Result<SessionKeys> {
        let remote = self.require_remote()?;
        let mut final_secret = derive_final_secret(&self.secret3);
        let keys = derive_session_keys(
            &final_secret,
            &self.local.public_key(),
            &remote,
            &self.local_app_mac,
            &self.remote_app_mac,
        );
        final_secret.zeroize();
        self.wipe();
        Ok(keys)
    }

    /// Zero all secret intermediates. The long-term key stays with its owner.
    pub fn wipe(&mut self) {
        self.secret.zeroize();
        self.sec_hash.zeroize();
        self.a_bob.zeroize();
        self.b_alice.zeroize();
        self.secret2.zeroize();
        self.secret3.zeroize();
        self.hello.zeroize();
    }

    /// `networkKey ‖ serverPublic ‖ secHash`
    fn signed_by_client(&self, server: &PublicKey) -> Vec<u8> {
        let mut msg = Vec::with_capacity(96);
        msg.extend_from_slice(self.network_key.as_bytes());
        msg.extend_from_slice(server.as_bytes());
        msg.extend_from_slice(&self.sec_hash);
        msg
    }

    /// `networkKey ‖ hello ‖ secHash`
    fn signed_by_server(&self) -> Vec<u8> {
        let mut msg = Vec::with_capacity(32 + HELLO_LENGTH + 32);
        msg.extend_from_slice(self.network_key.as_bytes());
        msg.extend_from_slice(&self.hello);
        msg.extend_from_slice(&self.sec_hash);
        msg
    }

    fn require_remote(&self) -> Result<PublicKey> {
        self.remote_public
            .ok_or_else(|| HandshakeError::InvalidKey("remote public key not known yet".into()))
    }
}

impl Drop for HandshakeContext {
    fn drop(&mut self) {
        self.wipe();
        self.local_app_mac.zeroize();
        self.remote_app_mac.zeroize();
    }
}
