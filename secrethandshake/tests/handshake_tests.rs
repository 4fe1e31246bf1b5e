// Integration tests for the four-message secret handshake.

use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};

use secrethandshake::crypto::hash::sha256_concat;
use secrethandshake::crypto::secretbox::{SecretBox, ZERO_NONCE};
use secrethandshake::handshake::derive::{app_mac, derive_secret2};
use secrethandshake::handshake::messages::{Challenge, ClientAuth, ServerAuth, CLIENT_AUTH_LENGTH};
use secrethandshake::{
    client_handshake, server_handshake, ClientHandshake, EphemeralKeyPair, HandshakeError,
    HandshakeOutcome, HandshakeState, LongTermKeyPair, NetworkKey, PublicKey, Role,
    ServerHandshake,
};

struct Peers {
    client: ClientHandshake,
    server: ServerHandshake,
}

fn peers_with(rng: &mut StdRng, client_nk: NetworkKey, server_nk: NetworkKey) -> Peers {
    let client_kp = LongTermKeyPair::generate(rng);
    let server_kp = LongTermKeyPair::generate(rng);
    let server_pub = server_kp.public_key();
    Peers {
        client: ClientHandshake::with_ephemeral(
            client_nk,
            client_kp,
            server_pub,
            EphemeralKeyPair::generate(rng),
        )
        .unwrap(),
        server: ServerHandshake::with_ephemeral(server_nk, server_kp, EphemeralKeyPair::generate(rng))
            .unwrap(),
    }
}

fn peers(seed: u64) -> Peers {
    let mut rng = StdRng::seed_from_u64(seed);
    let nk = NetworkKey::default();
    peers_with(&mut rng, nk, nk)
}

/// Run all four steps in memory, applying `tamper` to message `n` (1-based).
fn run(
    mut p: Peers,
    tamper: Option<(usize, usize)>,
) -> (Result<HandshakeOutcome, HandshakeError>, Result<HandshakeOutcome, HandshakeError>) {
    fn flip(bytes: &mut [u8], bit: usize) {
        bytes[bit / 8] ^= 1 << (bit % 8);
    }
    let hit = |n: usize| tamper.filter(|(m, _)| *m == n).map(|(_, bit)| bit);

    let mut msg1 = p.client.challenge().unwrap();
    if let Some(bit) = hit(1) {
        flip(&mut msg1.0, bit);
    }
    if let Err(e) = p.server.verify_client_challenge(&msg1) {
        return (Err(HandshakeError::NetworkKeyMismatch), Err(e));
    }

    let mut msg2 = p.server.challenge().unwrap();
    if let Some(bit) = hit(2) {
        flip(&mut msg2.0, bit);
    }
    if let Err(e) = p.client.verify_server_challenge(&msg2) {
        return (Err(e), Err(HandshakeError::NetworkKeyMismatch));
    }

    let mut msg3 = p.client.client_auth().unwrap();
    if let Some(bit) = hit(3) {
        flip(&mut msg3.0, bit);
    }
    if let Err(e) = p.server.verify_client_auth(&msg3) {
        return (Err(HandshakeError::PeerAuthenticationFailed(Role::Client)), Err(e));
    }

    let (mut msg4, server_out) = p.server.server_auth().unwrap();
    if let Some(bit) = hit(4) {
        flip(&mut msg4.0, bit);
    }
    (p.client.verify_server_auth(&msg4), Ok(server_out))
}

// ---------------------------------------------------------------------------
// Key agreement
// ---------------------------------------------------------------------------

#[test]
fn randomized_key_agreement() {
    for seed in 0..16 {
        let (c, s) = run(peers(seed), None);
        let (c, s) = (c.unwrap(), s.unwrap());
        assert_eq!(c.keys.encryption_key, s.keys.decryption_key);
        assert_eq!(c.keys.decryption_key, s.keys.encryption_key);
        assert_eq!(c.keys.encryption_nonce, s.keys.decryption_nonce);
        assert_eq!(c.keys.decryption_nonce, s.keys.encryption_nonce);
        assert_eq!(c.local_public, s.remote_public);
        assert_eq!(s.local_public, c.remote_public);
    }
}

#[test]
fn deterministic_inputs_give_deterministic_keys() {
    let (a, _) = run(peers(7), None);
    let (b, _) = run(peers(7), None);
    let (a, b) = (a.unwrap(), b.unwrap());
    assert_eq!(a.keys.encryption_key, b.keys.encryption_key);
    assert_eq!(a.keys.encryption_nonce, b.keys.encryption_nonce);

    let (c, _) = run(peers(8), None);
    assert_ne!(a.keys.encryption_key, c.unwrap().keys.encryption_key);
}

#[test]
fn nonces_come_from_challenge_macs() {
    // Same seed, same ephemerals: the twin shows which challenges `run` sends.
    let mut twin = peers(3);
    let client_challenge = twin.client.challenge().unwrap();
    twin.server.verify_client_challenge(&client_challenge).unwrap();
    let server_challenge = twin.server.challenge().unwrap();
    let (c, _) = run(peers(3), None);
    let c = c.unwrap();
    assert_eq!(&c.keys.encryption_nonce[..], &server_challenge.mac()[..24]);
    assert_eq!(&c.keys.decryption_nonce[..], &client_challenge.mac()[..24]);
}

// ---------------------------------------------------------------------------
// Network key mismatch
// ---------------------------------------------------------------------------

#[test]
fn network_key_mismatch_fails_server_first() {
    let mut rng = StdRng::seed_from_u64(11);
    let mut p = peers_with(
        &mut rng,
        NetworkKey::from_bytes([1u8; 32]),
        NetworkKey::from_bytes([2u8; 32]),
    );
    let err = p
        .server
        .verify_client_challenge(&p.client.challenge().unwrap())
        .unwrap_err();
    assert!(matches!(err, HandshakeError::NetworkKeyMismatch));
    assert_eq!(p.server.state(), HandshakeState::Failed);
    // No auth material is produced after a failed challenge.
    assert!(p.server.server_auth().is_err());
}

#[test]
fn network_key_mismatch_fails_client() {
    let mut rng = StdRng::seed_from_u64(12);
    let mut p = peers_with(
        &mut rng,
        NetworkKey::from_bytes([1u8; 32]),
        NetworkKey::from_bytes([2u8; 32]),
    );
    // The server answers a client that shares its own network key.
    let server_nk = NetworkKey::from_bytes([2u8; 32]);
    let other = EphemeralKeyPair::generate(&mut rng);
    let other_pub = other.public_key_bytes();
    p.server
        .verify_client_challenge(&Challenge::new(&app_mac(&server_nk, &other_pub).unwrap(), &other_pub))
        .unwrap();

    let err = p
        .client
        .verify_server_challenge(&p.server.challenge().unwrap())
        .unwrap_err();
    assert!(matches!(err, HandshakeError::NetworkKeyMismatch));
    assert!(p.client.client_auth().is_err());
}

#[tokio::test]
async fn network_key_mismatch_over_transport() {
    let client_kp = LongTermKeyPair::from_seed(&[1u8; 32]);
    let server_kp = LongTermKeyPair::from_seed(&[2u8; 32]);
    let server_pub = server_kp.public_key();
    let (mut a, mut b) = tokio::io::duplex(4096);

    let (client, server) = tokio::join!(
        async move {
            client_handshake(&mut a, NetworkKey::from_bytes([1u8; 32]), client_kp, server_pub).await
        },
        async move {
            // The transport is dropped on failure, hanging up on the client.
            server_handshake(&mut b, NetworkKey::from_bytes([2u8; 32]), server_kp).await
        },
    );

    assert!(matches!(server.unwrap_err(), HandshakeError::NetworkKeyMismatch));
    let client_err = client.unwrap_err();
    assert!(matches!(
        client_err,
        HandshakeError::Transport { stage: "receiving server challenge", .. }
    ));
}

// ---------------------------------------------------------------------------
// Tamper detection
// ---------------------------------------------------------------------------

#[test]
fn flipping_a_bit_in_every_byte_of_every_message_fails_the_receiver() {
    let lengths = [(1, 64), (2, 64), (3, 112), (4, 80)];
    for (msg, len) in lengths {
        for byte in 0..len {
            let bit = byte * 8 + byte % 8;
            let (c, s) = run(peers(100 + msg as u64), Some((msg, bit)));
            match msg {
                1 => assert!(matches!(s, Err(HandshakeError::NetworkKeyMismatch))),
                2 => assert!(matches!(c, Err(HandshakeError::NetworkKeyMismatch))),
                3 => assert!(matches!(
                    s,
                    Err(HandshakeError::PeerAuthenticationFailed(Role::Client))
                )),
                _ => assert!(matches!(
                    c,
                    Err(HandshakeError::PeerAuthenticationFailed(Role::Server))
                )),
            }
        }
    }
}

#[test]
fn wrong_server_identity_fails_client_auth() {
    let mut rng = StdRng::seed_from_u64(21);
    let nk = NetworkKey::default();
    let client_kp = LongTermKeyPair::generate(&mut rng);
    let server_kp = LongTermKeyPair::generate(&mut rng);
    let impostor = LongTermKeyPair::generate(&mut rng);

    let mut client = ClientHandshake::new(nk, client_kp, server_kp.public_key()).unwrap();
    let mut server = ServerHandshake::new(nk, impostor).unwrap();

    server.verify_client_challenge(&client.challenge().unwrap()).unwrap();
    client.verify_server_challenge(&server.challenge().unwrap()).unwrap();
    let auth = client.client_auth().unwrap();
    let err = server.verify_client_auth(&auth).unwrap_err();
    assert!(matches!(err, HandshakeError::PeerAuthenticationFailed(Role::Client)));
    assert_eq!(err.to_string(), "client not authenticated");
}

#[test]
fn server_auth_replayed_into_other_session_fails() {
    let mut p1 = peers(31);
    let mut p2 = peers(32);

    p1.server.verify_client_challenge(&p1.client.challenge().unwrap()).unwrap();
    p1.client.verify_server_challenge(&p1.server.challenge().unwrap()).unwrap();
    p1.server.verify_client_auth(&p1.client.client_auth().unwrap()).unwrap();
    let (reply, _) = p1.server.server_auth().unwrap();

    p2.server.verify_client_challenge(&p2.client.challenge().unwrap()).unwrap();
    p2.client.verify_server_challenge(&p2.server.challenge().unwrap()).unwrap();
    p2.client.client_auth().unwrap();
    let err = p2.client.verify_server_auth(&ServerAuth(reply.0)).unwrap_err();
    assert!(matches!(err, HandshakeError::PeerAuthenticationFailed(Role::Server)));
}

// ---------------------------------------------------------------------------
// Low-order key material
// ---------------------------------------------------------------------------

/// A client that builds a well-formed ClientAuth box claiming `claimed` as
/// its identity and `signature` as its signature.
fn forged_client_auth(
    server: &mut ServerHandshake,
    server_pub: &PublicKey,
    nk: &NetworkKey,
    claimed: [u8; 32],
    signature: [u8; 64],
) -> ClientAuth {
    let eph = EphemeralKeyPair::from_secret_bytes([0x5A; 32]);
    let eph_pub = eph.public_key_bytes();
    let challenge = Challenge::new(&app_mac(nk, &eph_pub).unwrap(), &eph_pub);
    server.verify_client_challenge(&challenge).unwrap();

    let server_challenge = server.challenge().unwrap();
    let secret = eph.diffie_hellman(&server_challenge.ephemeral_public());
    let a_bob = eph.diffie_hellman_with(&server_pub.to_curve25519().unwrap());
    let secret2 = derive_secret2(nk, &secret, &a_bob);

    let mut hello = [0u8; 96];
    hello[..64].copy_from_slice(&signature);
    hello[64..].copy_from_slice(&claimed);
    let sealed = SecretBox::new(&secret2).seal(&ZERO_NONCE, &hello).unwrap();
    let mut out = [0u8; CLIENT_AUTH_LENGTH];
    out.copy_from_slice(&sealed);
    ClientAuth(out)
}

#[test]
fn low_order_client_key_is_rejected() {
    let nk = NetworkKey::from_bytes([0u8; 32]);
    let server_kp = LongTermKeyPair::from_seed(&[9u8; 32]);
    let server_pub = server_kp.public_key();

    let mut identity = [0u8; 32];
    identity[0] = 1;
    for claimed in [identity, [0u8; 32]] {
        let mut server = ServerHandshake::new(nk, server_kp.clone()).unwrap();
        let mut sig = [0u8; 64];
        StdRng::seed_from_u64(1).fill_bytes(&mut sig);
        let auth = forged_client_auth(&mut server, &server_pub, &nk, claimed, sig);
        let err = server.verify_client_auth(&auth).unwrap_err();
        assert!(matches!(err, HandshakeError::PeerAuthenticationFailed(Role::Client)));
        assert_eq!(server.state(), HandshakeState::Failed);
    }
}

#[test]
fn low_order_signature_point_is_rejected() {
    let nk = NetworkKey::from_bytes([0u8; 32]);
    let server_kp = LongTermKeyPair::from_seed(&[9u8; 32]);
    let server_pub = server_kp.public_key();
    let client_kp = LongTermKeyPair::from_seed(&[10u8; 32]);

    let mut server = ServerHandshake::new(nk, server_kp).unwrap();
    let mut sig = [0u8; 64];
    sig[0] = 1; // R = identity point
    let auth = forged_client_auth(&mut server, &server_pub, &nk, client_kp.public_key().to_bytes(), sig);
    assert!(matches!(
        server.verify_client_auth(&auth),
        Err(HandshakeError::PeerAuthenticationFailed(Role::Client))
    ));
}

#[test]
fn forged_box_with_valid_layout_still_needs_a_signature() {
    let nk = NetworkKey::from_bytes([0u8; 32]);
    let server_kp = LongTermKeyPair::from_seed(&[9u8; 32]);
    let server_pub = server_kp.public_key();
    let client_kp = LongTermKeyPair::from_seed(&[10u8; 32]);

    let mut server = ServerHandshake::new(nk, server_kp).unwrap();
    // Signature over the wrong message.
    let sig = client_kp.sign(&sha256_concat(&[b"not the transcript"]));
    let auth = forged_client_auth(&mut server, &server_pub, &nk, client_kp.public_key().to_bytes(), sig);
    assert!(server.verify_client_auth(&auth).is_err());
}

// ---------------------------------------------------------------------------
// Known-answer vectors
//
// Produced with libsodium (crypto_sign_seed_keypair, crypto_scalarmult,
// crypto_auth_hmacsha512256, crypto_hash_sha256, crypto_secretbox_easy) for
// the main network key, identity seeds of repeated 0x01 / 0x02 bytes and
// ephemeral secrets of repeated 0x03 / 0x04 bytes.
// ---------------------------------------------------------------------------

const KAT_CLIENT_PUB: &str = "8a88e3dd7409f195fd52db2d3cba5d72ca6709bf1d94121bf3748801b40f6f5c";
const KAT_SERVER_PUB: &str = "8139770ea87d175f56a35466c34c7ecccb8d8a91b4ee37a25df60f5b8fc9b394";
const KAT_SHARED_SECRET: &str = "40e47a3f525bdcac491d418978d7db5af623ac7afe7623c6d78a5d4fce9d0f63";
const KAT_CHALLENGE_CLIENT: &str = "883239f8c7165cb7db838910d06ef49c6b2ae05dd68d1aaed80e3c283af06829\
                                    5dfedd3b6bd47f6fa28ee15d969d5bb0ea53774d488bdaf9df1c6e0124b3ef22";
const KAT_CHALLENGE_SERVER: &str = "4375f9c1d57129521f356625731cdf2cbb191349133e88188f62966ee39542d0\
                                    ac01b2209e86354fb853237b5de0f4fab13c7fcbf433a61c019369617fecf10b";
const KAT_CLIENT_AUTH: &str = "61cbde099f19c20241aa0bf870362c4aee4a2cfc0b8023efa1f8b60b41999254\
                               a4d02eb960aac24ae2b8ccbcb00ccb6bf3e626c8c8314d2be34a0506a0a327c5\
                               d7abd29ca79024a5bef92d99a5707d4f50b8c0fab34417b6bece706cdd5347ba\
                               f9a1876fdee8b014df4b8d088b755540";
const KAT_SERVER_AUTH: &str = "d608859b4555cef1b3272ddea67ac7add33e3c74f56e6bc98b353198809e5caa\
                               60daa905ea838854cfec7caee24baf7a244d41693e9273efa06b250a7b509d28\
                               62fa28554c18d9d64633f9a8d8bf3ee5";
const KAT_CLIENT_ENC_KEY: &str = "04f305c2bcba4b7d2c5a66a08ebdb826fb0a6fa148d9019aa4f5a29d3299503e";
const KAT_CLIENT_ENC_NONCE: &str = "4375f9c1d57129521f356625731cdf2cbb191349133e8818";
const KAT_CLIENT_DEC_KEY: &str = "dade10a21e9c051f7cbe344054753abb39d6ce2a694aebbe35176fb1f6a95d05";
const KAT_CLIENT_DEC_NONCE: &str = "883239f8c7165cb7db838910d06ef49c6b2ae05dd68d1aae";

fn kat_peers() -> (ClientHandshake, ServerHandshake) {
    let nk = NetworkKey::SSB_MAIN;
    let client_kp = LongTermKeyPair::from_seed(&[0x01; 32]);
    let server_kp = LongTermKeyPair::from_seed(&[0x02; 32]);
    let server_pub = server_kp.public_key();
    let client = ClientHandshake::with_ephemeral(
        nk,
        client_kp,
        server_pub,
        EphemeralKeyPair::from_secret_bytes([0x03; 32]),
    )
    .unwrap();
    let server =
        ServerHandshake::with_ephemeral(nk, server_kp, EphemeralKeyPair::from_secret_bytes([0x04; 32]))
            .unwrap();
    (client, server)
}

#[test]
fn known_answer_identities_and_shared_secret() {
    assert_eq!(
        hex::encode(LongTermKeyPair::from_seed(&[0x01; 32]).public_key().as_bytes()),
        KAT_CLIENT_PUB
    );
    assert_eq!(
        hex::encode(LongTermKeyPair::from_seed(&[0x02; 32]).public_key().as_bytes()),
        KAT_SERVER_PUB
    );

    let client_eph = EphemeralKeyPair::from_secret_bytes([0x03; 32]);
    let server_eph = EphemeralKeyPair::from_secret_bytes([0x04; 32]);
    assert_eq!(
        hex::encode(client_eph.diffie_hellman(&server_eph.public_key_bytes())),
        KAT_SHARED_SECRET
    );
}

#[test]
fn known_answer_handshake_messages_and_keys() {
    let (mut client, mut server) = kat_peers();

    let msg1 = client.challenge().unwrap();
    assert_eq!(hex::encode(msg1.0), KAT_CHALLENGE_CLIENT);
    server.verify_client_challenge(&msg1).unwrap();

    let msg2 = server.challenge().unwrap();
    assert_eq!(hex::encode(msg2.0), KAT_CHALLENGE_SERVER);
    client.verify_server_challenge(&msg2).unwrap();

    let msg3 = client.client_auth().unwrap();
    assert_eq!(hex::encode(msg3.0), KAT_CLIENT_AUTH);
    let client_pub = server.verify_client_auth(&msg3).unwrap();
    assert_eq!(hex::encode(client_pub.as_bytes()), KAT_CLIENT_PUB);

    let (msg4, server_out) = server.server_auth().unwrap();
    assert_eq!(hex::encode(msg4.0), KAT_SERVER_AUTH);
    let client_out = client.verify_server_auth(&msg4).unwrap();

    let keys = &client_out.keys;
    assert_eq!(hex::encode(keys.encryption_key), KAT_CLIENT_ENC_KEY);
    assert_eq!(hex::encode(keys.encryption_nonce), KAT_CLIENT_ENC_NONCE);
    assert_eq!(hex::encode(keys.decryption_key), KAT_CLIENT_DEC_KEY);
    assert_eq!(hex::encode(keys.decryption_nonce), KAT_CLIENT_DEC_NONCE);

    let mirrored = &server_out.keys;
    assert_eq!(hex::encode(mirrored.decryption_key), KAT_CLIENT_ENC_KEY);
    assert_eq!(hex::encode(mirrored.decryption_nonce), KAT_CLIENT_ENC_NONCE);
    assert_eq!(hex::encode(mirrored.encryption_key), KAT_CLIENT_DEC_KEY);
    assert_eq!(hex::encode(mirrored.encryption_nonce), KAT_CLIENT_DEC_NONCE);
}
