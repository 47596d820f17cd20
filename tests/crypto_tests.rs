//! Integration tests for the psafe crypto module.

use psafe::crypto::keys::{derive_enc_key, derive_hmac_key, MasterKey};
use psafe::crypto::{
    decrypt, derive_master_key, derive_master_key_with_params, encrypt, generate_salt,
    Argon2Params,
};

// ---------------------------------------------------------------------------
// Encryption round-trip
// ---------------------------------------------------------------------------

#[test]
fn encrypt_decrypt_roundtrip() {
    // Use a fixed 32-byte key.
    let key = [0xABu8; 32];
    let plaintext = b"{\"schema\":3,\"records\":[]}";

    let ciphertext = encrypt(&key, plaintext).expect("encrypt should succeed");

    // Ciphertext must be longer than plaintext (12-byte nonce + 16-byte tag).
    assert!(ciphertext.len() > plaintext.len());

    let recovered = decrypt(&key, &ciphertext).expect("decrypt should succeed");
    assert_eq!(recovered, plaintext);
}

#[test]
fn encrypt_produces_different_ciphertext_each_time() {
    let key = [0xCDu8; 32];
    let plaintext = b"hunter2";

    let ct1 = encrypt(&key, plaintext).expect("encrypt 1");
    let ct2 = encrypt(&key, plaintext).expect("encrypt 2");

    // Because each call generates a new random nonce, the output must differ.
    assert_ne!(
        ct1, ct2,
        "two encryptions of the same plaintext must differ"
    );
}

#[test]
fn decrypt_with_wrong_key_fails() {
    let key = [0x11u8; 32];
    let wrong_key = [0x22u8; 32];
    let plaintext = b"correct horse battery staple";

    let ciphertext = encrypt(&key, plaintext).expect("encrypt");
    let result = decrypt(&wrong_key, &ciphertext);

    assert!(result.is_err(), "decryption with the wrong key must fail");
}

#[test]
fn decrypt_with_truncated_data_fails() {
    // Anything shorter than 12 bytes (nonce length) should fail.
    let key = [0xAAu8; 32];
    let result = decrypt(&key, &[0u8; 5]);
    assert!(result.is_err(), "truncated ciphertext must fail");
}

#[test]
fn decrypt_with_tampered_ciphertext_fails() {
    let key = [0x33u8; 32];
    let mut ciphertext = encrypt(&key, b"payload").expect("encrypt");

    // Flip a bit in the authenticated body.
    let last = ciphertext.len() - 1;
    ciphertext[last] ^= 0x01;

    assert!(
        decrypt(&key, &ciphertext).is_err(),
        "AES-GCM must reject tampered ciphertext"
    );
}

// ---------------------------------------------------------------------------
// Key derivation
// ---------------------------------------------------------------------------

#[test]
fn generate_salt_is_unique() {
    let s1 = generate_salt();
    let s2 = generate_salt();
    assert_ne!(s1, s2, "two salts must differ");
    assert_eq!(s1.len(), 32);
}

#[test]
fn derive_master_key_is_deterministic() {
    let salt = [0x42u8; 32];
    let params = Argon2Params {
        memory_kib: 8_192,
        iterations: 1,
        parallelism: 1,
    };

    let k1 = derive_master_key_with_params(b"passphrase", &salt, &params).expect("derive 1");
    let k2 = derive_master_key_with_params(b"passphrase", &salt, &params).expect("derive 2");
    assert_eq!(k1, k2, "same inputs must derive the same key");
}

#[test]
fn derive_master_key_differs_by_passphrase_and_salt() {
    let salt_a = [0x01u8; 32];
    let salt_b = [0x02u8; 32];
    let params = Argon2Params {
        memory_kib: 8_192,
        iterations: 1,
        parallelism: 1,
    };

    let base = derive_master_key_with_params(b"one", &salt_a, &params).unwrap();
    let other_pw = derive_master_key_with_params(b"two", &salt_a, &params).unwrap();
    let other_salt = derive_master_key_with_params(b"one", &salt_b, &params).unwrap();

    assert_ne!(base, other_pw);
    assert_ne!(base, other_salt);
}

#[test]
fn default_params_derive_works() {
    // Default Argon2 parameters are slow but must still function.
    let salt = generate_salt();
    let key = derive_master_key(b"pw", &salt).expect("derive with defaults");
    assert_eq!(key.len(), 32);
}

// ---------------------------------------------------------------------------
// HKDF sub-keys
// ---------------------------------------------------------------------------

#[test]
fn enc_and_hmac_subkeys_differ() {
    let master = [0x55u8; 32];
    let enc = derive_enc_key(&master).expect("enc key");
    let mac = derive_hmac_key(&master).expect("hmac key");

    assert_ne!(enc, mac, "domain-separated sub-keys must differ");
    assert_ne!(enc, master);
    assert_ne!(mac, master);
}

#[test]
fn master_key_wrapper_matches_free_functions() {
    let bytes = [0x77u8; 32];
    let mk = MasterKey::new(bytes);

    assert_eq!(mk.derive_enc_key().unwrap(), derive_enc_key(&bytes).unwrap());
    assert_eq!(
        mk.derive_hmac_key().unwrap(),
        derive_hmac_key(&bytes).unwrap()
    );
}
