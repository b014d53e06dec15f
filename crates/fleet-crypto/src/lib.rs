//! Authenticated encrypt/decrypt for kubeconfigs (spec §4.A).
//!
//! A process-wide 256-bit key is derived by hashing a configured
//! passphrase. Each ciphertext is self-describing: it carries a fresh
//! random AEAD nonce concatenated with the AEAD output, base64-encoded
//! (spec §6: `base64(nonce || AEAD(plaintext, nonce, key))`).

use aes_gcm::{
    aead::{Aead, AeadCore, KeyInit, OsRng},
    Aes256Gcm, Key, Nonce,
};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use sha2::{Digest, Sha256};
use snafu::{ResultExt, Snafu};

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Snafu)]
pub enum Error {
    #[snafu(display("ciphertext is not valid base64"))]
    DecodeBase64 { source: base64::DecodeError },

    #[snafu(display("ciphertext is shorter than the nonce size"))]
    Truncated,

    /// Authenticator mismatch: tampered ciphertext, wrong key, or corrupt
    /// storage (spec §4.A: "Decryption fails with InvalidCiphertext if the
    /// authenticator does not match").
    #[snafu(display("ciphertext failed authentication"))]
    InvalidCiphertext,
}

impl From<Error> for fleet_entities::FleetError {
    fn from(err: Error) -> Self {
        fleet_entities::FleetError::invalid_argument(err.to_string())
    }
}

/// The derived process-wide key. Cheap to clone; holds only the 32-byte
/// digest.
#[derive(Clone)]
pub struct KeyMaterial {
    key: Key<Aes256Gcm>,
}

impl KeyMaterial {
    /// Derives the key by SHA-256 of the configured passphrase
    /// (spec §4.A: "derived by cryptographic hash of a configured
    /// passphrase").
    pub fn from_passphrase(passphrase: &str) -> Self {
        let digest = Sha256::digest(passphrase.as_bytes());
        Self {
            key: *Key::<Aes256Gcm>::from_slice(&digest),
        }
    }

    /// Validates `algorithm` (the informational `encryption.algorithm`
    /// config key, spec §6) against the AEAD actually implemented here.
    /// Returns the algorithm name normalized if recognized.
    pub fn supported_algorithm_name(algorithm: &str) -> Option<&'static str> {
        match algorithm.to_ascii_lowercase().as_str() {
            "aes-256-gcm" | "aes256gcm" | "aes_256_gcm" => Some("aes-256-gcm"),
            _ => None,
        }
    }
}

/// Encrypt/decrypt kubeconfig bytes under one process-wide key
/// (spec §4.A).
#[derive(Clone)]
pub struct Cipher {
    cipher: Aes256Gcm,
}

impl Cipher {
    pub fn new(key: &KeyMaterial) -> Self {
        Self {
            cipher: Aes256Gcm::new(&key.key),
        }
    }

    /// Encrypts `plaintext`, returning `base64(nonce || ciphertext)`.
    pub fn encrypt(&self, plaintext: &[u8]) -> String {
        let nonce = Aes256Gcm::generate_nonce(&mut OsRng);
        // AES-256-GCM never fails to encrypt for well-formed inputs.
        let ciphertext = self
            .cipher
            .encrypt(&nonce, plaintext)
            .expect("AES-256-GCM encryption is infallible for in-memory plaintext");

        let mut out = Vec::with_capacity(nonce.len() + ciphertext.len());
        out.extend_from_slice(&nonce);
        out.extend_from_slice(&ciphertext);
        STANDARD.encode(out)
    }

    /// Decrypts a ciphertext produced by [`Cipher::encrypt`].
    pub fn decrypt(&self, ciphertext_b64: &str) -> Result<Vec<u8>> {
        let raw = STANDARD.decode(ciphertext_b64).context(DecodeBase64Snafu)?;
        let nonce_len = Nonce::default().len();
        if raw.len() < nonce_len {
            return Truncated.fail();
        }
        let (nonce_bytes, ciphertext) = raw.split_at(nonce_len);
        let nonce = Nonce::from_slice(nonce_bytes);

        self.cipher
            .decrypt(nonce, ciphertext)
            .map_err(|_| Error::InvalidCiphertext)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn cipher() -> Cipher {
        Cipher::new(&KeyMaterial::from_passphrase("correct horse battery staple"))
    }

    #[rstest]
    #[case::empty(b"".as_slice())]
    #[case::short(b"apiVersion: v1".as_slice())]
    #[case::binary(&[0u8, 1, 2, 255, 254, 10, 13])]
    fn round_trips(#[case] plaintext: &[u8]) {
        let c = cipher();
        let ciphertext = c.encrypt(plaintext);
        let decrypted = c.decrypt(&ciphertext).expect("decrypt should succeed");
        assert_eq!(decrypted, plaintext);
    }

    #[test]
    fn distinct_calls_use_distinct_nonces() {
        let c = cipher();
        let a = c.encrypt(b"same plaintext");
        let b = c.encrypt(b"same plaintext");
        assert_ne!(a, b, "each call must draw a fresh random nonce");
    }

    #[test]
    fn bit_flip_fails_authentication() {
        let c = cipher();
        let ciphertext = c.encrypt(b"kubeconfig contents");
        let mut raw = STANDARD.decode(&ciphertext).unwrap();
        let last = raw.len() - 1;
        raw[last] ^= 0x01;
        let tampered = STANDARD.encode(raw);

        let err = c.decrypt(&tampered).expect_err("tampered ciphertext must fail");
        assert!(matches!(err, Error::InvalidCiphertext));
    }

    #[test]
    fn wrong_key_fails_authentication() {
        let encrypt_cipher = cipher();
        let decrypt_cipher = Cipher::new(&KeyMaterial::from_passphrase("a different passphrase"));

        let ciphertext = encrypt_cipher.encrypt(b"kubeconfig contents");
        let err = decrypt_cipher
            .decrypt(&ciphertext)
            .expect_err("wrong key must fail authentication");
        assert!(matches!(err, Error::InvalidCiphertext));
    }

    #[test]
    fn truncated_ciphertext_is_rejected() {
        let c = cipher();
        let err = c.decrypt(&STANDARD.encode(b"short")).expect_err("must reject");
        assert!(matches!(err, Error::Truncated));
    }

    #[rstest]
    #[case("aes-256-gcm", Some("aes-256-gcm"))]
    #[case("AES256GCM", Some("aes-256-gcm"))]
    #[case("chacha20-poly1305", None)]
    fn algorithm_name_validation(#[case] input: &str, #[case] expected: Option<&str>) {
        assert_eq!(KeyMaterial::supported_algorithm_name(input), expected);
    }
}
