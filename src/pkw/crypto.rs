//! Cryptographic building blocks shared by the PKW engine and the client.
//!
//! This module intentionally provides small, composable primitives which the
//! PPRF, the key-wrapping layer, and the session code wire together:
//!
//! - HKDF-SHA256 is the GGM expander (`info` ∈ {"l", "r", "o"}), the wrap
//!   nonce derivation, and the lookup-table key ratchet.
//! - AEAD: AES-GCM provides authenticated encryption; the key width (128 or
//!   256 bits) is decided at runtime from the engine's key length.
//! - AAD binds every ciphertext to its header (the remote object id), so a
//!   header swap must fail decryption.
//!
//! A `(key, nonce)` pair is never reused: wrapping keys are single-use per
//! tag, and every file body is encrypted under a fresh DEK.

use aes_gcm::aead::{Aead, KeyInit, Payload};
use aes_gcm::{Aes128Gcm, Aes256Gcm, Nonce};
use hkdf::Hkdf;
use rand::RngCore;
use rand::rngs::OsRng;
use secrecy::SecretSlice;
use sha2::Sha256;
use thiserror::Error;
use zeroize::Zeroizing;

/// Size (bytes) of AES-GCM nonces.
pub const NONCE_LEN: usize = 12;
/// Size (bytes) of the Poly1305/GCM authentication tag appended to ciphertexts.
pub const AEAD_TAG_LEN: usize = 16;

/// Secret bytes held in memory with zeroize-on-drop semantics.
pub type SecretBytes = SecretSlice<u8>;

#[derive(Debug, Error)]
pub enum CryptoError {
    #[error("unsupported AEAD key length: {0} bytes")]
    InvalidKeyLength(usize),

    #[error("invalid nonce length")]
    InvalidNonceLength,

    #[error("hkdf error")]
    Hkdf,

    #[error("aead error")]
    Aead,
}

/// Generate `N` cryptographically-secure random bytes.
pub fn random_bytes<const N: usize>() -> [u8; N] {
    let mut bytes = [0u8; N];
    OsRng.fill_bytes(&mut bytes);
    bytes
}

/// Generate `len` cryptographically-secure random bytes in a zeroizing buffer.
pub fn random_secret(len: usize) -> Zeroizing<Vec<u8>> {
    let mut bytes = Zeroizing::new(vec![0u8; len]);
    OsRng.fill_bytes(&mut bytes);
    bytes
}

/// HKDF-SHA256 expand with no salt: `out = HKDF(ikm, info)` of `len` bytes.
pub fn hkdf_expand(ikm: &[u8], info: &[u8], len: usize) -> Result<Zeroizing<Vec<u8>>, CryptoError> {
    let hk = Hkdf::<Sha256>::new(None, ikm);
    let mut out = Zeroizing::new(vec![0u8; len]);
    hk.expand(info, &mut out).map_err(|_| CryptoError::Hkdf)?;
    Ok(out)
}

/// AEAD-encrypt `plaintext` under `key`, dispatching on the key width.
///
/// Accepts 16-byte (AES-128-GCM) and 32-byte (AES-256-GCM) keys.
pub fn aead_encrypt(
    key: &[u8],
    nonce: &[u8; NONCE_LEN],
    aad: &[u8],
    plaintext: &[u8],
) -> Result<Vec<u8>, CryptoError> {
    let payload = Payload {
        msg: plaintext,
        aad,
    };
    match key.len() {
        16 => {
            let cipher = Aes128Gcm::new_from_slice(key).map_err(|_| CryptoError::Aead)?;
            cipher
                .encrypt(Nonce::from_slice(nonce), payload)
                .map_err(|_| CryptoError::Aead)
        }
        32 => {
            let cipher = Aes256Gcm::new_from_slice(key).map_err(|_| CryptoError::Aead)?;
            cipher
                .encrypt(Nonce::from_slice(nonce), payload)
                .map_err(|_| CryptoError::Aead)
        }
        other => Err(CryptoError::InvalidKeyLength(other)),
    }
}

/// AEAD-decrypt `ciphertext` under `key`.
///
/// Returns an error if authentication fails (tamper, wrong key, or AAD
/// mismatch). Plaintext comes back in a `Zeroizing` buffer to reduce
/// accidental retention.
pub fn aead_decrypt(
    key: &[u8],
    nonce: &[u8; NONCE_LEN],
    aad: &[u8],
    ciphertext: &[u8],
) -> Result<Zeroizing<Vec<u8>>, CryptoError> {
    let payload = Payload {
        msg: ciphertext,
        aad,
    };
    let plaintext = match key.len() {
        16 => {
            let cipher = Aes128Gcm::new_from_slice(key).map_err(|_| CryptoError::Aead)?;
            cipher
                .decrypt(Nonce::from_slice(nonce), payload)
                .map_err(|_| CryptoError::Aead)?
        }
        32 => {
            let cipher = Aes256Gcm::new_from_slice(key).map_err(|_| CryptoError::Aead)?;
            cipher
                .decrypt(Nonce::from_slice(nonce), payload)
                .map_err(|_| CryptoError::Aead)?
        }
        other => return Err(CryptoError::InvalidKeyLength(other)),
    };
    Ok(Zeroizing::new(plaintext))
}

/// Parse a 12-byte AEAD nonce from an arbitrary slice.
pub fn nonce_from_slice(bytes: &[u8]) -> Result<[u8; NONCE_LEN], CryptoError> {
    let bytes: &[u8; NONCE_LEN] = bytes
        .try_into()
        .map_err(|_| CryptoError::InvalidNonceLength)?;
    Ok(*bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encrypt_decrypt_roundtrip_both_key_widths() {
        for key_len in [16usize, 32] {
            let key = random_secret(key_len);
            let nonce = random_bytes::<NONCE_LEN>();
            let aad = b"object-7";

            let ct = aead_encrypt(&key, &nonce, aad, b"payload").unwrap();
            assert_eq!(ct.len(), b"payload".len() + AEAD_TAG_LEN);
            let pt = aead_decrypt(&key, &nonce, aad, &ct).unwrap();
            assert_eq!(pt.as_slice(), b"payload");
        }
    }

    #[test]
    fn decrypt_fails_on_tamper() {
        let key = random_secret(32);
        let nonce = random_bytes::<NONCE_LEN>();
        let mut ct = aead_encrypt(&key, &nonce, b"aad", b"secret").unwrap();
        ct[0] ^= 0x01;
        assert!(matches!(
            aead_decrypt(&key, &nonce, b"aad", &ct),
            Err(CryptoError::Aead)
        ));
    }

    #[test]
    fn decrypt_fails_on_aad_mismatch() {
        let key = random_secret(16);
        let nonce = random_bytes::<NONCE_LEN>();
        let ct = aead_encrypt(&key, &nonce, b"header-a", b"secret").unwrap();
        assert!(matches!(
            aead_decrypt(&key, &nonce, b"header-b", &ct),
            Err(CryptoError::Aead)
        ));
    }

    #[test]
    fn rejects_unsupported_key_width() {
        let key = random_secret(24);
        let nonce = random_bytes::<NONCE_LEN>();
        assert!(matches!(
            aead_encrypt(&key, &nonce, b"", b""),
            Err(CryptoError::InvalidKeyLength(24))
        ));
    }

    #[test]
    fn hkdf_expand_is_deterministic_and_label_separated() {
        let ikm = [7u8; 16];
        let left = hkdf_expand(&ikm, b"l", 16).unwrap();
        let left2 = hkdf_expand(&ikm, b"l", 16).unwrap();
        let right = hkdf_expand(&ikm, b"r", 16).unwrap();
        assert_eq!(left, left2);
        assert_ne!(left, right);
    }
}
