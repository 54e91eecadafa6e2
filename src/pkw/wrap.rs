//! Puncturable key wrapping: HPPRF-derived per-tag keys + AES-GCM.
//!
//! Each tag's PRF output is used as a single-use AEAD key to wrap a data
//! encryption key, bound to a caller-supplied header as associated data.
//! Puncturing the tag destroys the wrapping key, so every DEK ever wrapped
//! under it becomes unrecoverable from the key material alone.
//!
//! The wrap nonce is derived deterministically from the header
//! (`HKDF(header, "h")`), which is safe because the protocol forbids a
//! second wrap under the same un-punctured tag.

use thiserror::Error;
use zeroize::Zeroizing;

use secrecy::ExposeSecret;

use crate::pkw::crypto::{self, CryptoError, NONCE_LEN, SecretBytes};
use crate::pkw::hpprf::{GgmHpprf, TagError};
use crate::pkw::key::{KeyFormatError, PprfKey};
use crate::pkw::seal;
use crate::pkw::tag::Tag;

const INFO_WRAP_NONCE: &[u8] = b"h";

#[derive(Debug, Error)]
pub enum PkwError {
    #[error("illegal tag: {0}")]
    IllegalTag(#[from] TagError),

    #[error("authentication failed")]
    Auth,

    #[error("malformed serialized key: {0}")]
    Format(#[from] KeyFormatError),

    #[error("wrong password or corrupted key export")]
    Import,

    #[error("unsupported wrapping key length {0} (expected 128 or 256 bits)")]
    UnsupportedKeyLen(u32),

    #[error(transparent)]
    Crypto(#[from] CryptoError),
}

/// The puncturable key-wrapping scheme: an HPPRF whose outputs act as
/// AES-GCM keys.
pub struct HpprfAeadPkw {
    hpprf: GgmHpprf,
}

impl HpprfAeadPkw {
    /// A fresh PKW over a newly sampled PPRF key.
    pub fn new(tag_len: u32, key_len: u32) -> Result<Self, PkwError> {
        ensure_aead_key_len(key_len)?;
        Ok(Self {
            hpprf: GgmHpprf::new(PprfKey::generate(key_len, tag_len)?),
        })
    }

    pub fn from_key(key: PprfKey) -> Result<Self, PkwError> {
        ensure_aead_key_len(key.key_len())?;
        Ok(Self {
            hpprf: GgmHpprf::new(key),
        })
    }

    /// Reconstruct a PKW from the PPRF key wire format.
    pub fn from_serialized(bytes: &[u8]) -> Result<Self, PkwError> {
        Self::from_key(PprfKey::deserialize(bytes)?)
    }

    /// Reconstruct a PKW from a password-sealed key export.
    pub fn from_sealed(blob: &[u8], password: &str) -> Result<Self, PkwError> {
        let serialized = seal::open_sealed(blob, password)?;
        // A sealed blob that authenticates but fails to parse is equally an
        // import failure to callers.
        Self::from_serialized(&serialized).map_err(|_| PkwError::Import)
    }

    /// Wrap `dek` under the key derived for `tag`, bound to `header`.
    pub fn wrap(&self, tag: &Tag, header: &[u8], dek: &[u8]) -> Result<Vec<u8>, PkwError> {
        let key = self.hpprf.eval(tag)?;
        let nonce = wrap_nonce(header);
        Ok(crypto::aead_encrypt(key.expose_secret(), &nonce, header, dek)?)
    }

    /// Unwrap a DEK previously wrapped under `tag` and `header`.
    ///
    /// Fails with [`PkwError::IllegalTag`] once the tag is punctured and
    /// with [`PkwError::Auth`] if the ciphertext or header was tampered.
    pub fn unwrap(&self, tag: &Tag, header: &[u8], wrapped: &[u8]) -> Result<SecretBytes, PkwError> {
        let key = self.hpprf.eval(tag)?;
        let nonce = wrap_nonce(header);
        let dek = crypto::aead_decrypt(key.expose_secret(), &nonce, header, wrapped)
            .map_err(|_| PkwError::Auth)?;
        Ok(SecretBytes::from(dek.to_vec()))
    }

    /// Puncture `tag`, revoking every wrap ever made under it.
    pub fn punc(&mut self, tag: &Tag) -> Result<(), PkwError> {
        Ok(self.hpprf.punc(tag)?)
    }

    pub fn num_puncs(&self) -> u32 {
        self.hpprf.num_puncs()
    }

    pub fn tag_len(&self) -> u32 {
        self.hpprf.tag_len()
    }

    pub fn key_len(&self) -> u32 {
        self.hpprf.key_len()
    }

    pub fn serialize_key(&self) -> Zeroizing<Vec<u8>> {
        self.hpprf.serialize_key()
    }

    /// Export the key sealed under a password (see [`seal`] for the layout).
    pub fn serialize_and_encrypt_key(&self, password: &str) -> Result<Vec<u8>, PkwError> {
        seal::seal_key(&self.serialize_key(), password)
    }
}

fn ensure_aead_key_len(key_len: u32) -> Result<(), PkwError> {
    match key_len {
        128 | 256 => Ok(()),
        other => Err(PkwError::UnsupportedKeyLen(other)),
    }
}

/// Deterministic 12-byte wrap nonce from the header bytes.
fn wrap_nonce(header: &[u8]) -> [u8; NONCE_LEN] {
    let out = crypto::hkdf_expand(header, INFO_WRAP_NONCE, NONCE_LEN)
        .expect("nonce length fits one HKDF expand");
    let mut nonce = [0u8; NONCE_LEN];
    nonce.copy_from_slice(&out);
    nonce
}
