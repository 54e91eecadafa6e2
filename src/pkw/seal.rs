//! Password-sealed key export.
//!
//! Layout: `salt[16] ‖ nonce[12] ‖ AES-256-GCM(serialized key)` with the
//! GCM tag appended. The KEK is PBKDF2-HMAC-SHA256 over the password with a
//! freshly sampled salt.

use pbkdf2::pbkdf2_hmac;
use sha2::Sha256;
use zeroize::Zeroizing;

use crate::pkw::crypto::{self, AEAD_TAG_LEN, NONCE_LEN};
use crate::pkw::wrap::PkwError;

pub const SALT_LEN: usize = 16;
const KEK_LEN: usize = 32;
const PBKDF2_ROUNDS: u32 = 600_000;

/// Seal serialized key bytes under `password`.
pub fn seal_key(serialized: &[u8], password: &str) -> Result<Vec<u8>, PkwError> {
    let salt = crypto::random_bytes::<SALT_LEN>();
    let nonce = crypto::random_bytes::<NONCE_LEN>();
    let kek = derive_kek(password, &salt);

    let ciphertext = crypto::aead_encrypt(&kek, &nonce, &[], serialized)?;

    let mut out = Vec::with_capacity(SALT_LEN + NONCE_LEN + ciphertext.len());
    out.extend_from_slice(&salt);
    out.extend_from_slice(&nonce);
    out.extend_from_slice(&ciphertext);
    Ok(out)
}

/// Recover serialized key bytes from a sealed blob.
///
/// A wrong password, truncated blob, or tampered ciphertext all surface as
/// [`PkwError::Import`].
pub fn open_sealed(blob: &[u8], password: &str) -> Result<Zeroizing<Vec<u8>>, PkwError> {
    if blob.len() < SALT_LEN + NONCE_LEN + AEAD_TAG_LEN {
        return Err(PkwError::Import);
    }
    let (salt, rest) = blob.split_at(SALT_LEN);
    let (nonce, ciphertext) = rest.split_at(NONCE_LEN);
    let nonce: [u8; NONCE_LEN] = nonce.try_into().expect("split at NONCE_LEN");

    let kek = derive_kek(password, salt);
    crypto::aead_decrypt(&kek, &nonce, &[], ciphertext).map_err(|_| PkwError::Import)
}

fn derive_kek(password: &str, salt: &[u8]) -> Zeroizing<Vec<u8>> {
    let mut kek = Zeroizing::new(vec![0u8; KEK_LEN]);
    pbkdf2_hmac::<Sha256>(password.as_bytes(), salt, PBKDF2_ROUNDS, &mut kek);
    kek
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pkw::tag::Tag;
    use crate::pkw::wrap::HpprfAeadPkw;
    use secrecy::ExposeSecret;

    fn int_tag(value: u64) -> Tag {
        Tag::from_u64(value, 128)
    }

    #[test]
    fn sealed_key_roundtrips_with_the_right_password() {
        let mut pkw = HpprfAeadPkw::new(128, 128).unwrap();
        let wrapped = pkw.wrap(&int_tag(0), b"headerinfo", b"mykey").unwrap();
        pkw.punc(&int_tag(12)).unwrap();

        let sealed = pkw.serialize_and_encrypt_key("myPassword").unwrap();
        let restored = HpprfAeadPkw::from_sealed(&sealed, "myPassword").unwrap();

        assert_eq!(restored.num_puncs(), 1);
        let dek = restored.unwrap(&int_tag(0), b"headerinfo", &wrapped).unwrap();
        assert_eq!(dek.expose_secret(), b"mykey");
        assert!(matches!(
            restored.wrap(&int_tag(12), b"", b""),
            Err(PkwError::IllegalTag(_))
        ));
    }

    #[test]
    fn wrong_password_is_an_import_failure() {
        let pkw = HpprfAeadPkw::new(128, 128).unwrap();
        let sealed = pkw.serialize_and_encrypt_key("myPassword").unwrap();
        assert!(matches!(
            HpprfAeadPkw::from_sealed(&sealed, "wrongPassword"),
            Err(PkwError::Import)
        ));
    }

    #[test]
    fn truncated_blob_is_an_import_failure() {
        assert!(matches!(
            open_sealed(&[0u8; SALT_LEN + NONCE_LEN], "pw"),
            Err(PkwError::Import)
        ));
    }
}
