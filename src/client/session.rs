//! Session persistence: the settings directory and the remote lookup table.
//!
//! The settings directory holds `pkw.key` (the serialized PPRF key),
//! `lookup.key` (the table ratchet key), and `properties.cli`
//! (tab-separated `key_len` / `tag_len`). The path↔id table itself lives in
//! cloud object `T`, encrypted under the ratchet key; every session save
//! advances the ratchet with `HKDF(current, "n")`, so a captured old table
//! ciphertext cannot be opened with the current key file.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use thiserror::Error;
use zeroize::Zeroizing;

use crate::client::fsio::{self, FsIoError};
use crate::client::operator::{ClientOperator, OperatorError};
use crate::cloud::DirCloudCommunicator;
use crate::pkw::crypto::{self, CryptoError, NONCE_LEN};
use crate::pkw::tag::{Tag, TagEncodingError};
use crate::pkw::wrap::{HpprfAeadPkw, PkwError};
use crate::provider::{FlatIdProvider, Id};

pub const SETTINGS_ENV: &str = "CLOUDSHRED_SETTINGS";
pub const STORE_ENV: &str = "CLOUDSHRED_STORE";
const APP_DIR: &str = "cloudshred";
const KEY_FILE: &str = "pkw.key";
const RATCHET_FILE: &str = "lookup.key";
const PROPERTIES_FILE: &str = "properties.cli";

const DEFAULT_KEY_LEN: u32 = 256;
const DEFAULT_TAG_LEN: u32 = 256;

/// HKDF label advancing the lookup-table key.
const INFO_RATCHET: &[u8] = b"n";

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("unable to determine settings directory")]
    SettingsDirUnavailable,

    #[error("unable to determine storage directory")]
    StoreDirUnavailable,

    #[error("malformed properties file")]
    MalformedProperties,

    #[error("malformed lookup table")]
    MalformedTable,

    #[error(transparent)]
    Io(#[from] FsIoError),

    #[error(transparent)]
    Pkw(#[from] PkwError),

    #[error(transparent)]
    Crypto(#[from] CryptoError),

    #[error(transparent)]
    Encoding(#[from] TagEncodingError),

    #[error(transparent)]
    Operator(#[from] OperatorError),
}

/// Resolve the settings directory: explicit flag, then the environment,
/// then the platform config directory.
pub fn settings_dir(override_path: Option<&Path>) -> Result<PathBuf, SessionError> {
    if let Some(path) = override_path {
        return Ok(path.to_path_buf());
    }
    if let Some(path) = std::env::var_os(SETTINGS_ENV) {
        return Ok(PathBuf::from(path));
    }
    let mut dir = dirs::config_dir().ok_or(SessionError::SettingsDirUnavailable)?;
    dir.push(APP_DIR);
    Ok(dir)
}

/// Resolve the storage root standing in for the cloud bucket.
pub fn store_dir(override_path: Option<&Path>) -> Result<PathBuf, SessionError> {
    if let Some(path) = override_path {
        return Ok(path.to_path_buf());
    }
    if let Some(path) = std::env::var_os(STORE_ENV) {
        return Ok(PathBuf::from(path));
    }
    let mut dir = dirs::data_local_dir().ok_or(SessionError::StoreDirUnavailable)?;
    dir.push(APP_DIR);
    dir.push("store");
    Ok(dir)
}

pub struct Session {
    settings_dir: PathBuf,
}

impl Session {
    /// Open the session: restore the operator from the settings directory
    /// and the remote lookup table, or start fresh when nothing is
    /// persisted yet.
    pub fn open(
        settings_dir: PathBuf,
        store_root: &Path,
    ) -> Result<(Self, ClientOperator), SessionError> {
        let session = Self { settings_dir };
        let cloud = DirCloudCommunicator::new(store_root).map_err(OperatorError::from)?;

        let key_path = session.settings_dir.join(KEY_FILE);
        let properties_path = session.settings_dir.join(PROPERTIES_FILE);

        let operator = if key_path.exists() && properties_path.exists() {
            let (key_len, tag_len) = read_properties(&properties_path)?;
            let key_bytes = Zeroizing::new(fsio::read_bytes(&key_path)?);
            let pkw = HpprfAeadPkw::from_serialized(&key_bytes)?;

            // A missing or undecryptable table starts an empty binding set;
            // the stored objects are still reachable once re-bound.
            let table = session
                .restore_table(&cloud, key_len, tag_len)
                .unwrap_or_default();
            let provider = FlatIdProvider::from_table(table, tag_len as usize);
            ClientOperator::new(pkw, Box::new(provider), Box::new(cloud))
        } else {
            let pkw = HpprfAeadPkw::new(DEFAULT_TAG_LEN, DEFAULT_KEY_LEN)?;
            let provider = FlatIdProvider::new(DEFAULT_TAG_LEN as usize);
            ClientOperator::new(pkw, Box::new(provider), Box::new(cloud))
        };

        Ok((session, operator))
    }

    /// Persist the session: key file, properties, and the encrypted lookup
    /// table under the advanced ratchet key.
    pub fn save(&self, operator: &mut ClientOperator) -> Result<(), SessionError> {
        fsio::write_bytes_atomic(&self.settings_dir.join(KEY_FILE), &operator.export_key())?;

        let properties = format!(
            "key_len\t{}\ntag_len\t{}\n",
            operator.key_len(),
            operator.tag_len()
        );
        fsio::write_bytes_atomic(
            &self.settings_dir.join(PROPERTIES_FILE),
            properties.as_bytes(),
        )?;

        let next_key = self.advance_ratchet(operator.key_len() as usize / 8)?;
        let table = encode_table(operator)?;
        let nonce = crypto::random_bytes::<NONCE_LEN>();
        let ciphertext = crypto::aead_encrypt(&next_key, &nonce, &[], table.as_bytes())?;

        let mut object = Vec::with_capacity(NONCE_LEN + ciphertext.len());
        object.extend_from_slice(&nonce);
        object.extend_from_slice(&ciphertext);
        operator.write_lookup_table(&object)?;
        Ok(())
    }

    /// Read the table object and decrypt it with the current ratchet key.
    fn restore_table(
        &self,
        cloud: &DirCloudCommunicator,
        key_len: u32,
        tag_len: u32,
    ) -> Result<BTreeMap<PathBuf, Id>, SessionError> {
        use crate::cloud::CloudCommunicator;

        let object = cloud.read_lookup_table_from_cloud().map_err(OperatorError::from)?;
        if object.len() < NONCE_LEN {
            return Err(SessionError::MalformedTable);
        }
        let (nonce, ciphertext) = object.split_at(NONCE_LEN);
        let nonce = crypto::nonce_from_slice(nonce)?;

        let ratchet_key = self.current_ratchet_key(key_len as usize / 8)?;
        let plaintext = crypto::aead_decrypt(&ratchet_key, &nonce, &[], ciphertext)?;
        let text = std::str::from_utf8(&plaintext).map_err(|_| SessionError::MalformedTable)?;
        parse_table(text, tag_len as usize)
    }

    fn ratchet_path(&self) -> PathBuf {
        self.settings_dir.join(RATCHET_FILE)
    }

    /// The ratchet key as currently persisted, or a fresh one.
    fn current_ratchet_key(&self, len: usize) -> Result<Zeroizing<Vec<u8>>, SessionError> {
        let path = self.ratchet_path();
        if path.exists() {
            let key = Zeroizing::new(fsio::read_bytes(&path)?);
            if key.len() == len {
                return Ok(key);
            }
        }
        Ok(crypto::random_secret(len))
    }

    /// Derive the successor ratchet key and persist it; the table written
    /// alongside is encrypted under the successor.
    fn advance_ratchet(&self, len: usize) -> Result<Zeroizing<Vec<u8>>, SessionError> {
        let current = self.current_ratchet_key(len)?;
        let next = crypto::hkdf_expand(&current, INFO_RATCHET, len)?;
        fsio::write_bytes_atomic(&self.ratchet_path(), &next)?;
        Ok(next)
    }
}

/// One line per binding: `path \t base64(local_tag) \t remote_id`.
fn encode_table(operator: &mut ClientOperator) -> Result<String, SessionError> {
    let mut out = String::new();
    for file in operator.list_files() {
        let id = operator.get_id(Path::new(&file))?;
        out.push_str(&file);
        out.push('\t');
        out.push_str(&id.local_tag.to_base64());
        out.push('\t');
        out.push_str(&id.remote_id);
        out.push('\n');
    }
    Ok(out)
}

fn parse_table(text: &str, tag_len: usize) -> Result<BTreeMap<PathBuf, Id>, SessionError> {
    let mut table = BTreeMap::new();
    for line in text.lines() {
        let mut fields = line.splitn(3, '\t');
        let (Some(path), Some(tag), Some(remote)) =
            (fields.next(), fields.next(), fields.next())
        else {
            return Err(SessionError::MalformedTable);
        };
        let tag = Tag::from_base64(tag, tag_len)?;
        table.insert(PathBuf::from(path), Id::new(tag, remote));
    }
    Ok(table)
}

fn read_properties(path: &Path) -> Result<(u32, u32), SessionError> {
    let bytes = fsio::read_bytes(path)?;
    let text = std::str::from_utf8(&bytes).map_err(|_| SessionError::MalformedProperties)?;

    let mut key_len = None;
    let mut tag_len = None;
    for line in text.lines() {
        let Some((name, value)) = line.split_once('\t') else {
            return Err(SessionError::MalformedProperties);
        };
        let value: u32 = value
            .trim()
            .parse()
            .map_err(|_| SessionError::MalformedProperties)?;
        match name {
            "key_len" => key_len = Some(value),
            "tag_len" => tag_len = Some(value),
            _ => {}
        }
    }
    match (key_len, tag_len) {
        (Some(key_len), Some(tag_len)) => Ok((key_len, tag_len)),
        _ => Err(SessionError::MalformedProperties),
    }
}
