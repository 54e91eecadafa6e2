//! The client operator: the top-level file API.
//!
//! Composes an identifier provider, the PKW engine, and a cloud
//! communicator into `put` / `get` / `shred` / `rotate_keys` / `clean`.
//! Every operation takes `&mut self`: exclusive access is the serialization
//! the wrap-once-per-tag contract requires.

use std::path::{Path, PathBuf};

use secrecy::ExposeSecret;
use thiserror::Error;
use zeroize::Zeroizing;

use crate::cloud::{CloudCommunicator, CloudError};
use crate::pkw::crypto::{self, NONCE_LEN};
use crate::pkw::wrap::{HpprfAeadPkw, PkwError};
use crate::provider::{Id, IdProvider, ProviderError};

#[derive(Debug, Error)]
pub enum OperatorError {
    #[error(transparent)]
    Pkw(#[from] PkwError),

    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error(transparent)]
    Cloud(#[from] CloudError),

    #[error("stored object {0} is malformed")]
    Malformed(String),
}

pub struct ClientOperator {
    pkw: HpprfAeadPkw,
    provider: Box<dyn IdProvider>,
    cloud: Box<dyn CloudCommunicator>,
}

impl ClientOperator {
    pub fn new(
        pkw: HpprfAeadPkw,
        provider: Box<dyn IdProvider>,
        cloud: Box<dyn CloudCommunicator>,
    ) -> Self {
        Self {
            pkw,
            provider,
            cloud,
        }
    }

    /// Encrypt `content` under a fresh DEK, wrap the DEK under the path's
    /// tag, and store both objects.
    ///
    /// A path that is already bound is shredded first and re-bound to a
    /// fresh id: wrapping twice under a live tag is forbidden, so an
    /// overwrite always rotates the tag.
    pub fn put(&mut self, path: &Path, content: &[u8]) -> Result<Id, OperatorError> {
        if self.provider.exists_path(path) {
            let old = self.provider.get_id(path)?;
            self.shred(&old)?;
        }
        let id = self.provider.get_id(path)?;
        let header = id.remote_id.as_bytes();

        let dek = crypto::random_secret(self.pkw.key_len() as usize / 8);
        let nonce = crypto::random_bytes::<NONCE_LEN>();
        let ciphertext =
            crypto::aead_encrypt(&dek, &nonce, header, content).map_err(PkwError::from)?;
        let wrapped = self.pkw.wrap(&id.local_tag, header, &dek)?;

        self.cloud.write_to_cloud(&id, &wrapped, &ciphertext, &nonce)?;
        Ok(id)
    }

    /// Fetch and decrypt the file stored under `id`.
    pub fn get(&self, id: &Id) -> Result<Vec<u8>, OperatorError> {
        let body_name = self.cloud.id_to_cloud_name(id);
        let body = self.cloud.read_from_cloud(&body_name)?;
        if body.len() < NONCE_LEN {
            return Err(OperatorError::Malformed(body_name));
        }
        let (nonce, ciphertext) = body.split_at(NONCE_LEN);
        let nonce = crypto::nonce_from_slice(nonce).map_err(PkwError::from)?;

        let wrapped = self
            .cloud
            .read_from_cloud(&self.cloud.id_to_cloud_header(id))?;
        let header = id.remote_id.as_bytes();
        let dek = self.pkw.unwrap(&id.local_tag, header, &wrapped)?;

        let content = crypto::aead_decrypt(dek.expose_secret(), &nonce, header, ciphertext)
            .map_err(|_| PkwError::Auth)?;
        Ok(content.to_vec())
    }

    /// Cryptographically delete `id`: puncture its tag, drop the binding,
    /// and queue the remote objects for deletion.
    ///
    /// The puncture alone already makes the stored DEK unrecoverable; the
    /// remote deletes are cleanup and may lag in the queue.
    pub fn shred(&mut self, id: &Id) -> Result<(), OperatorError> {
        self.pkw.punc(&id.local_tag)?;
        self.provider.remove(id);
        self.cloud.enqueue_delete(id);
        self.cloud.handle_delete_queue()?;
        Ok(())
    }

    /// Re-wrap every live file key under `new_pkw` and install it. File
    /// bodies stay untouched. Returns the number of re-wrapped headers.
    pub fn rotate_keys(&mut self, new_pkw: HpprfAeadPkw) -> Result<usize, OperatorError> {
        let ids = self.provider.list_ids();
        for id in &ids {
            let header = id.remote_id.as_bytes();
            let wrapped = self
                .cloud
                .read_from_cloud(&self.cloud.id_to_cloud_header(id))?;
            let dek = self.pkw.unwrap(&id.local_tag, header, &wrapped)?;
            let rewrapped = new_pkw.wrap(&id.local_tag, header, dek.expose_secret())?;
            self.cloud.write_header_to_cloud(id, &rewrapped)?;
        }
        self.pkw = new_pkw;
        Ok(ids.len())
    }

    /// Remove cloud objects no live id references; returns the count.
    pub fn clean(&mut self) -> Result<usize, OperatorError> {
        Ok(self.cloud.clean_storage(&self.provider.list_ids())?)
    }

    pub fn list_files(&self) -> Vec<String> {
        let mut files: Vec<String> = self
            .provider
            .list_ids()
            .iter()
            .filter_map(|id| self.provider.get_path(id).ok())
            .map(|p| p.display().to_string())
            .collect();
        files.sort();
        files
    }

    pub fn get_id(&mut self, path: &Path) -> Result<Id, OperatorError> {
        Ok(self.provider.get_id(path)?)
    }

    pub fn exists_path(&self, path: &Path) -> bool {
        self.provider.exists_path(path)
    }

    pub fn get_file_name(&self, id: &Id) -> Result<PathBuf, OperatorError> {
        Ok(self.provider.get_path(id)?)
    }

    pub fn export_key(&self) -> Zeroizing<Vec<u8>> {
        self.pkw.serialize_key()
    }

    pub fn export_key_with_password(&self, password: &str) -> Result<Vec<u8>, OperatorError> {
        Ok(self.pkw.serialize_and_encrypt_key(password)?)
    }

    pub fn num_puncs(&self) -> u32 {
        self.pkw.num_puncs()
    }

    pub fn tag_len(&self) -> u32 {
        self.pkw.tag_len()
    }

    pub fn key_len(&self) -> u32 {
        self.pkw.key_len()
    }

    pub fn write_lookup_table(&mut self, encrypted: &[u8]) -> Result<(), OperatorError> {
        Ok(self.cloud.write_lookup_table_to_cloud(encrypted)?)
    }

    pub fn read_lookup_table(&self) -> Result<Vec<u8>, OperatorError> {
        Ok(self.cloud.read_lookup_table_from_cloud()?)
    }
}
