//! The storage-side seam: writing, reading, and deleting encrypted blobs.
//!
//! The operator only ever talks to the [`CloudCommunicator`] capability.
//! Per file id `R` the store holds two objects: `R.f` (nonce ‖ body
//! ciphertext) and `R.h` (the wrapped DEK). The reserved object `T` holds
//! the encrypted lookup table. Deletions are batched in a queue that
//! flushes once it exceeds [`MAX_DELETE_QUEUE`] entries.

pub mod dir;

use thiserror::Error;

use crate::pkw::crypto::NONCE_LEN;
use crate::provider::Id;

pub use dir::DirCloudCommunicator;

/// Name of the encrypted lookup-table object.
pub const LOOKUP_TABLE_OBJECT: &str = "T";

/// Queued deletions above this count trigger a flush.
pub const MAX_DELETE_QUEUE: usize = 20;

#[derive(Debug, Error)]
pub enum CloudError {
    #[error("object not found: {0}")]
    NotFound(String),

    #[error("{0} queued deletions failed")]
    DeleteFailed(usize),

    #[error("cloud i/o failure: {0}")]
    Io(#[from] std::io::Error),
}

pub trait CloudCommunicator {
    /// Store body and header for `id`; the two writes run concurrently and
    /// either both land or the error surfaces after best-effort cleanup of
    /// partial state.
    fn write_to_cloud(
        &mut self,
        id: &Id,
        wrapped_key: &[u8],
        ciphertext: &[u8],
        nonce: &[u8; NONCE_LEN],
    ) -> Result<(), CloudError>;

    /// Replace only the header object (key rotation).
    fn write_header_to_cloud(&mut self, id: &Id, wrapped_key: &[u8]) -> Result<(), CloudError>;

    fn read_from_cloud(&self, name: &str) -> Result<Vec<u8>, CloudError>;

    fn write_lookup_table_to_cloud(&mut self, encrypted: &[u8]) -> Result<(), CloudError>;

    fn read_lookup_table_from_cloud(&self) -> Result<Vec<u8>, CloudError>;

    /// Queue both of `id`'s objects for deletion.
    fn enqueue_delete(&mut self, id: &Id);

    /// Flush the queue if it has grown past [`MAX_DELETE_QUEUE`].
    fn handle_delete_queue(&mut self) -> Result<(), CloudError>;

    /// Enumerate remote objects, queue everything no live id references,
    /// flush, and report how many objects were deleted.
    fn clean_storage(&mut self, known_ids: &[Id]) -> Result<usize, CloudError>;

    fn id_to_cloud_name(&self, id: &Id) -> String {
        format!("{}.f", id.remote_id)
    }

    fn id_to_cloud_header(&self, id: &Id) -> String {
        format!("{}.h", id.remote_id)
    }
}

/// A communicator that stores nothing and deletes nothing: the test seam
/// for operator logic that needs no storage behavior.
#[cfg(test)]
pub struct NullCloudCommunicator;

#[cfg(test)]
impl CloudCommunicator for NullCloudCommunicator {
    fn write_to_cloud(
        &mut self,
        _id: &Id,
        _wrapped_key: &[u8],
        _ciphertext: &[u8],
        _nonce: &[u8; NONCE_LEN],
    ) -> Result<(), CloudError> {
        Ok(())
    }

    fn write_header_to_cloud(&mut self, _id: &Id, _wrapped_key: &[u8]) -> Result<(), CloudError> {
        Ok(())
    }

    fn read_from_cloud(&self, name: &str) -> Result<Vec<u8>, CloudError> {
        Err(CloudError::NotFound(name.to_owned()))
    }

    fn write_lookup_table_to_cloud(&mut self, _encrypted: &[u8]) -> Result<(), CloudError> {
        Ok(())
    }

    fn read_lookup_table_from_cloud(&self) -> Result<Vec<u8>, CloudError> {
        Err(CloudError::NotFound(LOOKUP_TABLE_OBJECT.to_owned()))
    }

    fn enqueue_delete(&mut self, _id: &Id) {}

    fn handle_delete_queue(&mut self) -> Result<(), CloudError> {
        Ok(())
    }

    fn clean_storage(&mut self, _known_ids: &[Id]) -> Result<usize, CloudError> {
        Ok(0)
    }
}
