//! Directory-backed cloud communicator.
//!
//! A local directory stands in for the object store: one file per object,
//! written with the temp-file + persist pattern so readers never observe a
//! half-written object. Concurrency mirrors the remote adapter it replaces:
//! body and header writes run in parallel, and the delete queue flushes all
//! deletions at once.

use std::collections::BTreeSet;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::thread;

use crate::cloud::{CloudCommunicator, CloudError, LOOKUP_TABLE_OBJECT, MAX_DELETE_QUEUE};
use crate::pkw::crypto::NONCE_LEN;
use crate::provider::Id;

pub struct DirCloudCommunicator {
    root: PathBuf,
    delete_queue: Vec<String>,
}

impl DirCloudCommunicator {
    /// Open (and create if needed) the store rooted at `root`.
    pub fn new(root: impl Into<PathBuf>) -> Result<Self, CloudError> {
        let root = root.into();
        fs::create_dir_all(&root)?;
        Ok(Self {
            root,
            delete_queue: Vec::new(),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn object_path(&self, name: &str) -> PathBuf {
        self.root.join(name)
    }

    fn write_object(&self, name: &str, parts: &[&[u8]]) -> Result<(), CloudError> {
        let mut tmp = tempfile::NamedTempFile::new_in(&self.root)?;
        for part in parts {
            tmp.as_file_mut().write_all(part)?;
        }
        tmp.as_file_mut().sync_all()?;
        tmp.persist(self.object_path(name))
            .map_err(|e| CloudError::Io(e.error))?;
        Ok(())
    }

    fn remove_object_best_effort(&self, name: &str) {
        let _ = fs::remove_file(self.object_path(name));
    }

    /// Delete every queued object concurrently; the queue is only emptied
    /// when all deletions succeed. Deleting an already-absent object counts
    /// as success: the queue may hold names that were never written (a
    /// shredded directory id) or that a concurrent clean got to first.
    fn flush_deletes(&mut self) -> Result<(), CloudError> {
        let results: Vec<io::Result<()>> = thread::scope(|s| {
            let handles: Vec<_> = self
                .delete_queue
                .iter()
                .map(|name| {
                    let path = self.object_path(name);
                    s.spawn(move || fs::remove_file(path))
                })
                .collect();
            handles
                .into_iter()
                .map(|h| h.join().expect("delete worker panicked"))
                .collect()
        });

        let failed = results
            .iter()
            .filter(|r| matches!(r, Err(e) if e.kind() != io::ErrorKind::NotFound))
            .count();
        if failed > 0 {
            return Err(CloudError::DeleteFailed(failed));
        }
        self.delete_queue.clear();
        Ok(())
    }
}

impl CloudCommunicator for DirCloudCommunicator {
    fn write_to_cloud(
        &mut self,
        id: &Id,
        wrapped_key: &[u8],
        ciphertext: &[u8],
        nonce: &[u8; NONCE_LEN],
    ) -> Result<(), CloudError> {
        let body_name = self.id_to_cloud_name(id);
        let header_name = self.id_to_cloud_header(id);

        let (body, header) = thread::scope(|s| {
            let body = s.spawn(|| self.write_object(&body_name, &[nonce.as_slice(), ciphertext]));
            let header = s.spawn(|| self.write_object(&header_name, &[wrapped_key]));
            (
                body.join().expect("body writer panicked"),
                header.join().expect("header writer panicked"),
            )
        });

        if body.is_err() || header.is_err() {
            self.remove_object_best_effort(&body_name);
            self.remove_object_best_effort(&header_name);
        }
        body.and(header)
    }

    fn write_header_to_cloud(&mut self, id: &Id, wrapped_key: &[u8]) -> Result<(), CloudError> {
        self.write_object(&self.id_to_cloud_header(id), &[wrapped_key])
    }

    fn read_from_cloud(&self, name: &str) -> Result<Vec<u8>, CloudError> {
        fs::read(self.object_path(name)).map_err(|e| {
            if e.kind() == io::ErrorKind::NotFound {
                CloudError::NotFound(name.to_owned())
            } else {
                CloudError::Io(e)
            }
        })
    }

    fn write_lookup_table_to_cloud(&mut self, encrypted: &[u8]) -> Result<(), CloudError> {
        self.write_object(LOOKUP_TABLE_OBJECT, &[encrypted])
    }

    fn read_lookup_table_from_cloud(&self) -> Result<Vec<u8>, CloudError> {
        self.read_from_cloud(LOOKUP_TABLE_OBJECT)
    }

    fn enqueue_delete(&mut self, id: &Id) {
        self.delete_queue.push(self.id_to_cloud_name(id));
        self.delete_queue.push(self.id_to_cloud_header(id));
    }

    fn handle_delete_queue(&mut self) -> Result<(), CloudError> {
        if self.delete_queue.len() > MAX_DELETE_QUEUE {
            self.flush_deletes()?;
        }
        Ok(())
    }

    fn clean_storage(&mut self, known_ids: &[Id]) -> Result<usize, CloudError> {
        let known: BTreeSet<&str> = known_ids.iter().map(|id| id.remote_id.as_str()).collect();

        for entry in fs::read_dir(&self.root)? {
            let name = entry?.file_name().to_string_lossy().into_owned();
            if name == LOOKUP_TABLE_OBJECT {
                continue;
            }
            // Object names end in ".f" or ".h"; strip that to recover the
            // remote id.
            let Some(remote) = name.len().checked_sub(2).and_then(|end| name.get(..end)) else {
                continue;
            };
            if !known.contains(remote) && !self.delete_queue.contains(&name) {
                self.delete_queue.push(name);
            }
        }

        let count = self.delete_queue.len();
        self.flush_deletes()?;
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pkw::tag::Tag;

    fn id(remote: &str) -> Id {
        Id::new(Tag::from_u64(1, 16), remote)
    }

    fn store() -> (tempfile::TempDir, DirCloudCommunicator) {
        let dir = tempfile::tempdir().unwrap();
        let comm = DirCloudCommunicator::new(dir.path().join("bucket")).unwrap();
        (dir, comm)
    }

    #[test]
    fn write_stores_body_and_header_objects() {
        let (_guard, mut comm) = store();
        let nonce = [7u8; NONCE_LEN];
        comm.write_to_cloud(&id("42"), b"wrapped", b"ciphertext", &nonce)
            .unwrap();

        let body = comm.read_from_cloud("42.f").unwrap();
        assert_eq!(&body[..NONCE_LEN], &nonce);
        assert_eq!(&body[NONCE_LEN..], b"ciphertext");
        assert_eq!(comm.read_from_cloud("42.h").unwrap(), b"wrapped");
    }

    #[test]
    fn header_write_replaces_only_the_header() {
        let (_guard, mut comm) = store();
        let nonce = [0u8; NONCE_LEN];
        comm.write_to_cloud(&id("7"), b"old", b"body", &nonce).unwrap();

        comm.write_header_to_cloud(&id("7"), b"new").unwrap();
        assert_eq!(comm.read_from_cloud("7.h").unwrap(), b"new");
        assert_eq!(&comm.read_from_cloud("7.f").unwrap()[NONCE_LEN..], b"body");
    }

    #[test]
    fn missing_objects_are_not_found() {
        let (_guard, comm) = store();
        assert!(matches!(
            comm.read_from_cloud("nope.f"),
            Err(CloudError::NotFound(_))
        ));
    }

    #[test]
    fn delete_queue_flushes_past_the_threshold() {
        let (_guard, mut comm) = store();
        let nonce = [0u8; NONCE_LEN];
        // 11 ids = 22 objects: one over the queue limit after enqueueing.
        for i in 0..11 {
            let id = id(&i.to_string());
            comm.write_to_cloud(&id, b"w", b"c", &nonce).unwrap();
            comm.enqueue_delete(&id);
        }
        assert!(comm.read_from_cloud("0.f").is_ok());

        comm.handle_delete_queue().unwrap();
        assert!(matches!(
            comm.read_from_cloud("0.f"),
            Err(CloudError::NotFound(_))
        ));
        assert!(matches!(
            comm.read_from_cloud("10.h"),
            Err(CloudError::NotFound(_))
        ));
    }

    #[test]
    fn small_queues_stay_parked() {
        let (_guard, mut comm) = store();
        let nonce = [0u8; NONCE_LEN];
        comm.write_to_cloud(&id("1"), b"w", b"c", &nonce).unwrap();
        comm.enqueue_delete(&id("1"));
        comm.handle_delete_queue().unwrap();
        assert!(comm.read_from_cloud("1.f").is_ok());
    }

    #[test]
    fn clean_storage_removes_unreferenced_objects_and_spares_the_table() {
        let (_guard, mut comm) = store();
        let nonce = [0u8; NONCE_LEN];
        comm.write_to_cloud(&id("live"), b"w", b"c", &nonce).unwrap();
        comm.write_to_cloud(&id("dead"), b"w", b"c", &nonce).unwrap();
        comm.write_lookup_table_to_cloud(b"table").unwrap();

        let deleted = comm.clean_storage(&[id("live")]).unwrap();
        assert_eq!(deleted, 2);

        assert!(comm.read_from_cloud("live.f").is_ok());
        assert!(comm.read_from_cloud("live.h").is_ok());
        assert!(comm.read_lookup_table_from_cloud().is_ok());
        assert!(matches!(
            comm.read_from_cloud("dead.f"),
            Err(CloudError::NotFound(_))
        ));
    }

    #[test]
    fn clean_storage_counts_previously_queued_objects_once() {
        let (_guard, mut comm) = store();
        let nonce = [0u8; NONCE_LEN];
        comm.write_to_cloud(&id("gone"), b"w", b"c", &nonce).unwrap();
        comm.enqueue_delete(&id("gone"));

        let deleted = comm.clean_storage(&[]).unwrap();
        assert_eq!(deleted, 2);
    }
}
