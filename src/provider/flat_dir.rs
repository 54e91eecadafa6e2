//! Per-directory identifier provider.
//!
//! Local tags restart at zero inside every directory while remote tokens
//! come from one globally monotone counter, so a cloud name reveals neither
//! the directory a file lives in nor how full that directory is.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::pkw::tag::Tag;
use crate::provider::{Id, IdProvider, ProviderError};

pub struct FlatDirIdProvider {
    lookup: BTreeMap<PathBuf, Id>,
    reverse: BTreeMap<Id, PathBuf>,
    dir_counters: BTreeMap<PathBuf, Tag>,
    global: Tag,
    tag_len: usize,
}

impl FlatDirIdProvider {
    pub fn new(tag_len: usize) -> Self {
        let mut dir_counters = BTreeMap::new();
        dir_counters.insert(PathBuf::new(), Tag::zero(tag_len));
        Self {
            lookup: BTreeMap::new(),
            reverse: BTreeMap::new(),
            dir_counters,
            global: Tag::zero(tag_len),
            tag_len,
        }
    }

    /// Erase every binding whose path lies under `dir`, along with the
    /// per-directory counters of the erased subtree.
    pub fn remove_dir(&mut self, dir: &Path) {
        self.dir_counters.retain(|d, _| !d.starts_with(dir));
        self.reverse.retain(|_, path| !path.starts_with(dir));
        self.lookup.retain(|path, _| !path.starts_with(dir));
    }

    fn alloc(&mut self, dir: &Path) -> Result<Id, ProviderError> {
        let tag_len = self.tag_len;
        let counter = self
            .dir_counters
            .entry(dir.to_path_buf())
            .or_insert_with(|| Tag::zero(tag_len));
        if counter.is_all_ones() {
            return Err(ProviderError::IdsExhausted);
        }
        let local = counter.clone();
        *counter = counter.succ().expect("counter is not all ones");

        let remote = self.global.clone();
        self.global = self.global.succ().ok_or(ProviderError::IdsExhausted)?;

        Ok(Id::new(local, remote.to_base64()))
    }
}

fn parent_dir(path: &Path) -> PathBuf {
    path.parent().map(Path::to_path_buf).unwrap_or_default()
}

impl IdProvider for FlatDirIdProvider {
    fn get_id(&mut self, path: &Path) -> Result<Id, ProviderError> {
        if let Some(id) = self.lookup.get(path) {
            return Ok(id.clone());
        }
        let dir = parent_dir(path);
        let id = loop {
            let candidate = self.alloc(&dir)?;
            if !self.reverse.contains_key(&candidate) {
                break candidate;
            }
        };
        self.lookup.insert(path.to_path_buf(), id.clone());
        self.reverse.insert(id.clone(), path.to_path_buf());
        Ok(id)
    }

    fn get_path(&self, id: &Id) -> Result<PathBuf, ProviderError> {
        self.reverse.get(id).cloned().ok_or(ProviderError::UnknownId)
    }

    fn exists_id(&self, id: &Id) -> bool {
        self.reverse.contains_key(id)
    }

    fn exists_path(&self, path: &Path) -> bool {
        self.lookup.contains_key(path)
    }

    fn remove(&mut self, id: &Id) {
        if let Some(path) = self.reverse.remove(id) {
            self.lookup.remove(&path);
        }
    }

    fn len(&self) -> usize {
        self.lookup.len()
    }

    fn list_ids(&self) -> Vec<Id> {
        self.reverse.keys().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn local_tags_restart_per_directory_while_remotes_stay_global() {
        let mut provider = FlatDirIdProvider::new(16);

        let id1 = provider.get_id(Path::new("foo")).unwrap();
        assert_eq!(id1.local_tag, Tag::zero(16));
        assert_eq!(id1.remote_id, Tag::from_u64(0, 16).to_base64());

        let id2 = provider.get_id(Path::new("bar")).unwrap();
        assert_eq!(id2.local_tag, Tag::from_u64(1, 16));
        assert_eq!(id2.remote_id, Tag::from_u64(1, 16).to_base64());

        let id3 = provider.get_id(Path::new("foo/bar")).unwrap();
        assert_eq!(id3.local_tag, Tag::zero(16));
        assert_eq!(id3.remote_id, Tag::from_u64(2, 16).to_base64());

        let id4 = provider.get_id(Path::new("foo/foo")).unwrap();
        assert_eq!(id4.local_tag, Tag::from_u64(1, 16));
        assert_eq!(id4.remote_id, Tag::from_u64(3, 16).to_base64());
    }

    #[test]
    fn remove_and_remove_dir() {
        let mut provider = FlatDirIdProvider::new(16);
        let id1 = provider.get_id(Path::new("foo/foo")).unwrap();
        let id2 = provider.get_id(Path::new("bar")).unwrap();
        let id3 = provider.get_id(Path::new("foo/bar")).unwrap();

        provider.remove(&id1);
        assert!(!provider.exists_id(&id1));
        assert!(provider.exists_id(&id2));
        assert!(provider.exists_id(&id3));
        assert_eq!(provider.get_path(&id1), Err(ProviderError::UnknownId));

        provider.remove_dir(Path::new("foo"));
        assert_eq!(provider.get_path(&id3), Err(ProviderError::UnknownId));
        assert!(provider.exists_id(&id2));
    }

    #[test]
    fn remove_dir_is_component_wise() {
        let mut provider = FlatDirIdProvider::new(16);
        let inside = provider.get_id(Path::new("foo/a")).unwrap();
        let lookalike = provider.get_id(Path::new("foobar")).unwrap();

        provider.remove_dir(Path::new("foo"));
        assert!(!provider.exists_id(&inside));
        assert!(provider.exists_id(&lookalike));
    }

    #[test]
    fn counters_restart_after_remove_dir() {
        let mut provider = FlatDirIdProvider::new(16);
        provider.get_id(Path::new("foo/a")).unwrap();
        provider.get_id(Path::new("foo/b")).unwrap();
        provider.remove_dir(Path::new("foo"));

        let fresh = provider.get_id(Path::new("foo/c")).unwrap();
        assert_eq!(fresh.local_tag, Tag::zero(16));
    }
}
