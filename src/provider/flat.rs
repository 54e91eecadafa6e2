//! Flat identifier provider: one monotone counter over the whole tag space.
//!
//! The remote token is the base-64 view of the tag itself; cloud names leak
//! nothing beyond allocation order.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::pkw::tag::Tag;
use crate::provider::{Id, IdProvider, ProviderError};

pub struct FlatIdProvider {
    lookup: BTreeMap<PathBuf, Id>,
    reverse: BTreeMap<Tag, PathBuf>,
    tag_len: usize,
    counter: Tag,
}

impl FlatIdProvider {
    pub fn new(tag_len: usize) -> Self {
        Self {
            lookup: BTreeMap::new(),
            reverse: BTreeMap::new(),
            tag_len,
            counter: Tag::zero(tag_len),
        }
    }

    /// Rebuild from a persisted lookup table. The counter resumes at the
    /// maximum bound tag, so the next allocation is max + 1.
    pub fn from_table(table: BTreeMap<PathBuf, Id>, tag_len: usize) -> Self {
        let mut counter = Tag::zero(tag_len);
        let mut reverse = BTreeMap::new();
        for (path, id) in &table {
            reverse.insert(id.local_tag.clone(), path.clone());
            if id.local_tag > counter {
                counter = id.local_tag.clone();
            }
        }
        Self {
            lookup: table,
            reverse,
            tag_len,
            counter,
        }
    }

    pub fn tag_len(&self) -> usize {
        self.tag_len
    }

    /// Advance the counter to the next unbound tag.
    fn next_tag(&mut self) -> Result<Tag, ProviderError> {
        loop {
            let next = self.counter.succ().ok_or(ProviderError::IdsExhausted)?;
            self.counter = next.clone();
            if !self.reverse.contains_key(&next) {
                return Ok(next);
            }
        }
    }
}

impl IdProvider for FlatIdProvider {
    fn get_id(&mut self, path: &Path) -> Result<Id, ProviderError> {
        if let Some(id) = self.lookup.get(path) {
            return Ok(id.clone());
        }
        let tag = self.next_tag()?;
        let id = Id::new(tag.clone(), tag.to_base64());
        self.lookup.insert(path.to_path_buf(), id.clone());
        self.reverse.insert(tag, path.to_path_buf());
        Ok(id)
    }

    fn get_path(&self, id: &Id) -> Result<PathBuf, ProviderError> {
        self.reverse
            .get(&id.local_tag)
            .cloned()
            .ok_or(ProviderError::UnknownId)
    }

    fn exists_id(&self, id: &Id) -> bool {
        self.reverse.contains_key(&id.local_tag)
    }

    fn exists_path(&self, path: &Path) -> bool {
        self.lookup.contains_key(path)
    }

    fn remove(&mut self, id: &Id) {
        if let Some(path) = self.reverse.remove(&id.local_tag) {
            self.lookup.remove(&path);
        }
    }

    fn len(&self) -> usize {
        self.lookup.len()
    }

    fn list_ids(&self) -> Vec<Id> {
        self.lookup.values().cloned().collect()
    }
}
