//! Identifier providers: binding file paths to compact identifiers.
//!
//! An [`Id`] pairs the cryptographic handle (the PKW tag) with an opaque
//! remote token used to name cloud objects, so the storage side never sees
//! tag structure. Providers differ in how tags are laid out: [`flat`]
//! counts through the tag space, [`flat_dir`] counts per directory, and
//! [`hierarchical`] gives each path component 16 bits so a directory maps
//! onto a tag prefix and can be punctured as a subtree.

pub mod flat;
pub mod flat_dir;
pub mod hierarchical;

use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::pkw::tag::Tag;

pub use flat::FlatIdProvider;
pub use flat_dir::FlatDirIdProvider;
pub use hierarchical::HierarchicalIdProvider;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ProviderError {
    #[error("unknown identifier")]
    UnknownId,

    #[error("identifier space is exhausted")]
    IdsExhausted,

    #[error("the root has been punctured; no identifiers can be issued")]
    RootPunctured,

    #[error("cannot treat file {0:?} as a directory")]
    FileDirConflict(PathBuf),
}

/// A file's identity: the local PKW tag and the remote object token.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct Id {
    pub local_tag: Tag,
    pub remote_id: String,
}

impl Id {
    pub fn new(local_tag: Tag, remote_id: impl Into<String>) -> Self {
        Self {
            local_tag,
            remote_id: remote_id.into(),
        }
    }
}

/// Capability interface over the path ↔ id binding.
///
/// `get_id` is idempotent: a bound path keeps its id until it is removed.
pub trait IdProvider {
    fn get_id(&mut self, path: &Path) -> Result<Id, ProviderError>;

    fn get_path(&self, id: &Id) -> Result<PathBuf, ProviderError>;

    fn exists_id(&self, id: &Id) -> bool;

    fn exists_path(&self, path: &Path) -> bool;

    /// Unbind `id`. Removing an unknown id is a no-op.
    fn remove(&mut self, id: &Id);

    /// Number of live bindings.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn list_ids(&self) -> Vec<Id>;
}
