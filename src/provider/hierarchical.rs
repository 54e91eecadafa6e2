//! Hierarchical identifier provider.
//!
//! Every path component consumes 16 bits of tag: an entity's tag is its
//! parent directory's tag followed by the big-endian index the parent
//! assigned it. Directory subtrees therefore occupy tag prefixes, and a
//! single prefix puncture in the HPPRF revokes a whole directory at once.
//!
//! Parent→children and child→parent relations are both kept in maps keyed
//! by path; ownership rests in the maps, never in cross-references.
//! Remote tokens come from a process-wide decimal counter, so cloud names
//! carry no tree structure.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use crate::pkw::tag::Tag;
use crate::provider::{Id, IdProvider, ProviderError};

/// Children per directory are capped by the 16-bit per-level index.
const MAX_DIR_CHILDREN: u32 = 1 << 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum NodeKind {
    File,
    Dir { next_child: u32 },
}

pub struct HierarchicalIdProvider {
    lookup: BTreeMap<PathBuf, (Id, NodeKind)>,
    reverse: BTreeMap<Id, PathBuf>,
    children: BTreeMap<PathBuf, BTreeSet<PathBuf>>,
    remote_counter: u64,
}

impl Default for HierarchicalIdProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl HierarchicalIdProvider {
    pub fn new() -> Self {
        let root = Id::new(Tag::empty(), "");
        let mut lookup = BTreeMap::new();
        lookup.insert(PathBuf::new(), (root.clone(), NodeKind::Dir { next_child: 0 }));
        let mut reverse = BTreeMap::new();
        reverse.insert(root, PathBuf::new());
        let mut children = BTreeMap::new();
        children.insert(PathBuf::new(), BTreeSet::new());
        Self {
            lookup,
            reverse,
            children,
            remote_counter: 0,
        }
    }

    /// Number of live directories, the root included.
    pub fn get_number_dirs(&self) -> usize {
        self.children.len()
    }

    /// Take the next child index of the directory at `dir` and build the
    /// child's id from it.
    fn alloc_child(&mut self, dir: &Path) -> Result<Id, ProviderError> {
        let (dir_id, kind) = self
            .lookup
            .get_mut(dir)
            .ok_or(ProviderError::RootPunctured)?;
        let NodeKind::Dir { next_child } = kind else {
            return Err(ProviderError::FileDirConflict(dir.to_path_buf()));
        };
        if *next_child >= MAX_DIR_CHILDREN {
            return Err(ProviderError::IdsExhausted);
        }
        let index = *next_child as u16;
        *next_child += 1;

        let tag = dir_id.local_tag.concat(&Tag::from_u16(index));
        let remote = self.remote_counter.to_string();
        self.remote_counter += 1;
        Ok(Id::new(tag, remote))
    }

    /// Create any missing ancestor directories of `path`, closest to the
    /// root first.
    fn ensure_parent_dirs(&mut self, path: &Path) -> Result<(), ProviderError> {
        let mut missing = Vec::new();
        let mut current = parent_of(path);
        while !self.lookup.contains_key(&current) {
            missing.push(current.clone());
            current = parent_of(&current);
        }
        for dir in missing.into_iter().rev() {
            let parent = parent_of(&dir);
            let id = self.alloc_child(&parent)?;
            self.lookup
                .insert(dir.clone(), (id.clone(), NodeKind::Dir { next_child: 0 }));
            self.reverse.insert(id, dir.clone());
            self.children.insert(dir.clone(), BTreeSet::new());
            self.children
                .entry(parent)
                .or_default()
                .insert(dir);
        }
        Ok(())
    }

    fn collect_descendants(&self, path: &Path) -> Vec<PathBuf> {
        let mut all = Vec::new();
        if let Some(direct) = self.children.get(path) {
            for child in direct {
                all.push(child.clone());
                all.extend(self.collect_descendants(child));
            }
        }
        all
    }

    /// Walk upward from `path`'s parent, erasing directories that became
    /// empty. The root itself is never pruned.
    fn prune_empty_ancestors(&mut self, path: &Path) {
        let mut path = path.to_path_buf();
        let mut parent = parent_of(&path);
        if let Some(siblings) = self.children.get_mut(&parent) {
            siblings.remove(&path);
        }
        while !parent.as_os_str().is_empty()
            && self.children.get(&parent).is_some_and(BTreeSet::is_empty)
        {
            self.children.remove(&parent);
            if let Some((dir_id, _)) = self.lookup.remove(&parent) {
                self.reverse.remove(&dir_id);
            }
            path = parent;
            parent = parent_of(&path);
            if let Some(siblings) = self.children.get_mut(&parent) {
                siblings.remove(&path);
            }
        }
    }
}

fn parent_of(path: &Path) -> PathBuf {
    path.parent().map(Path::to_path_buf).unwrap_or_default()
}

impl IdProvider for HierarchicalIdProvider {
    fn get_id(&mut self, path: &Path) -> Result<Id, ProviderError> {
        if let Some((id, _)) = self.lookup.get(path) {
            return Ok(id.clone());
        }
        if self.lookup.is_empty() {
            return Err(ProviderError::RootPunctured);
        }
        self.ensure_parent_dirs(path)?;

        let parent = parent_of(path);
        let id = self.alloc_child(&parent)?;
        self.lookup
            .insert(path.to_path_buf(), (id.clone(), NodeKind::File));
        self.reverse.insert(id.clone(), path.to_path_buf());
        self.children
            .entry(parent)
            .or_default()
            .insert(path.to_path_buf());
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
        let Some(path) = self.reverse.get(id).cloned() else {
            return;
        };

        for descendant in self.collect_descendants(&path) {
            if let Some((descendant_id, _)) = self.lookup.remove(&descendant) {
                self.reverse.remove(&descendant_id);
            }
            self.children.remove(&descendant);
        }

        self.lookup.remove(&path);
        self.reverse.remove(id);
        self.children.remove(&path);

        if path.as_os_str().is_empty() {
            // The root itself was removed: the provider is spent.
            return;
        }
        self.prune_empty_ancestors(&path);
    }

    /// Live bindings counted over files; directories are bookkeeping.
    fn len(&self) -> usize {
        self.list_ids().len()
    }

    fn list_ids(&self) -> Vec<Id> {
        self.lookup
            .values()
            .filter(|(_, kind)| *kind == NodeKind::File)
            .map(|(id, _)| id.clone())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ints_tag(indices: &[u16]) -> Tag {
        indices
            .iter()
            .fold(Tag::empty(), |acc, &i| acc.concat(&Tag::from_u16(i)))
    }

    fn local(provider: &mut HierarchicalIdProvider, path: &str) -> Tag {
        provider.get_id(Path::new(path)).unwrap().local_tag
    }

    #[test]
    fn root_has_the_empty_tag() {
        let mut provider = HierarchicalIdProvider::new();
        assert_eq!(local(&mut provider, ""), Tag::empty());
    }

    #[test]
    fn first_file_gets_all_zero_indices() {
        let mut provider = HierarchicalIdProvider::new();
        assert_eq!(local(&mut provider, "path/one/file.txt"), ints_tag(&[0, 0, 0]));
    }

    #[test]
    fn sibling_files_and_directories_count_up() {
        let mut provider = HierarchicalIdProvider::new();
        assert_eq!(local(&mut provider, "path/one/file1.txt"), ints_tag(&[0, 0, 0]));
        assert_eq!(local(&mut provider, "path/one/file2.txt"), ints_tag(&[0, 0, 1]));
        assert_eq!(local(&mut provider, "path/one/file3.txt"), ints_tag(&[0, 0, 2]));

        assert_eq!(local(&mut provider, "path/two/file1.txt"), ints_tag(&[0, 1, 0]));
        assert_eq!(local(&mut provider, "path/two/file2.txt"), ints_tag(&[0, 1, 1]));

        assert_eq!(local(&mut provider, "path/one"), ints_tag(&[0, 0]));
        assert_eq!(local(&mut provider, "path/two"), ints_tag(&[0, 1]));
    }

    #[test]
    fn remote_ids_are_a_decimal_counter() {
        let mut provider = HierarchicalIdProvider::new();
        let id = provider.get_id(Path::new("a/b.txt")).unwrap();
        // "a" took remote id 0, the file takes 1.
        assert_eq!(id.remote_id, "1");
        let next = provider.get_id(Path::new("c.txt")).unwrap();
        assert_eq!(next.remote_id, "2");
    }

    #[test]
    fn removing_a_directory_removes_the_subtree_and_prunes_empty_parents() {
        let mut provider = HierarchicalIdProvider::new();
        local(&mut provider, "path/one/file1.txt");
        local(&mut provider, "path/one/file2.txt");
        local(&mut provider, "path/one/file3.txt");

        let dir_id = provider.get_id(Path::new("path/one")).unwrap();
        provider.remove(&dir_id);

        assert!(!provider.exists_path(Path::new("path/one")));
        assert!(!provider.exists_path(Path::new("path/one/file1.txt")));
        assert!(!provider.exists_path(Path::new("path/one/file2.txt")));
        assert!(!provider.exists_path(Path::new("path/one/file3.txt")));
        // "path" became empty and was pruned; only the root remains.
        assert!(!provider.exists_path(Path::new("path")));
        assert_eq!(provider.get_number_dirs(), 1);
    }

    #[test]
    fn recreated_directories_never_reuse_punctured_indices() {
        let mut provider = HierarchicalIdProvider::new();
        local(&mut provider, "path/one/file1.txt");
        local(&mut provider, "path/one/file2.txt");
        local(&mut provider, "path/one/file3.txt");

        let one = provider.get_id(Path::new("path/one")).unwrap();
        provider.remove(&one);
        assert_eq!(provider.get_number_dirs(), 1);

        // "path" comes back under the root's next index, never index 0
        // again: its old subtree is cryptographically dead.
        assert_eq!(local(&mut provider, "path/file1.txt"), ints_tag(&[1, 0]));
        assert_eq!(provider.get_number_dirs(), 2);

        assert_eq!(local(&mut provider, "path/two/file1.txt"), ints_tag(&[1, 1, 0]));
        assert_eq!(local(&mut provider, "path/two/file2.txt"), ints_tag(&[1, 1, 1]));
        assert_eq!(provider.get_number_dirs(), 3);

        let path_id = provider.get_id(Path::new("path")).unwrap();
        provider.remove(&path_id);

        assert!(!provider.exists_path(Path::new("path/two")));
        assert!(!provider.exists_path(Path::new("path/two/file1.txt")));
        assert_eq!(provider.get_number_dirs(), 1);

        assert_eq!(local(&mut provider, "path/one/file1.txt"), ints_tag(&[2, 0, 0]));
        assert_eq!(local(&mut provider, "path/one/file2.txt"), ints_tag(&[2, 0, 1]));
        assert_eq!(provider.get_number_dirs(), 3);
    }

    #[test]
    fn removing_a_file_keeps_populated_parents() {
        let mut provider = HierarchicalIdProvider::new();
        let keep = provider.get_id(Path::new("dir/keep.txt")).unwrap();
        let gone = provider.get_id(Path::new("dir/gone.txt")).unwrap();

        provider.remove(&gone);
        assert!(provider.exists_id(&keep));
        assert!(provider.exists_path(Path::new("dir")));
        assert_eq!(provider.get_number_dirs(), 2);
    }

    #[test]
    fn removing_the_root_spends_the_provider() {
        let mut provider = HierarchicalIdProvider::new();
        local(&mut provider, "a/b.txt");

        let root = provider.get_id(Path::new("")).unwrap();
        provider.remove(&root);

        assert_eq!(
            provider.get_id(Path::new("c.txt")),
            Err(ProviderError::RootPunctured)
        );
    }

    #[test]
    fn files_cannot_become_directories() {
        let mut provider = HierarchicalIdProvider::new();
        local(&mut provider, "entry");
        assert_eq!(
            provider.get_id(Path::new("entry/child.txt")),
            Err(ProviderError::FileDirConflict(PathBuf::from("entry")))
        );
    }

    #[test]
    fn list_ids_only_reports_files() {
        let mut provider = HierarchicalIdProvider::new();
        let file = provider.get_id(Path::new("dir/file.txt")).unwrap();
        let ids = provider.list_ids();
        assert_eq!(ids, vec![file]);
        assert_eq!(provider.len(), 1);
    }
}
