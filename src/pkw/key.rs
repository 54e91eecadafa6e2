//! PPRF key material: the frontier of surviving GGM subtree roots.
//!
//! A key holds a prefix-free set of `(prefix, seed)` nodes whose subtrees
//! cover exactly the unpunctured part of the tag space. The wire layout is
//! fixed (all integers little-endian):
//!
//! ```text
//! u32 key_len ‖ u32 tag_len ‖ u32 puncs ‖ u32 node_count ‖
//!   (u32 prefix_bit_len ‖ prefix, MSB-first zero-padded ‖ seed[key_len/8])*
//! ```

use std::collections::BTreeMap;

use thiserror::Error;
use zeroize::Zeroizing;

use crate::pkw::crypto;
use crate::pkw::tag::{MAX_TAG_LEN, Tag};

#[derive(Debug, Error)]
pub enum KeyFormatError {
    #[error("key length {0} is not a positive multiple of 8 bits")]
    InvalidKeyLen(u32),

    #[error("tag length {0} is out of range")]
    InvalidTagLen(u32),

    #[error("seed has {got} bytes, key length requires {want}")]
    SeedLength { got: usize, want: usize },

    #[error("node prefix exceeds the tag length")]
    PrefixTooLong,

    #[error("serialized key is truncated")]
    Truncated,

    #[error("serialized key has trailing bytes")]
    TrailingBytes,

    #[error("duplicate node prefix")]
    DuplicatePrefix,

    #[error("node prefixes are not prefix-free")]
    NotPrefixFree,
}

/// A surviving GGM subtree: evaluating any tag under `prefix` needs only
/// this seed.
#[derive(Clone)]
pub struct SecretRoot {
    prefix: Tag,
    seed: Zeroizing<Vec<u8>>,
}

impl SecretRoot {
    pub fn new(prefix: Tag, seed: Zeroizing<Vec<u8>>) -> Self {
        Self { prefix, seed }
    }

    pub fn prefix(&self) -> &Tag {
        &self.prefix
    }

    pub fn seed(&self) -> &[u8] {
        &self.seed
    }
}

/// The mutable PPRF state: key/tag widths, the puncture counter, and the
/// frontier node map.
pub struct PprfKey {
    key_len: u32,
    tag_len: u32,
    puncs: u32,
    nodes: BTreeMap<Tag, SecretRoot>,
}

impl PprfKey {
    /// A fresh key: one node with the empty prefix and a random seed, so the
    /// whole tag space is covered and nothing is punctured yet.
    pub fn generate(key_len: u32, tag_len: u32) -> Result<Self, KeyFormatError> {
        let seed = crypto::random_secret(validated_seed_len(key_len)?);
        let root = SecretRoot::new(Tag::empty(), seed);
        Self::from_parts(key_len, tag_len, 0, vec![root])
    }

    /// Assemble a key from explicit nodes, validating widths and
    /// prefix-freeness.
    pub fn from_parts(
        key_len: u32,
        tag_len: u32,
        puncs: u32,
        roots: Vec<SecretRoot>,
    ) -> Result<Self, KeyFormatError> {
        let seed_len = validated_seed_len(key_len)?;
        if tag_len == 0 || tag_len as usize > MAX_TAG_LEN {
            return Err(KeyFormatError::InvalidTagLen(tag_len));
        }

        let mut nodes = BTreeMap::new();
        for root in roots {
            if root.seed.len() != seed_len {
                return Err(KeyFormatError::SeedLength {
                    got: root.seed.len(),
                    want: seed_len,
                });
            }
            if root.prefix.len() > tag_len as usize {
                return Err(KeyFormatError::PrefixTooLong);
            }
            if nodes.insert(root.prefix.clone(), root).is_some() {
                return Err(KeyFormatError::DuplicatePrefix);
            }
        }

        // In lexicographic order a prefix sorts immediately before its
        // extensions, so an adjacent check covers the whole antichain.
        let mut prev: Option<&Tag> = None;
        for prefix in nodes.keys() {
            if let Some(prev) = prev {
                if prev.is_prefix_of(prefix) {
                    return Err(KeyFormatError::NotPrefixFree);
                }
            }
            prev = Some(prefix);
        }

        Ok(Self {
            key_len,
            tag_len,
            puncs,
            nodes,
        })
    }

    pub fn key_len(&self) -> u32 {
        self.key_len
    }

    pub fn tag_len(&self) -> u32 {
        self.tag_len
    }

    pub fn seed_len(&self) -> usize {
        self.key_len as usize / 8
    }

    pub fn puncs(&self) -> u32 {
        self.puncs
    }

    pub fn record_puncture(&mut self) {
        self.puncs += 1;
    }

    pub fn nodes(&self) -> &BTreeMap<Tag, SecretRoot> {
        &self.nodes
    }

    pub fn node(&self, prefix: &Tag) -> Option<&SecretRoot> {
        self.nodes.get(prefix)
    }

    pub fn remove_node(&mut self, prefix: &Tag) -> Option<SecretRoot> {
        self.nodes.remove(prefix)
    }

    pub fn insert_node(&mut self, root: SecretRoot) {
        self.nodes.insert(root.prefix.clone(), root);
    }

    /// Drop every node whose prefix extends `tag` (prefix puncture).
    pub fn remove_subsumed(&mut self, tag: &Tag) {
        self.nodes.retain(|prefix, _| !prefix.starts_with(tag));
    }

    /// Serialize into the fixed wire layout. The buffer zeroizes on drop;
    /// callers own any longer-lived copies.
    pub fn serialize(&self) -> Zeroizing<Vec<u8>> {
        let seed_len = self.seed_len();
        let mut out = Zeroizing::new(Vec::with_capacity(
            16 + self.nodes.len() * (4 + self.tag_len as usize / 8 + 1 + seed_len),
        ));
        out.extend_from_slice(&self.key_len.to_le_bytes());
        out.extend_from_slice(&self.tag_len.to_le_bytes());
        out.extend_from_slice(&self.puncs.to_le_bytes());
        out.extend_from_slice(&(self.nodes.len() as u32).to_le_bytes());
        for root in self.nodes.values() {
            out.extend_from_slice(&(root.prefix.len() as u32).to_le_bytes());
            out.extend_from_slice(&root.prefix.to_packed_bytes());
            out.extend_from_slice(&root.seed);
        }
        out
    }

    /// Parse the fixed wire layout, rejecting truncated or trailing bytes
    /// and any state that violates the key invariants.
    pub fn deserialize(bytes: &[u8]) -> Result<Self, KeyFormatError> {
        let mut pos = 0usize;
        let key_len = read_u32(bytes, &mut pos)?;
        let tag_len = read_u32(bytes, &mut pos)?;
        let puncs = read_u32(bytes, &mut pos)?;
        let node_count = read_u32(bytes, &mut pos)? as usize;

        let seed_len = validated_seed_len(key_len)?;
        if tag_len == 0 || tag_len as usize > MAX_TAG_LEN {
            return Err(KeyFormatError::InvalidTagLen(tag_len));
        }

        let mut roots = Vec::with_capacity(node_count.min(1024));
        for _ in 0..node_count {
            let prefix_bits = read_u32(bytes, &mut pos)? as usize;
            if prefix_bits > tag_len as usize {
                return Err(KeyFormatError::PrefixTooLong);
            }
            let prefix_bytes = take(bytes, &mut pos, prefix_bits.div_ceil(8))?;
            let prefix = Tag::from_packed_bytes(prefix_bytes, prefix_bits)
                .expect("length checked above");
            let seed = Zeroizing::new(take(bytes, &mut pos, seed_len)?.to_vec());
            roots.push(SecretRoot::new(prefix, seed));
        }
        if pos != bytes.len() {
            return Err(KeyFormatError::TrailingBytes);
        }

        Self::from_parts(key_len, tag_len, puncs, roots)
    }
}

fn validated_seed_len(key_len: u32) -> Result<usize, KeyFormatError> {
    if key_len == 0 || key_len % 8 != 0 || key_len > 4096 {
        return Err(KeyFormatError::InvalidKeyLen(key_len));
    }
    Ok(key_len as usize / 8)
}

fn read_u32(bytes: &[u8], pos: &mut usize) -> Result<u32, KeyFormatError> {
    let slice = take(bytes, pos, 4)?;
    Ok(u32::from_le_bytes(slice.try_into().expect("slice is 4 bytes")))
}

fn take<'a>(bytes: &'a [u8], pos: &mut usize, len: usize) -> Result<&'a [u8], KeyFormatError> {
    if bytes.len() - *pos < len {
        return Err(KeyFormatError::Truncated);
    }
    let slice = &bytes[*pos..*pos + len];
    *pos += len;
    Ok(slice)
}
