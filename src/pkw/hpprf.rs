//! Hierarchically puncturable PRF over the GGM tree construction
//! (Goldreich, Goldwasser & Micali, "How to construct random functions",
//! JACM 33(4), 1986).
//!
//! Children of a node seed are `HKDF(seed, "l")` and `HKDF(seed, "r")`;
//! outputs pass through one extra `HKDF(·, "o")` so internal tree state is
//! never returned. Puncturing removes the covering frontier node and
//! replaces it with the co-path siblings of the punctured tag; puncturing a
//! prefix simply erases every node underneath it.

use secrecy::SecretSlice;
use thiserror::Error;
use zeroize::Zeroizing;

use crate::pkw::crypto::{self, SecretBytes};
use crate::pkw::key::{PprfKey, SecretRoot};
use crate::pkw::tag::Tag;

const INFO_LEFT: &[u8] = b"l";
const INFO_RIGHT: &[u8] = b"r";
const INFO_OUT: &[u8] = b"o";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TagError {
    #[error("tag of {len} bits exceeds the configured tag length {max}")]
    TooLong { len: usize, max: u32 },

    #[error("tag lies under a puncture")]
    Punctured,
}

pub struct GgmHpprf {
    key: PprfKey,
}

impl GgmHpprf {
    pub fn new(key: PprfKey) -> Self {
        Self { key }
    }

    pub fn tag_len(&self) -> u32 {
        self.key.tag_len()
    }

    pub fn key_len(&self) -> u32 {
        self.key.key_len()
    }

    pub fn num_puncs(&self) -> u32 {
        self.key.puncs()
    }

    pub fn serialize_key(&self) -> Zeroizing<Vec<u8>> {
        self.key.serialize()
    }

    /// Evaluate the PRF at `tag`.
    ///
    /// Fails with [`TagError::Punctured`] if no surviving subtree covers the
    /// tag, i.e. the tag (or one of its prefixes) was punctured.
    pub fn eval(&self, tag: &Tag) -> Result<SecretBytes, TagError> {
        self.check_len(tag)?;
        let prefix = self.covering_prefix(tag).ok_or(TagError::Punctured)?;
        let node = self.key.node(&prefix).expect("covering prefix is a node");

        let seed_len = self.key.seed_len();
        let mut curr = Zeroizing::new(node.seed().to_vec());
        for i in prefix.len()..tag.len() {
            let info = if tag.bit(i) { INFO_RIGHT } else { INFO_LEFT };
            curr = expand(&curr, info, seed_len);
        }
        let out = expand(&curr, INFO_OUT, seed_len);
        Ok(SecretSlice::from(out.to_vec()))
    }

    /// Puncture the PRF at `tag`.
    ///
    /// A point puncture replaces the covering node with the co-path
    /// siblings. If no node covers `tag`, any nodes lying under it are
    /// erased instead (hierarchical puncture); when there are none either,
    /// the tag was already punctured and this is a no-op.
    pub fn punc(&mut self, tag: &Tag) -> Result<(), TagError> {
        self.check_len(tag)?;
        let Some(prefix) = self.covering_prefix(tag) else {
            self.key.remove_subsumed(tag);
            return Ok(());
        };
        let node = self
            .key
            .remove_node(&prefix)
            .expect("covering prefix is a node");

        let seed_len = self.key.seed_len();
        let mut curr = Zeroizing::new(node.seed().to_vec());
        let mut walked = prefix;
        for i in walked.len()..tag.len() {
            let right = expand(&curr, INFO_RIGHT, seed_len);
            let left = expand(&curr, INFO_LEFT, seed_len);
            let bit = tag.bit(i);
            let (descend, sibling_seed) = if bit { (right, left) } else { (left, right) };

            let mut sibling = walked.clone();
            sibling.push_bit(!bit);
            self.key.insert_node(SecretRoot::new(sibling, sibling_seed));

            curr = descend;
            walked.push_bit(bit);
        }
        // `curr` (the seed at `tag` itself) is dropped and zeroized here.
        self.key.record_puncture();
        Ok(())
    }

    fn check_len(&self, tag: &Tag) -> Result<(), TagError> {
        if tag.len() > self.key.tag_len() as usize {
            return Err(TagError::TooLong {
                len: tag.len(),
                max: self.key.tag_len(),
            });
        }
        Ok(())
    }

    /// The unique frontier node whose prefix covers `tag`, if any.
    fn covering_prefix(&self, tag: &Tag) -> Option<Tag> {
        (0..=tag.len())
            .map(|i| tag.prefix(i))
            .find(|p| self.key.node(p).is_some())
    }
}

fn expand(ikm: &[u8], info: &[u8], len: usize) -> Zeroizing<Vec<u8>> {
    // A single HKDF expand caps out far above any valid seed length, so a
    // failure here is an internal invariant violation.
    crypto::hkdf_expand(ikm, info, len).expect("seed length fits one HKDF expand")
}
