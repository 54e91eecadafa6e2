//! The puncturable key-wrapping (PKW) engine.
//!
//! Layering, bottom up: [`tag`] defines the bit-string index space, [`key`]
//! holds the GGM frontier state, [`hpprf`] evaluates and punctures the
//! tree, and [`wrap`] turns PRF outputs into single-use AES-GCM wrapping
//! keys. [`seal`] adds the password-sealed export format and [`crypto`] the
//! shared primitives.

pub mod crypto;
pub mod hpprf;
pub mod key;
pub mod seal;
pub mod tag;
pub mod wrap;

pub use crypto::SecretBytes;
pub use hpprf::{GgmHpprf, TagError};
pub use key::{KeyFormatError, PprfKey, SecretRoot};
pub use tag::{MAX_TAG_LEN, Tag};
pub use wrap::{HpprfAeadPkw, PkwError};
